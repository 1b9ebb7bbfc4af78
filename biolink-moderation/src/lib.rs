pub mod controller;
pub mod escalation;

#[cfg(test)]
mod testing;

pub use controller::{
    ModerationController, ModerationError, ResetOutcome, Screening, Violation, ViolationOutcome,
};
pub use escalation::{EnforcementAction, EscalationDecision, decide};
