//! Escalation rules: warning count + group policy -> enforcement action.
//!
//! Pure functions only. Callers own reading and writing the stores.

use biolink_database::model::group_policy::GroupPolicy;

/// What happens to a member on top of the warning notice.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnforcementAction {
    /// Notice only; no restriction.
    Warn,
    /// Restrict the member to read-only.
    Mute,
    /// Remove the member from the group.
    Ban,
}

impl EnforcementAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warn => "warn",
            Self::Mute => "mute",
            Self::Ban => "ban",
        }
    }

    pub fn restricts(self) -> bool {
        !matches!(self, Self::Warn)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EscalationDecision {
    pub new_count: u32,
    pub action: EnforcementAction,
}

/// Decide the outcome of one more violation.
///
/// Below `threshold` the member is only warned. At or above it, ban wins over
/// mute when a group enables both, and a group with neither stays warn-only
/// indefinitely.
pub fn decide(count_before: u32, policy: GroupPolicy, threshold: u32) -> EscalationDecision {
    let new_count = count_before.saturating_add(1);

    let action = if new_count < threshold {
        EnforcementAction::Warn
    } else if policy.ban_enabled {
        EnforcementAction::Ban
    } else if policy.mute_enabled {
        EnforcementAction::Mute
    } else {
        EnforcementAction::Warn
    };

    EscalationDecision { new_count, action }
}

#[cfg(test)]
mod tests {
    use super::{EnforcementAction, EscalationDecision, decide};
    use biolink_database::model::group_policy::GroupPolicy;

    const THRESHOLD: u32 = 3;

    fn policy(mute_enabled: bool, ban_enabled: bool) -> GroupPolicy {
        GroupPolicy {
            mute_enabled,
            ban_enabled,
        }
    }

    fn decision(new_count: u32, action: EnforcementAction) -> EscalationDecision {
        EscalationDecision { new_count, action }
    }

    #[test]
    fn ban_takes_precedence_over_mute() {
        assert_eq!(
            decide(2, policy(true, true), THRESHOLD),
            decision(3, EnforcementAction::Ban)
        );
    }

    #[test]
    fn mute_applies_at_threshold() {
        assert_eq!(
            decide(2, policy(true, false), THRESHOLD),
            decision(3, EnforcementAction::Mute)
        );
    }

    #[test]
    fn no_policy_means_perpetual_warning() {
        assert_eq!(
            decide(2, policy(false, false), THRESHOLD),
            decision(3, EnforcementAction::Warn)
        );
        assert_eq!(
            decide(41, policy(false, false), THRESHOLD),
            decision(42, EnforcementAction::Warn)
        );
    }

    #[test]
    fn below_threshold_always_warns() {
        for p in [
            policy(false, false),
            policy(true, false),
            policy(false, true),
            policy(true, true),
        ] {
            assert_eq!(decide(0, p, THRESHOLD), decision(1, EnforcementAction::Warn));
            assert_eq!(decide(1, p, THRESHOLD), decision(2, EnforcementAction::Warn));
        }
    }

    #[test]
    fn escalation_persists_past_threshold() {
        assert_eq!(
            decide(5, policy(true, false), THRESHOLD),
            decision(6, EnforcementAction::Mute)
        );
    }

    #[test]
    fn threshold_of_one_escalates_immediately() {
        assert_eq!(
            decide(0, policy(false, true), 1),
            decision(1, EnforcementAction::Ban)
        );
    }
}
