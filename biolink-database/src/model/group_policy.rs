use serde::{Deserialize, Serialize};

/// Per-group escalation switches. Both off means warn-only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupPolicy {
    pub mute_enabled: bool,
    pub ban_enabled: bool,
}

/// The closed set of policy switches a group can flip.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PolicyField {
    Mute,
    Ban,
}

impl PolicyField {
    /// Short user-facing name ("mute" / "ban").
    pub fn label(self) -> &'static str {
        match self {
            Self::Mute => "mute",
            Self::Ban => "ban",
        }
    }

    pub fn apply(self, policy: &mut GroupPolicy, value: bool) {
        match self {
            Self::Mute => policy.mute_enabled = value,
            Self::Ban => policy.ban_enabled = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{GroupPolicy, PolicyField};

    #[test]
    fn fields_touch_only_their_switch() {
        let mut policy = GroupPolicy::default();
        PolicyField::Ban.apply(&mut policy, true);
        assert!(policy.ban_enabled);
        assert!(!policy.mute_enabled);

        PolicyField::Mute.apply(&mut policy, true);
        PolicyField::Ban.apply(&mut policy, false);
        assert_eq!(
            policy,
            GroupPolicy {
                mute_enabled: true,
                ban_enabled: false
            }
        );
    }
}
