use crate::formatting::format_compact_duration;

/// Posted when the bot joins a group.
pub fn welcome_text(threshold: u32) -> String {
    format!(
        "This bot deletes messages from members whose bio contains a link.\n\
         COMMANDS :-\n\
         /start - show all features and command details\n\
         /mutebio - mute members with a bio link after {threshold} warnings\n\
         /unmutebio - stop muting members with a bio link\n\
         /banbio - ban members with a bio link after {threshold} warnings\n\
         /unbanbio - stop banning members with a bio link\n\
         /resetbio all - reset warnings and punishments for all members\n\
         /resetbio (reply, username or user id) - reset warnings and punishments for one member"
    )
}

pub const RESET_ALL_OK: &str = "✅ All warnings and punishments have been reset.";
pub const RESET_FAILED: &str = "❗ Could not reset warnings right now. Please try again later.";
pub const POLICY_FAILED: &str =
    "❗ Could not update the bio-link settings right now. Please try again later.";

pub fn reset_one_ok(user_id: i64) -> String {
    format!("✅ Warnings and punishments reset for user ID {}", user_id)
}

pub fn warning_notice(member: &str, count: u32, threshold: u32, expiry_secs: u64) -> String {
    format!(
        "⚠️ {member}, your message was removed because your bio contains a link. \
         Please remove it from your profile.\n\
         Warning {count}/{threshold} (warnings expire after {}).",
        format_compact_duration(expiry_secs)
    )
}

pub fn mute_notice(member: &str, count: u32) -> String {
    format!("🔇 {member} has been muted after {count} warnings for a bio link.")
}

pub fn ban_notice(member: &str, count: u32) -> String {
    format!("🚫 {member} has been banned after {count} warnings for a bio link.")
}

/// Acknowledgement for a policy switch, e.g. `("mute", true)`.
pub fn policy_notice(mode: &str, enabled: bool) -> String {
    if enabled {
        format!(
            "✅ Bio-link {mode} mode enabled. Members reaching the warning limit will be {}.",
            past_tense(mode)
        )
    } else {
        format!("✅ Bio-link {mode} mode disabled.")
    }
}

fn past_tense(mode: &str) -> &'static str {
    match mode {
        "ban" => "banned",
        "mute" => "muted",
        _ => "restricted",
    }
}

#[cfg(test)]
mod tests {
    use super::{policy_notice, reset_one_ok, warning_notice, welcome_text};

    #[test]
    fn warning_notice_carries_count_and_window() {
        let text = warning_notice("User 7", 2, 3, 43_200);
        assert!(text.contains("User 7"));
        assert!(text.contains("Warning 2/3"));
        assert!(text.contains("12h"));
    }

    #[test]
    fn welcome_lists_commands_with_threshold() {
        let text = welcome_text(4);
        assert!(text.contains("/resetbio all"));
        assert_eq!(text.matches("after 4 warnings").count(), 2);
    }

    #[test]
    fn acknowledgements() {
        assert_eq!(reset_one_ok(99), "✅ Warnings and punishments reset for user ID 99");
        assert!(policy_notice("ban", true).contains("banned"));
        assert_eq!(policy_notice("mute", false), "✅ Bio-link mute mode disabled.");
    }
}
