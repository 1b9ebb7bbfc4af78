/// Format seconds into a compact human-readable duration (e.g. 59s, 1m, 1h, 1d, 1h 30m).
pub fn format_compact_duration(total_seconds: u64) -> String {
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;

    if days > 0 {
        return if hours > 0 {
            format!("{}d {}h", days, hours)
        } else {
            format!("{}d", days)
        };
    }

    let mut parts = Vec::with_capacity(3);
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{}s", seconds));
    }
    parts.join(" ")
}

/// Label a member for group notices, falling back to the numeric id.
pub fn format_member_label(user_id: i64, display_name: Option<&str>) -> String {
    match display_name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => format!("{} ({})", name, user_id),
        None => format!("User {}", user_id),
    }
}

#[cfg(test)]
mod tests {
    use super::{format_compact_duration, format_member_label};

    #[test]
    fn compact_duration_formatting() {
        assert_eq!(format_compact_duration(0), "0s");
        assert_eq!(format_compact_duration(59), "59s");
        assert_eq!(format_compact_duration(61), "1m 1s");
        assert_eq!(format_compact_duration(3605), "1h 5s");
        assert_eq!(format_compact_duration(43_200), "12h");
        assert_eq!(format_compact_duration(90_000), "1d 1h");
    }

    #[test]
    fn member_labels() {
        assert_eq!(format_member_label(42, Some("Ann")), "Ann (42)");
        assert_eq!(format_member_label(42, Some("   ")), "User 42");
        assert_eq!(format_member_label(42, None), "User 42");
    }
}
