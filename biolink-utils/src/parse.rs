/// Parse a compact duration token like `30s`, `10m`, `12h`, `1d`, `1h30m`, or plain seconds.
pub fn parse_duration_seconds(raw: &str) -> Option<u64> {
    let compact: String = raw.chars().filter(|ch| !ch.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }

    let bytes = compact.as_bytes();
    let mut cursor = 0;
    let mut total_seconds = 0_u64;
    let mut saw_unit_segment = false;

    while cursor < bytes.len() {
        let number_start = cursor;
        while cursor < bytes.len() && bytes[cursor].is_ascii_digit() {
            cursor += 1;
        }

        if number_start == cursor {
            return None;
        }

        let number = compact[number_start..cursor].parse::<u64>().ok()?;

        let saw_unit = cursor < bytes.len();
        let multiplier = if saw_unit {
            let unit = bytes[cursor] as char;
            cursor += 1;

            match unit.to_ascii_lowercase() {
                's' => 1_u64,
                'm' => 60,
                'h' => 60 * 60,
                'd' => 60 * 60 * 24,
                _ => return None,
            }
        } else {
            // A bare number is only valid as the whole token.
            if saw_unit_segment {
                return None;
            }
            1
        };

        saw_unit_segment = saw_unit_segment || saw_unit;
        total_seconds = total_seconds.checked_add(number.checked_mul(multiplier)?)?;
    }

    (total_seconds > 0).then_some(total_seconds)
}

/// Parse a boolean flag the way environment switches are written.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_duration_seconds, parse_flag};

    #[test]
    fn parses_compact_durations() {
        assert_eq!(parse_duration_seconds("30s"), Some(30));
        assert_eq!(parse_duration_seconds("12h"), Some(43_200));
        assert_eq!(parse_duration_seconds("1h30m"), Some(5_400));
        assert_eq!(parse_duration_seconds(" 2 D "), Some(172_800));
        assert_eq!(parse_duration_seconds("90"), Some(90));
    }

    #[test]
    fn rejects_malformed_durations() {
        assert_eq!(parse_duration_seconds(""), None);
        assert_eq!(parse_duration_seconds("0"), None);
        assert_eq!(parse_duration_seconds("h"), None);
        assert_eq!(parse_duration_seconds("5w"), None);
        assert_eq!(parse_duration_seconds("1h30"), None);
    }

    #[test]
    fn parses_flags() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" on "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
