//! Budget window parsing.

use chrono::Duration;

/// Window used when a tier's window cannot be parsed.
pub const DEFAULT_WINDOW: &str = "24h";

/// Parse a rolling window such as `30m`, `1h`, `24h` or `7d`.
///
/// The amount must be a positive integer; units are `m`, `h` and `d`.
pub fn parse_window(value: &str) -> Option<Duration> {
    let value = value.trim();
    let unit = value.chars().last()?;
    let amount: i64 = value[..value.len() - unit.len_utf8()].parse().ok()?;
    if amount <= 0 {
        return None;
    }
    match unit {
        'm' => Some(Duration::minutes(amount)),
        'h' => Some(Duration::hours(amount)),
        'd' => Some(Duration::days(amount)),
        _ => None,
    }
}

/// Parse `value`, falling back to [`DEFAULT_WINDOW`].
pub fn window_or_default(value: &str) -> Duration {
    parse_window(value).unwrap_or_else(|| Duration::hours(24))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_window_units() {
        assert_eq!(parse_window("30m"), Some(Duration::minutes(30)));
        assert_eq!(parse_window("1h"), Some(Duration::hours(1)));
        assert_eq!(parse_window(" 24h "), Some(Duration::hours(24)));
        assert_eq!(parse_window("7d"), Some(Duration::days(7)));
    }

    #[test]
    fn test_parse_window_rejects_garbage() {
        for bad in ["", "h", "0h", "-1h", "10", "5w", "1.5h", "fortnight"] {
            assert_eq!(parse_window(bad), None, "{bad}");
        }
        assert_eq!(window_or_default("nope"), Duration::hours(24));
    }
}
