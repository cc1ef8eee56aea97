use std::time::Duration;

use crate::error::CoreError;

/// Parse an alert-rule duration string such as `"2m"`, `"500ms"`, `"0s"`.
///
/// An empty string is treated as zero duration. Any other unparsable value
/// is a validation error, per spec.md §7 ("malformed duration").
pub fn parse_rule_duration(raw: &str) -> Result<Duration, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Duration::ZERO);
    }
    humantime::parse_duration(trimmed)
        .map_err(|e| CoreError::InvalidDuration(format!("{raw:?}: {e}")))
}

/// Render a duration the way `AlertEvent` messages quote it: rounded to the
/// nearest second, e.g. `"3m0s"` -> humantime's own formatting.
#[must_use]
pub fn format_duration_secs(d: Duration) -> String {
    let secs = d.as_secs();
    humantime::format_duration(Duration::from_secs(secs)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minutes() {
        assert_eq!(parse_rule_duration("2m").unwrap(), Duration::from_secs(120));
    }

    #[test]
    fn parses_millis() {
        assert_eq!(
            parse_rule_duration("500ms").unwrap(),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(parse_rule_duration("").unwrap(), Duration::ZERO);
        assert_eq!(parse_rule_duration("   ").unwrap(), Duration::ZERO);
    }

    #[test]
    fn zero_seconds_parses() {
        assert_eq!(parse_rule_duration("0s").unwrap(), Duration::ZERO);
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_rule_duration("not-a-duration").is_err());
    }

    #[test]
    fn formats_rounded_to_seconds() {
        assert_eq!(format_duration_secs(Duration::from_millis(3200)), "3s");
    }
}
