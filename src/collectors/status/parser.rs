use once_cell::sync::Lazy;
use regex::Regex;

/// Trailing `.<digits>` as found in binlog/relay-log file names (`mysql-bin.000123`).
#[allow(clippy::expect_used)]
static LOG_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.([0-9]+)$").expect("valid log number regex"));

/// Canonicalize a raw replication-status value into something `f64::from_str` understands.
///
/// - `"Yes"` → `"1"`, `"No"` → `"0"`
/// - a value ending in `.<digits>` → only the digits after the dot
/// - anything else is returned unchanged
#[must_use]
pub fn parse_status(raw: &str) -> String {
    match raw {
        "Yes" => "1".to_string(),
        "No" => "0".to_string(),
        _ => LOG_NUMBER
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .map_or_else(|| raw.to_string(), |m| m.as_str().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_booleans() {
        assert_eq!(parse_status("Yes"), "1");
        assert_eq!(parse_status("No"), "0");
    }

    #[test]
    fn test_parse_status_booleans_are_case_sensitive() {
        assert_eq!(parse_status("yes"), "yes");
        assert_eq!(parse_status("NO"), "NO");
    }

    #[test]
    fn test_parse_status_trailing_digits() {
        assert_eq!(parse_status("1234.567"), "567");
        assert_eq!(parse_status("master-bin.000123"), "000123");
        assert_eq!(parse_status("mysql-bin.000123"), "000123");
        assert_eq!(parse_status("relay.log.42"), "42");
    }

    #[test]
    fn test_parse_status_passthrough() {
        assert_eq!(parse_status("some text"), "some text");
        assert_eq!(parse_status("1234"), "1234");
        assert_eq!(parse_status(""), "");
        assert_eq!(parse_status("1234."), "1234.");
        assert_eq!(parse_status("Connecting"), "Connecting");
    }

    #[test]
    fn test_parse_status_output_is_numeric_for_replica_columns() {
        for raw in ["Yes", "No", "mysql-bin.000007", "0"] {
            assert!(parse_status(raw).parse::<f64>().is_ok(), "{raw} should parse");
        }
        assert!(parse_status("Waiting for master").parse::<f64>().is_err());
    }
}
