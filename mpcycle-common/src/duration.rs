use std::time::Duration;
use std::str::FromStr;
use anyhow::{Result, Context};

pub fn parse_duration(duration_str: &str) -> Result<Duration> {
    humantime::Duration::from_str(duration_str)
        .map(|d| d.into())
        .with_context(|| format!("Invalid duration format: {}", duration_str))
}

pub fn format_duration(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("100ms").unwrap(), Duration::from_millis(100));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_format_duration_parses_back() {
        let interval = Duration::from_millis(1500);
        assert_eq!(parse_duration(&format_duration(interval)).unwrap(), interval);
    }
}
