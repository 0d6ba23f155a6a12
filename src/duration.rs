use std::time::Duration;

use crate::provider::ProviderError;

/// Parses a duration string such as `30s`, `5m` or `1h30m`.
///
/// `summary` names the diagnostic raised on failure so each attribute can
/// report its own error.
pub fn parse(input: &str, summary: &str) -> Result<Duration, ProviderError> {
    humantime::parse_duration(input.trim()).map_err(|e| {
        ProviderError::diagnostic(
            summary,
            format!("Could not parse duration '{}': {}", input, e),
        )
    })
}

pub fn display(duration: Duration) -> String {
    humantime::format_duration(duration).to_string()
}
