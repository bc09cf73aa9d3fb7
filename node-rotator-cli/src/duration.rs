use std::time::Duration;

/// Parses a Go style duration such as `90s`, `2m` or `1h30m`.
pub(crate) fn parse_duration(text: &str) -> Result<Duration, String> {
    let nanos = go_parse_duration::parse_duration(text)
        .map_err(|err| format!("invalid duration '{text}': {err:?}"))?;
    let nanos = u64::try_from(nanos).map_err(|_| format!("negative duration '{text}'"))?;
    Ok(Duration::from_nanos(nanos))
}
