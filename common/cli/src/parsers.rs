use std::time::Duration;

/// Parses a duration given in whole milliseconds, e.g. '1000'.
pub fn duration_ms_parser(s: &str) -> Result<Duration, String> {
    let trimmed = s.trim();
    trimmed
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|error| {
            format!(
                "Invalid duration. Required format: '<MILLISECONDS>', found: '{}', cause: {}",
                trimmed, error
            )
        })
}

/// Parses a 'key=value' pair, as used for overriding individual files of the virtual file system.
pub fn key_value_parser(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid argument. Required format: '<KEY>=<VALUE>', found: '{}'", s))?;

    if key.is_empty() {
        return Err(format!("Invalid argument. Key must not be empty, found: '{}'", s));
    }

    Ok((key.to_string(), value.to_string()))
}
