//! Configuration validation.

use url::Url;

/// The public base URL is handed to Twilio, which only fetches TwiML and
/// opens media streams over TLS.
pub fn validate_public_base_url(value: &str) -> Result<(), Box<dyn std::error::Error>> {
    let url = Url::parse(value).map_err(|e| format!("Invalid PUBLIC_BASE_URL '{value}': {e}"))?;

    if url.scheme() != "https" {
        return Err(format!(
            "PUBLIC_BASE_URL must use https, got '{}' in '{value}'",
            url.scheme()
        )
        .into());
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(format!("PUBLIC_BASE_URL must include a host: '{value}'").into());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(
            format!("PUBLIC_BASE_URL must not carry a query or fragment: '{value}'").into(),
        );
    }

    Ok(())
}

/// The realtime endpoint is a WebSocket URL.
pub fn validate_realtime_url(value: &str) -> Result<(), Box<dyn std::error::Error>> {
    let url =
        Url::parse(value).map_err(|e| format!("Invalid OPENAI_REALTIME_URL '{value}': {e}"))?;

    match url.scheme() {
        "ws" | "wss" => Ok(()),
        other => Err(format!("OPENAI_REALTIME_URL must use ws or wss, got '{other}'").into()),
    }
}

pub fn validate_supported_voices(voices: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    if voices.is_empty() {
        return Err("SUPPORTED_VOICES must list at least one voice".into());
    }
    if let Some(blank) = voices.iter().position(|v| v.trim().is_empty()) {
        return Err(format!("SUPPORTED_VOICES entry {blank} is blank").into());
    }
    Ok(())
}

pub fn validate_flush_threshold(threshold: usize) -> Result<(), Box<dyn std::error::Error>> {
    if threshold == 0 {
        return Err("FLUSH_THRESHOLD must be at least 1".into());
    }
    Ok(())
}

/// Fail when a required setting is missing or blank.
pub fn require(
    name: &str,
    value: Option<String>,
) -> Result<String, Box<dyn std::error::Error>> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(format!("{name} is required").into()),
    }
}
