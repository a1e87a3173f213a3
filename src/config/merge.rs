//! Builds a [`ServerConfig`] from environment variables with optional YAML
//! overrides. Priority: YAML > ENV vars > .env values > defaults.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use super::validation::require;
use super::yaml::YamlConfig;
use super::{DEFAULT_PROMPT, DEFAULT_VOICES, ServerConfig, TlsConfig};
use crate::core::audio::AudioMode;
use crate::core::realtime::{DEFAULT_FLUSH_THRESHOLD, DEFAULT_REALTIME_MODEL, OPENAI_REALTIME_URL};
use crate::core::telephony::TWILIO_API_BASE_URL;

/// Non-blank environment variable value.
fn env_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|e| format!("Invalid {name} value '{raw}': {e}").into()),
        None => Ok(None),
    }
}

/// Split a comma-separated list, dropping blank entries.
pub(crate) fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_audio_mode(value: &str) -> Result<AudioMode, Box<dyn std::error::Error>> {
    AudioMode::parse(value).ok_or_else(|| {
        format!("Invalid AUDIO_MODE '{value}': expected 'transcode' or 'passthrough'").into()
    })
}

fn resolve_tls(
    enabled: Option<bool>,
    cert_path: Option<String>,
    key_path: Option<String>,
) -> Result<Option<TlsConfig>, Box<dyn std::error::Error>> {
    if enabled == Some(false) {
        return Ok(None);
    }
    match (cert_path, key_path) {
        (Some(cert), Some(key)) => Ok(Some(TlsConfig {
            cert_path: PathBuf::from(cert),
            key_path: PathBuf::from(key),
        })),
        (None, None) if enabled == Some(true) => {
            Err("TLS is enabled but no certificate or key path is configured".into())
        }
        (None, None) => Ok(None),
        _ => Err("TLS_CERT_PATH and TLS_KEY_PATH must be set together".into()),
    }
}

/// Merge environment variables (base) with optional YAML overrides.
pub fn merge_config(yaml: Option<YamlConfig>) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let yaml = yaml.unwrap_or_default();
    let server = yaml.server.unwrap_or_default();
    let twilio = yaml.twilio.unwrap_or_default();
    let openai = yaml.openai.unwrap_or_default();
    let bridge = yaml.bridge.unwrap_or_default();
    let security = yaml.security.unwrap_or_default();
    let tls_yaml = server.tls.unwrap_or_default();

    let host = server
        .host
        .or_else(|| env_var("HOST"))
        .unwrap_or_else(|| "0.0.0.0".to_string());
    let port = match server.port {
        Some(port) => port,
        None => env_parse::<u16>("PORT")?.unwrap_or(3001),
    };

    let tls = resolve_tls(
        tls_yaml.enabled,
        tls_yaml.cert_path.or_else(|| env_var("TLS_CERT_PATH")),
        tls_yaml.key_path.or_else(|| env_var("TLS_KEY_PATH")),
    )?;

    let public_base_url = require(
        "PUBLIC_BASE_URL",
        server.public_base_url.or_else(|| env_var("PUBLIC_BASE_URL")),
    )?
    .trim_end_matches('/')
    .to_string();

    let twilio_account_sid = require(
        "TWILIO_ACCOUNT_SID",
        twilio.account_sid.or_else(|| env_var("TWILIO_ACCOUNT_SID")),
    )?;
    let twilio_auth_token = require(
        "TWILIO_AUTH_TOKEN",
        twilio.auth_token.or_else(|| env_var("TWILIO_AUTH_TOKEN")),
    )?;
    let twilio_caller_id = require(
        "TWILIO_CALLER_ID",
        twilio.caller_id.or_else(|| env_var("TWILIO_CALLER_ID")),
    )?;
    let twilio_api_base_url = twilio
        .api_base_url
        .or_else(|| env_var("TWILIO_API_BASE_URL"))
        .unwrap_or_else(|| TWILIO_API_BASE_URL.to_string());

    let openai_api_key = require(
        "OPENAI_API_KEY",
        openai.api_key.or_else(|| env_var("OPENAI_API_KEY")),
    )?;
    let openai_realtime_model = openai
        .realtime_model
        .or_else(|| env_var("OPENAI_REALTIME_MODEL"))
        .unwrap_or_else(|| DEFAULT_REALTIME_MODEL.to_string());
    let openai_realtime_url = openai
        .realtime_url
        .or_else(|| env_var("OPENAI_REALTIME_URL"))
        .unwrap_or_else(|| OPENAI_REALTIME_URL.to_string());

    let supported_voices = match bridge.supported_voices {
        Some(voices) => voices
            .into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect(),
        None => env_var("SUPPORTED_VOICES")
            .map(|v| parse_list(&v))
            .unwrap_or_else(|| DEFAULT_VOICES.iter().map(|v| v.to_string()).collect()),
    };
    let default_prompt = bridge
        .default_prompt
        .or_else(|| env_var("DEFAULT_PROMPT"))
        .unwrap_or_else(|| DEFAULT_PROMPT.to_string());
    let flush_threshold = match bridge.flush_threshold {
        Some(threshold) => threshold,
        None => env_parse::<usize>("FLUSH_THRESHOLD")?.unwrap_or(DEFAULT_FLUSH_THRESHOLD),
    };
    let audio_mode = match bridge.audio_mode.or_else(|| env_var("AUDIO_MODE")) {
        Some(mode) => parse_audio_mode(&mode)?,
        None => AudioMode::default(),
    };

    let cors_allowed_origins = security
        .cors_allowed_origins
        .or_else(|| env_var("CORS_ALLOWED_ORIGINS"));

    Ok(ServerConfig {
        host,
        port,
        tls,
        public_base_url,
        twilio_account_sid,
        twilio_auth_token,
        twilio_caller_id,
        twilio_api_base_url,
        openai_api_key,
        openai_realtime_model,
        openai_realtime_url,
        supported_voices,
        default_prompt,
        flush_threshold,
        audio_mode,
        cors_allowed_origins,
    })
}
