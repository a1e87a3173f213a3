//! Configuration module for the call bridge server
//!
//! This module handles server configuration from .env files, YAML files and
//! environment variables. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `merge`: Environment loading and YAML overrides
//! - `validation`: Configuration validation logic
//!
//! # Example
//! ```rust,no_run
//! use realtime_call_bridge::config::ServerConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ServerConfig::from_env()?;
//!
//! // Load from YAML file with environment variable base
//! let config_path = PathBuf::from("config.yaml");
//! let config = ServerConfig::from_file(&config_path)?;
//!
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;

use url::Url;

use crate::core::audio::AudioMode;
use crate::core::realtime::RealtimeConfig;

mod merge;
mod validation;
mod yaml;

/// Prompt used when a call does not supply one.
pub const DEFAULT_PROMPT: &str = "You are a cheerful assistant that helps callers with scheduling demo calls. Gather their name, email, and a preferred callback time.";

/// Voices offered when none are configured.
pub const DEFAULT_VOICES: [&str; 3] = ["alloy", "ember", "verse"];

/// TLS configuration for HTTPS and WSS
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Path to the TLS certificate file (PEM format)
    pub cert_path: PathBuf,
    /// Path to the TLS private key file (PEM format)
    pub key_path: PathBuf,
}

/// Server configuration
///
/// Contains everything needed to run the bridge:
/// - Server settings (host, port, TLS, public URL)
/// - Twilio account credentials and caller id
/// - OpenAI Realtime credentials and endpoint
/// - Call behaviour (voices, default prompt, turn size, audio mode)
/// - Security settings (CORS)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    // TLS configuration (optional)
    pub tls: Option<TlsConfig>,

    /// Externally reachable https base URL, without trailing slash
    pub public_base_url: String,

    // Twilio settings
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    /// Number outbound calls are placed from
    pub twilio_caller_id: String,
    pub twilio_api_base_url: String,

    // OpenAI settings
    pub openai_api_key: String,
    pub openai_realtime_model: String,
    pub openai_realtime_url: String,

    // Call behaviour
    /// Voices callers may select; the first one is the default
    pub supported_voices: Vec<String>,
    pub default_prompt: String,
    /// Number of caller chunks buffered before a turn is submitted
    pub flush_threshold: usize,
    pub audio_mode: AudioMode,

    // Security configuration
    /// CORS allowed origins (comma-separated list or "*" for all)
    /// Default: None (CORS disabled, same-origin only)
    pub cors_allowed_origins: Option<String>,
}

/// Zeroize secret fields when ServerConfig is dropped.
impl Drop for ServerConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        self.twilio_auth_token.zeroize();
        self.openai_api_key.zeroize();
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// The .env file is loaded in main.rs at application startup, so its
    /// values are visible here as ordinary environment variables.
    ///
    /// # Errors
    /// Returns an error if a required variable is missing, a value has an
    /// invalid format, or validation fails.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = merge::merge_config(None)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml_config = yaml::YamlConfig::from_file(path)?;
        let config = merge::merge_config(Some(yaml_config))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the merged configuration
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        validation::validate_public_base_url(&self.public_base_url)?;
        validation::validate_realtime_url(&self.openai_realtime_url)?;
        validation::validate_supported_voices(&self.supported_voices)?;
        validation::validate_flush_threshold(self.flush_threshold)?;
        Ok(())
    }

    /// Get the server address as a string
    ///
    /// Returns the address in the format "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if TLS is enabled
    pub fn is_tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// First supported voice.
    pub fn default_voice(&self) -> &str {
        self.supported_voices
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_VOICES[0])
    }

    pub fn is_supported_voice(&self, voice: &str) -> bool {
        self.supported_voices.iter().any(|v| v == voice)
    }

    /// Build an absolute URL under the public base URL.
    ///
    /// `scheme` replaces the base scheme (e.g. `wss` for the media stream);
    /// `query` pairs are form-encoded.
    ///
    /// # Example
    /// ```rust,ignore
    /// // public_base_url = "https://bridge.example.com"
    /// let url = config.build_public_url("/media-stream", Some("wss"), &[])?;
    /// assert_eq!(url.as_str(), "wss://bridge.example.com/media-stream");
    /// ```
    pub fn build_public_url(
        &self,
        path: &str,
        scheme: Option<&str>,
        query: &[(&str, &str)],
    ) -> Result<Url, String> {
        let mut url = Url::parse(&self.public_base_url)
            .map_err(|e| format!("Invalid PUBLIC_BASE_URL: {e}"))?;

        if let Some(scheme) = scheme {
            url.set_scheme(scheme).map_err(|_| {
                format!(
                    "Cannot switch {} to scheme '{scheme}'",
                    self.public_base_url
                )
            })?;
        }

        let base_path = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{}/{}", base_path, path.trim_start_matches('/')));

        if query.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(query);
        }

        Ok(url)
    }

    /// Model session settings for one call.
    pub fn realtime_config(&self, voice: &str, instructions: &str) -> RealtimeConfig {
        RealtimeConfig {
            api_key: self.openai_api_key.clone(),
            url: self.openai_realtime_url.clone(),
            model: self.openai_realtime_model.clone(),
            voice: voice.to_string(),
            instructions: instructions.to_string(),
            audio_mode: self.audio_mode,
            flush_threshold: self.flush_threshold,
        }
    }
}
