//! Base types for the speech-model side of the bridge.
//!
//! # Audio Format
//!
//! The model is fed base64 chunks in the format selected by [`AudioMode`]:
//! PCM 16-bit little-endian at 24kHz by default, or G.711 u-law at 8kHz
//! when passthrough is configured.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use crate::core::audio::AudioMode;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during realtime operations.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Handshake or initial send to the model failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error on an established connection
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// The model reported an error event
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

// =============================================================================
// Configuration
// =============================================================================

/// Default number of buffered chunks that make up a turn.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 8;

/// Configuration for one model session.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// API key for authentication
    pub api_key: String,
    /// WebSocket endpoint without query string
    pub url: String,
    /// Model name passed as the `model` query parameter
    pub model: String,
    /// Voice identifier for audio output
    pub voice: String,
    /// System prompt sent as session instructions
    pub instructions: String,
    /// How audio is converted between the two legs
    pub audio_mode: AudioMode,
    /// Buffered chunk count that triggers a turn
    pub flush_threshold: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            url: super::openai::OPENAI_REALTIME_URL.to_string(),
            model: super::openai::DEFAULT_REALTIME_MODEL.to_string(),
            voice: "alloy".to_string(),
            instructions: String::new(),
            audio_mode: AudioMode::default(),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
        }
    }
}

impl RealtimeConfig {
    /// Check the fields a connection attempt depends on.
    pub fn validate(&self) -> RealtimeResult<()> {
        if self.api_key.is_empty() {
            return Err(RealtimeError::InvalidConfiguration(
                "API key is required".to_string(),
            ));
        }
        if self.flush_threshold == 0 {
            return Err(RealtimeError::InvalidConfiguration(
                "flush threshold must be at least 1".to_string(),
            ));
        }
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(RealtimeError::InvalidConfiguration(format!(
                "realtime URL must use ws:// or wss://, got {}",
                self.url
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Connection State
// =============================================================================

/// Lifecycle of a model session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected to the model
    #[default]
    Disconnected,
    /// Handshake in progress
    Connecting,
    /// Connected; turn-taking is live
    Active,
    /// Torn down; cannot be reused
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Active => write!(f, "Active"),
            ConnectionState::Closed => write!(f, "Closed"),
        }
    }
}

// =============================================================================
// Callback Types
// =============================================================================

/// Callback receiving model audio already converted for the caller
/// (base64, telephony format).
pub type AudioOutputCallback =
    Arc<dyn Fn(String) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;
