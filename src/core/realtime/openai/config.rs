//! OpenAI Realtime API configuration types.
//!
//! This module contains the endpoint constants, audio format names and
//! response modalities used when configuring a bridge session.

use serde::{Deserialize, Serialize};

use crate::core::audio::{AudioMode, MODEL_SAMPLE_RATE, TELEPHONY_SAMPLE_RATE};

/// OpenAI Realtime API WebSocket endpoint.
pub const OPENAI_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Model used when none is configured.
pub const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview-2024-12-17";

/// Value of the `OpenAI-Beta` header required by the realtime endpoint.
pub const OPENAI_BETA_HEADER: &str = "realtime=v1";

// =============================================================================
// Audio Formats
// =============================================================================

/// Audio formats the Realtime API accepts on input and produces on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenAIRealtimeAudioFormat {
    /// PCM 16-bit signed little-endian (default)
    #[default]
    Pcm16,
    /// G.711 u-law (8-bit)
    #[serde(rename = "g711_ulaw")]
    G711Ulaw,
}

impl OpenAIRealtimeAudioFormat {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pcm16 => "pcm16",
            Self::G711Ulaw => "g711_ulaw",
        }
    }

    /// Get the sample rate for this format.
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        match self {
            Self::Pcm16 => MODEL_SAMPLE_RATE,
            Self::G711Ulaw => TELEPHONY_SAMPLE_RATE,
        }
    }
}

impl From<AudioMode> for OpenAIRealtimeAudioFormat {
    fn from(mode: AudioMode) -> Self {
        match mode {
            AudioMode::Transcode => Self::Pcm16,
            AudioMode::Passthrough => Self::G711Ulaw,
        }
    }
}

impl std::fmt::Display for OpenAIRealtimeAudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Modalities
// =============================================================================

/// Output modalities for OpenAI Realtime API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Text output
    Text,
    /// Audio output
    Audio,
}

impl Modality {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Audio => "audio",
        }
    }
}
