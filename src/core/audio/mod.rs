//! Audio transcoding between the telephony leg and the speech model.
//!
//! # Formats
//!
//! - Telephony: G.711 u-law, 8 kHz, mono, base64 encoded
//! - Model: PCM 16-bit signed little-endian, 24 kHz, mono, base64 encoded
//!
//! All conversions are pure functions over one chunk, safe to call from the
//! inbound and outbound paths concurrently. A chunk that cannot be decoded
//! yields an [`AudioError`]; callers drop the chunk and keep the call alive.
//!
//! When the model is configured to accept u-law directly,
//! [`AudioMode::Passthrough`] turns both conversions into the identity.

pub mod g711;
pub mod resample;

use base64::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use g711::{decode_ulaw, encode_ulaw, linear_to_ulaw, ulaw_to_linear};
pub use resample::{RATE_FACTOR, downsample, upsample};

/// Telephony sample rate in Hz.
pub const TELEPHONY_SAMPLE_RATE: u32 = 8000;

/// Model sample rate in Hz.
pub const MODEL_SAMPLE_RATE: u32 = 24000;

/// Errors raised while converting a single audio chunk.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AudioError {
    /// Payload is not valid base64
    #[error("Invalid base64 audio payload: {0}")]
    InvalidBase64(String),

    /// PCM16 payload has a dangling byte
    #[error("PCM16 payload has odd length: {0} bytes")]
    OddLength(usize),

    /// Payload decoded to zero bytes
    #[error("Audio chunk is empty")]
    EmptyChunk,
}

/// Result type for audio conversions.
pub type AudioResult<T> = Result<T, AudioError>;

/// How audio crosses the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioMode {
    /// Convert u-law/8 kHz to PCM16/24 kHz and back.
    #[default]
    Transcode,
    /// The model speaks u-law/8 kHz natively; payloads are forwarded as-is.
    Passthrough,
}

impl AudioMode {
    /// Parse from string, returning `None` for unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "transcode" | "convert" => Some(Self::Transcode),
            "passthrough" | "pass-through" | "identity" => Some(Self::Passthrough),
            _ => None,
        }
    }

    /// Convert a caller chunk into the form the model expects.
    pub fn inbound(&self, payload: &str) -> AudioResult<String> {
        match self {
            Self::Transcode => to_model_format(payload),
            Self::Passthrough => validate_payload(payload).map(|_| payload.to_string()),
        }
    }

    /// Convert a model chunk into the form the caller expects.
    pub fn outbound(&self, payload: &str) -> AudioResult<String> {
        match self {
            Self::Transcode => to_telephony_format(payload),
            Self::Passthrough => validate_payload(payload).map(|_| payload.to_string()),
        }
    }
}

impl std::fmt::Display for AudioMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transcode => write!(f, "transcode"),
            Self::Passthrough => write!(f, "passthrough"),
        }
    }
}

fn decode_payload(payload: &str) -> AudioResult<Vec<u8>> {
    let bytes = BASE64_STANDARD
        .decode(payload.trim())
        .map_err(|e| AudioError::InvalidBase64(e.to_string()))?;
    if bytes.is_empty() {
        return Err(AudioError::EmptyChunk);
    }
    Ok(bytes)
}

fn validate_payload(payload: &str) -> AudioResult<()> {
    decode_payload(payload).map(|_| ())
}

/// Convert PCM16 little-endian bytes to samples.
pub fn pcm16_from_bytes(bytes: &[u8]) -> AudioResult<Vec<i16>> {
    if bytes.len() % 2 != 0 {
        return Err(AudioError::OddLength(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Convert samples to PCM16 little-endian bytes.
pub fn pcm16_to_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Telephony chunk (base64 u-law, 8 kHz) to model chunk (base64 PCM16, 24 kHz).
pub fn to_model_format(payload: &str) -> AudioResult<String> {
    let ulaw = decode_payload(payload)?;
    let linear = decode_ulaw(&ulaw);
    let upsampled = upsample(&linear);
    Ok(BASE64_STANDARD.encode(pcm16_to_bytes(&upsampled)))
}

/// Model chunk (base64 PCM16, 24 kHz) to telephony chunk (base64 u-law, 8 kHz).
pub fn to_telephony_format(payload: &str) -> AudioResult<String> {
    let pcm = decode_payload(payload)?;
    let samples = pcm16_from_bytes(&pcm)?;
    let downsampled = downsample(&samples);
    Ok(BASE64_STANDARD.encode(encode_ulaw(&downsampled)))
}
