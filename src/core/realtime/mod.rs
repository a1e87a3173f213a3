//! Speech-model side of the bridge.
//!
//! # Audio Format
//!
//! - Transcode mode: PCM 16-bit signed little-endian at 24kHz
//! - Passthrough mode: G.711 u-law at 8kHz
//!
//! # Turn Taking
//!
//! Caller audio is buffered and submitted in turns of
//! [`RealtimeConfig::flush_threshold`] chunks. A turn is one or more
//! `input_audio_buffer.append` events followed by exactly one
//! `input_audio_buffer.commit` and one `response.create`. No new turn is
//! submitted until the model reports the previous response done.

mod base;
pub mod openai;

pub use base::{
    AudioOutputCallback, ConnectionState, DEFAULT_FLUSH_THRESHOLD, RealtimeConfig, RealtimeError,
    RealtimeResult,
};
pub use openai::{
    DEFAULT_REALTIME_MODEL, Modality, ModelSession, OPENAI_REALTIME_URL,
    OpenAIRealtimeAudioFormat, TurnBuffer,
};
