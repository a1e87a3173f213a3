//! OpenAI Realtime API module.
//!
//! The model side of a bridged call: wire messages, the turn buffer that
//! gates caller audio into turns, and the [`ModelSession`] that owns the
//! WebSocket connection.
//!
//! # Example
//!
//! ```rust,ignore
//! use realtime_call_bridge::core::realtime::{ModelSession, RealtimeConfig};
//! use std::sync::Arc;
//!
//! let config = RealtimeConfig {
//!     api_key: "sk-...".to_string(),
//!     voice: "alloy".to_string(),
//!     instructions: "You are a helpful assistant.".to_string(),
//!     ..Default::default()
//! };
//!
//! let session = ModelSession::connect(config, Arc::new(|chunk| Box::pin(async move {
//!     // chunk is base64 u-law, ready for the caller
//! }))).await?;
//!
//! session.submit_audio(&caller_payload).await?;
//! session.close().await?;
//! ```

mod config;
mod messages;
mod session;
mod turn_buffer;

pub use config::{
    DEFAULT_REALTIME_MODEL, Modality, OPENAI_BETA_HEADER, OPENAI_REALTIME_URL,
    OpenAIRealtimeAudioFormat,
};
pub use messages::{
    ClientEvent, ErrorDetails, ResponseConfig, ResponseInfo, ServerEvent, SessionConfig,
    SessionInfo,
};
pub use session::ModelSession;
pub use turn_buffer::TurnBuffer;
