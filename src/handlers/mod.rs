//! HTTP and WebSocket request handlers
//!
//! - `api` - Health check and landing page
//! - `calls` - Outbound call placement and TwiML
//! - `media_stream` - Twilio media stream WebSocket bridged to the realtime model

pub mod api;
pub mod calls;
pub mod media_stream;

pub use media_stream::media_stream_handler;
