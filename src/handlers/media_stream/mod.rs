//! Twilio media stream bridge
//!
//! `GET /media-stream` upgrades to a WebSocket carrying Twilio Media Streams
//! events. Each connection becomes one bridged call:
//!
//! 1. `connected` is logged
//! 2. `start` opens a model session with the stream's prompt and voice, then
//!    sends a `bridge-ready` mark ahead of any model audio
//! 3. `media` chunks are transcoded and buffered into model turns
//! 4. model audio is transcoded back and sent as `media` frames
//! 5. `stop`, a caller disconnect or a model disconnect tears both legs down

pub mod handler;
pub mod messages;
pub mod session;

pub use handler::{TWILIO_SUBPROTOCOL, media_stream_handler};
pub use messages::{
    BRIDGE_READY_MARK, CallerMessageRoute, TelephonyEvent, TelephonyOutgoing,
};
pub use session::{CallFlow, CallSession};
