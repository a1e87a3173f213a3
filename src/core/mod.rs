pub mod audio;
pub mod realtime;
pub mod telephony;

// Re-export commonly used types for convenience
pub use audio::{AudioError, AudioMode, AudioResult, to_model_format, to_telephony_format};

pub use realtime::{
    AudioOutputCallback, ConnectionState, ModelSession, RealtimeConfig, RealtimeError,
    RealtimeResult, TurnBuffer,
};

pub use telephony::{CallInfo, TelephonyError, TelephonyResult, TwilioCallClient};
