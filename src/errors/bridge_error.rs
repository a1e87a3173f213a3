use thiserror::Error;

use crate::core::realtime::RealtimeError;

/// Failures that end a bridged call.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The telephony side sent a frame that is not a valid event
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The model session failed
    #[error(transparent)]
    Realtime(#[from] RealtimeError),

    /// The outbound path to the caller is gone
    #[error("Caller connection closed")]
    CallerGone,
}

pub type BridgeResult<T> = Result<T, BridgeError>;
