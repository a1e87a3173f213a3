//! Telephony provider integration (Twilio).
//!
//! - [`TwilioCallClient`] places outbound calls over the REST API.
//! - [`twiml`] renders the document that connects an answered call to the
//!   media stream endpoint.

pub mod client;
pub mod twiml;

use thiserror::Error;

pub use client::{CallInfo, TWILIO_API_BASE_URL, TwilioCallClient};
pub use twiml::connect_stream;

/// Errors from the telephony provider.
#[derive(Debug, Error)]
pub enum TelephonyError {
    /// Request could not be sent or the response could not be read
    #[error("Telephony request failed: {0}")]
    Request(String),

    /// Provider answered with a non-success status
    #[error("Telephony API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Provider error message
        message: String,
    },

    /// A URL handed to the provider could not be built
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Result type for telephony operations.
pub type TelephonyResult<T> = Result<T, TelephonyError>;
