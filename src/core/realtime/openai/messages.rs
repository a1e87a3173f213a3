//! OpenAI Realtime API WebSocket message types.
//!
//! # Protocol Overview
//!
//! Client events (sent to server):
//! - session.update - Configure instructions, modalities, voice and formats
//! - input_audio_buffer.append - Append one audio chunk
//! - input_audio_buffer.commit - Commit the appended audio as a user turn
//! - response.create - Ask the model to generate a response
//!
//! Server events consumed by the bridge:
//! - response.audio.delta - Audio data chunk
//! - response.done / response.completed - Response finished
//! - error - Error occurred
//!
//! A handful of informational events are also modelled so they can be logged
//! without being treated as unknown.

use serde::{Deserialize, Serialize};

use super::config::Modality;

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration sent once after connecting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// System instructions for the assistant
    pub instructions: String,

    /// Response modalities
    pub modalities: Vec<Modality>,

    /// Voice for audio output
    pub voice: String,

    /// Input audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_format: Option<String>,

    /// Output audio format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_format: Option<String>,
}

/// Options attached to a `response.create` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResponseConfig {
    /// Response modalities
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modalities: Option<Vec<Modality>>,
    /// Per-response instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl ResponseConfig {
    /// Audio-only response.
    pub fn audio() -> Self {
        Self {
            modalities: Some(vec![Modality::Audio]),
            instructions: None,
        }
    }

    /// Audio-only response carrying the session prompt, used for the greeting.
    pub fn audio_with_instructions(instructions: impl Into<String>) -> Self {
        Self {
            modalities: Some(vec![Modality::Audio]),
            instructions: Some(instructions.into()),
        }
    }
}

// =============================================================================
// Client Events
// =============================================================================

/// Events sent from the bridge to the model.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Append one base64 audio chunk to the input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64 audio in the model's input format
        audio: String,
    },

    /// Commit the input buffer as a user turn
    #[serde(rename = "input_audio_buffer.commit")]
    InputAudioBufferCommit,

    /// Request a model response
    #[serde(rename = "response.create")]
    ResponseCreate {
        /// Response configuration
        response: ResponseConfig,
    },
}

impl ClientEvent {
    /// Name of the event as it appears on the wire.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionUpdate { .. } => "session.update",
            Self::InputAudioBufferAppend { .. } => "input_audio_buffer.append",
            Self::InputAudioBufferCommit => "input_audio_buffer.commit",
            Self::ResponseCreate { .. } => "response.create",
        }
    }

    /// The ordered events that submit one turn: an append per chunk, one
    /// commit and one generation request.
    pub fn turn(chunks: Vec<String>) -> Vec<ClientEvent> {
        let mut events = Vec::with_capacity(chunks.len() + 2);
        events.extend(
            chunks
                .into_iter()
                .map(|audio| ClientEvent::InputAudioBufferAppend { audio }),
        );
        events.push(ClientEvent::InputAudioBufferCommit);
        events.push(ClientEvent::ResponseCreate {
            response: ResponseConfig::audio(),
        });
        events
    }
}

// =============================================================================
// Server Events
// =============================================================================

/// Session information included in session events.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionInfo {
    /// Session ID
    #[serde(default)]
    pub id: String,
}

/// Error details included in error events.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorDetails {
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: String,
    /// Error code
    #[serde(default)]
    pub code: Option<String>,
    /// Human readable message
    #[serde(default)]
    pub message: String,
}

/// Response summary included in response events.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseInfo {
    /// Response ID
    #[serde(default)]
    pub id: String,
    /// Final status (completed, cancelled, failed, incomplete)
    #[serde(default)]
    pub status: Option<String>,
}

/// Events received from the model.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Session created
    #[serde(rename = "session.created")]
    SessionCreated {
        /// Session info
        #[serde(default)]
        session: SessionInfo,
    },

    /// Session updated
    #[serde(rename = "session.updated")]
    SessionUpdated {
        /// Session info
        #[serde(default)]
        session: SessionInfo,
    },

    /// Input audio buffer committed
    #[serde(rename = "input_audio_buffer.committed")]
    InputAudioBufferCommitted {
        /// Item the committed audio became
        #[serde(default)]
        item_id: Option<String>,
    },

    /// Response generation started
    #[serde(rename = "response.created")]
    ResponseCreated {
        /// Response info
        #[serde(default)]
        response: ResponseInfo,
    },

    /// Audio data chunk
    #[serde(rename = "response.audio.delta")]
    AudioDelta {
        /// Response ID
        #[serde(default)]
        response_id: Option<String>,
        /// Base64 encoded audio in the model's output format
        delta: String,
    },

    /// Audio generation for an item finished
    #[serde(rename = "response.audio.done")]
    AudioDone {
        /// Response ID
        #[serde(default)]
        response_id: Option<String>,
    },

    /// Response finished
    #[serde(rename = "response.done", alias = "response.completed")]
    ResponseDone {
        /// Response info
        #[serde(default)]
        response: ResponseInfo,
    },

    /// Error occurred
    #[serde(rename = "error")]
    Error {
        /// Error details
        error: ErrorDetails,
    },
}

impl ServerEvent {
    /// Pull the `type` discriminant out of a frame that did not parse as a
    /// known event.
    pub fn peek_type(text: &str) -> Option<String> {
        serde_json::from_str::<serde_json::Value>(text)
            .ok()?
            .get("type")?
            .as_str()
            .map(str::to_string)
    }
}
