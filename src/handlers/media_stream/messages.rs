//! Twilio Media Streams message types
//!
//! Inbound events arrive as JSON text frames tagged by `event`. Outbound
//! frames carry model audio back to the caller and a `bridge-ready` mark
//! once the model session is live.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::BridgeError;

/// Name of the mark sent once the model session is connected.
pub const BRIDGE_READY_MARK: &str = "bridge-ready";

// =============================================================================
// Incoming Messages (Twilio -> Bridge)
// =============================================================================

/// Incoming Media Streams event
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyEvent {
    /// Socket established; no call metadata yet
    Connected {
        #[serde(default)]
        protocol: Option<String>,
        #[serde(default)]
        version: Option<String>,
    },

    /// Stream metadata, including custom TwiML parameters
    Start {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
        start: StartMetadata,
    },

    /// One chunk of caller audio
    Media {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
        media: MediaPayload,
    },

    /// Stream ended
    Stop {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
    },

    /// A mark we sent earlier finished playing
    Mark {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
        mark: MarkPayload,
    },

    /// Keypad digit pressed by the caller
    Dtmf {
        #[serde(rename = "streamSid", default)]
        stream_sid: Option<String>,
        dtmf: DtmfPayload,
    },

    /// Any event this bridge does not handle
    #[serde(other)]
    Unknown,
}

impl TelephonyEvent {
    /// Parse one text frame. Frames that are not JSON, lack an `event`, or
    /// lack the fields their event requires are protocol errors.
    pub fn parse(text: &str) -> Result<Self, BridgeError> {
        serde_json::from_str(text)
            .map_err(|e| BridgeError::Protocol(format!("Invalid media stream frame: {e}")))
    }

    /// Event name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            TelephonyEvent::Connected { .. } => "connected",
            TelephonyEvent::Start { .. } => "start",
            TelephonyEvent::Media { .. } => "media",
            TelephonyEvent::Stop { .. } => "stop",
            TelephonyEvent::Mark { .. } => "mark",
            TelephonyEvent::Dtmf { .. } => "dtmf",
            TelephonyEvent::Unknown => "unknown",
        }
    }
}

/// `start` block of a start event
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartMetadata {
    #[serde(default)]
    pub stream_sid: Option<String>,
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub tracks: Vec<String>,
    /// `<Parameter>` values from the TwiML
    #[serde(default)]
    pub custom_parameters: HashMap<String, String>,
}

/// `media` block of a media event
#[derive(Debug, Clone, Deserialize)]
pub struct MediaPayload {
    /// `inbound` or `outbound`; absent on single-track streams
    #[serde(default)]
    pub track: Option<String>,
    #[serde(default)]
    pub chunk: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Base64 u-law, 8kHz mono
    #[serde(default)]
    pub payload: String,
}

impl MediaPayload {
    /// Audio spoken by the caller.
    pub fn is_inbound(&self) -> bool {
        match self.track.as_deref() {
            None => true,
            Some(track) => track == "inbound" || track == "inbound_track",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarkPayload {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DtmfPayload {
    #[serde(default)]
    pub track: Option<String>,
    pub digit: String,
}

// =============================================================================
// Outgoing Messages (Bridge -> Twilio)
// =============================================================================

/// Outgoing Media Streams frame
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum TelephonyOutgoing {
    /// Audio to play to the caller
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },

    /// Marker echoed back by Twilio once playback reaches it
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkPayload,
    },
}

impl TelephonyOutgoing {
    pub fn media(stream_sid: impl Into<String>, payload: impl Into<String>) -> Self {
        TelephonyOutgoing::Media {
            stream_sid: stream_sid.into(),
            media: OutboundMedia {
                payload: payload.into(),
            },
        }
    }

    pub fn mark(stream_sid: impl Into<String>, name: impl Into<String>) -> Self {
        TelephonyOutgoing::Mark {
            stream_sid: stream_sid.into(),
            mark: MarkPayload { name: name.into() },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutboundMedia {
    /// Base64 u-law, 8kHz mono
    #[serde(default)]
    pub payload: String,
}

/// Message routing for the caller socket's sender task
#[derive(Debug)]
pub enum CallerMessageRoute {
    Outgoing(TelephonyOutgoing),
    Close,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_connected() {
        let event =
            TelephonyEvent::parse(r#"{"event":"connected","protocol":"Call","version":"1.0.0"}"#)
                .unwrap();
        assert!(matches!(event, TelephonyEvent::Connected { .. }));
    }

    #[test]
    fn test_parse_start_with_custom_parameters() {
        let frame = json!({
            "event": "start",
            "sequenceNumber": "1",
            "streamSid": "MZ123",
            "start": {
                "accountSid": "AC123",
                "streamSid": "MZ123",
                "callSid": "CA123",
                "tracks": ["inbound"],
                "mediaFormat": {"encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1},
                "customParameters": {"prompt": "Take a message", "voice": "verse"}
            }
        })
        .to_string();

        match TelephonyEvent::parse(&frame).unwrap() {
            TelephonyEvent::Start { stream_sid, start } => {
                assert_eq!(stream_sid.as_deref(), Some("MZ123"));
                assert_eq!(start.call_sid.as_deref(), Some("CA123"));
                assert_eq!(start.tracks, vec!["inbound".to_string()]);
                assert_eq!(
                    start.custom_parameters.get("prompt").map(String::as_str),
                    Some("Take a message")
                );
                assert_eq!(
                    start.custom_parameters.get("voice").map(String::as_str),
                    Some("verse")
                );
            }
            other => panic!("Expected Start, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_start_without_parameters() {
        let frame = r#"{"event":"start","streamSid":"MZ1","start":{"callSid":"CA1"}}"#;
        match TelephonyEvent::parse(frame).unwrap() {
            TelephonyEvent::Start { start, .. } => assert!(start.custom_parameters.is_empty()),
            other => panic!("Expected Start, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_media() {
        let frame = r#"{"event":"media","sequenceNumber":"3","streamSid":"MZ1","media":{"track":"inbound","chunk":"1","timestamp":"5","payload":"//8="}}"#;
        match TelephonyEvent::parse(frame).unwrap() {
            TelephonyEvent::Media { media, .. } => {
                assert_eq!(media.payload, "//8=");
                assert!(media.is_inbound());
            }
            other => panic!("Expected Media, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_media_without_payload() {
        let frame = r#"{"event":"media","streamSid":"MZ1","media":{"track":"inbound"}}"#;
        match TelephonyEvent::parse(frame).unwrap() {
            TelephonyEvent::Media { media, .. } => assert!(media.payload.is_empty()),
            other => panic!("Expected Media, got {other:?}"),
        }
    }

    #[test]
    fn test_media_track_direction() {
        let mut media = MediaPayload {
            track: None,
            chunk: None,
            timestamp: None,
            payload: String::new(),
        };
        assert!(media.is_inbound());
        media.track = Some("inbound_track".to_string());
        assert!(media.is_inbound());
        media.track = Some("outbound".to_string());
        assert!(!media.is_inbound());
    }

    #[test]
    fn test_parse_stop_mark_dtmf() {
        assert!(matches!(
            TelephonyEvent::parse(r#"{"event":"stop","streamSid":"MZ1","stop":{"callSid":"CA1"}}"#)
                .unwrap(),
            TelephonyEvent::Stop { .. }
        ));
        assert!(matches!(
            TelephonyEvent::parse(r#"{"event":"mark","streamSid":"MZ1","mark":{"name":"bridge-ready"}}"#)
                .unwrap(),
            TelephonyEvent::Mark { .. }
        ));
        match TelephonyEvent::parse(r#"{"event":"dtmf","streamSid":"MZ1","dtmf":{"track":"inbound_track","digit":"7"}}"#)
            .unwrap()
        {
            TelephonyEvent::Dtmf { dtmf, .. } => assert_eq!(dtmf.digit, "7"),
            other => panic!("Expected Dtmf, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_event_is_not_an_error() {
        let event = TelephonyEvent::parse(r#"{"event":"clear","streamSid":"MZ1"}"#).unwrap();
        assert!(matches!(event, TelephonyEvent::Unknown));
        assert_eq!(event.name(), "unknown");
    }

    #[test]
    fn test_malformed_frames_are_protocol_errors() {
        for frame in [
            "not json",
            r#"{"streamSid":"MZ1"}"#,
            r#"{"event":"media","streamSid":"MZ1"}"#,
            r#"{"event":"media","media":"//8="}"#,
        ] {
            assert!(
                matches!(TelephonyEvent::parse(frame), Err(BridgeError::Protocol(_))),
                "frame should be rejected: {frame}"
            );
        }
    }

    #[test]
    fn test_outgoing_media_serialization() {
        let frame = TelephonyOutgoing::media("MZ1", "//8=");
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({"event": "media", "streamSid": "MZ1", "media": {"payload": "//8="}})
        );
    }

    #[test]
    fn test_outgoing_mark_serialization() {
        let frame = TelephonyOutgoing::mark("MZ1", BRIDGE_READY_MARK);
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({"event": "mark", "streamSid": "MZ1", "mark": {"name": "bridge-ready"}})
        );
    }
}
