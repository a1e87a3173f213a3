//! Per-call state for one media stream.
//!
//! A [`CallSession`] is created when the telephony socket opens and owns the
//! [`ModelSession`] once the `start` event arrives. Outbound frames go through
//! the socket's sender task, so model audio and control frames share one
//! ordered, backpressured path.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::ServerConfig;
use crate::core::realtime::{AudioOutputCallback, ModelSession};
use crate::errors::BridgeError;
use crate::state::AppState;

use super::messages::{
    BRIDGE_READY_MARK, CallerMessageRoute, MediaPayload, StartMetadata, TelephonyEvent,
    TelephonyOutgoing,
};

/// What the receive loop should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallFlow {
    Continue,
    Stop,
}

/// Prompt and voice for a call, resolved from the stream's custom
/// parameters with configured fallbacks.
pub fn call_parameters(
    config: &ServerConfig,
    custom_parameters: &HashMap<String, String>,
) -> (String, String) {
    let prompt = custom_parameters
        .get("prompt")
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .unwrap_or(config.default_prompt.as_str())
        .to_string();

    let voice = match custom_parameters.get("voice").map(|v| v.trim()) {
        Some(voice) if config.is_supported_voice(voice) => voice.to_string(),
        Some(voice) if !voice.is_empty() => {
            warn!(
                requested = %voice,
                fallback = %config.default_voice(),
                "Unsupported voice requested, using default"
            );
            config.default_voice().to_string()
        }
        _ => config.default_voice().to_string(),
    };

    (prompt, voice)
}

/// Bridge state for one telephony stream.
pub struct CallSession {
    app_state: Arc<AppState>,
    outbound: mpsc::Sender<CallerMessageRoute>,
    stream_sid: Option<String>,
    call_sid: Option<String>,
    model: Option<ModelSession>,
    /// Flips to true once the ready mark is queued; model audio waits on it
    bridge_ready: watch::Sender<bool>,
}

impl CallSession {
    pub fn new(app_state: Arc<AppState>, outbound: mpsc::Sender<CallerMessageRoute>) -> Self {
        Self {
            app_state,
            outbound,
            stream_sid: None,
            call_sid: None,
            model: None,
            bridge_ready: watch::Sender::new(false),
        }
    }

    pub fn stream_sid(&self) -> Option<&str> {
        self.stream_sid.as_deref()
    }

    pub fn call_sid(&self) -> Option<&str> {
        self.call_sid.as_deref()
    }

    pub fn is_bridged(&self) -> bool {
        self.model.is_some()
    }

    /// Fires when the model connection ends on its own.
    pub fn model_disconnected(&self) -> Option<CancellationToken> {
        self.model.as_ref().map(ModelSession::disconnected)
    }

    /// Parse and handle one text frame from the telephony socket.
    pub async fn handle_frame(&mut self, text: &str) -> Result<CallFlow, BridgeError> {
        let event = TelephonyEvent::parse(text)?;
        trace!(event = event.name(), "Media stream event");
        self.handle_event(event).await
    }

    pub async fn handle_event(&mut self, event: TelephonyEvent) -> Result<CallFlow, BridgeError> {
        match event {
            TelephonyEvent::Connected { protocol, version } => {
                info!(?protocol, ?version, "Media stream connected");
                Ok(CallFlow::Continue)
            }
            TelephonyEvent::Start { stream_sid, start } => self.start(stream_sid, start).await,
            TelephonyEvent::Media { media, .. } => {
                self.media(media).await?;
                Ok(CallFlow::Continue)
            }
            TelephonyEvent::Stop { stream_sid } => {
                info!(stream_sid = ?stream_sid.or(self.stream_sid.clone()), "Media stream stopped");
                Ok(CallFlow::Stop)
            }
            TelephonyEvent::Mark { mark, .. } => {
                debug!(name = %mark.name, "Mark acknowledged");
                Ok(CallFlow::Continue)
            }
            TelephonyEvent::Dtmf { dtmf, .. } => {
                info!(digit = %dtmf.digit, "Caller pressed a key");
                Ok(CallFlow::Continue)
            }
            TelephonyEvent::Unknown => {
                debug!("Ignoring unrecognized media stream event");
                Ok(CallFlow::Continue)
            }
        }
    }

    async fn start(
        &mut self,
        stream_sid: Option<String>,
        start: StartMetadata,
    ) -> Result<CallFlow, BridgeError> {
        if self.stream_sid.is_some() {
            warn!(stream_sid = ?self.stream_sid, "Duplicate start event ignored");
            return Ok(CallFlow::Continue);
        }

        let stream_sid = stream_sid
            .or(start.stream_sid)
            .filter(|sid| !sid.is_empty())
            .ok_or_else(|| BridgeError::Protocol("start event without streamSid".to_string()))?;

        let app_state = self.app_state.clone();
        let config = &app_state.config;
        let (prompt, voice) = call_parameters(config, &start.custom_parameters);

        info!(
            stream_sid = %stream_sid,
            call_sid = ?start.call_sid,
            voice = %voice,
            "Media stream starting"
        );

        self.stream_sid = Some(stream_sid.clone());
        self.call_sid = start.call_sid;

        let on_audio = self.audio_forwarder(stream_sid.clone());
        let model = match ModelSession::connect(config.realtime_config(&voice, &prompt), on_audio)
            .await
        {
            Ok(model) => model,
            Err(e) => {
                error!(stream_sid = %stream_sid, "Failed to connect realtime model: {}", e);
                return Err(e.into());
            }
        };
        self.model = Some(model);

        self.send(TelephonyOutgoing::mark(stream_sid, BRIDGE_READY_MARK)).await?;
        self.bridge_ready.send_replace(true);
        Ok(CallFlow::Continue)
    }

    async fn media(&mut self, media: MediaPayload) -> Result<(), BridgeError> {
        if !media.is_inbound() {
            debug!(track = ?media.track, "Ignoring non-inbound media");
            return Ok(());
        }
        let Some(model) = self.model.as_ref() else {
            debug!("Media received before the model session is ready, dropping");
            return Ok(());
        };
        if media.payload.is_empty() {
            return Ok(());
        }
        model.submit_audio(&media.payload).await?;
        Ok(())
    }

    /// Model audio callback: wraps each converted chunk in a media frame for
    /// this stream. Chunks produced before the ready mark is queued wait for it.
    fn audio_forwarder(&self, stream_sid: String) -> AudioOutputCallback {
        let outbound = self.outbound.clone();
        let ready = self.bridge_ready.subscribe();
        Arc::new(move |payload: String| {
            let outbound = outbound.clone();
            let stream_sid = stream_sid.clone();
            let mut ready = ready.clone();
            Box::pin(async move {
                if ready.wait_for(|ready| *ready).await.is_err() {
                    debug!("Call session gone before the bridge was ready, dropping model audio");
                    return;
                }
                let frame = TelephonyOutgoing::media(stream_sid, payload);
                if outbound
                    .send(CallerMessageRoute::Outgoing(frame))
                    .await
                    .is_err()
                {
                    debug!("Caller sender closed, dropping model audio");
                }
            })
        })
    }

    async fn send(&self, frame: TelephonyOutgoing) -> Result<(), BridgeError> {
        self.outbound
            .send(CallerMessageRoute::Outgoing(frame))
            .await
            .map_err(|_| BridgeError::CallerGone)
    }

    /// Close the model session if one is open. Safe to call more than once.
    pub async fn close(&mut self) {
        if let Some(model) = self.model.take() {
            if let Err(e) = model.close().await {
                warn!("Failed to close realtime model session: {}", e);
            }
        }
    }
}
