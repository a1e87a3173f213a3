//! Model Session: one WebSocket connection to the OpenAI Realtime API per call.
//!
//! # Lifecycle
//!
//! `Disconnected -> Connecting -> Active -> Closed`
//!
//! [`ModelSession::connect`] performs the handshake, sends the session
//! configuration, starts the background drain task and asks the model for an
//! opening response. While that response is outstanding the turn buffer only
//! accumulates.
//!
//! # Concurrency
//!
//! The write half of the socket and the [`TurnBuffer`] live together behind
//! one async mutex. Every flush (from [`ModelSession::submit_audio`] or from
//! the drain task on completion) holds that lock across the whole
//! append/commit/response.create sequence, so at most one flush is in flight
//! and its events are never interleaved with another turn's.
//!
//! Audio deltas are handed to the [`AudioOutputCallback`] without the lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use http::HeaderValue;
use http::header::AUTHORIZATION;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, warn};
use url::Url;

use super::config::{Modality, OPENAI_BETA_HEADER, OpenAIRealtimeAudioFormat};
use super::messages::{ClientEvent, ResponseConfig, ServerEvent, SessionConfig};
use super::turn_buffer::TurnBuffer;
use crate::core::audio::AudioMode;
use crate::core::realtime::base::{
    AudioOutputCallback, ConnectionState, RealtimeConfig, RealtimeError, RealtimeResult,
};

/// Upper bound on the WebSocket handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

// =============================================================================
// Shared Core
// =============================================================================

/// State mutated by both the call task and the drain task.
struct SessionCore {
    sink: Option<WsSink>,
    turns: TurnBuffer,
}

impl SessionCore {
    async fn send(&mut self, events: Vec<ClientEvent>) -> RealtimeResult<()> {
        let sink = self.sink.as_mut().ok_or(RealtimeError::NotConnected)?;
        for event in events {
            let json = serde_json::to_string(&event)
                .map_err(|e| RealtimeError::SerializationError(e.to_string()))?;
            sink.send(Message::Text(json.into()))
                .await
                .map_err(|e| RealtimeError::WebSocketError(e.to_string()))?;
        }
        Ok(())
    }

    /// Submit everything buffered as one turn. Returns the number of chunks
    /// sent; zero means nothing was eligible.
    async fn flush_turn(&mut self) -> RealtimeResult<usize> {
        let chunks = self.turns.flush();
        if chunks.is_empty() {
            return Ok(0);
        }
        let count = chunks.len();
        self.turns.set_awaiting(true);
        self.send(ClientEvent::turn(chunks)).await?;
        Ok(count)
    }

    async fn close_sink(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            if let Err(e) = sink.close().await {
                debug!("Model socket close returned: {}", e);
            }
        }
    }
}

// =============================================================================
// Model Session
// =============================================================================

/// A live connection to the speech model for one call.
pub struct ModelSession {
    config: RealtimeConfig,
    state: Arc<RwLock<ConnectionState>>,
    core: Arc<Mutex<SessionCore>>,
    /// Cancelled by [`ModelSession::close`] to stop the drain task
    shutdown: CancellationToken,
    /// Cancelled by the drain task when the model hangs up on its own
    disconnected: CancellationToken,
    drain_handle: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl ModelSession {
    /// Open the connection, configure the session, start draining model
    /// events and request the opening response.
    ///
    /// On failure nothing is left running: the socket is closed and the
    /// drain task, if started, is stopped.
    pub async fn connect(
        config: RealtimeConfig,
        on_audio: AudioOutputCallback,
    ) -> RealtimeResult<Self> {
        config.validate()?;
        let state = Arc::new(RwLock::new(ConnectionState::Connecting));

        let url = build_ws_url(&config)?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| RealtimeError::ConnectionFailed(format!("Invalid realtime URL: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| RealtimeError::InvalidConfiguration(e.to_string()))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);
        request
            .headers_mut()
            .insert("OpenAI-Beta", HeaderValue::from_static(OPENAI_BETA_HEADER));

        let (ws_stream, _response) =
            tokio::time::timeout(CONNECT_TIMEOUT, tokio_tungstenite::connect_async(request))
                .await
                .map_err(|_| {
                    RealtimeError::ConnectionFailed(format!(
                        "Handshake timed out after {}s",
                        CONNECT_TIMEOUT.as_secs()
                    ))
                })?
                .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        info!(
            model = %config.model,
            voice = %config.voice,
            audio_mode = %config.audio_mode,
            "Connected to realtime model"
        );

        let (sink, stream) = ws_stream.split();
        let core = Arc::new(Mutex::new(SessionCore {
            sink: Some(sink),
            turns: TurnBuffer::new(config.flush_threshold),
        }));

        {
            let mut guard = core.lock().await;
            let update = ClientEvent::SessionUpdate {
                session: build_session_config(&config),
            };
            if let Err(e) = guard.send(vec![update]).await {
                guard.close_sink().await;
                return Err(RealtimeError::ConnectionFailed(format!(
                    "Failed to send session configuration: {}",
                    e
                )));
            }
        }

        let shutdown = CancellationToken::new();
        let disconnected = CancellationToken::new();
        let handle = tokio::spawn(
            drain_events(
                stream,
                core.clone(),
                on_audio,
                config.audio_mode,
                state.clone(),
                shutdown.clone(),
                disconnected.clone(),
            )
            .in_current_span(),
        );

        let greeting = {
            let mut guard = core.lock().await;
            guard.turns.set_awaiting(true);
            guard
                .send(vec![ClientEvent::ResponseCreate {
                    response: ResponseConfig::audio_with_instructions(config.instructions.clone()),
                }])
                .await
        };
        if let Err(e) = greeting {
            shutdown.cancel();
            let _ = handle.await;
            core.lock().await.close_sink().await;
            return Err(RealtimeError::ConnectionFailed(format!(
                "Failed to request opening response: {}",
                e
            )));
        }

        *state.write().await = ConnectionState::Active;

        Ok(Self {
            config,
            state,
            core,
            shutdown,
            disconnected,
            drain_handle: Mutex::new(Some(handle)),
            closed: AtomicBool::new(false),
        })
    }

    /// Convert one caller chunk and buffer it, submitting a turn when the
    /// buffer is due. The flush completes before this returns.
    ///
    /// A chunk that fails to convert is dropped with a warning.
    pub async fn submit_audio(&self, payload: &str) -> RealtimeResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RealtimeError::NotConnected);
        }

        let chunk = match self.config.audio_mode.inbound(payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Dropping caller audio chunk: {}", e);
                return Ok(());
            }
        };

        let mut core = self.core.lock().await;
        core.turns.append(chunk);
        if core.turns.should_flush() {
            let count = core.flush_turn().await?;
            debug!(chunks = count, "Submitted caller turn");
        }
        Ok(())
    }

    /// Tear the session down. Buffered audio that can still go out is
    /// submitted first. Safe to call more than once.
    pub async fn close(&self) -> RealtimeResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        {
            let mut core = self.core.lock().await;
            if !core.turns.is_empty() && !core.turns.is_awaiting() {
                match core.flush_turn().await {
                    Ok(count) => debug!(chunks = count, "Submitted final caller turn"),
                    Err(e) => warn!("Failed to submit final caller turn: {}", e),
                }
            }
        }

        self.shutdown.cancel();
        let handle = self.drain_handle.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("Model drain task ended abnormally: {}", e);
            }
        }

        self.core.lock().await.close_sink().await;
        *self.state.write().await = ConnectionState::Closed;
        info!("Realtime model session closed");
        Ok(())
    }

    /// Token cancelled when the model connection ends without
    /// [`ModelSession::close`] having been called.
    pub fn disconnected(&self) -> CancellationToken {
        self.disconnected.clone()
    }

    pub async fn connection_state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Whether a model response is outstanding.
    pub async fn is_awaiting_response(&self) -> bool {
        self.core.lock().await.turns.is_awaiting()
    }

    /// Chunks buffered but not yet submitted.
    pub async fn pending_chunks(&self) -> usize {
        self.core.lock().await.turns.len()
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }
}

impl Drop for ModelSession {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// =============================================================================
// Drain Task
// =============================================================================

async fn drain_events(
    mut stream: WsSource,
    core: Arc<Mutex<SessionCore>>,
    on_audio: AudioOutputCallback,
    audio_mode: AudioMode,
    state: Arc<RwLock<ConnectionState>>,
    shutdown: CancellationToken,
    disconnected: CancellationToken,
) {
    loop {
        let message = tokio::select! {
            _ = shutdown.cancelled() => break,
            message = stream.next() => message,
        };

        match message {
            Some(Ok(Message::Text(text))) => {
                let handled = handle_server_event(text.as_str(), &core, &on_audio, audio_mode);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = handled => {}
                }
            }
            Some(Ok(Message::Ping(data))) => {
                let mut core = core.lock().await;
                if let Some(sink) = core.sink.as_mut() {
                    if let Err(e) = sink.send(Message::Pong(data)).await {
                        warn!("Failed to answer model ping: {}", e);
                    }
                }
            }
            Some(Ok(Message::Close(frame))) => {
                info!(?frame, "Model closed the connection");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                error!("Model connection error: {}", e);
                break;
            }
            None => {
                info!("Model connection ended");
                break;
            }
        }
    }

    if !shutdown.is_cancelled() {
        *state.write().await = ConnectionState::Closed;
        disconnected.cancel();
    }
    debug!("Model drain task finished");
}

async fn handle_server_event(
    text: &str,
    core: &Arc<Mutex<SessionCore>>,
    on_audio: &AudioOutputCallback,
    audio_mode: AudioMode,
) {
    let event = match serde_json::from_str::<ServerEvent>(text) {
        Ok(event) => event,
        Err(e) => {
            match ServerEvent::peek_type(text) {
                Some(event_type) if event_type == "error" => {
                    let err = malformed_error_event(text);
                    error!("{}", err);
                }
                Some(event_type) => debug!(event_type = %event_type, "Ignoring model event"),
                None => warn!("Failed to parse model event: {}", e),
            }
            return;
        }
    };

    match event {
        ServerEvent::AudioDelta { delta, .. } => match audio_mode.outbound(&delta) {
            Ok(chunk) => on_audio(chunk).await,
            Err(e) => warn!("Dropping model audio chunk: {}", e),
        },
        ServerEvent::ResponseDone { response } => {
            debug!(response_id = %response.id, status = ?response.status, "Model response done");
            let mut core = core.lock().await;
            if core.turns.complete_response() {
                match core.flush_turn().await {
                    Ok(count) => debug!(chunks = count, "Submitted pending caller turn"),
                    Err(e) => error!("Failed to submit pending caller turn: {}", e),
                }
            }
        }
        ServerEvent::Error { error } => {
            let err = RealtimeError::ProviderError(error.message);
            error!(error_type = %error.error_type, code = ?error.code, "{}", err);
        }
        ServerEvent::SessionCreated { session } => {
            info!(session_id = %session.id, "Model session created");
        }
        other => debug!(?other, "Model event"),
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// An `error` event whose body did not match the expected shape.
fn malformed_error_event(text: &str) -> RealtimeError {
    let message = serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|error| error.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .or_else(|| value.get("error").map(|error| error.to_string()))
        })
        .unwrap_or_else(|| "model reported an error without details".to_string());
    RealtimeError::ProviderError(message)
}

/// `{url}?model={model}&voice={voice}`
fn build_ws_url(config: &RealtimeConfig) -> RealtimeResult<Url> {
    let mut url = Url::parse(&config.url)
        .map_err(|e| RealtimeError::InvalidConfiguration(format!("Invalid realtime URL: {}", e)))?;
    url.query_pairs_mut()
        .append_pair("model", &config.model)
        .append_pair("voice", &config.voice);
    Ok(url)
}

fn build_session_config(config: &RealtimeConfig) -> SessionConfig {
    let format = OpenAIRealtimeAudioFormat::from(config.audio_mode);
    SessionConfig {
        instructions: config.instructions.clone(),
        modalities: vec![Modality::Audio, Modality::Text],
        voice: config.voice.clone(),
        input_audio_format: Some(format.as_str().to_string()),
        output_audio_format: Some(format.as_str().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RealtimeConfig {
        RealtimeConfig {
            api_key: "sk-test".to_string(),
            voice: "verse".to_string(),
            instructions: "Take a message".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_malformed_error_event_is_provider_error() {
        let err = malformed_error_event(r#"{"type":"error"}"#);
        assert!(matches!(err, RealtimeError::ProviderError(_)));

        let err = malformed_error_event(r#"{"type":"error","error":{"message":"quota exceeded"}}"#);
        assert!(matches!(err, RealtimeError::ProviderError(ref m) if m == "quota exceeded"));

        let err = malformed_error_event(r#"{"type":"error","error":"overloaded"}"#);
        assert!(matches!(err, RealtimeError::ProviderError(ref m) if m.contains("overloaded")));
    }

    #[test]
    fn test_build_ws_url_appends_model_and_voice() {
        let url = build_ws_url(&test_config()).unwrap();
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.path(), "/v1/realtime");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("model".to_string(), "gpt-4o-realtime-preview-2024-12-17".to_string()),
                ("voice".to_string(), "verse".to_string()),
            ]
        );
    }

    #[test]
    fn test_session_config_follows_audio_mode() {
        let mut config = test_config();
        let session = build_session_config(&config);
        assert_eq!(session.instructions, "Take a message");
        assert_eq!(session.modalities, vec![Modality::Audio, Modality::Text]);
        assert_eq!(session.input_audio_format.as_deref(), Some("pcm16"));
        assert_eq!(session.output_audio_format.as_deref(), Some("pcm16"));

        config.audio_mode = AudioMode::Passthrough;
        let session = build_session_config(&config);
        assert_eq!(session.input_audio_format.as_deref(), Some("g711_ulaw"));
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_config() {
        let config = RealtimeConfig::default();
        let on_audio: AudioOutputCallback = Arc::new(|_| Box::pin(async {}));
        assert!(matches!(
            ModelSession::connect(config, on_audio).await,
            Err(RealtimeError::InvalidConfiguration(_))
        ));
    }
}
