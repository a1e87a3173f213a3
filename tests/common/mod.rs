//! Shared test support: a scripted stand-in for the realtime model endpoint
//! and configuration helpers.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

use realtime_call_bridge::config::{DEFAULT_PROMPT, ServerConfig};
use realtime_call_bridge::core::audio::AudioMode;

pub const TEST_API_KEY: &str = "sk-test";

/// Commands a test can push to the connected model client.
#[derive(Debug)]
pub enum MockCommand {
    Send(Message),
    Hangup,
}

/// Handshake details captured from the most recent connection.
#[derive(Debug, Clone, Default)]
pub struct Handshake {
    pub uri: String,
    pub authorization: Option<String>,
    pub beta: Option<String>,
}

/// Mock realtime model server. Records every JSON event the client sends
/// and replays whatever the test pushes through [`MockRealtime::send_event`].
pub struct MockRealtime {
    pub url: String,
    events: Arc<Mutex<Vec<Value>>>,
    handshake: Arc<Mutex<Option<Handshake>>>,
    control: Arc<Mutex<Option<mpsc::UnboundedSender<MockCommand>>>>,
    connections: Arc<Mutex<usize>>,
    closed: Arc<Mutex<usize>>,
}

impl MockRealtime {
    pub async fn start() -> Self {
        Self::start_with_greeting(None).await
    }

    /// Like [`MockRealtime::start`], but answers the first `response.create`
    /// on each connection with `greeting` as an audio delta straight away.
    pub async fn start_with_greeting(greeting: Option<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock realtime server");
        let addr = listener.local_addr().expect("Failed to get address");

        let events = Arc::new(Mutex::new(Vec::new()));
        let handshake = Arc::new(Mutex::new(None));
        let control = Arc::new(Mutex::new(None));
        let connections = Arc::new(Mutex::new(0));
        let closed = Arc::new(Mutex::new(0));

        let accept_events = events.clone();
        let accept_handshake = handshake.clone();
        let accept_control = control.clone();
        let accept_connections = connections.clone();
        let accept_closed = closed.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let captured = Arc::new(std::sync::Mutex::new(Handshake::default()));
                let captured_cb = captured.clone();
                let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                    let header = |name: &str| {
                        req.headers()
                            .get(name)
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string)
                    };
                    let mut hs = captured_cb.lock().unwrap();
                    hs.uri = req.uri().to_string();
                    hs.authorization = header("authorization");
                    hs.beta = header("openai-beta");
                    Ok(resp)
                };

                let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                    continue;
                };
                let hs = captured.lock().unwrap().clone();
                *accept_handshake.lock().await = Some(hs);
                *accept_connections.lock().await += 1;

                let (tx, rx) = mpsc::unbounded_channel();
                *accept_control.lock().await = Some(tx);
                let events = accept_events.clone();
                let closed = accept_closed.clone();
                let greeting = greeting.clone();
                tokio::spawn(async move {
                    serve_connection(ws, rx, events, greeting).await;
                    *closed.lock().await += 1;
                });
            }
        });

        Self {
            url: format!("ws://{}/v1/realtime", addr),
            events,
            handshake,
            control,
            connections,
            closed,
        }
    }

    pub async fn events(&self) -> Vec<Value> {
        self.events.lock().await.clone()
    }

    pub async fn event_types(&self) -> Vec<String> {
        self.events()
            .await
            .iter()
            .filter_map(|e| e["type"].as_str().map(str::to_string))
            .collect()
    }

    pub async fn handshake(&self) -> Option<Handshake> {
        self.handshake.lock().await.clone()
    }

    pub async fn connections(&self) -> usize {
        *self.connections.lock().await
    }

    /// Wait until `count` client connections have ended.
    pub async fn wait_for_closed(&self, count: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while *self.closed.lock().await < count {
            if tokio::time::Instant::now() > deadline {
                panic!("Timed out waiting for {} closed connections", count);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Wait until at least `count` events have been recorded.
    pub async fn wait_for_events(&self, count: usize) -> Vec<Value> {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let events = self.events().await;
            if events.len() >= count {
                return events;
            }
            if tokio::time::Instant::now() > deadline {
                panic!(
                    "Timed out waiting for {} events, got {}: {:?}",
                    count,
                    events.len(),
                    events
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn command(&self, command: MockCommand) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(tx) = self.control.lock().await.as_ref() {
                tx.send(command).expect("Mock connection is gone");
                return;
            }
            if tokio::time::Instant::now() > deadline {
                panic!("No client connected to the mock realtime server");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn send_event(&self, event: Value) {
        self.command(MockCommand::Send(Message::Text(event.to_string().into())))
            .await;
    }

    pub async fn send_response_done(&self, response_id: &str) {
        self.send_event(json!({
            "type": "response.done",
            "response": {"id": response_id, "status": "completed"}
        }))
        .await;
    }

    pub async fn send_audio_delta(&self, delta: &str) {
        self.send_event(json!({
            "type": "response.audio.delta",
            "response_id": "resp_1",
            "delta": delta
        }))
        .await;
    }

    /// Drop the client connection without a close handshake.
    pub async fn hangup(&self) {
        self.command(MockCommand::Hangup).await;
    }
}

async fn serve_connection(
    ws: tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>,
    mut commands: mpsc::UnboundedReceiver<MockCommand>,
    events: Arc<Mutex<Vec<Value>>>,
    mut greeting: Option<String>,
) {
    let (mut sink, mut stream) = ws.split();
    loop {
        tokio::select! {
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let Ok(value) = serde_json::from_str::<Value>(text.as_str()) else {
                        continue;
                    };
                    let requested = value["type"] == "response.create";
                    events.lock().await.push(value);
                    if let Some(delta) = greeting.take_if(|_| requested) {
                        let event = json!({
                            "type": "response.audio.delta",
                            "response_id": "resp_greeting",
                            "delta": delta
                        });
                        if sink.send(Message::Text(event.to_string().into())).await.is_err() {
                            break;
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
            cmd = commands.recv() => match cmd {
                Some(MockCommand::Send(message)) => {
                    if sink.send(message).await.is_err() {
                        break;
                    }
                }
                Some(MockCommand::Hangup) | None => break,
            },
        }
    }
}

/// Address nothing is listening on.
pub fn dead_ws_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let port = listener.local_addr().expect("Failed to get address").port();
    drop(listener);
    format!("ws://127.0.0.1:{}/v1/realtime", port)
}

/// Server configuration pointing the model leg at `realtime_url` and the
/// Twilio REST API at `twilio_api_base_url`.
pub fn test_config(realtime_url: &str, twilio_api_base_url: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        tls: None,
        public_base_url: "https://bridge.example.com".to_string(),
        twilio_account_sid: "AC123".to_string(),
        twilio_auth_token: "twilio-token".to_string(),
        twilio_caller_id: "+15550001111".to_string(),
        twilio_api_base_url: twilio_api_base_url.to_string(),
        openai_api_key: TEST_API_KEY.to_string(),
        openai_realtime_model: "gpt-4o-realtime-preview-2024-12-17".to_string(),
        openai_realtime_url: realtime_url.to_string(),
        supported_voices: vec!["alloy".to_string(), "ember".to_string(), "verse".to_string()],
        default_prompt: DEFAULT_PROMPT.to_string(),
        flush_threshold: 8,
        audio_mode: AudioMode::Transcode,
        cors_allowed_origins: None,
    }
}

/// Serve the full router on an ephemeral port.
pub async fn start_bridge(config: ServerConfig) -> std::net::SocketAddr {
    let state = realtime_call_bridge::AppState::new(config).expect("Failed to create app state");
    let app = realtime_call_bridge::routes::create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get address");
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.ok();
    });
    addr
}
