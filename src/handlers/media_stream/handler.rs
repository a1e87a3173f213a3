//! Media stream WebSocket handler
//!
//! Accepts Twilio's media stream socket, drives a [`CallSession`] from the
//! inbound events and guarantees teardown of both legs on every exit path.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, header::SEC_WEBSOCKET_PROTOCOL},
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::{select, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::state::AppState;

use super::messages::CallerMessageRoute;
use super::session::{CallFlow, CallSession};

/// Sub-protocol Twilio requests for media streams.
pub const TWILIO_SUBPROTOCOL: &str = "audio.twilio.com";

/// Outbound frame buffer per call
const CHANNEL_BUFFER_SIZE: usize = 256;

/// Maximum WebSocket frame size (1 MB)
const MAX_WS_FRAME_SIZE: usize = 1024 * 1024;

/// Maximum WebSocket message size (1 MB)
const MAX_WS_MESSAGE_SIZE: usize = 1024 * 1024;

/// How long teardown waits for queued frames to drain
const SENDER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Sub-protocols offered by the client, in request order.
pub fn requested_protocols(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(|protocol| protocol.trim().to_string())
        .filter(|protocol| !protocol.is_empty())
        .collect()
}

/// Media stream WebSocket handler
///
/// Negotiates `audio.twilio.com` when offered. A client that does not offer
/// it is still accepted, without a sub-protocol, and the mismatch is logged.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let requested = requested_protocols(&headers);
    if requested.iter().any(|p| p == TWILIO_SUBPROTOCOL) {
        info!(protocol = TWILIO_SUBPROTOCOL, "Media stream upgrade requested");
    } else {
        warn!(
            requested = ?requested,
            expected = TWILIO_SUBPROTOCOL,
            "Unexpected media stream sub-protocols, accepting without one"
        );
    }

    ws.protocols([TWILIO_SUBPROTOCOL])
        .max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| {
            let call_id = Uuid::new_v4();
            handle_media_stream(socket, state).instrument(info_span!("call", call_id = %call_id))
        })
}

async fn model_gone(token: Option<CancellationToken>) {
    match token {
        Some(token) => token.cancelled_owned().await,
        None => std::future::pending::<()>().await,
    }
}

/// Handle the media stream WebSocket connection
async fn handle_media_stream(socket: WebSocket, app_state: Arc<AppState>) {
    info!("Media stream connection established");

    let (mut sender, mut receiver) = socket.split();
    let (message_tx, mut message_rx) = mpsc::channel::<CallerMessageRoute>(CHANNEL_BUFFER_SIZE);

    // Sender task for outgoing frames
    let mut sender_task = tokio::spawn(
        async move {
            while let Some(route) = message_rx.recv().await {
                let should_close = matches!(route, CallerMessageRoute::Close);

                let result = match route {
                    CallerMessageRoute::Outgoing(message) => {
                        match serde_json::to_string(&message) {
                            Ok(json_str) => sender.send(Message::Text(json_str.into())).await,
                            Err(e) => {
                                error!("Failed to serialize outgoing frame: {}", e);
                                continue;
                            }
                        }
                    }
                    CallerMessageRoute::Close => {
                        debug!("Closing media stream WebSocket");
                        sender.send(Message::Close(None)).await
                    }
                };

                if let Err(e) = result {
                    warn!("Failed to send media stream frame: {}", e);
                    break;
                }

                if should_close {
                    break;
                }
            }
        }
        .in_current_span(),
    );

    let mut call = CallSession::new(app_state, message_tx.clone());
    let mut peer_closed = false;

    loop {
        let next = select! {
            msg = receiver.next() => msg,
            _ = model_gone(call.model_disconnected()) => {
                warn!(stream_sid = ?call.stream_sid(), "Model connection ended, closing call");
                break;
            }
        };

        match next {
            Some(Ok(Message::Text(text))) => match call.handle_frame(text.as_str()).await {
                Ok(CallFlow::Continue) => {}
                Ok(CallFlow::Stop) => break,
                Err(e) => {
                    error!(stream_sid = ?call.stream_sid(), "Ending call: {}", e);
                    break;
                }
            },
            Some(Ok(Message::Binary(data))) => {
                debug!("Ignoring binary frame: {} bytes", data.len());
            }
            Some(Ok(Message::Close(_))) => {
                info!("Media stream close received");
                peer_closed = true;
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("Media stream WebSocket error: {}", e);
                peer_closed = true;
                break;
            }
            None => {
                info!("Media stream connection closed by peer");
                peer_closed = true;
                break;
            }
        }
    }

    // Cleanup
    call.close().await;

    if !peer_closed && message_tx.send(CallerMessageRoute::Close).await.is_err() {
        debug!("Sender task already finished");
    }
    drop(call);
    drop(message_tx);

    if tokio::time::timeout(SENDER_DRAIN_TIMEOUT, &mut sender_task)
        .await
        .is_err()
    {
        warn!("Timed out draining outbound frames");
        sender_task.abort();
    }

    info!("Media stream connection terminated");
}
