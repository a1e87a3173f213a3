//! Media stream WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::calls::MEDIA_STREAM_PATH;
use crate::handlers::media_stream_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media stream WebSocket router
///
/// # Endpoint
///
/// `GET /media-stream` - WebSocket upgrade for Twilio Media Streams,
/// sub-protocol `audio.twilio.com`
///
/// # Protocol
///
/// Twilio sends `connected`, `start`, `media` and `stop` events as JSON text
/// frames. The bridge answers with a `bridge-ready` mark once the model
/// session is up, then `media` frames carrying the model's spoken reply:
///
/// ```json
/// {"event": "mark", "streamSid": "MZ...", "mark": {"name": "bridge-ready"}}
/// {"event": "media", "streamSid": "MZ...", "media": {"payload": "<base64 u-law>"}}
/// ```
pub fn create_media_stream_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(MEDIA_STREAM_PATH, get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
