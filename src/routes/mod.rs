//! Router assembly
//!
//! [`create_router`] merges the HTTP and media stream routers and applies
//! the CORS and security header layers shared by both.

pub mod api;
pub mod media_stream;

use std::sync::Arc;

use axum::Router;
use http::{HeaderValue, Method, header::CONTENT_TYPE};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

use crate::state::AppState;

/// CORS layer for `cors_allowed_origins`: `*`, a comma-separated origin
/// list, or unset for same-origin only.
pub fn cors_layer(cors_origins: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    match cors_origins {
        Some("*") => base.allow_origin(Any),
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            base.allow_origin(origins)
        }
        None => {
            info!(
                "CORS not configured, defaulting to same-origin only. \
                 Set CORS_ALLOWED_ORIGINS to enable cross-origin access."
            );
            base
        }
    }
}

/// Build the complete application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(state.config.cors_allowed_origins.as_deref());

    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ));

    api::create_api_router()
        .merge(media_stream::create_media_stream_router())
        .with_state(state)
        .layer(cors)
        .layer(security_headers)
}
