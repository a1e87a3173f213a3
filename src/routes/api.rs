use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, calls};
use crate::state::AppState;
use std::sync::Arc;

/// Create the HTTP router: landing page, call placement, TwiML and health.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::index))
        .route("/health", get(api::health_check))
        .route("/call", post(calls::create_call))
        .route(calls::TWIML_PATH, get(calls::twiml).post(calls::twiml))
        .layer(TraceLayer::new_for_http())
}
