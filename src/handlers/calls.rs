//! Outbound call placement and the TwiML document Twilio fetches once the
//! callee answers.

use std::sync::Arc;

use axum::{
    Form, Json,
    extract::{Query, State},
    http::header::CONTENT_TYPE,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::telephony::{TelephonyError, connect_stream};
use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Path of the media stream WebSocket endpoint.
pub const MEDIA_STREAM_PATH: &str = "/media-stream";

/// Path of the TwiML endpoint.
pub const TWIML_PATH: &str = "/twiml";

/// Form body of `POST /call`
#[derive(Debug, Deserialize)]
pub struct CallRequest {
    #[serde(default)]
    pub to_number: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub voice: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CallResponse {
    pub call_sid: String,
    pub to_number: String,
    pub voice: String,
    pub prompt: String,
}

/// Query of `GET|POST /twiml`
#[derive(Debug, Default, Deserialize)]
pub struct TwimlQuery {
    pub prompt: Option<String>,
    pub voice: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Place an outbound call that will be bridged to the model.
pub async fn create_call(
    State(state): State<Arc<AppState>>,
    Form(request): Form<CallRequest>,
) -> AppResult<Json<CallResponse>> {
    let config = &state.config;

    let to_number = request.to_number.trim();
    if to_number.is_empty() {
        return Err(AppError::BadRequest(
            "A destination phone number is required.".to_string(),
        ));
    }

    let voice = non_blank(request.voice.as_deref()).unwrap_or(config.default_voice());
    if !config.is_supported_voice(voice) {
        return Err(AppError::BadRequest(format!(
            "Unsupported voice '{}'. Supported voices: {}",
            voice,
            config.supported_voices.join(", ")
        )));
    }

    let prompt = non_blank(request.prompt.as_deref()).unwrap_or(config.default_prompt.as_str());

    let twiml_url = config
        .build_public_url(TWIML_PATH, None, &[("prompt", prompt), ("voice", voice)])
        .map_err(TelephonyError::InvalidUrl)?;

    let call = state
        .twilio
        .start_call(to_number, twiml_url.as_str())
        .await?;

    info!(call_sid = %call.sid, voice = %voice, "Call placed");

    Ok(Json(CallResponse {
        call_sid: call.sid,
        to_number: to_number.to_string(),
        voice: voice.to_string(),
        prompt: prompt.to_string(),
    }))
}

/// TwiML that connects the answered call to the media stream endpoint,
/// passing prompt and voice as stream parameters.
pub async fn twiml(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TwimlQuery>,
) -> AppResult<impl IntoResponse> {
    let config = &state.config;
    let prompt = non_blank(query.prompt.as_deref()).unwrap_or(config.default_prompt.as_str());
    let voice = non_blank(query.voice.as_deref()).unwrap_or(config.default_voice());

    let stream_url = config
        .build_public_url(MEDIA_STREAM_PATH, Some("wss"), &[])
        .map_err(AppError::Internal)?;

    let document = connect_stream(stream_url.as_str(), &[("prompt", prompt), ("voice", voice)]);
    Ok(([(CONTENT_TYPE, "application/xml")], document))
}
