use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    response::{Html, IntoResponse},
};
use serde_json::json;

use crate::core::telephony::twiml::xml_escape;
use crate::state::AppState;

/// Liveness probe.
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Landing page with a form for placing an outbound call.
pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    let config = &state.config;
    let voice_options: String = config
        .supported_voices
        .iter()
        .map(|voice| {
            let escaped = xml_escape(voice);
            let selected = if voice == config.default_voice() {
                " selected"
            } else {
                ""
            };
            format!(r#"<option value="{escaped}"{selected}>{escaped}</option>"#)
        })
        .collect();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Realtime Call Bridge</title>
</head>
<body>
<h1>Place a call</h1>
<form method="post" action="/call">
<label>Phone number <input type="tel" name="to_number" placeholder="+15551234567" required></label>
<label>Voice <select name="voice">{voice_options}</select></label>
<label>Prompt <textarea name="prompt" rows="6" cols="60">{prompt}</textarea></label>
<button type="submit">Call</button>
</form>
</body>
</html>
"#,
        prompt = xml_escape(&config.default_prompt),
    ))
}
