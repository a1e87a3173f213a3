use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::telephony::{TelephonyResult, TwilioCallClient};

/// Application state shared by all handlers.
pub struct AppState {
    pub config: ServerConfig,
    pub twilio: TwilioCallClient,
}

impl AppState {
    pub fn new(config: ServerConfig) -> TelephonyResult<Arc<Self>> {
        let twilio = TwilioCallClient::new(
            config.twilio_api_base_url.clone(),
            config.twilio_account_sid.clone(),
            config.twilio_auth_token.clone(),
            config.twilio_caller_id.clone(),
        )?;
        Ok(Arc::new(Self { config, twilio }))
    }
}
