//! Twilio REST client for placing outbound calls.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};
use zeroize::Zeroize;

use super::{TelephonyError, TelephonyResult};

/// Default Twilio REST API host.
pub const TWILIO_API_BASE_URL: &str = "https://api.twilio.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Call resource returned by `Calls.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct CallInfo {
    /// Call SID (`CA...`)
    pub sid: String,
    /// Initial call status, usually `queued`
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    message: Option<String>,
}

/// Places calls through `POST /2010-04-01/Accounts/{sid}/Calls.json`.
#[derive(Clone)]
pub struct TwilioCallClient {
    http: reqwest::Client,
    api_base_url: String,
    account_sid: String,
    auth_token: String,
    caller_id: String,
}

impl std::fmt::Debug for TwilioCallClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioCallClient")
            .field("api_base_url", &self.api_base_url)
            .field("account_sid", &self.account_sid)
            .field("caller_id", &self.caller_id)
            .finish_non_exhaustive()
    }
}

impl TwilioCallClient {
    pub fn new(
        api_base_url: impl Into<String>,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
        caller_id: impl Into<String>,
    ) -> TelephonyResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TelephonyError::Request(e.to_string()))?;

        Ok(Self {
            http,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            caller_id: caller_id.into(),
        })
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.api_base_url, self.account_sid
        )
    }

    /// Dial `to_number` from the configured caller id. Twilio fetches
    /// `twiml_url` once the callee answers.
    pub async fn start_call(&self, to_number: &str, twiml_url: &str) -> TelephonyResult<CallInfo> {
        let response = self
            .http
            .post(self.calls_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("To", to_number),
                ("From", self.caller_id.as_str()),
                ("Url", twiml_url),
            ])
            .send()
            .await
            .map_err(|e| TelephonyError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = match serde_json::from_str::<TwilioErrorBody>(&body) {
                Ok(TwilioErrorBody {
                    code,
                    message: Some(message),
                }) => match code {
                    Some(code) => format!("{} (code {})", message, code),
                    None => message,
                },
                _ => body,
            };
            error!(status = %status, "Twilio rejected call request: {}", message);
            return Err(TelephonyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let call: CallInfo = response
            .json()
            .await
            .map_err(|e| TelephonyError::Request(format!("Invalid call response: {}", e)))?;
        info!(call_sid = %call.sid, status = ?call.status, "Outbound call queued");
        Ok(call)
    }
}

impl Drop for TwilioCallClient {
    fn drop(&mut self) {
        self.auth_token.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calls_url() {
        let client =
            TwilioCallClient::new("https://api.twilio.com/", "AC123", "token", "+15550000000")
                .unwrap();
        assert_eq!(
            client.calls_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Calls.json"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let client =
            TwilioCallClient::new(TWILIO_API_BASE_URL, "AC123", "secret-token", "+15550000000")
                .unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("AC123"));
        assert!(!debug.contains("secret-token"));
    }
}
