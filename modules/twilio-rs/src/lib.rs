pub mod error;

pub use error::{Result, TwilioError};

use serde::Deserialize;
use tracing::debug;

const BASE_URL: &str = "https://api.twilio.com/2010-04-01";

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    /// Sending number in E.164 form, e.g. "+15551234567".
    pub phone_number: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub sid: String,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct TwilioClient {
    client: reqwest::Client,
    options: TwilioOptions,
}

impl TwilioClient {
    pub fn new(options: TwilioOptions) -> Self {
        Self {
            client: reqwest::Client::new(),
            options,
        }
    }

    /// Send an SMS. Returns the provider message SID on acceptance.
    pub async fn send_sms(&self, to: &str, body: &str) -> Result<MessageResponse> {
        let from = self.options.phone_number.clone();
        self.post_message(&from, to, body).await
    }

    /// Send a WhatsApp message through the Twilio sandbox/business channel.
    pub async fn send_whatsapp(&self, to: &str, body: &str) -> Result<MessageResponse> {
        let from = whatsapp_address(&self.options.phone_number);
        let to = whatsapp_address(to);
        self.post_message(&from, &to, body).await
    }

    async fn post_message(&self, from: &str, to: &str, body: &str) -> Result<MessageResponse> {
        let url = format!(
            "{}/Accounts/{}/Messages.json",
            BASE_URL, self.options.account_sid
        );

        let form = [("From", from), ("To", to), ("Body", body)];
        let resp = self
            .client
            .post(&url)
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .form(&form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(TwilioError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let message: MessageResponse = resp.json().await?;
        debug!(sid = %message.sid, to, "Twilio message accepted");
        Ok(message)
    }
}

/// Twilio addresses WhatsApp recipients as `whatsapp:<number>`.
fn whatsapp_address(number: &str) -> String {
    format!("whatsapp:{}", number.trim_start_matches('+'))
}
