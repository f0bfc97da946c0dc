pub mod error;

pub use error::{AfricasTalkingError, Result};

use serde::Deserialize;
use tracing::debug;

const BASE_URL: &str = "https://api.africastalking.com/version1";

#[derive(Debug, Clone)]
pub struct AfricasTalkingOptions {
    pub username: String,
    pub api_key: String,
}

/// Top-level response of the messaging endpoint. Per-recipient statuses
/// live under `SMSMessageData.Recipients`.
#[derive(Debug, Clone, Deserialize)]
pub struct SmsResponse {
    #[serde(rename = "SMSMessageData")]
    pub data: SmsMessageData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmsMessageData {
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Recipients", default)]
    pub recipients: Vec<RecipientStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipientStatus {
    #[serde(rename = "number")]
    pub number: String,
    #[serde(rename = "status")]
    pub status: String,
    #[serde(rename = "messageId")]
    pub message_id: String,
}

#[derive(Debug, Clone)]
pub struct AfricasTalkingClient {
    client: reqwest::Client,
    options: AfricasTalkingOptions,
}

impl AfricasTalkingClient {
    pub fn new(options: AfricasTalkingOptions) -> Self {
        Self {
            client: reqwest::Client::new(),
            options,
        }
    }

    /// Send an SMS to a single recipient.
    pub async fn send_sms(&self, to: &str, message: &str) -> Result<SmsResponse> {
        self.post_sms(to, message).await
    }

    /// Send one SMS to many recipients in a single API call.
    pub async fn send_bulk_sms(&self, recipients: &[String], message: &str) -> Result<SmsResponse> {
        self.post_sms(&recipients.join(","), message).await
    }

    async fn post_sms(&self, to: &str, message: &str) -> Result<SmsResponse> {
        let url = format!("{BASE_URL}/messaging");
        let form = [
            ("username", self.options.username.as_str()),
            ("to", to),
            ("message", message),
        ];

        let resp = self
            .client
            .post(&url)
            .header("apiKey", &self.options.api_key)
            .header("Accept", "application/json")
            .form(&form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(AfricasTalkingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: SmsResponse = resp.json().await?;
        debug!(to, recipients = parsed.data.recipients.len(), "SMS accepted");
        Ok(parsed)
    }

    /// Send a WhatsApp message. The endpoint takes JSON rather than the
    /// form encoding used by the SMS endpoint.
    pub async fn send_whatsapp(&self, to: &str, message: &str) -> Result<()> {
        let url = format!("{BASE_URL}/whatsapp/message");
        let body = serde_json::json!({ "to": to, "message": message });

        let resp = self
            .client
            .post(&url)
            .header("apiKey", &self.options.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(AfricasTalkingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!(to, "WhatsApp message accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sms_response_parses_recipients() {
        let json = r#"{
            "SMSMessageData": {
                "Message": "Sent to 1/1 Total Cost: KES 0.8000",
                "Recipients": [
                    {"number": "+254700000001", "status": "Success", "messageId": "ATXid_1", "cost": "KES 0.8000"}
                ]
            }
        }"#;
        let resp: SmsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data.recipients.len(), 1);
        assert_eq!(resp.data.recipients[0].status, "Success");
    }

    #[test]
    fn sms_response_tolerates_missing_recipients() {
        let json = r#"{"SMSMessageData": {"Message": "InvalidPhoneNumber"}}"#;
        let resp: SmsResponse = serde_json::from_str(json).unwrap();
        assert!(resp.data.recipients.is_empty());
    }
}
