pub mod error;

pub use error::{EmailError, Result};

use tracing::debug;

const DEFAULT_API_URL: &str = "https://api.emailjs.com/api/v1.0/email/send";

#[derive(Debug, Clone)]
pub struct EmailOptions {
    /// Gateway endpoint. Defaults to the EmailJS send endpoint.
    pub api_url: Option<String>,
    pub service_id: String,
    pub template_id: String,
    pub user_id: String,
    pub from_name: String,
}

#[derive(Debug, Clone)]
pub struct EmailClient {
    client: reqwest::Client,
    options: EmailOptions,
}

impl EmailClient {
    pub fn new(options: EmailOptions) -> Self {
        Self {
            client: reqwest::Client::new(),
            options,
        }
    }

    /// Send a single email through the gateway.
    pub async fn send_email(&self, to: &str, subject: &str, body_html: &str) -> Result<()> {
        let url = self
            .options
            .api_url
            .as_deref()
            .unwrap_or(DEFAULT_API_URL);

        let payload = serde_json::json!({
            "service_id": self.options.service_id,
            "template_id": self.options.template_id,
            "user_id": self.options.user_id,
            "template_params": {
                "to_email": to,
                "subject": subject,
                "message": body_html,
                "from_name": self.options.from_name,
            },
        });

        let resp = self.client.post(url).json(&payload).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(EmailError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!(to, subject, "Email accepted by gateway");
        Ok(())
    }
}
