use anyhow::Result;

/// Which provider backs the SMS-class channel. WhatsApp always goes
/// through Africa's Talking when its credentials are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmsProvider {
    Twilio,
    AfricasTalking,
}

/// Application configuration loaded from environment variables.
/// Provider credentials are optional — a missing pair simply leaves that
/// channel unconfigured and the router reports it as unavailable.
#[derive(Debug, Clone)]
pub struct Config {
    // Web server
    pub web_host: String,
    pub web_port: u16,

    // SMS / WhatsApp providers
    pub sms_provider: SmsProvider,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_phone_number: Option<String>,
    pub africastalking_username: Option<String>,
    pub africastalking_api_key: Option<String>,

    // Email gateway
    pub email_api_url: Option<String>,
    pub email_service_id: Option<String>,
    pub email_template_id: Option<String>,
    pub email_user_id: Option<String>,

    // Dispatch
    /// External emergency-service numbers that get a CRITICAL alert for
    /// every incident, regardless of hospital assignment.
    pub emergency_contacts: Vec<String>,
    /// Per-recipient delivery attempt timeout in seconds.
    pub notify_timeout_secs: u64,

    /// Optional JSON file of hospital records loaded into the directory
    /// at startup.
    pub hospital_seed_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            web_host: std::env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: std::env::var("WEB_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            sms_provider: match std::env::var("SMS_PROVIDER").as_deref() {
                Ok("africastalking") => SmsProvider::AfricasTalking,
                _ => SmsProvider::Twilio,
            },
            twilio_account_sid: std::env::var("TWILIO_ACCOUNT_SID").ok(),
            twilio_auth_token: std::env::var("TWILIO_AUTH_TOKEN").ok(),
            twilio_phone_number: std::env::var("TWILIO_PHONE_NUMBER").ok(),
            africastalking_username: std::env::var("AFRICASTALKING_USERNAME").ok(),
            africastalking_api_key: std::env::var("AFRICASTALKING_API_KEY").ok(),
            email_api_url: std::env::var("EMAIL_API_URL").ok(),
            email_service_id: std::env::var("EMAIL_SERVICE_ID").ok(),
            email_template_id: std::env::var("EMAIL_TEMPLATE_ID").ok(),
            email_user_id: std::env::var("EMAIL_USER_ID").ok(),
            emergency_contacts: std::env::var("EMERGENCY_CONTACTS")
                .unwrap_or_default()
                .split(',')
                .filter(|s| !s.is_empty())
                .map(|s| s.trim().to_string())
                .collect(),
            notify_timeout_secs: std::env::var("NOTIFY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            hospital_seed_path: std::env::var("HOSPITAL_SEED_PATH").ok(),
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        fn preview(val: &Option<String>) -> &'static str {
            match val {
                Some(v) if !v.is_empty() => "set",
                _ => "<not set>",
            }
        }

        tracing::info!(
            sms_provider = ?self.sms_provider,
            twilio = preview(&self.twilio_account_sid),
            africastalking = preview(&self.africastalking_api_key),
            email = preview(&self.email_user_id),
            emergency_contacts = self.emergency_contacts.len(),
            "Config loaded"
        );
    }
}
