use thiserror::Error;

pub type Result<T> = std::result::Result<T, TwilioError>;

#[derive(Debug, Error)]
pub enum TwilioError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for TwilioError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TwilioError::Parse(err.to_string())
        } else {
            TwilioError::Network(err.to_string())
        }
    }
}
