use thiserror::Error;

pub type Result<T> = std::result::Result<T, AfricasTalkingError>;

#[derive(Debug, Error)]
pub enum AfricasTalkingError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for AfricasTalkingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AfricasTalkingError::Parse(err.to_string())
        } else {
            AfricasTalkingError::Network(err.to_string())
        }
    }
}
