use thiserror::Error;
use uuid::Uuid;

use crate::types::IncidentStatus;

#[derive(Error, Debug)]
pub enum MambaError {
    #[error("invalid coordinates: lat {lat}, lng {lng}")]
    InvalidCoordinates { lat: f64, lng: f64 },

    #[error("invalid location: {0}")]
    InvalidLocation(String),

    #[error("incident {0} not found")]
    IncidentNotFound(Uuid),

    #[error("hospital {0} not found")]
    HospitalNotFound(Uuid),

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        from: IncidentStatus,
        to: IncidentStatus,
    },

    #[error("channel unavailable: {0}")]
    ChannelUnavailable(String),

    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    #[error("no adapter configured for channel: {0}")]
    UnknownChannel(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl MambaError {
    /// Transient delivery failures are worth retrying; everything else is
    /// either a caller error or a defect.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MambaError::ChannelUnavailable(_))
    }
}
