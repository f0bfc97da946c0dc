use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use mamba_common::{MambaError, NotificationPayload};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Sms,
    WhatsApp,
    Email,
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelKind::Sms => write!(f, "sms"),
            ChannelKind::WhatsApp => write!(f, "whatsapp"),
            ChannelKind::Email => write!(f, "email"),
        }
    }
}

/// Proof that a provider accepted the message. `provider_ref` carries the
/// provider-side message id when one is returned.
#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
    pub channel: ChannelKind,
    pub provider_ref: Option<String>,
}

/// One delivery technology behind a uniform send capability. Adapters are
/// selected by configuration and addressed by `kind()`; callers never
/// branch on the concrete provider.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    fn kind(&self) -> ChannelKind;

    async fn send(&self, payload: &NotificationPayload) -> Result<DeliveryReceipt, MambaError>;
}

/// Recipient identifiers containing an email marker route to the email
/// channel; everything else is treated as phone-shaped.
pub fn is_email_address(identifier: &str) -> bool {
    identifier.contains('@')
}

/// E.164-ish phone shape: optional leading '+', then digits and separators.
pub fn is_phone_number(identifier: &str) -> bool {
    let trimmed = identifier.trim_start_matches('+');
    !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || c == '-' || c == ' ')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_marker_detection() {
        assert!(is_email_address("er@knh.or.ke"));
        assert!(!is_email_address("+254700000001"));
    }

    #[test]
    fn phone_shape_detection() {
        assert!(is_phone_number("+254700000001"));
        assert!(is_phone_number("+254-20-2726300"));
        assert!(!is_phone_number("er@knh.or.ke"));
        assert!(!is_phone_number(""));
        assert!(!is_phone_number("+"));
    }
}
