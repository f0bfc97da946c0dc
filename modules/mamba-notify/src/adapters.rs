//! Provider-backed channel adapters. Each maps its client's error surface
//! onto the dispatch taxonomy: transport/5xx failures are
//! `ChannelUnavailable` (retryable), provider rejections of the recipient
//! are `InvalidRecipient` (not retried).

use async_trait::async_trait;

use africastalking_client::{AfricasTalkingClient, AfricasTalkingError};
use email_client::{EmailClient, EmailError};
use mamba_common::{MambaError, NotificationKind, NotificationPayload};
use twilio::{TwilioClient, TwilioError};

use crate::channel::{is_email_address, is_phone_number, ChannelAdapter, ChannelKind, DeliveryReceipt};

// --- Twilio SMS ---

pub struct TwilioSmsAdapter {
    client: TwilioClient,
}

impl TwilioSmsAdapter {
    pub fn new(client: TwilioClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelAdapter for TwilioSmsAdapter {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    async fn send(&self, payload: &NotificationPayload) -> Result<DeliveryReceipt, MambaError> {
        if !is_phone_number(&payload.recipient) {
            return Err(MambaError::InvalidRecipient(payload.recipient.clone()));
        }
        let resp = self
            .client
            .send_sms(&payload.recipient, &payload.message)
            .await
            .map_err(map_twilio_error)?;
        Ok(DeliveryReceipt {
            channel: ChannelKind::Sms,
            provider_ref: Some(resp.sid),
        })
    }
}

// --- Africa's Talking SMS ---

pub struct AfricasTalkingSmsAdapter {
    client: AfricasTalkingClient,
}

impl AfricasTalkingSmsAdapter {
    pub fn new(client: AfricasTalkingClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelAdapter for AfricasTalkingSmsAdapter {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    async fn send(&self, payload: &NotificationPayload) -> Result<DeliveryReceipt, MambaError> {
        if !is_phone_number(&payload.recipient) {
            return Err(MambaError::InvalidRecipient(payload.recipient.clone()));
        }
        let resp = self
            .client
            .send_sms(&payload.recipient, &payload.message)
            .await
            .map_err(map_at_error)?;

        // The endpoint reports per-recipient acceptance in the body even on
        // HTTP 200; an empty recipient list means the number was rejected.
        match resp.data.recipients.first() {
            Some(r) if r.status == "Success" => Ok(DeliveryReceipt {
                channel: ChannelKind::Sms,
                provider_ref: Some(r.message_id.clone()),
            }),
            Some(r) => Err(MambaError::InvalidRecipient(format!(
                "{}: {}",
                payload.recipient, r.status
            ))),
            None => Err(MambaError::InvalidRecipient(payload.recipient.clone())),
        }
    }
}

// --- Africa's Talking WhatsApp ---

pub struct AfricasTalkingWhatsAppAdapter {
    client: AfricasTalkingClient,
}

impl AfricasTalkingWhatsAppAdapter {
    pub fn new(client: AfricasTalkingClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelAdapter for AfricasTalkingWhatsAppAdapter {
    fn kind(&self) -> ChannelKind {
        ChannelKind::WhatsApp
    }

    async fn send(&self, payload: &NotificationPayload) -> Result<DeliveryReceipt, MambaError> {
        if !is_phone_number(&payload.recipient) {
            return Err(MambaError::InvalidRecipient(payload.recipient.clone()));
        }
        self.client
            .send_whatsapp(&payload.recipient, &payload.message)
            .await
            .map_err(map_at_error)?;
        Ok(DeliveryReceipt {
            channel: ChannelKind::WhatsApp,
            provider_ref: None,
        })
    }
}

// --- Twilio WhatsApp ---

pub struct TwilioWhatsAppAdapter {
    client: TwilioClient,
}

impl TwilioWhatsAppAdapter {
    pub fn new(client: TwilioClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelAdapter for TwilioWhatsAppAdapter {
    fn kind(&self) -> ChannelKind {
        ChannelKind::WhatsApp
    }

    async fn send(&self, payload: &NotificationPayload) -> Result<DeliveryReceipt, MambaError> {
        if !is_phone_number(&payload.recipient) {
            return Err(MambaError::InvalidRecipient(payload.recipient.clone()));
        }
        let resp = self
            .client
            .send_whatsapp(&payload.recipient, &payload.message)
            .await
            .map_err(map_twilio_error)?;
        Ok(DeliveryReceipt {
            channel: ChannelKind::WhatsApp,
            provider_ref: Some(resp.sid),
        })
    }
}

// --- Email ---

pub struct EmailAdapter {
    client: EmailClient,
}

impl EmailAdapter {
    pub fn new(client: EmailClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChannelAdapter for EmailAdapter {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn send(&self, payload: &NotificationPayload) -> Result<DeliveryReceipt, MambaError> {
        if !is_email_address(&payload.recipient) {
            return Err(MambaError::InvalidRecipient(payload.recipient.clone()));
        }
        let subject = email_subject(payload.kind);
        let body = format_email_body(&payload.message, payload.kind);
        self.client
            .send_email(&payload.recipient, subject, &body)
            .await
            .map_err(map_email_error)?;
        Ok(DeliveryReceipt {
            channel: ChannelKind::Email,
            provider_ref: None,
        })
    }
}

pub fn email_subject(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::SosAlert => "URGENT: Snakebite Emergency Alert",
        NotificationKind::HospitalUpdate => "Hospital System Update",
        NotificationKind::StockAlert => "Antivenom Stock Alert",
        NotificationKind::Emergency => "CRITICAL: Emergency Alert",
    }
}

/// Minimal HTML wrapper around the channel-agnostic text. The text itself
/// is preformatted; only the banner varies by kind.
fn format_email_body(message: &str, kind: NotificationKind) -> String {
    format!(
        "<html><body>\
         <h2>{}</h2>\
         <pre style=\"font-family: monospace; white-space: pre-line;\">{}</pre>\
         <p>This is an automated message from the emergency response system. \
         For immediate medical emergencies, call emergency services. \
         Do not reply to this email.</p>\
         </body></html>",
        email_subject(kind),
        message
    )
}

// --- Error mapping ---

fn map_twilio_error(err: TwilioError) -> MambaError {
    match err {
        TwilioError::Api { status, message } if (400..500).contains(&status) && status != 429 => {
            MambaError::InvalidRecipient(message)
        }
        other => MambaError::ChannelUnavailable(other.to_string()),
    }
}

fn map_at_error(err: AfricasTalkingError) -> MambaError {
    match err {
        AfricasTalkingError::Api { status, message }
            if (400..500).contains(&status) && status != 429 =>
        {
            MambaError::InvalidRecipient(message)
        }
        other => MambaError::ChannelUnavailable(other.to_string()),
    }
}

fn map_email_error(err: EmailError) -> MambaError {
    match err {
        EmailError::Api { status, message } if (400..500).contains(&status) && status != 429 => {
            MambaError::InvalidRecipient(message)
        }
        other => MambaError::ChannelUnavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_is_retryable() {
        let err = map_twilio_error(TwilioError::Api {
            status: 429,
            message: "Too Many Requests".into(),
        });
        assert!(err.is_retryable());
    }

    #[test]
    fn bad_number_is_not_retryable() {
        let err = map_twilio_error(TwilioError::Api {
            status: 400,
            message: "The 'To' number is not a valid phone number".into(),
        });
        assert!(matches!(err, MambaError::InvalidRecipient(_)));
    }

    #[test]
    fn network_failure_is_channel_unavailable() {
        let err = map_at_error(AfricasTalkingError::Network("connection refused".into()));
        assert!(matches!(err, MambaError::ChannelUnavailable(_)));
    }

    #[test]
    fn subject_varies_by_kind() {
        assert_ne!(
            email_subject(NotificationKind::SosAlert),
            email_subject(NotificationKind::StockAlert)
        );
    }
}
