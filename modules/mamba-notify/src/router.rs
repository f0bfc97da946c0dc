use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tracing::{error, warn};

use mamba_common::{MambaError, NotificationKind, NotificationPayload, Priority};
use uuid::Uuid;

use crate::audit::{AuditEntry, AuditSink};
use crate::channel::{is_email_address, ChannelAdapter, ChannelKind};

/// Per-recipient result of one dispatch attempt. Carries enough to retry:
/// the identifier, the channel the policy chose, and whether the failure
/// was transient.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryOutcome {
    pub recipient: String,
    pub channel: ChannelKind,
    pub success: bool,
    pub error: Option<String>,
    pub retryable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub outcomes: Vec<DeliveryOutcome>,
}

/// Routes payloads to channel adapters. One recipient's failure never
/// cancels another's attempt, and nothing here propagates into the
/// dispatch flow that triggered the send.
pub struct NotificationRouter {
    adapters: HashMap<ChannelKind, Arc<dyn ChannelAdapter>>,
    audit: Arc<dyn AuditSink>,
    attempt_timeout: Duration,
}

impl NotificationRouter {
    pub fn new(audit: Arc<dyn AuditSink>, attempt_timeout: Duration) -> Self {
        Self {
            adapters: HashMap::new(),
            audit,
            attempt_timeout,
        }
    }

    /// Register an adapter under its own kind. Later registrations replace
    /// earlier ones, which is how configuration picks a provider.
    pub fn with_adapter(mut self, adapter: Arc<dyn ChannelAdapter>) -> Self {
        self.adapters.insert(adapter.kind(), adapter);
        self
    }

    /// Deterministic channel selection.
    ///
    /// Critical alerts prefer SMS unless the identifier is email-shaped;
    /// high priority always goes out as SMS; medium and low use email when
    /// the identifier carries an email marker.
    pub fn select_channel(recipient: &str, priority: Priority) -> ChannelKind {
        match priority {
            Priority::Critical => {
                if is_email_address(recipient) {
                    ChannelKind::Email
                } else {
                    ChannelKind::Sms
                }
            }
            Priority::High => ChannelKind::Sms,
            Priority::Medium | Priority::Low => {
                if is_email_address(recipient) {
                    ChannelKind::Email
                } else {
                    ChannelKind::Sms
                }
            }
        }
    }

    /// Attempt one delivery. Never returns an error; failures are folded
    /// into the outcome and the audit trail.
    pub async fn dispatch(&self, payload: &NotificationPayload) -> DeliveryOutcome {
        let channel = Self::select_channel(&payload.recipient, payload.priority);
        let result = self.attempt(channel, payload).await;

        let error = result.as_ref().err().map(|e| e.to_string());
        let retryable = result.as_ref().err().is_some_and(|e| e.is_retryable());

        let entry = AuditEntry::sent(
            payload.kind,
            &payload.recipient,
            payload.priority,
            payload.message.len(),
            error.clone(),
        );
        if let Err(e) = self.audit.record(entry).await {
            warn!(error = %e, "Failed to record notification audit entry");
        }

        DeliveryOutcome {
            recipient: payload.recipient.clone(),
            channel,
            success: error.is_none(),
            error,
            retryable,
        }
    }

    async fn attempt(
        &self,
        channel: ChannelKind,
        payload: &NotificationPayload,
    ) -> Result<(), MambaError> {
        let adapter = self.adapters.get(&channel).ok_or_else(|| {
            // A complete policy table always resolves to a registered
            // adapter; reaching this is a wiring defect.
            error!(channel = %channel, recipient = %payload.recipient, "No adapter for selected channel");
            MambaError::UnknownChannel(channel.to_string())
        })?;

        match tokio::time::timeout(self.attempt_timeout, adapter.send(payload)).await {
            Ok(Ok(receipt)) => {
                tracing::debug!(
                    channel = %receipt.channel,
                    provider_ref = receipt.provider_ref.as_deref().unwrap_or("-"),
                    recipient = %payload.recipient,
                    "Notification delivered"
                );
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(channel = %channel, recipient = %payload.recipient, error = %e, "Notification attempt failed");
                Err(e)
            }
            Err(_) => {
                warn!(channel = %channel, recipient = %payload.recipient, "Notification attempt timed out");
                Err(MambaError::ChannelUnavailable(format!(
                    "delivery attempt exceeded {}s",
                    self.attempt_timeout.as_secs()
                )))
            }
        }
    }

    /// Fan out one message to many recipients, one concurrent attempt per
    /// recipient, and join on all of them. Settles every branch; the
    /// summary counts always add up to the recipient count.
    pub async fn dispatch_batch(
        &self,
        recipients: &[String],
        message: &str,
        kind: NotificationKind,
        priority: Priority,
        incident_id: Option<Uuid>,
    ) -> BatchSummary {
        let attempts = recipients.iter().map(|recipient| {
            let payload = NotificationPayload {
                kind,
                recipient: recipient.clone(),
                message: message.to_string(),
                priority,
                incident_id,
            };
            async move { self.dispatch(&payload).await }
        });

        let outcomes = join_all(attempts).await;
        let successful = outcomes.iter().filter(|o| o.success).count();
        let failed = outcomes.len() - successful;

        tracing::info!(
            total = outcomes.len(),
            successful,
            failed,
            kind = %kind,
            "Notification batch completed"
        );

        BatchSummary {
            total: outcomes.len(),
            successful,
            failed,
            outcomes,
        }
    }
}
