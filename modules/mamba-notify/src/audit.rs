//! Immutable record of every delivery attempt. Entries feed later metrics
//! and manual retry; dispatch decisions never read them back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use mamba_common::{NotificationKind, Priority};

#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub event_type: &'static str,
    pub kind: NotificationKind,
    pub recipient: String,
    pub priority: Priority,
    pub message_length: usize,
    pub success: bool,
    pub error: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn sent(
        kind: NotificationKind,
        recipient: &str,
        priority: Priority,
        message_length: usize,
        error: Option<String>,
    ) -> Self {
        Self {
            event_type: "notification_sent",
            kind,
            recipient: recipient.to_string(),
            priority,
            message_length,
            success: error.is_none(),
            error,
            recorded_at: Utc::now(),
        }
    }
}

/// Append-only sink for delivery attempts. Implemented in memory here and
/// by whatever analytics store the deployment wires in.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct MemoryAuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<AuditEntry> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditLog {
    async fn record(&self, entry: AuditEntry) -> anyhow::Result<()> {
        self.entries.write().await.push(entry);
        Ok(())
    }
}
