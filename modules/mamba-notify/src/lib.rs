pub mod adapters;
pub mod audit;
pub mod channel;
pub mod message;
pub mod router;

pub use audit::{AuditEntry, AuditSink, MemoryAuditLog};
pub use channel::{ChannelAdapter, ChannelKind, DeliveryReceipt};
pub use router::{BatchSummary, DeliveryOutcome, NotificationRouter};
