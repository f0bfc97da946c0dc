pub mod events;
pub mod hub;

pub use events::RealtimeEvent;
pub use hub::{BroadcastHub, Topic};
