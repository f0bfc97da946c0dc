//! Typed realtime events pushed to topic subscribers. Delivery is
//! fire-and-forget; the incident store stays the source of truth and
//! clients re-query it after reconnecting.

use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use mamba_common::{Incident, StockReport};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeEvent {
    /// Incident created or changed — general feed.
    SosUpdate { incident: Incident },
    /// Incident assigned to a specific hospital — that hospital's feed.
    SosAssigned { incident: Incident },
    /// Status change for the reporting responder's feed.
    SosStatusUpdate { incident: Incident },
    /// Non-incident change affecting a hospital.
    HospitalUpdate {
        hospital_id: Uuid,
        update: serde_json::Value,
    },
    /// Antivenom stock snapshot for a hospital.
    StockUpdate {
        hospital_id: Uuid,
        stock: StockReport,
    },
}

impl RealtimeEvent {
    /// The snake_case event type string, mirroring the serde tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            RealtimeEvent::SosUpdate { .. } => "sos_update",
            RealtimeEvent::SosAssigned { .. } => "sos_assigned",
            RealtimeEvent::SosStatusUpdate { .. } => "sos_status_update",
            RealtimeEvent::HospitalUpdate { .. } => "hospital_update",
            RealtimeEvent::StockUpdate { .. } => "stock_update",
        }
    }

    /// Wire frame pushed to WebSocket clients.
    pub fn to_frame(&self) -> serde_json::Value {
        json!({
            "type": self.event_type(),
            "data": self,
            "timestamp": chrono::Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_matches_serde_tag() {
        let event = RealtimeEvent::HospitalUpdate {
            hospital_id: Uuid::nil(),
            update: json!({"verified": true}),
        };
        assert_eq!(event.event_type(), "hospital_update");

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"].as_str().unwrap(), "hospital_update");
    }

    #[test]
    fn frame_carries_type_data_timestamp() {
        let event = RealtimeEvent::StockUpdate {
            hospital_id: Uuid::nil(),
            stock: StockReport {
                antivenom_type: "Polyvalent".into(),
                quantity: 2,
                expiry_date: None,
                status: "AVAILABLE".into(),
            },
        };
        let frame = event.to_frame();
        assert_eq!(frame["type"], "stock_update");
        assert!(frame["data"]["stock"]["quantity"].is_number());
        assert!(frame["timestamp"].is_string());
    }
}
