use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Geo Types ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// A point is well-formed when both components are finite and inside
    /// the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Haversine great-circle distance between two points in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().asin();
    EARTH_RADIUS_KM * c
}

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl IncidentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, IncidentStatus::Completed | IncidentStatus::Cancelled)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// The machine is monotonic: forward moves along
    /// Pending → Assigned → InProgress → Completed are accepted (skips
    /// included), Cancelled is reachable from any non-terminal state, and
    /// re-applying the current non-terminal status is a no-op transition
    /// (idempotent re-assignment). Terminal states accept nothing.
    pub fn can_transition_to(&self, next: IncidentStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            IncidentStatus::Cancelled => true,
            _ => next >= *self,
        }
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentStatus::Pending => write!(f, "PENDING"),
            IncidentStatus::Assigned => write!(f, "ASSIGNED"),
            IncidentStatus::InProgress => write!(f, "IN_PROGRESS"),
            IncidentStatus::Completed => write!(f, "COMPLETED"),
            IncidentStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Critical => write!(f, "critical"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    /// Notification priority for an alert about a snake of this risk level.
    pub fn to_priority(self) -> Priority {
        match self {
            RiskLevel::Low => Priority::Low,
            RiskLevel::Moderate => Priority::Medium,
            RiskLevel::High => Priority::High,
            RiskLevel::Critical => Priority::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    SosAlert,
    HospitalUpdate,
    StockAlert,
    Emergency,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::SosAlert => write!(f, "sos_alert"),
            NotificationKind::HospitalUpdate => write!(f, "hospital_update"),
            NotificationKind::StockAlert => write!(f, "stock_alert"),
            NotificationKind::Emergency => write!(f, "emergency"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
}

// --- Hospital ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub phone: Option<String>,
    /// Dedicated emergency line, usually staffed around the clock.
    pub emergency: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AntivenomStock {
    pub polyvalent: u32,
    pub specific: u32,
    pub last_updated: DateTime<Utc>,
}

impl AntivenomStock {
    pub fn is_available(&self) -> bool {
        self.polyvalent > 0 || self.specific > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hospital {
    pub id: Uuid,
    pub name: String,
    pub coordinates: GeoPoint,
    pub verified_status: VerificationStatus,
    pub contact: ContactInfo,
    pub antivenom_stock: AntivenomStock,
    pub emergency_services: bool,
}

impl Hospital {
    /// Eligible resolution target: verified and able to take emergencies.
    pub fn is_eligible(&self) -> bool {
        self.verified_status == VerificationStatus::Verified && self.emergency_services
    }
}

// --- Incident ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: Uuid,
    pub location: GeoPoint,
    pub address: Option<String>,
    pub responder_id: String,
    pub species_id: Option<Uuid>,
    pub risk_level: Option<RiskLevel>,
    pub hospital_id: Option<Uuid>,
    pub status: IncidentStatus,
    pub victim_details: Option<String>,
    pub symptoms: Vec<String>,
    pub first_aid_applied: Vec<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Incident {
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Incoming report body. Everything except the location and the reporting
/// responder is optional; victim metadata never gates dispatch. A missing
/// location is rejected before anything is persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct IncidentReport {
    #[serde(default)]
    pub location: Option<GeoPoint>,
    pub address: Option<String>,
    pub responder_id: String,
    #[serde(default)]
    pub species_id: Option<Uuid>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub victim_details: Option<String>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub first_aid_applied: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update applied through the orchestrator. Absent fields keep
/// their current value; `hospital_id` is only settable through the
/// assignment path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncidentUpdate {
    pub status: Option<IncidentStatus>,
    pub species_id: Option<Uuid>,
    pub risk_level: Option<RiskLevel>,
    pub victim_details: Option<String>,
    pub symptoms: Option<Vec<String>>,
    pub first_aid_applied: Option<Vec<String>>,
    pub notes: Option<String>,
}

// --- Notification ---

/// Channel-agnostic notification value object. Built by the orchestrator,
/// consumed by the router; only the audit trail outlives the send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub kind: NotificationKind,
    pub recipient: String,
    pub message: String,
    pub priority: Priority,
    pub incident_id: Option<Uuid>,
}

/// Antivenom stock snapshot reported by a hospital, used to drive stock
/// alerts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReport {
    pub antivenom_type: String,
    pub quantity: u32,
    pub expiry_date: Option<DateTime<Utc>>,
    pub status: String,
}
