//! End-to-end dispatch scenarios: submission drives resolution,
//! assignment, notification fan-out, and realtime broadcast, with
//! downstream failures isolated from the caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use mamba_common::{
    AntivenomStock, ContactInfo, GeoPoint, Hospital, IncidentReport, IncidentStatus, MambaError,
    NotificationPayload, VerificationStatus,
};
use mamba_dispatch::{DispatchService, MemoryDirectory, MemoryIncidentStore};
use mamba_notify::{
    ChannelAdapter, ChannelKind, DeliveryReceipt, MemoryAuditLog, NotificationRouter,
};
use mamba_realtime::{BroadcastHub, Topic};

struct StubAdapter {
    kind: ChannelKind,
    fail: bool,
}

#[async_trait]
impl ChannelAdapter for StubAdapter {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    async fn send(&self, _payload: &NotificationPayload) -> Result<DeliveryReceipt, MambaError> {
        if self.fail {
            Err(MambaError::ChannelUnavailable("gateway down".into()))
        } else {
            Ok(DeliveryReceipt {
                channel: self.kind,
                provider_ref: None,
            })
        }
    }
}

struct Fixture {
    service: DispatchService,
    directory: Arc<MemoryDirectory>,
    hub: Arc<BroadcastHub>,
    audit: Arc<MemoryAuditLog>,
}

fn fixture(sms_fails: bool) -> Fixture {
    let directory = Arc::new(MemoryDirectory::new());
    let store = Arc::new(MemoryIncidentStore::new());
    let audit = Arc::new(MemoryAuditLog::new());
    let router = Arc::new(
        NotificationRouter::new(audit.clone(), Duration::from_secs(5))
            .with_adapter(Arc::new(StubAdapter {
                kind: ChannelKind::Sms,
                fail: sms_fails,
            }))
            .with_adapter(Arc::new(StubAdapter {
                kind: ChannelKind::Email,
                fail: false,
            })),
    );
    let hub = Arc::new(BroadcastHub::default());
    let service = DispatchService::new(
        directory.clone(),
        store,
        router,
        hub.clone(),
        vec!["+254-999".into(), "+254-20-2726300".into()],
    );
    Fixture {
        service,
        directory,
        hub,
        audit,
    }
}

fn hospital(id: Uuid, lat: f64, lng: f64, verified: bool) -> Hospital {
    Hospital {
        id,
        name: format!("Hospital {id}"),
        coordinates: GeoPoint { lat, lng },
        verified_status: if verified {
            VerificationStatus::Verified
        } else {
            VerificationStatus::Pending
        },
        contact: ContactInfo {
            phone: Some("+254-20-1111111".into()),
            emergency: Some("+254-20-9999999".into()),
            email: Some("er@example.or.ke".into()),
        },
        antivenom_stock: AntivenomStock {
            polyvalent: 12,
            specific: 4,
            last_updated: Utc::now(),
        },
        emergency_services: true,
    }
}

fn report(lat: f64, lng: f64) -> IncidentReport {
    IncidentReport {
        location: Some(GeoPoint { lat, lng }),
        address: None,
        responder_id: "responder-7".into(),
        species_id: None,
        risk_level: None,
        victim_details: None,
        symptoms: vec!["swelling".into(), "nausea".into()],
        first_aid_applied: vec!["immobilization".into()],
        notes: None,
    }
}

#[tokio::test]
async fn submission_assigns_eligible_hospital_not_closer_ineligible_one() {
    let fx = fixture(false);
    let eligible = Uuid::new_v4();
    // Unverified hospital sits closer to the incident than the eligible one.
    fx.directory.upsert(hospital(Uuid::new_v4(), -1.3046, 36.8158, false));
    fx.directory.upsert(hospital(eligible, -1.30, 36.82, true));

    let mut global_rx = fx.hub.subscribe(&Topic::IncidentGlobal);
    let mut hospital_rx = fx.hub.subscribe(&Topic::Hospital(eligible));

    let incident = fx.service.submit_incident(report(-1.3048, 36.8156)).await.unwrap();

    assert_eq!(incident.status, IncidentStatus::Assigned);
    assert_eq!(incident.hospital_id, Some(eligible));

    let global_event = global_rx.recv().await.unwrap();
    assert_eq!(global_event.event_type(), "sos_update");
    let hospital_event = hospital_rx.recv().await.unwrap();
    assert_eq!(hospital_event.event_type(), "sos_assigned");
}

#[tokio::test]
async fn malformed_location_is_rejected_before_any_side_effect() {
    let fx = fixture(false);
    fx.directory.upsert(hospital(Uuid::new_v4(), -1.30, 36.82, true));

    let mut global_rx = fx.hub.subscribe(&Topic::IncidentGlobal);

    let err = fx.service.submit_incident(report(200.0, 36.0)).await.unwrap_err();
    assert!(matches!(err, MambaError::InvalidCoordinates { .. }));

    assert!(fx.service.list_active().await.unwrap().is_empty());
    assert!(fx.audit.entries().await.is_empty(), "no notification attempts");
    assert!(global_rx.try_recv().is_err(), "no broadcast fired");
}

#[tokio::test]
async fn missing_location_is_invalid_location() {
    let fx = fixture(false);
    let mut bad = report(0.0, 0.0);
    bad.location = None;

    let err = fx.service.submit_incident(bad).await.unwrap_err();
    assert!(matches!(err, MambaError::InvalidLocation(_)));
}

#[tokio::test]
async fn no_eligible_hospital_leaves_incident_pending() {
    let fx = fixture(false);
    fx.directory.upsert(hospital(Uuid::new_v4(), -1.30, 36.82, false));

    let incident = fx.service.submit_incident(report(-1.3048, 36.8156)).await.unwrap();
    assert_eq!(incident.status, IncidentStatus::Pending);
    assert_eq!(incident.hospital_id, None);

    // Emergency services still get their alerts.
    let entries = fx.audit.entries().await;
    assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn channel_failures_never_fail_the_submission() {
    let fx = fixture(true);
    fx.directory.upsert(hospital(Uuid::new_v4(), -1.30, 36.82, true));

    let incident = fx.service.submit_incident(report(-1.3048, 36.8156)).await.unwrap();
    assert_eq!(incident.status, IncidentStatus::Assigned);

    // Hospital contacts (emergency, phone, email) + two emergency services.
    let entries = fx.audit.entries().await;
    assert_eq!(entries.len(), 5);
    // SMS-bound attempts failed, the email one went through.
    assert_eq!(entries.iter().filter(|e| e.success).count(), 1);
}

#[tokio::test]
async fn double_assignment_is_idempotent() {
    let fx = fixture(false);
    let id = Uuid::new_v4();
    fx.directory.upsert(hospital(id, -1.30, 36.82, true));

    let incident = fx.service.submit_incident(report(-1.3048, 36.8156)).await.unwrap();
    let first = fx.service.assign_hospital(incident.id, id).await.unwrap();
    let second = fx.service.assign_hospital(incident.id, id).await.unwrap();

    assert_eq!(first.status, IncidentStatus::Assigned);
    assert_eq!(second.status, IncidentStatus::Assigned);
    assert_eq!(first.hospital_id, second.hospital_id);
}

#[tokio::test]
async fn assigning_unknown_hospital_is_not_found() {
    let fx = fixture(false);
    fx.directory.upsert(hospital(Uuid::new_v4(), -1.30, 36.82, true));

    let incident = fx.service.submit_incident(report(-1.3048, 36.8156)).await.unwrap();
    let err = fx
        .service
        .assign_hospital(incident.id, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, MambaError::HospitalNotFound(_)));
}

#[tokio::test]
async fn completed_incident_cannot_be_reassigned() {
    let fx = fixture(false);
    let id = Uuid::new_v4();
    fx.directory.upsert(hospital(id, -1.30, 36.82, true));

    let incident = fx.service.submit_incident(report(-1.3048, 36.8156)).await.unwrap();
    fx.service
        .update_incident(
            incident.id,
            mamba_common::IncidentUpdate {
                status: Some(IncidentStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let err = fx.service.assign_hospital(incident.id, id).await.unwrap_err();
    assert!(matches!(err, MambaError::InvalidTransition { .. }));
}

#[tokio::test]
async fn responder_topic_gets_status_updates() {
    let fx = fixture(false);
    fx.directory.upsert(hospital(Uuid::new_v4(), -1.30, 36.82, true));

    let mut responder_rx = fx.hub.subscribe(&Topic::Responder("responder-7".into()));
    let incident = fx.service.submit_incident(report(-1.3048, 36.8156)).await.unwrap();

    let event = responder_rx.recv().await.unwrap();
    assert_eq!(event.event_type(), "sos_status_update");

    fx.service
        .update_incident(
            incident.id,
            mamba_common::IncidentUpdate {
                status: Some(IncidentStatus::InProgress),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let event = responder_rx.recv().await.unwrap();
    assert_eq!(event.event_type(), "sos_status_update");
}

#[tokio::test]
async fn stock_alert_notifies_and_broadcasts() {
    let fx = fixture(false);
    let id = Uuid::new_v4();
    fx.directory.upsert(hospital(id, -1.30, 36.82, true));

    let mut stock_rx = fx.hub.subscribe(&Topic::Stock(id));

    let outcomes = fx
        .service
        .send_stock_alert(
            id,
            mamba_common::StockReport {
                antivenom_type: "Polyvalent".into(),
                quantity: 3,
                expiry_date: None,
                status: "AVAILABLE".into(),
            },
        )
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 3, "emergency line, front desk, email");
    let event = stock_rx.recv().await.unwrap();
    assert_eq!(event.event_type(), "stock_update");
}
