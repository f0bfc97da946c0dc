use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use mamba_common::{
    Hospital, Incident, IncidentReport, IncidentStatus, IncidentUpdate, MambaError,
    NotificationKind, NotificationPayload, Priority, StockReport,
};
use mamba_notify::{DeliveryOutcome, NotificationRouter};
use mamba_realtime::{BroadcastHub, RealtimeEvent, Topic};

use crate::directory::HospitalDirectory;
use crate::geo;
use crate::store::{IncidentChange, IncidentStore};

/// Coordinates the dispatch flow: validate → create → resolve → notify →
/// broadcast. Once an incident is created, downstream failures are logged
/// and isolated; the caller always gets the canonical incident back.
pub struct DispatchService {
    directory: Arc<dyn HospitalDirectory>,
    store: Arc<dyn IncidentStore>,
    router: Arc<NotificationRouter>,
    hub: Arc<BroadcastHub>,
    /// External emergency-service numbers alerted for every incident.
    emergency_contacts: Vec<String>,
}

impl DispatchService {
    pub fn new(
        directory: Arc<dyn HospitalDirectory>,
        store: Arc<dyn IncidentStore>,
        router: Arc<NotificationRouter>,
        hub: Arc<BroadcastHub>,
        emergency_contacts: Vec<String>,
    ) -> Self {
        Self {
            directory,
            store,
            router,
            hub,
            emergency_contacts,
        }
    }

    pub async fn get_incident(&self, id: Uuid) -> Result<Incident, MambaError> {
        self.store
            .get(id)
            .await?
            .ok_or(MambaError::IncidentNotFound(id))
    }

    pub async fn list_active(&self) -> Result<Vec<Incident>, MambaError> {
        self.store.list_active().await
    }

    pub fn directory(&self) -> &Arc<dyn HospitalDirectory> {
        &self.directory
    }

    /// Handle a new report. Only validation failures surface to the
    /// caller; a missing hospital, dead notification channels, or an empty
    /// broadcast topic never fail the submission.
    pub async fn submit_incident(&self, report: IncidentReport) -> Result<Incident, MambaError> {
        let location = report
            .location
            .ok_or_else(|| MambaError::InvalidLocation("location is required".to_string()))?;
        if !location.is_valid() {
            return Err(MambaError::InvalidCoordinates {
                lat: location.lat,
                lng: location.lng,
            });
        }

        let now = Utc::now();
        let incident = Incident {
            id: Uuid::new_v4(),
            location,
            address: report.address,
            responder_id: report.responder_id,
            species_id: report.species_id,
            risk_level: report.risk_level,
            hospital_id: None,
            status: IncidentStatus::Pending,
            victim_details: report.victim_details,
            symptoms: report.symptoms,
            first_aid_applied: report.first_aid_applied,
            notes: report.notes,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(incident.clone()).await?;
        info!(id = %incident.id, responder = %incident.responder_id, "Incident created");

        // Step 3: resolve and assign. Finding nothing is a valid outcome;
        // a directory read failure is treated the same way.
        let hospital = match geo::resolve_nearest(self.directory.as_ref(), location).await {
            Ok(found) => found,
            Err(e) => {
                warn!(id = %incident.id, error = %e, "Hospital resolution failed; incident stays pending");
                None
            }
        };

        let incident = match &hospital {
            Some(h) => {
                let assigned = self
                    .store
                    .apply(incident.id, IncidentChange::AssignHospital(h.id))
                    .await?;
                info!(id = %assigned.id, hospital = %h.name, "Incident assigned to nearest hospital");
                assigned
            }
            None => {
                info!(id = %incident.id, "No eligible hospital; incident remains pending");
                incident
            }
        };

        // Steps 4–5 are fault-isolated: completed persistence is never
        // rolled back on their account.
        self.notify_emergency(&incident, hospital.as_ref()).await;
        self.broadcast_incident(&incident);

        Ok(incident)
    }

    /// Apply field updates and/or a status transition, then publish the
    /// change to realtime subscribers.
    pub async fn update_incident(
        &self,
        id: Uuid,
        update: IncidentUpdate,
    ) -> Result<Incident, MambaError> {
        let incident = self.store.apply(id, IncidentChange::Update(update)).await?;
        info!(id = %incident.id, status = %incident.status, "Incident updated");

        self.hub.publish(
            &Topic::IncidentGlobal,
            RealtimeEvent::SosUpdate {
                incident: incident.clone(),
            },
        );
        self.hub.publish(
            &Topic::Responder(incident.responder_id.clone()),
            RealtimeEvent::SosStatusUpdate {
                incident: incident.clone(),
            },
        );

        Ok(incident)
    }

    /// Explicit (re)assignment. Repeats the notify and broadcast steps of
    /// the dispatch flow with hospital-update semantics; assigning the
    /// same hospital twice is idempotent.
    pub async fn assign_hospital(
        &self,
        id: Uuid,
        hospital_id: Uuid,
    ) -> Result<Incident, MambaError> {
        let hospital = self
            .directory
            .get(hospital_id)
            .await?
            .ok_or(MambaError::HospitalNotFound(hospital_id))?;

        let incident = self
            .store
            .apply(id, IncidentChange::AssignHospital(hospital_id))
            .await?;
        info!(id = %incident.id, hospital = %hospital.name, "Hospital assigned");

        self.notify_hospital_assignment(&incident, &hospital).await;
        self.broadcast_incident(&incident);

        Ok(incident)
    }

    /// Notify a hospital's contacts about its antivenom stock level and
    /// publish the snapshot on the hospital's stock topic.
    pub async fn send_stock_alert(
        &self,
        hospital_id: Uuid,
        stock: StockReport,
    ) -> Result<Vec<DeliveryOutcome>, MambaError> {
        let hospital = self
            .directory
            .get(hospital_id)
            .await?
            .ok_or(MambaError::HospitalNotFound(hospital_id))?;

        let message = mamba_notify::message::stock_alert(&hospital, &stock);
        let outcomes = self
            .notify_hospital_contacts(&hospital, &message, NotificationKind::StockAlert, None)
            .await;

        self.hub.publish(
            &Topic::Stock(hospital.id),
            RealtimeEvent::StockUpdate {
                hospital_id: hospital.id,
                stock,
            },
        );

        Ok(outcomes)
    }

    // --- notification fan-out ---

    /// Emergency alert on incident creation: the assigned hospital's
    /// contacts plus the configured emergency services.
    async fn notify_emergency(&self, incident: &Incident, hospital: Option<&Hospital>) {
        let message = mamba_notify::message::emergency_alert(incident, hospital);
        let mut outcomes = Vec::new();

        if let Some(hospital) = hospital {
            outcomes.extend(
                self.notify_hospital_contacts(
                    hospital,
                    &message,
                    NotificationKind::SosAlert,
                    Some(incident.id),
                )
                .await,
            );
        }

        let service_alerts = self.emergency_contacts.iter().map(|contact| {
            let payload = NotificationPayload {
                kind: NotificationKind::Emergency,
                recipient: contact.clone(),
                message: message.clone(),
                priority: Priority::Critical,
                incident_id: Some(incident.id),
            };
            let router = self.router.clone();
            async move { router.dispatch(&payload).await }
        });
        outcomes.extend(join_all(service_alerts).await);

        self.log_outcomes(incident.id, &outcomes);
    }

    /// Reassignment notice to the newly assigned hospital.
    async fn notify_hospital_assignment(&self, incident: &Incident, hospital: &Hospital) {
        let detail = json!({
            "incident_id": incident.id,
            "responder_id": incident.responder_id,
            "location": incident.location,
            "risk_level": incident.risk_level,
        });
        let message =
            mamba_notify::message::hospital_update(hospital, "sos_assignment", &detail);
        let outcomes = self
            .notify_hospital_contacts(
                hospital,
                &message,
                NotificationKind::HospitalUpdate,
                Some(incident.id),
            )
            .await;
        self.log_outcomes(incident.id, &outcomes);
    }

    /// Contact fan-out for one hospital: emergency line at CRITICAL, front
    /// desk at HIGH, email at MEDIUM — whichever of the three exist.
    async fn notify_hospital_contacts(
        &self,
        hospital: &Hospital,
        message: &str,
        kind: NotificationKind,
        incident_id: Option<Uuid>,
    ) -> Vec<DeliveryOutcome> {
        let mut targets: Vec<(String, NotificationKind, Priority)> = Vec::new();
        if let Some(emergency) = &hospital.contact.emergency {
            targets.push((emergency.clone(), NotificationKind::Emergency, Priority::Critical));
        }
        if let Some(phone) = &hospital.contact.phone {
            targets.push((phone.clone(), kind, Priority::High));
        }
        if let Some(email) = &hospital.contact.email {
            targets.push((email.clone(), kind, Priority::Medium));
        }

        let attempts = targets.into_iter().map(|(recipient, kind, priority)| {
            let payload = NotificationPayload {
                kind,
                recipient,
                message: message.to_string(),
                priority,
                incident_id,
            };
            let router = self.router.clone();
            async move { router.dispatch(&payload).await }
        });
        join_all(attempts).await
    }

    fn log_outcomes(&self, incident_id: Uuid, outcomes: &[DeliveryOutcome]) {
        let failed = outcomes.iter().filter(|o| !o.success).count();
        if failed > 0 {
            warn!(
                id = %incident_id,
                total = outcomes.len(),
                failed,
                "Some notification deliveries failed; incident dispatch unaffected"
            );
        } else {
            info!(id = %incident_id, total = outcomes.len(), "Notifications dispatched");
        }
    }

    // --- realtime ---

    /// Publish the standard trio for an incident change: the general feed,
    /// the assigned hospital's feed, and the reporting responder's feed.
    fn broadcast_incident(&self, incident: &Incident) {
        self.hub.publish(
            &Topic::IncidentGlobal,
            RealtimeEvent::SosUpdate {
                incident: incident.clone(),
            },
        );

        if let Some(hospital_id) = incident.hospital_id {
            self.hub.publish(
                &Topic::Hospital(hospital_id),
                RealtimeEvent::SosAssigned {
                    incident: incident.clone(),
                },
            );
        }

        self.hub.publish(
            &Topic::Responder(incident.responder_id.clone()),
            RealtimeEvent::SosStatusUpdate {
                incident: incident.clone(),
            },
        );
    }
}
