use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use mamba_common::{Incident, IncidentStatus, IncidentUpdate, MambaError};

/// A mutation applied to one incident. Validation happens against the
/// state read inside the same atomic entry access, never against a value
/// read earlier by the caller.
#[derive(Debug, Clone)]
pub enum IncidentChange {
    /// Field updates, optionally including a status transition.
    Update(IncidentUpdate),
    /// Set the hospital and force ASSIGNED when currently PENDING.
    AssignHospital(Uuid),
}

/// Persistence seam for incident records. Implementations must serialize
/// mutations per incident id; flows on different incidents proceed in
/// parallel.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    async fn insert(&self, incident: Incident) -> Result<(), MambaError>;

    async fn get(&self, id: Uuid) -> Result<Option<Incident>, MambaError>;

    /// Incidents not yet in a terminal state, newest first.
    async fn list_active(&self) -> Result<Vec<Incident>, MambaError>;

    /// Validate and apply a change atomically, returning the canonical
    /// record after the change.
    async fn apply(&self, id: Uuid, change: IncidentChange) -> Result<Incident, MambaError>;
}

#[derive(Default)]
pub struct MemoryIncidentStore {
    incidents: DashMap<Uuid, Incident>,
}

impl MemoryIncidentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IncidentStore for MemoryIncidentStore {
    async fn insert(&self, incident: Incident) -> Result<(), MambaError> {
        self.incidents.insert(incident.id, incident);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Incident>, MambaError> {
        Ok(self.incidents.get(&id).map(|e| e.value().clone()))
    }

    async fn list_active(&self) -> Result<Vec<Incident>, MambaError> {
        let mut active: Vec<Incident> = self
            .incidents
            .iter()
            .filter(|e| e.value().is_active())
            .map(|e| e.value().clone())
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(active)
    }

    async fn apply(&self, id: Uuid, change: IncidentChange) -> Result<Incident, MambaError> {
        // The entry guard holds the shard lock for this id, so the
        // validate-and-write below is one atomic step.
        let mut entry = self
            .incidents
            .get_mut(&id)
            .ok_or(MambaError::IncidentNotFound(id))?;
        let incident = entry.value_mut();

        match change {
            IncidentChange::Update(update) => {
                if let Some(next) = update.status {
                    if !incident.status.can_transition_to(next) {
                        return Err(MambaError::InvalidTransition {
                            from: incident.status,
                            to: next,
                        });
                    }
                    incident.status = next;
                }
                if let Some(species_id) = update.species_id {
                    incident.species_id = Some(species_id);
                }
                if let Some(risk_level) = update.risk_level {
                    incident.risk_level = Some(risk_level);
                }
                if let Some(victim_details) = update.victim_details {
                    incident.victim_details = Some(victim_details);
                }
                if let Some(symptoms) = update.symptoms {
                    incident.symptoms = symptoms;
                }
                if let Some(first_aid) = update.first_aid_applied {
                    incident.first_aid_applied = first_aid;
                }
                if let Some(notes) = update.notes {
                    incident.notes = Some(notes);
                }
            }
            IncidentChange::AssignHospital(hospital_id) => {
                if incident.status.is_terminal() {
                    return Err(MambaError::InvalidTransition {
                        from: incident.status,
                        to: IncidentStatus::Assigned,
                    });
                }
                incident.hospital_id = Some(hospital_id);
                if incident.status == IncidentStatus::Pending {
                    incident.status = IncidentStatus::Assigned;
                }
            }
        }

        incident.updated_at = Utc::now();
        Ok(incident.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mamba_common::GeoPoint;

    fn pending_incident() -> Incident {
        let now = Utc::now();
        Incident {
            id: Uuid::new_v4(),
            location: GeoPoint { lat: -1.3048, lng: 36.8156 },
            address: None,
            responder_id: "responder-1".into(),
            species_id: None,
            risk_level: None,
            hospital_id: None,
            status: IncidentStatus::Pending,
            victim_details: None,
            symptoms: vec![],
            first_aid_applied: vec![],
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn status_update(status: IncidentStatus) -> IncidentChange {
        IncidentChange::Update(IncidentUpdate {
            status: Some(status),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = MemoryIncidentStore::new();
        let err = store
            .apply(Uuid::new_v4(), status_update(IncidentStatus::Cancelled))
            .await
            .unwrap_err();
        assert!(matches!(err, MambaError::IncidentNotFound(_)));
    }

    #[tokio::test]
    async fn full_lifecycle_is_accepted_in_sequence() {
        let store = MemoryIncidentStore::new();
        let incident = pending_incident();
        let id = incident.id;
        store.insert(incident).await.unwrap();

        for status in [
            IncidentStatus::Assigned,
            IncidentStatus::InProgress,
            IncidentStatus::Completed,
        ] {
            let updated = store.apply(id, status_update(status)).await.unwrap();
            assert_eq!(updated.status, status);
        }
    }

    #[tokio::test]
    async fn terminal_incident_rejects_every_transition() {
        let store = MemoryIncidentStore::new();
        let incident = pending_incident();
        let id = incident.id;
        store.insert(incident).await.unwrap();
        store
            .apply(id, status_update(IncidentStatus::Cancelled))
            .await
            .unwrap();

        for status in [
            IncidentStatus::Pending,
            IncidentStatus::Assigned,
            IncidentStatus::InProgress,
            IncidentStatus::Completed,
        ] {
            let err = store.apply(id, status_update(status)).await.unwrap_err();
            assert!(matches!(err, MambaError::InvalidTransition { .. }));
        }

        let err = store
            .apply(id, IncidentChange::AssignHospital(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, MambaError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn rejected_transition_leaves_fields_untouched() {
        let store = MemoryIncidentStore::new();
        let incident = pending_incident();
        let id = incident.id;
        store.insert(incident).await.unwrap();
        store
            .apply(id, status_update(IncidentStatus::Completed))
            .await
            .unwrap();

        let err = store
            .apply(
                id,
                IncidentChange::Update(IncidentUpdate {
                    status: Some(IncidentStatus::Pending),
                    notes: Some("should not land".into()),
                    ..Default::default()
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MambaError::InvalidTransition { .. }));

        let stored = store.get(id).await.unwrap().unwrap();
        assert!(stored.notes.is_none());
    }

    #[tokio::test]
    async fn assignment_forces_assigned_only_from_pending() {
        let store = MemoryIncidentStore::new();
        let incident = pending_incident();
        let id = incident.id;
        store.insert(incident).await.unwrap();

        let hospital = Uuid::new_v4();
        let assigned = store
            .apply(id, IncidentChange::AssignHospital(hospital))
            .await
            .unwrap();
        assert_eq!(assigned.status, IncidentStatus::Assigned);
        assert_eq!(assigned.hospital_id, Some(hospital));

        // Once in progress, reassignment moves the hospital but not the
        // status backwards.
        store
            .apply(id, status_update(IncidentStatus::InProgress))
            .await
            .unwrap();
        let other = Uuid::new_v4();
        let reassigned = store
            .apply(id, IncidentChange::AssignHospital(other))
            .await
            .unwrap();
        assert_eq!(reassigned.status, IncidentStatus::InProgress);
        assert_eq!(reassigned.hospital_id, Some(other));
    }

    #[tokio::test]
    async fn assignment_is_idempotent() {
        let store = MemoryIncidentStore::new();
        let incident = pending_incident();
        let id = incident.id;
        store.insert(incident).await.unwrap();

        let hospital = Uuid::new_v4();
        let first = store
            .apply(id, IncidentChange::AssignHospital(hospital))
            .await
            .unwrap();
        let second = store
            .apply(id, IncidentChange::AssignHospital(hospital))
            .await
            .unwrap();
        assert_eq!(first.status, second.status);
        assert_eq!(first.hospital_id, second.hospital_id);
    }

    #[tokio::test]
    async fn list_active_excludes_terminal_and_sorts_newest_first() {
        let store = MemoryIncidentStore::new();

        let mut older = pending_incident();
        older.created_at = Utc::now() - chrono::Duration::minutes(10);
        let older_id = older.id;
        let newer = pending_incident();
        let newer_id = newer.id;
        let done = pending_incident();
        let done_id = done.id;

        for incident in [older, newer, done] {
            store.insert(incident).await.unwrap();
        }
        store
            .apply(done_id, status_update(IncidentStatus::Cancelled))
            .await
            .unwrap();

        let active = store.list_active().await.unwrap();
        let ids: Vec<Uuid> = active.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![newer_id, older_id]);
    }

    #[tokio::test]
    async fn concurrent_transitions_on_one_incident_serialize() {
        use std::sync::Arc;

        let store = Arc::new(MemoryIncidentStore::new());
        let incident = pending_incident();
        let id = incident.id;
        store.insert(incident).await.unwrap();

        // Race many cancel attempts against forward transitions; every
        // apply validates against the state it reads under the entry lock,
        // so exactly one terminal transition can win and nothing lands
        // after it.
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let change = if i % 2 == 0 {
                    IncidentStatus::Cancelled
                } else {
                    IncidentStatus::InProgress
                };
                store
                    .apply(
                        id,
                        IncidentChange::Update(IncidentUpdate {
                            status: Some(change),
                            ..Default::default()
                        }),
                    )
                    .await
            }));
        }

        let results = futures::future::join_all(handles).await;
        let cancels = results
            .iter()
            .filter(|r| {
                matches!(
                    r.as_ref().unwrap(),
                    Ok(i) if i.status == IncidentStatus::Cancelled
                )
            })
            .count();
        assert_eq!(cancels, 1, "exactly one cancel transition can succeed");

        let stored = store.get(id).await.unwrap().unwrap();
        assert_eq!(stored.status, IncidentStatus::Cancelled);
    }
}
