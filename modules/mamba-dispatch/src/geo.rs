use serde::Serialize;

use mamba_common::{haversine_km, GeoPoint, Hospital, MambaError};

use crate::directory::HospitalDirectory;

const NEARBY_LIMIT: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct HospitalDistance {
    #[serde(flatten)]
    pub hospital: Hospital,
    pub distance_km: f64,
}

/// Resolve the nearest eligible hospital to a point.
///
/// Eligibility is verified ∧ emergency-capable; distance is great-circle;
/// ties resolve to the lowest hospital id so resolution is deterministic.
/// `None` means no eligible hospital exists — a valid outcome the caller
/// handles by leaving the incident unassigned.
pub async fn resolve_nearest(
    directory: &dyn HospitalDirectory,
    point: GeoPoint,
) -> Result<Option<Hospital>, MambaError> {
    if !point.is_valid() {
        return Err(MambaError::InvalidCoordinates {
            lat: point.lat,
            lng: point.lng,
        });
    }

    let hospitals = directory.list().await?;
    let mut best: Option<(f64, Hospital)> = None;

    for hospital in hospitals.into_iter().filter(Hospital::is_eligible) {
        let distance = haversine_km(point, hospital.coordinates);
        let closer = match &best {
            None => true,
            Some((best_distance, best_hospital)) => {
                distance < *best_distance
                    || (distance == *best_distance && hospital.id < best_hospital.id)
            }
        };
        if closer {
            best = Some((distance, hospital));
        }
    }

    Ok(best.map(|(_, hospital)| hospital))
}

/// Verified hospitals within `radius_km` of a point, nearest first,
/// capped at twenty results.
pub async fn nearby(
    directory: &dyn HospitalDirectory,
    point: GeoPoint,
    radius_km: f64,
) -> Result<Vec<HospitalDistance>, MambaError> {
    if !point.is_valid() {
        return Err(MambaError::InvalidCoordinates {
            lat: point.lat,
            lng: point.lng,
        });
    }

    let mut results: Vec<HospitalDistance> = directory
        .list()
        .await?
        .into_iter()
        .filter(|h| h.verified_status == mamba_common::VerificationStatus::Verified)
        .map(|hospital| HospitalDistance {
            distance_km: haversine_km(point, hospital.coordinates),
            hospital,
        })
        .filter(|h| h.distance_km <= radius_km)
        .collect();

    results.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    results.truncate(NEARBY_LIMIT);
    Ok(results)
}
