use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

use mamba_common::{
    GeoPoint, IncidentReport, IncidentUpdate, MambaError, NotificationKind, Priority, StockReport,
};

use crate::{ws, AppState};

pub fn build(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/api/incidents", post(create_incident))
        .route("/api/incidents/active", get(active_incidents))
        .route(
            "/api/incidents/{id}",
            get(get_incident).patch(update_incident),
        )
        .route("/api/incidents/{id}/assign-hospital", post(assign_hospital))
        .route("/api/hospitals/nearby", get(nearby_hospitals))
        .route("/api/hospitals/{id}/stock-alert", post(stock_alert))
        .route("/api/notifications/bulk", post(bulk_notifications))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
}

/// Map the dispatch error taxonomy to HTTP statuses. Only errors from the
/// incident's own data reach here; delivery failures are folded into
/// outcomes upstream.
fn error_response(err: MambaError) -> Response {
    let status = match &err {
        MambaError::InvalidCoordinates { .. }
        | MambaError::InvalidLocation(_)
        | MambaError::InvalidRecipient(_) => StatusCode::BAD_REQUEST,
        MambaError::IncidentNotFound(_) | MambaError::HospitalNotFound(_) => StatusCode::NOT_FOUND,
        MambaError::InvalidTransition { .. } => StatusCode::CONFLICT,
        other => {
            error!(error = %other, "Unhandled dispatch error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

async fn create_incident(
    State(state): State<Arc<AppState>>,
    Json(report): Json<IncidentReport>,
) -> Response {
    match state.dispatch.submit_incident(report).await {
        Ok(incident) => (StatusCode::CREATED, Json(incident)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn get_incident(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    match state.dispatch.get_incident(id).await {
        Ok(incident) => Json(incident).into_response(),
        Err(err) => error_response(err),
    }
}

async fn active_incidents(State(state): State<Arc<AppState>>) -> Response {
    match state.dispatch.list_active().await {
        Ok(incidents) => Json(incidents).into_response(),
        Err(err) => error_response(err),
    }
}

async fn update_incident(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(update): Json<IncidentUpdate>,
) -> Response {
    match state.dispatch.update_incident(id, update).await {
        Ok(incident) => Json(incident).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
struct AssignHospitalRequest {
    hospital_id: Uuid,
}

async fn assign_hospital(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<AssignHospitalRequest>,
) -> Response {
    match state.dispatch.assign_hospital(id, body.hospital_id).await {
        Ok(incident) => Json(incident).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
struct NearbyParams {
    lat: f64,
    lng: f64,
    radius: Option<f64>,
}

async fn nearby_hospitals(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearbyParams>,
) -> Response {
    let point = GeoPoint {
        lat: params.lat,
        lng: params.lng,
    };
    let radius = params.radius.unwrap_or(50.0);
    match mamba_dispatch::nearby(state.dispatch.directory().as_ref(), point, radius).await {
        Ok(hospitals) => Json(hospitals).into_response(),
        Err(err) => error_response(err),
    }
}

async fn stock_alert(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(stock): Json<StockReport>,
) -> Response {
    match state.dispatch.send_stock_alert(id, stock).await {
        Ok(outcomes) => Json(outcomes).into_response(),
        Err(err) => error_response(err),
    }
}

#[derive(Deserialize)]
struct BulkNotificationRequest {
    recipients: Vec<String>,
    message: String,
    #[serde(rename = "type")]
    kind: NotificationKind,
    priority: Option<Priority>,
}

async fn bulk_notifications(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BulkNotificationRequest>,
) -> Response {
    let summary = state
        .router
        .dispatch_batch(
            &body.recipients,
            &body.message,
            body.kind,
            body.priority.unwrap_or(Priority::Medium),
            None,
        )
        .await;
    Json(summary).into_response()
}
