//! Dispatch request API routes: intake, reads, non-financial transitions

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::contracts::{CancelRequestV1, IntakeRequestV1, ProcessingRequestV1};
use crate::repos::request_repo::{self, DispatchRequest, RequestError, RequestStatus};
use crate::routes::ApiError;
use crate::services::{intake_service, status_service};
use crate::services::intake_service::IntakeError;
use crate::services::status_service::StatusError;

/// Query parameters for the request list endpoint
#[derive(Debug, Deserialize)]
pub struct ListRequestsQuery {
    pub station_id: Option<i64>,
    pub status: Option<RequestStatus>,
    pub limit: Option<i64>,
}

/// Dispatch request response shape
#[derive(Debug, Serialize)]
pub struct RequestResponse {
    pub id: Uuid,
    pub request_code: String,
    pub station_id: i64,
    pub customer_id: i64,
    pub product_id: i64,
    pub sub_product_id: Option<i64>,
    pub requested_qty_centi: i64,
    pub actual_qty_centi: Option<i64>,
    pub status: RequestStatus,
    pub price_minor: Option<i64>,
    pub total_amount_minor: Option<i64>,
    pub remarks: Option<String>,
    pub created_by: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub status_changed_by: Option<i64>,
    pub status_changed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<DispatchRequest> for RequestResponse {
    fn from(r: DispatchRequest) -> Self {
        RequestResponse {
            id: r.id,
            request_code: r.request_code,
            station_id: r.station_id,
            customer_id: r.customer_id,
            product_id: r.product_id,
            sub_product_id: r.sub_product_id,
            requested_qty_centi: r.requested_qty_centi,
            actual_qty_centi: r.actual_qty_centi,
            status: r.status,
            price_minor: r.price_minor,
            total_amount_minor: r.total_amount_minor,
            remarks: r.remarks,
            created_by: r.created_by,
            created_at: r.created_at,
            status_changed_by: r.status_changed_by,
            status_changed_at: r.status_changed_at,
        }
    }
}

/// Handler for POST /api/dispatch/requests
pub async fn create_request(
    State(pool): State<Arc<PgPool>>,
    Json(payload): Json<IntakeRequestV1>,
) -> Result<(StatusCode, Json<RequestResponse>), ApiError> {
    let request = intake_service::create_request(&pool, &payload)
        .await
        .map_err(map_intake_error)?;

    Ok((StatusCode::CREATED, Json(request.into())))
}

/// Handler for GET /api/dispatch/requests
///
/// Runs the stale-pending sweep before querying; the sweep is cooperative,
/// triggered by read traffic rather than a timer.
pub async fn list_requests(
    State(pool): State<Arc<PgPool>>,
    Query(params): Query<ListRequestsQuery>,
) -> Result<Json<Vec<RequestResponse>>, ApiError> {
    status_service::sweep_stale(&pool)
        .await
        .map_err(map_status_error)?;

    let limit = params.limit.unwrap_or(100).clamp(1, 500);

    let requests = request_repo::list(&pool, params.station_id, params.status, limit)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to list requests: {}", e)))?;

    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

/// Handler for GET /api/dispatch/requests/{request_id}
pub async fn get_request(
    State(pool): State<Arc<PgPool>>,
    Path(request_id): Path<Uuid>,
) -> Result<Json<RequestResponse>, ApiError> {
    let request = request_repo::find_by_id(&pool, request_id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to fetch request: {}", e)))?
        .ok_or_else(|| ApiError::not_found(format!("Dispatch request not found: {}", request_id)))?;

    Ok(Json(request.into()))
}

/// Handler for POST /api/dispatch/requests/{request_id}/processing
pub async fn mark_processing(
    State(pool): State<Arc<PgPool>>,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<ProcessingRequestV1>,
) -> Result<Json<RequestResponse>, ApiError> {
    let request = status_service::mark_processing(&pool, request_id, &payload)
        .await
        .map_err(map_status_error)?;

    Ok(Json(request.into()))
}

/// Handler for POST /api/dispatch/requests/{request_id}/cancel
pub async fn cancel_request(
    State(pool): State<Arc<PgPool>>,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<CancelRequestV1>,
) -> Result<Json<RequestResponse>, ApiError> {
    let request = status_service::cancel(&pool, request_id, &payload)
        .await
        .map_err(map_status_error)?;

    Ok(Json(request.into()))
}

fn map_intake_error(err: IntakeError) -> ApiError {
    match err {
        IntakeError::Validation(e) => ApiError::unprocessable(e.to_string()),
        IntakeError::Request(RequestError::NotFound(id)) => {
            ApiError::not_found(format!("Dispatch request not found: {}", id))
        }
        other => ApiError::internal(format!("Intake failed: {}", other)),
    }
}

fn map_status_error(err: StatusError) -> ApiError {
    match err {
        StatusError::Validation(e) => ApiError::unprocessable(e.to_string()),
        StatusError::Request(RequestError::NotFound(id)) => {
            ApiError::not_found(format!("Dispatch request not found: {}", id))
        }
        StatusError::WrongState { .. } => ApiError::conflict(err.to_string()),
        other => ApiError::internal(format!("Transition failed: {}", other)),
    }
}
