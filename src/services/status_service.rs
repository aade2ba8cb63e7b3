//! Non-financial status transitions
//!
//! Pending -> Processing, manual cancellation, and the stale-pending sweep.
//! None of these touch stock or balances; funds are never reserved before
//! completion.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::contracts::{CancelRequestV1, ProcessingRequestV1};
use crate::repos::request_repo::{self, DispatchRequest, RequestError, RequestStatus};
use crate::validation::{self, ValidationError};

/// Requests still Pending after this many hours are swept to Cancelled
pub const STALE_AFTER_HOURS: i64 = 72;

/// Errors that can occur during status transitions
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Request {request_id} is {status:?}; cannot transition to {target:?}")]
    WrongState {
        request_id: Uuid,
        status: RequestStatus,
        target: RequestStatus,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Transition a Pending request to Processing
pub async fn mark_processing(
    pool: &PgPool,
    request_id: Uuid,
    payload: &ProcessingRequestV1,
) -> Result<DispatchRequest, StatusError> {
    validation::validate_processing(payload)?;

    let mut tx = pool.begin().await?;

    let request = request_repo::lock_by_id_tx(&mut tx, request_id).await?;
    if request.status != RequestStatus::Pending {
        return Err(StatusError::WrongState {
            request_id,
            status: request.status,
            target: RequestStatus::Processing,
        });
    }

    request_repo::tx_mark_processing(
        &mut tx,
        request_id,
        payload.actor_id,
        payload.sub_product_id,
        payload.remarks.as_deref(),
        [
            payload.attachment_1.as_deref(),
            payload.attachment_2.as_deref(),
            payload.attachment_3.as_deref(),
        ],
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        request_id = %request_id,
        actor_id = payload.actor_id,
        "Dispatch request marked processing"
    );

    let request = request_repo::find_by_id(pool, request_id)
        .await?
        .ok_or(RequestError::NotFound(request_id))?;

    Ok(request)
}

/// Manually cancel a Pending or Processing request
pub async fn cancel(
    pool: &PgPool,
    request_id: Uuid,
    payload: &CancelRequestV1,
) -> Result<DispatchRequest, StatusError> {
    validation::validate_cancel(payload)?;

    let mut tx = pool.begin().await?;

    let request = request_repo::lock_by_id_tx(&mut tx, request_id).await?;
    if !matches!(
        request.status,
        RequestStatus::Pending | RequestStatus::Processing
    ) {
        return Err(StatusError::WrongState {
            request_id,
            status: request.status,
            target: RequestStatus::Cancelled,
        });
    }

    request_repo::tx_mark_cancelled(
        &mut tx,
        request_id,
        payload.actor_id,
        payload.remarks.as_deref(),
        [
            payload.attachment_1.as_deref(),
            payload.attachment_2.as_deref(),
            payload.attachment_3.as_deref(),
        ],
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        request_id = %request_id,
        actor_id = payload.actor_id,
        "Dispatch request cancelled"
    );

    let request = request_repo::find_by_id(pool, request_id)
        .await?
        .ok_or(RequestError::NotFound(request_id))?;

    Ok(request)
}

/// Sweep requests still Pending past the staleness window to Cancelled
///
/// Runs cooperatively on each list read rather than on a timer. Idempotent:
/// already-swept rows no longer match, so re-running changes nothing. The
/// sweep records no human actor; status_changed_by stays NULL.
pub async fn sweep_stale(pool: &PgPool) -> Result<u64, StatusError> {
    let cutoff = Utc::now() - Duration::hours(STALE_AFTER_HOURS);

    let swept = request_repo::cancel_stale(pool, cutoff).await?;

    if swept > 0 {
        tracing::info!(swept, "Auto-cancelled stale pending requests");
    }

    Ok(swept)
}
