//! Repository for dispatch requests
//!
//! Requests move Pending -> Processing -> {Completed, Cancelled}, or
//! Pending -> Cancelled directly. Transitions are one-way; Completed and
//! Cancelled are terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

/// Request status enum matching database request_status
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "request_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

/// Dispatch request row
#[derive(Debug, Clone, FromRow)]
pub struct DispatchRequest {
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
    pub attachment_1: Option<String>,
    pub attachment_2: Option<String>,
    pub attachment_3: Option<String>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub status_changed_by: Option<i64>,
    pub status_changed_at: Option<DateTime<Utc>>,
}

/// Fields for inserting a new Pending request
#[derive(Debug, Clone)]
pub struct NewDispatchRequest {
    pub station_id: i64,
    pub customer_id: i64,
    pub product_id: i64,
    pub sub_product_id: Option<i64>,
    pub requested_qty_centi: i64,
    pub price_minor: Option<i64>,
    pub remarks: Option<String>,
    pub attachment_1: Option<String>,
    pub attachment_2: Option<String>,
    pub attachment_3: Option<String>,
    pub created_by: i64,
}

/// Errors that can occur during request repository operations
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Dispatch request not found: {0}")]
    NotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

const REQUEST_COLUMNS: &str = r#"
        id,
        request_code,
        station_id,
        customer_id,
        product_id,
        sub_product_id,
        requested_qty_centi,
        actual_qty_centi,
        status,
        price_minor,
        total_amount_minor,
        remarks,
        attachment_1,
        attachment_2,
        attachment_3,
        created_by,
        created_at,
        status_changed_by,
        status_changed_at
"#;

/// Draw the next human-readable request code from the backing sequence
pub async fn next_request_code(
    tx: &mut Transaction<'_, Postgres>,
) -> Result<String, RequestError> {
    let n = sqlx::query_scalar::<_, i64>("SELECT nextval('request_code_seq')")
        .fetch_one(&mut **tx)
        .await?;

    Ok(format!("MP{:06}", n))
}

/// Insert a new Pending request and return its id
pub async fn insert_request(
    tx: &mut Transaction<'_, Postgres>,
    request_id: Uuid,
    request_code: &str,
    req: &NewDispatchRequest,
) -> Result<Uuid, RequestError> {
    sqlx::query(
        r#"
        INSERT INTO dispatch_requests
            (id, request_code, station_id, customer_id, product_id, sub_product_id,
             requested_qty_centi, status, price_minor, remarks,
             attachment_1, attachment_2, attachment_3, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(request_id)
    .bind(request_code)
    .bind(req.station_id)
    .bind(req.customer_id)
    .bind(req.product_id)
    .bind(req.sub_product_id)
    .bind(req.requested_qty_centi)
    .bind(req.price_minor)
    .bind(&req.remarks)
    .bind(&req.attachment_1)
    .bind(&req.attachment_2)
    .bind(&req.attachment_3)
    .bind(req.created_by)
    .execute(&mut **tx)
    .await?;

    Ok(request_id)
}

/// Fetch a request by id
pub async fn find_by_id(
    pool: &PgPool,
    request_id: Uuid,
) -> Result<Option<DispatchRequest>, RequestError> {
    let request = sqlx::query_as::<_, DispatchRequest>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM dispatch_requests WHERE id = $1"
    ))
    .bind(request_id)
    .fetch_optional(pool)
    .await?;

    Ok(request)
}

/// Lock a request row for the duration of a transition transaction
pub async fn lock_by_id_tx(
    tx: &mut Transaction<'_, Postgres>,
    request_id: Uuid,
) -> Result<DispatchRequest, RequestError> {
    let request = sqlx::query_as::<_, DispatchRequest>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM dispatch_requests WHERE id = $1 FOR UPDATE"
    ))
    .bind(request_id)
    .fetch_optional(&mut **tx)
    .await?;

    request.ok_or(RequestError::NotFound(request_id))
}

/// List requests, newest first, optionally filtered by station and status
pub async fn list(
    pool: &PgPool,
    station_id: Option<i64>,
    status: Option<RequestStatus>,
    limit: i64,
) -> Result<Vec<DispatchRequest>, RequestError> {
    let requests = sqlx::query_as::<_, DispatchRequest>(&format!(
        r#"
        SELECT {REQUEST_COLUMNS}
        FROM dispatch_requests
        WHERE ($1::BIGINT IS NULL OR station_id = $1)
          AND ($2::request_status IS NULL OR status = $2)
        ORDER BY created_at DESC
        LIMIT $3
        "#
    ))
    .bind(station_id)
    .bind(status)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(requests)
}

/// Transition a locked request to Processing
pub async fn tx_mark_processing(
    tx: &mut Transaction<'_, Postgres>,
    request_id: Uuid,
    actor_id: i64,
    sub_product_id: Option<i64>,
    remarks: Option<&str>,
    attachments: [Option<&str>; 3],
) -> Result<(), RequestError> {
    let result = sqlx::query(
        r#"
        UPDATE dispatch_requests
        SET status = 'processing',
            sub_product_id = COALESCE($3, sub_product_id),
            remarks = COALESCE($4, remarks),
            attachment_1 = COALESCE($5, attachment_1),
            attachment_2 = COALESCE($6, attachment_2),
            attachment_3 = COALESCE($7, attachment_3),
            status_changed_by = $2,
            status_changed_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(request_id)
    .bind(actor_id)
    .bind(sub_product_id)
    .bind(remarks)
    .bind(attachments[0])
    .bind(attachments[1])
    .bind(attachments[2])
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound(request_id));
    }

    Ok(())
}

/// Transition a locked request to Cancelled (manual path)
pub async fn tx_mark_cancelled(
    tx: &mut Transaction<'_, Postgres>,
    request_id: Uuid,
    actor_id: i64,
    remarks: Option<&str>,
    attachments: [Option<&str>; 3],
) -> Result<(), RequestError> {
    let result = sqlx::query(
        r#"
        UPDATE dispatch_requests
        SET status = 'cancelled',
            remarks = COALESCE($3, remarks),
            attachment_1 = COALESCE($4, attachment_1),
            attachment_2 = COALESCE($5, attachment_2),
            attachment_3 = COALESCE($6, attachment_3),
            status_changed_by = $2,
            status_changed_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(request_id)
    .bind(actor_id)
    .bind(remarks)
    .bind(attachments[0])
    .bind(attachments[1])
    .bind(attachments[2])
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound(request_id));
    }

    Ok(())
}

/// Transition a locked request to Completed with its final financials
pub async fn tx_mark_completed(
    tx: &mut Transaction<'_, Postgres>,
    request_id: Uuid,
    actor_id: i64,
    actual_qty_centi: i64,
    price_minor: i64,
    total_amount_minor: i64,
    remarks: Option<&str>,
) -> Result<(), RequestError> {
    let result = sqlx::query(
        r#"
        UPDATE dispatch_requests
        SET status = 'completed',
            actual_qty_centi = $3,
            price_minor = $4,
            total_amount_minor = $5,
            remarks = COALESCE($6, remarks),
            status_changed_by = $2,
            status_changed_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(request_id)
    .bind(actor_id)
    .bind(actual_qty_centi)
    .bind(price_minor)
    .bind(total_amount_minor)
    .bind(remarks)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RequestError::NotFound(request_id));
    }

    Ok(())
}

/// Cancel every request still Pending past the staleness cutoff
///
/// Idempotent: already-cancelled rows no longer match the predicate, so
/// re-running the sweep has no additional effect.
pub async fn cancel_stale(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> Result<u64, RequestError> {
    let result = sqlx::query(
        r#"
        UPDATE dispatch_requests
        SET status = 'cancelled',
            remarks = 'Auto-cancelled: pending past the staleness window',
            status_changed_at = NOW()
        WHERE status = 'pending'
          AND created_at < $1
        "#,
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
