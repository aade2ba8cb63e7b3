//! Request intake
//!
//! Creates a Pending dispatch request with a sequence-backed MP###### code.
//! Intake carries no financial effect; funds are only touched at completion.

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::contracts::IntakeRequestV1;
use crate::repos::request_repo::{self, DispatchRequest, NewDispatchRequest, RequestError};
use crate::validation::{self, ValidationError};

/// Errors that can occur during request intake
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Create a new Pending dispatch request
pub async fn create_request(
    pool: &PgPool,
    payload: &IntakeRequestV1,
) -> Result<DispatchRequest, IntakeError> {
    validation::validate_intake(payload)?;

    let mut tx = pool.begin().await?;

    let request_code = request_repo::next_request_code(&mut tx).await?;
    let request_id = Uuid::new_v4();

    request_repo::insert_request(
        &mut tx,
        request_id,
        &request_code,
        &NewDispatchRequest {
            station_id: payload.station_id,
            customer_id: payload.customer_id,
            product_id: payload.product_id,
            sub_product_id: payload.sub_product_id,
            requested_qty_centi: (payload.quantity * 100.0).round() as i64,
            price_minor: payload.price.map(|p| (p * 100.0).round() as i64),
            remarks: payload.remarks.clone(),
            attachment_1: payload.attachment_1.clone(),
            attachment_2: payload.attachment_2.clone(),
            attachment_3: payload.attachment_3.clone(),
            created_by: payload.actor_id,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        request_id = %request_id,
        request_code = %request_code,
        station_id = payload.station_id,
        customer_id = payload.customer_id,
        "Dispatch request created"
    );

    let request = request_repo::find_by_id(pool, request_id)
        .await?
        .ok_or(RequestError::NotFound(request_id))?;

    Ok(request)
}
