//! Dispatch completion API route

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::contracts::CompleteRequestV1;
use crate::repos::balance_repo::BalanceError;
use crate::repos::request_repo::RequestError;
use crate::routes::ApiError;
use crate::services::completion_service::{self, CompletionError, CompletionOutcome};

/// Completion response shape
///
/// `funded=false` is an expected business outcome and still a 200: the
/// caller distinguishes it by the flag and reason, not the status code.
#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub funded: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_minor: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount_minor: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_qty_centi: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_before_centi: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_after_centi: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub running_balance_minor: Option<i64>,
}

/// Handler for POST /api/dispatch/requests/{request_id}/complete
pub async fn complete_request(
    State(pool): State<Arc<PgPool>>,
    Path(request_id): Path<Uuid>,
    Json(payload): Json<CompleteRequestV1>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let outcome = completion_service::complete_request(&pool, request_id, &payload)
        .await
        .map_err(map_completion_error)?;

    let response = match outcome {
        CompletionOutcome::Completed(receipt) => CompletionResponse {
            funded: true,
            reason_code: None,
            reason: None,
            request_code: Some(receipt.request_code),
            price_minor: Some(receipt.price_minor),
            total_amount_minor: Some(receipt.total_amount_minor),
            actual_qty_centi: Some(receipt.actual_qty_centi),
            stock_before_centi: Some(receipt.stock_before_centi),
            stock_after_centi: Some(receipt.stock_after_centi),
            running_balance_minor: Some(receipt.updated_balance.running_balance_minor),
        },
        CompletionOutcome::NotFunded { reason } => CompletionResponse {
            funded: false,
            reason_code: Some(reason.code()),
            reason: Some(reason.to_string()),
            request_code: None,
            price_minor: None,
            total_amount_minor: None,
            actual_qty_centi: None,
            stock_before_centi: None,
            stock_after_centi: None,
            running_balance_minor: None,
        },
    };

    Ok(Json(response))
}

fn map_completion_error(err: CompletionError) -> ApiError {
    match err {
        CompletionError::Validation(e) => ApiError::unprocessable(e.to_string()),
        CompletionError::Request(RequestError::NotFound(id)) => {
            ApiError::not_found(format!("Dispatch request not found: {}", id))
        }
        CompletionError::Balance(BalanceError::NotFound(customer_id)) => {
            ApiError::unprocessable(format!("No balance record for customer {}", customer_id))
        }
        CompletionError::WrongState { .. } => ApiError::conflict(err.to_string()),
        other => ApiError::internal(format!("Completion failed: {}", other)),
    }
}
