//! Customer balance API routes

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;

use crate::repos::balance_repo::{self, BillingMode};
use crate::routes::ApiError;
use crate::services::balance_policy;

/// Customer balance snapshot response shape
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub customer_id: i64,
    pub billing_mode: BillingMode,
    pub credit_limit_minor: i64,
    pub credit_used_minor: i64,
    /// Remaining credit as displayed: floored at zero
    pub available_minor: i64,
    pub running_balance_minor: i64,
    pub day_limit_days: i32,
    pub day_amount_used_minor: i64,
    pub day_limit_expiry: Option<chrono::DateTime<chrono::Utc>>,
    pub is_active: bool,
}

/// Handler for GET /api/customers/{customer_id}/balance
pub async fn get_customer_balance(
    State(pool): State<Arc<PgPool>>,
    Path(customer_id): Path<i64>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let record = balance_repo::find_by_customer(&pool, customer_id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to fetch balance: {}", e)))?
        .ok_or_else(|| {
            ApiError::not_found(format!("No balance record for customer {}", customer_id))
        })?;

    let available_minor = balance_policy::displayed_available_minor(&record);

    Ok(Json(BalanceResponse {
        customer_id: record.customer_id,
        billing_mode: record.billing_mode,
        credit_limit_minor: record.credit_limit_minor,
        credit_used_minor: record.credit_used_minor,
        available_minor,
        running_balance_minor: record.running_balance_minor,
        day_limit_days: record.day_limit_days,
        day_amount_used_minor: record.day_amount_used_minor,
        day_limit_expiry: record.day_limit_expiry,
        is_active: record.is_active,
    }))
}
