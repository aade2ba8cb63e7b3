//! Stock API routes: levels, movement history, inward movements

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::contracts::StockInwardRequestV1;
use crate::repos::ledger_repo::{self, StockHistoryEntry, TransType};
use crate::repos::stock_repo;
use crate::routes::ApiError;
use crate::services::stock_service::{self, StockMovementError};

/// Query parameters for stock level and history endpoints
#[derive(Debug, Deserialize)]
pub struct StockQuery {
    pub station_id: i64,
    pub product_id: i64,
    pub limit: Option<i64>,
}

/// Stock level response shape
#[derive(Debug, Serialize)]
pub struct StockLevelResponse {
    pub station_id: i64,
    pub product_id: i64,
    pub qty_centi: i64,
}

/// Stock movement history row
#[derive(Debug, Serialize)]
pub struct StockHistoryResponse {
    pub id: Uuid,
    pub station_id: i64,
    pub product_id: i64,
    pub sub_product_id: Option<i64>,
    pub trans_type: TransType,
    pub delta_qty_centi: i64,
    pub stock_before_centi: i64,
    pub stock_after_centi: i64,
    pub amount_minor: i64,
    pub actor_id: i64,
    pub request_id: Option<Uuid>,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

impl From<StockHistoryEntry> for StockHistoryResponse {
    fn from(e: StockHistoryEntry) -> Self {
        StockHistoryResponse {
            id: e.id,
            station_id: e.station_id,
            product_id: e.product_id,
            sub_product_id: e.sub_product_id,
            trans_type: e.trans_type,
            delta_qty_centi: e.delta_qty_centi,
            stock_before_centi: e.stock_before_centi,
            stock_after_centi: e.stock_after_centi,
            amount_minor: e.amount_minor,
            actor_id: e.actor_id,
            request_id: e.request_id,
            recorded_at: e.recorded_at,
        }
    }
}

/// Inward movement response shape
#[derive(Debug, Serialize)]
pub struct InwardResponse {
    pub station_id: i64,
    pub product_id: i64,
    pub stock_before_centi: i64,
    pub stock_after_centi: i64,
    pub entry_id: Uuid,
}

/// Handler for GET /api/stock
pub async fn get_stock_level(
    State(pool): State<Arc<PgPool>>,
    Query(params): Query<StockQuery>,
) -> Result<Json<StockLevelResponse>, ApiError> {
    let level = stock_repo::find_level(&pool, params.station_id, params.product_id)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to fetch stock level: {}", e)))?;

    Ok(Json(StockLevelResponse {
        station_id: params.station_id,
        product_id: params.product_id,
        qty_centi: level.map(|l| l.qty_centi).unwrap_or(0),
    }))
}

/// Handler for GET /api/stock/history
pub async fn get_stock_history(
    State(pool): State<Arc<PgPool>>,
    Query(params): Query<StockQuery>,
) -> Result<Json<Vec<StockHistoryResponse>>, ApiError> {
    let limit = params.limit.unwrap_or(100).clamp(1, 1000);

    let entries = ledger_repo::find_stock_history(&pool, params.station_id, params.product_id, limit)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to fetch stock history: {}", e)))?;

    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

/// Handler for POST /api/stock/inward
pub async fn record_inward(
    State(pool): State<Arc<PgPool>>,
    Json(payload): Json<StockInwardRequestV1>,
) -> Result<(StatusCode, Json<InwardResponse>), ApiError> {
    let receipt = stock_service::record_inward(&pool, &payload)
        .await
        .map_err(map_stock_error)?;

    Ok((
        StatusCode::CREATED,
        Json(InwardResponse {
            station_id: receipt.station_id,
            product_id: receipt.product_id,
            stock_before_centi: receipt.stock_before_centi,
            stock_after_centi: receipt.stock_after_centi,
            entry_id: receipt.entry_id,
        }),
    ))
}

fn map_stock_error(err: StockMovementError) -> ApiError {
    match err {
        StockMovementError::Validation(e) => ApiError::unprocessable(e.to_string()),
        other => ApiError::internal(format!("Stock movement failed: {}", other)),
    }
}
