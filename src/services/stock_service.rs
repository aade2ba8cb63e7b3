//! Inward stock movements
//!
//! The increment counterpart of completion's decrement. Uses the same
//! lock-update-append unit so the replay invariant holds across both
//! movement directions.

use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::contracts::StockInwardRequestV1;
use crate::repos::ledger_repo::{self, LedgerError, StockEntryInsert, TransType};
use crate::repos::stock_repo::{self, StockError};
use crate::validation::{self, ValidationError};

/// Errors that can occur while recording a stock movement
#[derive(Debug, Error)]
pub enum StockMovementError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Stock(#[from] StockError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// What an inward movement wrote
#[derive(Debug, Clone)]
pub struct InwardReceipt {
    pub station_id: i64,
    pub product_id: i64,
    pub stock_before_centi: i64,
    pub stock_after_centi: i64,
    pub entry_id: Uuid,
}

/// Record an inbound stock movement for a (station, product) pair
pub async fn record_inward(
    pool: &PgPool,
    payload: &StockInwardRequestV1,
) -> Result<InwardReceipt, StockMovementError> {
    validation::validate_inward(payload)?;

    let qty_centi = (payload.quantity * 100.0).round() as i64;
    let amount_minor = payload
        .amount
        .map(|a| (a * 100.0).round() as i64)
        .unwrap_or(0);

    let mut tx = pool.begin().await?;

    let stock_before_centi = stock_repo::lock_level_tx(&mut tx, payload.station_id, payload.product_id)
        .await?
        .map(|level| level.qty_centi)
        .unwrap_or(0);

    let stock_after_centi = stock_before_centi + qty_centi;

    stock_repo::tx_upsert_level(&mut tx, payload.station_id, payload.product_id, stock_after_centi)
        .await?;

    let entry_id = ledger_repo::tx_append_stock_entry(
        &mut tx,
        &StockEntryInsert {
            station_id: payload.station_id,
            product_id: payload.product_id,
            sub_product_id: payload.sub_product_id,
            trans_type: TransType::Inward,
            delta_qty_centi: qty_centi,
            stock_before_centi,
            stock_after_centi,
            amount_minor,
            actor_id: payload.actor_id,
            request_id: None,
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        station_id = payload.station_id,
        product_id = payload.product_id,
        qty_centi,
        stock_before_centi,
        stock_after_centi,
        "Inward stock movement recorded"
    );

    Ok(InwardReceipt {
        station_id: payload.station_id,
        product_id: payload.product_id,
        stock_before_centi,
        stock_after_centi,
        entry_id,
    })
}
