//! Append-only ledgers: stock movements and balance history
//!
//! Entries are never updated or deleted. For any (station, product),
//! replaying stock entries in recorded order must reproduce the current
//! stock level exactly; the sign check at append time keeps that invariant
//! enforceable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::repos::balance_repo::BillingMode;

/// Movement direction enum matching database trans_type
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "trans_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TransType {
    Inward,
    Outward,
}

/// Stock movement ledger entry
#[derive(Debug, Clone, FromRow)]
pub struct StockHistoryEntry {
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
    pub recorded_at: DateTime<Utc>,
}

/// Fields for appending a stock movement entry
#[derive(Debug, Clone)]
pub struct StockEntryInsert {
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
}

/// Fields for appending a balance history entry
#[derive(Debug, Clone)]
pub struct BalanceEntryInsert {
    pub customer_id: i64,
    pub billing_mode: BillingMode,
    pub amount_minor: i64,
    pub balance_before_minor: i64,
    pub balance_after_minor: i64,
    pub actor_id: i64,
    pub request_id: Option<Uuid>,
}

/// Errors that can occur during ledger repository operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Delta sign disagrees with movement type: {trans_type:?} with delta {delta_qty_centi}")]
    SignMismatch {
        trans_type: TransType,
        delta_qty_centi: i64,
    },

    #[error("Snapshot mismatch: {stock_before_centi} + {delta_qty_centi} != {stock_after_centi}")]
    SnapshotMismatch {
        stock_before_centi: i64,
        delta_qty_centi: i64,
        stock_after_centi: i64,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Validate the sign convention and before/after arithmetic of an entry
///
/// Inward entries carry a positive delta, outward a negative one, and the
/// snapshots must chain: stock_before + delta = stock_after.
pub fn check_entry(entry: &StockEntryInsert) -> Result<(), LedgerError> {
    let sign_ok = match entry.trans_type {
        TransType::Inward => entry.delta_qty_centi > 0,
        TransType::Outward => entry.delta_qty_centi < 0,
    };
    if !sign_ok {
        return Err(LedgerError::SignMismatch {
            trans_type: entry.trans_type,
            delta_qty_centi: entry.delta_qty_centi,
        });
    }

    if entry.stock_before_centi + entry.delta_qty_centi != entry.stock_after_centi {
        return Err(LedgerError::SnapshotMismatch {
            stock_before_centi: entry.stock_before_centi,
            delta_qty_centi: entry.delta_qty_centi,
            stock_after_centi: entry.stock_after_centi,
        });
    }

    Ok(())
}

/// Append a stock movement entry and return its id
pub async fn tx_append_stock_entry(
    tx: &mut Transaction<'_, Postgres>,
    entry: &StockEntryInsert,
) -> Result<Uuid, LedgerError> {
    check_entry(entry)?;

    let entry_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO stock_history
            (id, station_id, product_id, sub_product_id, trans_type,
             delta_qty_centi, stock_before_centi, stock_after_centi,
             amount_minor, actor_id, request_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(entry_id)
    .bind(entry.station_id)
    .bind(entry.product_id)
    .bind(entry.sub_product_id)
    .bind(entry.trans_type)
    .bind(entry.delta_qty_centi)
    .bind(entry.stock_before_centi)
    .bind(entry.stock_after_centi)
    .bind(entry.amount_minor)
    .bind(entry.actor_id)
    .bind(entry.request_id)
    .execute(&mut **tx)
    .await?;

    Ok(entry_id)
}

/// Append a balance history entry and return its id
pub async fn tx_append_balance_entry(
    tx: &mut Transaction<'_, Postgres>,
    entry: &BalanceEntryInsert,
) -> Result<Uuid, LedgerError> {
    let entry_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO balance_history
            (id, customer_id, billing_mode, amount_minor,
             balance_before_minor, balance_after_minor, actor_id, request_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(entry_id)
    .bind(entry.customer_id)
    .bind(entry.billing_mode)
    .bind(entry.amount_minor)
    .bind(entry.balance_before_minor)
    .bind(entry.balance_after_minor)
    .bind(entry.actor_id)
    .bind(entry.request_id)
    .execute(&mut **tx)
    .await?;

    Ok(entry_id)
}

/// Fetch stock movement history for a pair in replay (recorded) order
pub async fn find_stock_history(
    pool: &PgPool,
    station_id: i64,
    product_id: i64,
    limit: i64,
) -> Result<Vec<StockHistoryEntry>, LedgerError> {
    let entries = sqlx::query_as::<_, StockHistoryEntry>(
        r#"
        SELECT
            id,
            station_id,
            product_id,
            sub_product_id,
            trans_type,
            delta_qty_centi,
            stock_before_centi,
            stock_after_centi,
            amount_minor,
            actor_id,
            request_id,
            recorded_at
        FROM stock_history
        WHERE station_id = $1 AND product_id = $2
        ORDER BY recorded_at, id
        LIMIT $3
        "#,
    )
    .bind(station_id)
    .bind(product_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Sum all movement deltas for a pair
///
/// With a zero opening level this must equal the current stock level.
pub async fn sum_deltas(
    pool: &PgPool,
    station_id: i64,
    product_id: i64,
) -> Result<i64, LedgerError> {
    let sum = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COALESCE(SUM(delta_qty_centi), 0)::BIGINT
        FROM stock_history
        WHERE station_id = $1 AND product_id = $2
        "#,
    )
    .bind(station_id)
    .bind(product_id)
    .fetch_one(pool)
    .await?;

    Ok(sum)
}

/// List all pairs that have ledger entries (for reconciliation sweeps)
pub async fn list_pairs(pool: &PgPool) -> Result<Vec<(i64, i64)>, LedgerError> {
    let pairs = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT DISTINCT station_id, product_id
        FROM stock_history
        ORDER BY station_id, product_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(pairs)
}
