//! Repository for station stock levels
//!
//! One row per (station, product). Levels are mutated only by dispatch
//! completions (decrement) and inward stock movements (increment), always
//! inside the same transaction that appends the matching ledger entry.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use thiserror::Error;

/// Current stock on hand for a (station, product) pair
#[derive(Debug, Clone, FromRow)]
pub struct StockLevel {
    pub station_id: i64,
    pub product_id: i64,
    pub qty_centi: i64,
    pub updated_at: DateTime<Utc>,
}

/// Errors that can occur during stock repository operations
#[derive(Debug, Error)]
pub enum StockError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Find the stock level for a pair
/// Returns None if no movement has ever touched the pair
pub async fn find_level(
    pool: &PgPool,
    station_id: i64,
    product_id: i64,
) -> Result<Option<StockLevel>, StockError> {
    let level = sqlx::query_as::<_, StockLevel>(
        r#"
        SELECT station_id, product_id, qty_centi, updated_at
        FROM stock_levels
        WHERE station_id = $1 AND product_id = $2
        "#,
    )
    .bind(station_id)
    .bind(product_id)
    .fetch_optional(pool)
    .await?;

    Ok(level)
}

/// Lock the stock row for a pair for the duration of the transaction
///
/// Completions and inward movements read through this lock so two
/// concurrent writers cannot both compute from the same before-snapshot.
pub async fn lock_level_tx(
    tx: &mut Transaction<'_, Postgres>,
    station_id: i64,
    product_id: i64,
) -> Result<Option<StockLevel>, StockError> {
    let level = sqlx::query_as::<_, StockLevel>(
        r#"
        SELECT station_id, product_id, qty_centi, updated_at
        FROM stock_levels
        WHERE station_id = $1 AND product_id = $2
        FOR UPDATE
        "#,
    )
    .bind(station_id)
    .bind(product_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(level)
}

/// Set the stock level for a pair, creating the row if absent
pub async fn tx_upsert_level(
    tx: &mut Transaction<'_, Postgres>,
    station_id: i64,
    product_id: i64,
    qty_centi: i64,
) -> Result<(), StockError> {
    sqlx::query(
        r#"
        INSERT INTO stock_levels (station_id, product_id, qty_centi, updated_at)
        VALUES ($1, $2, $3, NOW())
        ON CONFLICT (station_id, product_id)
        DO UPDATE SET
            qty_centi = EXCLUDED.qty_centi,
            updated_at = NOW()
        "#,
    )
    .bind(station_id)
    .bind(product_id)
    .bind(qty_centi)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// List all known stock pairs (for reconciliation sweeps)
pub async fn list_levels(pool: &PgPool) -> Result<Vec<StockLevel>, StockError> {
    let levels = sqlx::query_as::<_, StockLevel>(
        r#"
        SELECT station_id, product_id, qty_centi, updated_at
        FROM stock_levels
        ORDER BY station_id, product_id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(levels)
}
