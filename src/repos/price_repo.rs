//! Repository for deal price lookups
//!
//! Price entries are read-only from this module's perspective; pricing
//! administration owns their lifecycle. A tier is queried by exact
//! NULL-or-equal match on sub_product_id and customer_id: NULL in a column
//! means the entry carries no restriction on that axis.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

/// Deal price entry
#[derive(Debug, Clone, FromRow)]
pub struct PriceEntry {
    pub id: Uuid,
    pub station_id: i64,
    pub product_id: i64,
    pub sub_product_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub price_minor: i64,
    pub is_active: bool,
    pub updated_date: DateTime<Utc>,
}

/// Errors that can occur during price repository operations
#[derive(Debug, Error)]
pub enum PriceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Find the authoritative active price for one lookup tier
///
/// At most one active entry should exist per tier; when several do, the
/// most recently updated wins.
pub async fn find_tier_price_tx(
    tx: &mut Transaction<'_, Postgres>,
    station_id: i64,
    product_id: i64,
    sub_product_id: Option<i64>,
    customer_id: Option<i64>,
) -> Result<Option<PriceEntry>, PriceError> {
    let entry = sqlx::query_as::<_, PriceEntry>(
        r#"
        SELECT
            id,
            station_id,
            product_id,
            sub_product_id,
            customer_id,
            price_minor,
            is_active,
            updated_date
        FROM price_entries
        WHERE station_id = $1
          AND product_id = $2
          AND (($3::BIGINT IS NULL AND sub_product_id IS NULL) OR sub_product_id = $3)
          AND (($4::BIGINT IS NULL AND customer_id IS NULL) OR customer_id = $4)
          AND is_active = TRUE
        ORDER BY updated_date DESC
        LIMIT 1
        "#,
    )
    .bind(station_id)
    .bind(product_id)
    .bind(sub_product_id)
    .bind(customer_id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(entry)
}
