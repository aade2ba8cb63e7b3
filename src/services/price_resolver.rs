//! Price resolution for dispatch completions
//!
//! Tries increasingly general lookup keys against the deal price table,
//! most specific first. A read error aborts resolution; the transaction
//! must never complete a dispatch on a silently defaulted price.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::repos::price_repo::{self, PriceError};

/// One lookup tier: which restrictions the price entry must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceKey {
    pub sub_product_id: Option<i64>,
    pub customer_id: Option<i64>,
}

/// Where the resolved price came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    /// Matched a deal entry at the given tier (1 = most specific)
    Tier { tier: u8, entry_id: Uuid },
    /// No tier matched; the caller-supplied fallback applies
    Fallback,
}

/// Resolution result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPrice {
    pub price_minor: i64,
    pub source: PriceSource,
}

/// Build the ordered tier keys for a lookup
///
/// A sub-product only participates when it is a valid positive identifier;
/// otherwise the two sub-product tiers are skipped entirely.
pub fn tier_keys(sub_product_id: Option<i64>, customer_id: i64) -> Vec<PriceKey> {
    let sub = sub_product_id.filter(|&id| id > 0);

    let mut keys = Vec::with_capacity(4);
    if let Some(sub_id) = sub {
        keys.push(PriceKey {
            sub_product_id: Some(sub_id),
            customer_id: Some(customer_id),
        });
        keys.push(PriceKey {
            sub_product_id: Some(sub_id),
            customer_id: None,
        });
    }
    keys.push(PriceKey {
        sub_product_id: None,
        customer_id: Some(customer_id),
    });
    keys.push(PriceKey {
        sub_product_id: None,
        customer_id: None,
    });

    keys
}

/// Resolve the applicable unit price for a dispatch
///
/// Walks the tiers in order and takes the first active match; each tier
/// prefers its most recently updated entry. Falls back to the supplied
/// price when no tier matches.
pub async fn resolve_price_tx(
    tx: &mut Transaction<'_, Postgres>,
    station_id: i64,
    product_id: i64,
    sub_product_id: Option<i64>,
    customer_id: i64,
    fallback_price_minor: i64,
) -> Result<ResolvedPrice, PriceError> {
    for (idx, key) in tier_keys(sub_product_id, customer_id).iter().enumerate() {
        let entry = price_repo::find_tier_price_tx(
            tx,
            station_id,
            product_id,
            key.sub_product_id,
            key.customer_id,
        )
        .await?;

        if let Some(entry) = entry {
            let tier = (idx + 1) as u8;
            tracing::debug!(
                station_id,
                product_id,
                customer_id,
                tier,
                entry_id = %entry.id,
                price_minor = entry.price_minor,
                "Resolved deal price"
            );
            return Ok(ResolvedPrice {
                price_minor: entry.price_minor,
                source: PriceSource::Tier {
                    tier,
                    entry_id: entry.id,
                },
            });
        }
    }

    tracing::debug!(
        station_id,
        product_id,
        customer_id,
        fallback_price_minor,
        "No deal price matched; using fallback"
    );

    Ok(ResolvedPrice {
        price_minor: fallback_price_minor,
        source: PriceSource::Fallback,
    })
}
