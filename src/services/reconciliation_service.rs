//! Ledger reconciliation
//!
//! Verifies the replay invariant: for any (station, product), summing all
//! movement deltas from a zero opening level must reproduce the current
//! stock level exactly. Used by the `reconcile` admin binary and by audit
//! checks in tests.

use sqlx::PgPool;
use thiserror::Error;

use crate::repos::ledger_repo::{self, LedgerError, StockHistoryEntry};
use crate::repos::stock_repo::{self, StockError};

/// Errors that can occur during reconciliation
#[derive(Debug, Error)]
pub enum ReconciliationError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Stock(#[from] StockError),
}

/// Result of reconciling one (station, product) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub station_id: i64,
    pub product_id: i64,
    pub ledger_sum_centi: i64,
    pub level_centi: i64,
}

impl ReconciliationReport {
    pub fn consistent(&self) -> bool {
        self.ledger_sum_centi == self.level_centi
    }
}

/// Errors found while replaying an entry chain
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplayError {
    #[error("Entry {index}: stock_before {found} does not chain from running level {expected}")]
    BrokenChain {
        index: usize,
        expected: i64,
        found: i64,
    },

    #[error("Entry {index}: stock_before {stock_before} + delta {delta} != stock_after {stock_after}")]
    BadArithmetic {
        index: usize,
        stock_before: i64,
        delta: i64,
        stock_after: i64,
    },
}

/// Replay a chain of ledger entries from an opening level
///
/// Checks that each entry's before-snapshot matches the running level and
/// that its arithmetic is internally consistent; returns the final level.
pub fn replay_entries(
    opening_centi: i64,
    entries: &[StockHistoryEntry],
) -> Result<i64, ReplayError> {
    let mut running = opening_centi;

    for (index, entry) in entries.iter().enumerate() {
        if entry.stock_before_centi != running {
            return Err(ReplayError::BrokenChain {
                index,
                expected: running,
                found: entry.stock_before_centi,
            });
        }

        if entry.stock_before_centi + entry.delta_qty_centi != entry.stock_after_centi {
            return Err(ReplayError::BadArithmetic {
                index,
                stock_before: entry.stock_before_centi,
                delta: entry.delta_qty_centi,
                stock_after: entry.stock_after_centi,
            });
        }

        running = entry.stock_after_centi;
    }

    Ok(running)
}

/// Reconcile one (station, product) pair against its ledger
pub async fn reconcile_pair(
    pool: &PgPool,
    station_id: i64,
    product_id: i64,
) -> Result<ReconciliationReport, ReconciliationError> {
    let ledger_sum_centi = ledger_repo::sum_deltas(pool, station_id, product_id).await?;

    let level_centi = stock_repo::find_level(pool, station_id, product_id)
        .await?
        .map(|level| level.qty_centi)
        .unwrap_or(0);

    Ok(ReconciliationReport {
        station_id,
        product_id,
        ledger_sum_centi,
        level_centi,
    })
}

/// Reconcile every pair known to either the ledger or the stock table
///
/// A level row with no ledger entries is itself a mismatch worth surfacing,
/// so the pair set is the union of both sources.
pub async fn reconcile_all(
    pool: &PgPool,
) -> Result<Vec<ReconciliationReport>, ReconciliationError> {
    let mut pairs = ledger_repo::list_pairs(pool).await?;

    for level in stock_repo::list_levels(pool).await? {
        let pair = (level.station_id, level.product_id);
        if !pairs.contains(&pair) {
            pairs.push(pair);
        }
    }
    pairs.sort_unstable();

    let mut reports = Vec::with_capacity(pairs.len());
    for (station_id, product_id) in pairs {
        reports.push(reconcile_pair(pool, station_id, product_id).await?);
    }

    Ok(reports)
}
