//! Dispatch completion transaction
//!
//! The only transition with financial side effects. Resolves the
//! applicable price, evaluates the customer's funding policy, checks stock,
//! and applies the stock/balance/ledger/request writes as one database
//! transaction. Row locks on the balance and stock rows serialize
//! concurrent completions for the same customer or (station, product) pair.
//!
//! Policy rejections and stock underflow are expected business outcomes,
//! returned as structured `NotFunded` results; only infrastructure failures
//! surface as errors.

use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::contracts::CompleteRequestV1;
use crate::repos::balance_repo::{self, BalanceError, BillingMode};
use crate::repos::ledger_repo::{self, BalanceEntryInsert, LedgerError, StockEntryInsert, TransType};
use crate::repos::price_repo::PriceError;
use crate::repos::request_repo::{self, RequestError, RequestStatus};
use crate::repos::stock_repo::{self, StockError};
use crate::services::balance_policy::{self, FundingDecision, RejectionReason, UpdatedBalanceFields};
use crate::services::price_resolver::{self, ResolvedPrice};
use crate::validation::{self, ValidationError};

/// Errors that can occur during a completion attempt
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Balance(#[from] BalanceError),

    #[error("Price resolution failed: {0}")]
    Price(#[from] PriceError),

    #[error(transparent)]
    Stock(#[from] StockError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Request {request_id} is {status:?}; only Pending or Processing requests can be completed")]
    WrongState {
        request_id: Uuid,
        status: RequestStatus,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Why a completion was not funded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFundedReason {
    Policy(RejectionReason),
    InsufficientStock {
        available_centi: i64,
        requested_centi: i64,
    },
}

impl NotFundedReason {
    pub fn code(&self) -> &'static str {
        match self {
            NotFundedReason::Policy(reason) => reason.code(),
            NotFundedReason::InsufficientStock { .. } => "insufficient_stock",
        }
    }
}

impl std::fmt::Display for NotFundedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotFundedReason::Policy(reason) => reason.fmt(f),
            NotFundedReason::InsufficientStock {
                available_centi,
                requested_centi,
            } => write!(
                f,
                "Insufficient stock: requested {} but only {} on hand",
                requested_centi, available_centi
            ),
        }
    }
}

/// What a successful completion wrote
#[derive(Debug, Clone)]
pub struct CompletionReceipt {
    pub request_id: Uuid,
    pub request_code: String,
    pub price_minor: i64,
    pub total_amount_minor: i64,
    pub actual_qty_centi: i64,
    pub stock_before_centi: i64,
    pub stock_after_centi: i64,
    pub updated_balance: UpdatedBalanceFields,
    pub stock_entry_id: Uuid,
}

/// Outcome of a completion attempt that did not error
#[derive(Debug, Clone)]
pub enum CompletionOutcome {
    Completed(CompletionReceipt),
    NotFunded { reason: NotFundedReason },
}

/// Multiply a per-unit minor price by a centi-unit quantity, rounding
/// half-up to the nearest minor unit
fn amount_minor(price_minor: i64, qty_centi: i64) -> i64 {
    ((price_minor as i128 * qty_centi as i128 + 50) / 100) as i64
}

/// Attempt to transition a dispatch request to Completed
///
/// Steps, all within one transaction:
/// 1. Lock the request row; require Pending or Processing
/// 2. Lock the customer balance row
/// 3. Resolve the unit price (request's submitted price as fallback)
/// 4. Evaluate the funding policy on price x actual quantity
/// 5. Lock the stock row; reject if stock would go negative
/// 6. Persist stock, balance, ledger entries, and the request row
pub async fn complete_request(
    pool: &PgPool,
    request_id: Uuid,
    payload: &CompleteRequestV1,
) -> Result<CompletionOutcome, CompletionError> {
    validation::validate_completion(payload)?;

    let mut tx = pool.begin().await?;

    let request = request_repo::lock_by_id_tx(&mut tx, request_id).await?;

    if !matches!(
        request.status,
        RequestStatus::Pending | RequestStatus::Processing
    ) {
        return Err(CompletionError::WrongState {
            request_id,
            status: request.status,
        });
    }

    let balance = balance_repo::lock_by_customer_tx(&mut tx, request.customer_id).await?;

    let actual_qty_centi = match payload.actual_quantity {
        Some(qty) => (qty * 100.0).round() as i64,
        None => request.requested_qty_centi,
    };

    let ResolvedPrice {
        price_minor,
        source,
    } = price_resolver::resolve_price_tx(
        &mut tx,
        request.station_id,
        request.product_id,
        request.sub_product_id,
        request.customer_id,
        request.price_minor.unwrap_or(0),
    )
    .await?;

    let requested_amount_minor = amount_minor(price_minor, actual_qty_centi);

    let decision = balance_policy::evaluate(&balance, requested_amount_minor, Utc::now());

    let updated = match decision {
        FundingDecision::Rejected { reason, deactivate } => {
            if deactivate {
                // Expiry observed during evaluation: the deactivation must
                // persist even though the request stays uncompleted
                balance_repo::tx_deactivate(&mut tx, balance.customer_id).await?;
                tx.commit().await?;
            } else {
                tx.rollback().await?;
            }

            tracing::info!(
                request_id = %request_id,
                customer_id = balance.customer_id,
                reason = %reason,
                "Completion not funded"
            );

            return Ok(CompletionOutcome::NotFunded {
                reason: NotFundedReason::Policy(reason),
            });
        }
        FundingDecision::Funded { updated } => updated,
    };

    let stock_before_centi = stock_repo::lock_level_tx(&mut tx, request.station_id, request.product_id)
        .await?
        .map(|level| level.qty_centi)
        .unwrap_or(0);

    let stock_after_centi = stock_before_centi - actual_qty_centi;

    if stock_after_centi < 0 {
        tx.rollback().await?;

        tracing::info!(
            request_id = %request_id,
            station_id = request.station_id,
            product_id = request.product_id,
            stock_before_centi,
            actual_qty_centi,
            "Completion rejected: stock would go negative"
        );

        return Ok(CompletionOutcome::NotFunded {
            reason: NotFundedReason::InsufficientStock {
                available_centi: stock_before_centi,
                requested_centi: actual_qty_centi,
            },
        });
    }

    stock_repo::tx_upsert_level(&mut tx, request.station_id, request.product_id, stock_after_centi)
        .await?;

    balance_repo::tx_apply_funding(
        &mut tx,
        balance.customer_id,
        updated.credit_used_minor,
        updated.day_amount_used_minor,
        updated.running_balance_minor,
    )
    .await?;

    let stock_entry_id = ledger_repo::tx_append_stock_entry(
        &mut tx,
        &StockEntryInsert {
            station_id: request.station_id,
            product_id: request.product_id,
            sub_product_id: request.sub_product_id,
            trans_type: TransType::Outward,
            delta_qty_centi: -actual_qty_centi,
            stock_before_centi,
            stock_after_centi,
            amount_minor: requested_amount_minor,
            actor_id: payload.actor_id,
            request_id: Some(request_id),
        },
    )
    .await?;

    request_repo::tx_mark_completed(
        &mut tx,
        request_id,
        payload.actor_id,
        actual_qty_centi,
        price_minor,
        requested_amount_minor,
        payload.remarks.as_deref(),
    )
    .await?;

    // Wallet trail records the mode-authoritative counter before/after
    let (balance_before_minor, balance_after_minor) = match balance.billing_mode {
        BillingMode::CreditLimit => (balance.credit_used_minor, updated.credit_used_minor),
        BillingMode::DayLimit => (balance.day_amount_used_minor, updated.day_amount_used_minor),
    };

    ledger_repo::tx_append_balance_entry(
        &mut tx,
        &BalanceEntryInsert {
            customer_id: balance.customer_id,
            billing_mode: balance.billing_mode,
            amount_minor: requested_amount_minor,
            balance_before_minor,
            balance_after_minor,
            actor_id: payload.actor_id,
            request_id: Some(request_id),
        },
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        request_id = %request_id,
        request_code = %request.request_code,
        customer_id = balance.customer_id,
        price_minor,
        price_source = ?source,
        total_amount_minor = requested_amount_minor,
        stock_before_centi,
        stock_after_centi,
        "Dispatch request completed"
    );

    Ok(CompletionOutcome::Completed(CompletionReceipt {
        request_id,
        request_code: request.request_code,
        price_minor,
        total_amount_minor: requested_amount_minor,
        actual_qty_centi,
        stock_before_centi,
        stock_after_centi,
        updated_balance: updated,
        stock_entry_id,
    }))
}
