//! Repository for customer balance records
//!
//! One row per customer. Which field group is authoritative is selected by
//! `billing_mode`: credit-limit customers spend against
//! `credit_limit_minor`/`credit_used_minor`, day-limit customers are gated
//! by `is_active`/`day_limit_expiry`. Rows are mutated only by funded
//! completions and explicit deactivation; never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use thiserror::Error;

/// Billing mode enum matching database billing_mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, Serialize, Deserialize)]
#[sqlx(type_name = "billing_mode", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BillingMode {
    CreditLimit,
    DayLimit,
}

/// Customer balance record
#[derive(Debug, Clone, FromRow)]
pub struct CustomerBalance {
    pub customer_id: i64,
    pub billing_mode: BillingMode,
    pub credit_limit_minor: i64,
    pub credit_used_minor: i64,
    pub running_balance_minor: i64,
    pub day_limit_days: i32,
    pub day_amount_used_minor: i64,
    pub day_limit_expiry: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Errors that can occur during balance repository operations
#[derive(Debug, Error)]
pub enum BalanceError {
    #[error("No balance record for customer_id={0}")]
    NotFound(i64),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Find a customer's balance record
/// Returns None if the customer has never been onboarded
pub async fn find_by_customer(
    pool: &PgPool,
    customer_id: i64,
) -> Result<Option<CustomerBalance>, BalanceError> {
    let record = sqlx::query_as::<_, CustomerBalance>(
        r#"
        SELECT
            customer_id,
            billing_mode,
            credit_limit_minor,
            credit_used_minor,
            running_balance_minor,
            day_limit_days,
            day_amount_used_minor,
            day_limit_expiry,
            is_active,
            created_at,
            updated_at
        FROM customer_balances
        WHERE customer_id = $1
        "#,
    )
    .bind(customer_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Lock a customer's balance row for the duration of the transaction
///
/// Completion funding checks must read through this lock so two concurrent
/// completions cannot both pass the same credit-limit check.
pub async fn lock_by_customer_tx(
    tx: &mut Transaction<'_, Postgres>,
    customer_id: i64,
) -> Result<CustomerBalance, BalanceError> {
    let record = sqlx::query_as::<_, CustomerBalance>(
        r#"
        SELECT
            customer_id,
            billing_mode,
            credit_limit_minor,
            credit_used_minor,
            running_balance_minor,
            day_limit_days,
            day_amount_used_minor,
            day_limit_expiry,
            is_active,
            created_at,
            updated_at
        FROM customer_balances
        WHERE customer_id = $1
        FOR UPDATE
        "#,
    )
    .bind(customer_id)
    .fetch_optional(&mut **tx)
    .await?;

    record.ok_or(BalanceError::NotFound(customer_id))
}

/// Persist the post-funding field values computed by the policy evaluator
pub async fn tx_apply_funding(
    tx: &mut Transaction<'_, Postgres>,
    customer_id: i64,
    credit_used_minor: i64,
    day_amount_used_minor: i64,
    running_balance_minor: i64,
) -> Result<(), BalanceError> {
    let result = sqlx::query(
        r#"
        UPDATE customer_balances
        SET credit_used_minor = $2,
            day_amount_used_minor = $3,
            running_balance_minor = $4,
            updated_at = NOW()
        WHERE customer_id = $1
        "#,
    )
    .bind(customer_id)
    .bind(credit_used_minor)
    .bind(day_amount_used_minor)
    .bind(running_balance_minor)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(BalanceError::NotFound(customer_id));
    }

    Ok(())
}

/// Deactivate a day-limit customer whose expiry has passed
pub async fn tx_deactivate(
    tx: &mut Transaction<'_, Postgres>,
    customer_id: i64,
) -> Result<(), BalanceError> {
    let result = sqlx::query(
        r#"
        UPDATE customer_balances
        SET is_active = FALSE,
            updated_at = NOW()
        WHERE customer_id = $1
        "#,
    )
    .bind(customer_id)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(BalanceError::NotFound(customer_id));
    }

    Ok(())
}
