//! Funding policy evaluation for dispatch completions
//!
//! Pure decision logic over a customer balance record. The evaluator never
//! persists anything; it returns the new field values for the caller to
//! write, and signals day-limit expiry as an explicit deactivation the
//! caller applies as its own state transition.
//!
//! The two modes deliberately differ: credit-limit customers are blocked
//! when a request would exceed their remaining limit, day-limit customers
//! are never blocked by amount, only by expiry/activation.

use chrono::{DateTime, Utc};

use crate::repos::balance_repo::{BillingMode, CustomerBalance};

/// New balance field values to persist after a funded completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedBalanceFields {
    pub credit_used_minor: i64,
    pub day_amount_used_minor: i64,
    pub running_balance_minor: i64,
}

/// Why a request was not funded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    DayLimitInactive,
    DayLimitExpired,
    NoCreditLimit,
    InsufficientCredit {
        required_minor: i64,
        available_minor: i64,
    },
}

impl RejectionReason {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            RejectionReason::DayLimitInactive => "day_limit_inactive",
            RejectionReason::DayLimitExpired => "day_limit_expired",
            RejectionReason::NoCreditLimit => "no_credit_limit",
            RejectionReason::InsufficientCredit { .. } => "insufficient_credit",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::DayLimitInactive => {
                write!(f, "Day limit inactive; recharge required")
            }
            RejectionReason::DayLimitExpired => {
                write!(f, "Day limit expired; recharge required")
            }
            RejectionReason::NoCreditLimit => {
                write!(f, "No credit limit configured for this customer")
            }
            RejectionReason::InsufficientCredit {
                required_minor,
                available_minor,
            } => write!(
                f,
                "Insufficient credit: required {} but only {} available",
                required_minor, available_minor
            ),
        }
    }
}

/// Outcome of evaluating a requested amount against a balance record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FundingDecision {
    Funded {
        updated: UpdatedBalanceFields,
    },
    Rejected {
        reason: RejectionReason,
        /// The record must be deactivated even though the request is
        /// rejected (day-limit expiry observed during evaluation)
        deactivate: bool,
    },
}

/// Evaluate whether a requested amount is fundable
///
/// `now` is passed in so expiry checks stay deterministic under test.
pub fn evaluate(
    record: &CustomerBalance,
    requested_amount_minor: i64,
    now: DateTime<Utc>,
) -> FundingDecision {
    match record.billing_mode {
        BillingMode::DayLimit => evaluate_day_limit(record, requested_amount_minor, now),
        BillingMode::CreditLimit => evaluate_credit_limit(record, requested_amount_minor),
    }
}

fn evaluate_day_limit(
    record: &CustomerBalance,
    requested_amount_minor: i64,
    now: DateTime<Utc>,
) -> FundingDecision {
    if !record.is_active {
        return FundingDecision::Rejected {
            reason: RejectionReason::DayLimitInactive,
            deactivate: false,
        };
    }

    if let Some(expiry) = record.day_limit_expiry {
        if expiry <= now {
            return FundingDecision::Rejected {
                reason: RejectionReason::DayLimitExpired,
                deactivate: true,
            };
        }
    }

    // Day-limit customers are not blocked by amount
    FundingDecision::Funded {
        updated: UpdatedBalanceFields {
            credit_used_minor: record.credit_used_minor,
            day_amount_used_minor: record.day_amount_used_minor + requested_amount_minor,
            running_balance_minor: record.running_balance_minor + requested_amount_minor,
        },
    }
}

fn evaluate_credit_limit(
    record: &CustomerBalance,
    requested_amount_minor: i64,
) -> FundingDecision {
    if record.credit_limit_minor <= 0 {
        return FundingDecision::Rejected {
            reason: RejectionReason::NoCreditLimit,
            deactivate: false,
        };
    }

    // The comparison is deliberately unfloored: a record already over its
    // limit has negative availability and rejects every positive request
    let available_minor = record.credit_limit_minor - record.credit_used_minor;

    if requested_amount_minor > available_minor {
        return FundingDecision::Rejected {
            reason: RejectionReason::InsufficientCredit {
                required_minor: requested_amount_minor,
                available_minor,
            },
            deactivate: false,
        };
    }

    FundingDecision::Funded {
        updated: UpdatedBalanceFields {
            credit_used_minor: record.credit_used_minor + requested_amount_minor,
            day_amount_used_minor: record.day_amount_used_minor,
            running_balance_minor: record.running_balance_minor + requested_amount_minor,
        },
    }
}

/// Availability as displayed to users: floored at zero
pub fn displayed_available_minor(record: &CustomerBalance) -> i64 {
    (record.credit_limit_minor - record.credit_used_minor).max(0)
}
