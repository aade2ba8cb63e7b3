//! End-to-end tests for the dispatch completion transaction
//!
//! These run against a real Postgres (DATABASE_URL); they are ignored by
//! default so the suite passes without infrastructure:
//!
//! ```bash
//! cargo test -- --ignored
//! ```

mod common;

use serial_test::serial;
use uuid::Uuid;

use common::{
    cleanup_customer, cleanup_station, get_test_pool, setup_credit_customer,
    setup_day_limit_customer, setup_price_entry,
};
use dispatch_rs::contracts::{CompleteRequestV1, IntakeRequestV1, StockInwardRequestV1};
use dispatch_rs::repos::{balance_repo, ledger_repo, request_repo, stock_repo};
use dispatch_rs::repos::ledger_repo::TransType;
use dispatch_rs::repos::request_repo::RequestStatus;
use dispatch_rs::services::completion_service::{
    self, CompletionError, CompletionOutcome, NotFundedReason,
};
use dispatch_rs::services::{intake_service, reconciliation_service, status_service, stock_service};

const ACTOR: i64 = 900;

fn intake(station_id: i64, customer_id: i64, product_id: i64, quantity: f64, price: f64) -> IntakeRequestV1 {
    IntakeRequestV1 {
        station_id,
        customer_id,
        product_id,
        sub_product_id: None,
        quantity,
        price: Some(price),
        remarks: None,
        attachment_1: None,
        attachment_2: None,
        attachment_3: None,
        actor_id: ACTOR,
    }
}

fn complete_payload() -> CompleteRequestV1 {
    CompleteRequestV1 {
        actual_quantity: None,
        remarks: None,
        actor_id: ACTOR,
    }
}

async fn seed_stock(pool: &sqlx::PgPool, station_id: i64, product_id: i64, quantity: f64) {
    stock_service::record_inward(
        pool,
        &StockInwardRequestV1 {
            station_id,
            product_id,
            sub_product_id: None,
            quantity,
            amount: None,
            actor_id: ACTOR,
        },
    )
    .await
    .expect("Failed to seed stock");
}

#[tokio::test]
#[serial]
#[ignore = "requires a local Postgres (DATABASE_URL)"]
async fn test_completion_end_to_end_worked_example() {
    let pool = get_test_pool().await;
    let (station, product, customer) = (9101, 1, 9101);
    cleanup_station(&pool, station).await;
    cleanup_customer(&pool, customer).await;

    // Stock 100 units, credit limit 500.00 unused, request 40 units @ 10.00
    seed_stock(&pool, station, product, 100.0).await;
    setup_credit_customer(&pool, customer, 50_000, 0).await;

    let request = intake_service::create_request(&pool, &intake(station, customer, product, 40.0, 10.0))
        .await
        .unwrap();
    assert_eq!(request.status, RequestStatus::Pending);
    assert!(request.request_code.starts_with("MP"));

    let outcome = completion_service::complete_request(&pool, request.id, &complete_payload())
        .await
        .unwrap();

    let receipt = match outcome {
        CompletionOutcome::Completed(receipt) => receipt,
        other => panic!("Expected Completed, got {:?}", other),
    };

    assert_eq!(receipt.price_minor, 1_000);
    assert_eq!(receipt.total_amount_minor, 40_000);
    assert_eq!(receipt.stock_before_centi, 10_000);
    assert_eq!(receipt.stock_after_centi, 6_000);

    // Balance: credit_used and running_balance both 400.00
    let balance = balance_repo::find_by_customer(&pool, customer)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(balance.credit_used_minor, 40_000);
    assert_eq!(balance.running_balance_minor, 40_000);

    // Stock level 60 units
    let level = stock_repo::find_level(&pool, station, product)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(level.qty_centi, 6_000);

    // Exactly one outward ledger entry with the before/after snapshots
    let history = ledger_repo::find_stock_history(&pool, station, product, 100)
        .await
        .unwrap();
    let outward: Vec<_> = history
        .iter()
        .filter(|e| e.trans_type == TransType::Outward)
        .collect();
    assert_eq!(outward.len(), 1);
    assert_eq!(outward[0].stock_before_centi, 10_000);
    assert_eq!(outward[0].stock_after_centi, 6_000);
    assert_eq!(outward[0].amount_minor, 40_000);
    assert_eq!(outward[0].request_id, Some(request.id));

    // Request row carries the final financials
    let request = request_repo::find_by_id(&pool, request.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(request.status, RequestStatus::Completed);
    assert_eq!(request.price_minor, Some(1_000));
    assert_eq!(request.total_amount_minor, Some(40_000));

    cleanup_station(&pool, station).await;
    cleanup_customer(&pool, customer).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a local Postgres (DATABASE_URL)"]
async fn test_customer_deal_price_wins_over_station_wide() {
    let pool = get_test_pool().await;
    let (station, product, customer) = (9102, 1, 9102);
    cleanup_station(&pool, station).await;
    cleanup_customer(&pool, customer).await;

    seed_stock(&pool, station, product, 100.0).await;
    setup_credit_customer(&pool, customer, 1_000_000, 0).await;

    // Station-wide 90.00, customer-specific 85.00: the deal must win
    setup_price_entry(&pool, station, product, None, None, 9_000).await;
    setup_price_entry(&pool, station, product, None, Some(customer), 8_500).await;

    let request = intake_service::create_request(&pool, &intake(station, customer, product, 10.0, 95.0))
        .await
        .unwrap();

    let outcome = completion_service::complete_request(&pool, request.id, &complete_payload())
        .await
        .unwrap();

    match outcome {
        CompletionOutcome::Completed(receipt) => {
            assert_eq!(receipt.price_minor, 8_500);
            assert_eq!(receipt.total_amount_minor, 85_000);
        }
        other => panic!("Expected Completed, got {:?}", other),
    }

    cleanup_station(&pool, station).await;
    cleanup_customer(&pool, customer).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a local Postgres (DATABASE_URL)"]
async fn test_insufficient_credit_leaves_no_partial_state() {
    let pool = get_test_pool().await;
    let (station, product, customer) = (9103, 1, 9103);
    cleanup_station(&pool, station).await;
    cleanup_customer(&pool, customer).await;

    seed_stock(&pool, station, product, 100.0).await;
    // available 50.00; the 40-unit request at 10.00 needs 400.00
    setup_credit_customer(&pool, customer, 100_000, 95_000).await;

    let request = intake_service::create_request(&pool, &intake(station, customer, product, 40.0, 10.0))
        .await
        .unwrap();

    let outcome = completion_service::complete_request(&pool, request.id, &complete_payload())
        .await
        .unwrap();

    match outcome {
        CompletionOutcome::NotFunded { reason } => {
            assert_eq!(reason.code(), "insufficient_credit");
        }
        other => panic!("Expected NotFunded, got {:?}", other),
    }

    // Nothing moved: stock, balance, ledger, and request are untouched
    let level = stock_repo::find_level(&pool, station, product)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(level.qty_centi, 10_000);

    let balance = balance_repo::find_by_customer(&pool, customer)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(balance.credit_used_minor, 95_000);

    let history = ledger_repo::find_stock_history(&pool, station, product, 100)
        .await
        .unwrap();
    assert!(history.iter().all(|e| e.trans_type == TransType::Inward));

    let request = request_repo::find_by_id(&pool, request.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(request.status, RequestStatus::Pending);

    cleanup_station(&pool, station).await;
    cleanup_customer(&pool, customer).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a local Postgres (DATABASE_URL)"]
async fn test_stock_underflow_rejected_as_policy_outcome() {
    let pool = get_test_pool().await;
    let (station, product, customer) = (9104, 1, 9104);
    cleanup_station(&pool, station).await;
    cleanup_customer(&pool, customer).await;

    // Only 10 units on hand; the customer could fund far more
    seed_stock(&pool, station, product, 10.0).await;
    setup_credit_customer(&pool, customer, 10_000_000, 0).await;

    let request = intake_service::create_request(&pool, &intake(station, customer, product, 40.0, 10.0))
        .await
        .unwrap();

    let outcome = completion_service::complete_request(&pool, request.id, &complete_payload())
        .await
        .unwrap();

    match outcome {
        CompletionOutcome::NotFunded {
            reason: NotFundedReason::InsufficientStock {
                available_centi,
                requested_centi,
            },
        } => {
            assert_eq!(available_centi, 1_000);
            assert_eq!(requested_centi, 4_000);
        }
        other => panic!("Expected InsufficientStock, got {:?}", other),
    }

    // The funding evaluation passed but nothing was persisted
    let balance = balance_repo::find_by_customer(&pool, customer)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(balance.credit_used_minor, 0);

    let level = stock_repo::find_level(&pool, station, product)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(level.qty_centi, 1_000);

    cleanup_station(&pool, station).await;
    cleanup_customer(&pool, customer).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a local Postgres (DATABASE_URL)"]
async fn test_day_limit_funds_any_amount_while_active() {
    let pool = get_test_pool().await;
    let (station, product, customer) = (9105, 1, 9105);
    cleanup_station(&pool, station).await;
    cleanup_customer(&pool, customer).await;

    seed_stock(&pool, station, product, 10_000.0).await;
    setup_day_limit_customer(
        &pool,
        customer,
        15,
        Some(chrono::Utc::now() + chrono::Duration::days(10)),
        true,
    )
    .await;

    // 5000 units at 95.00: an amount no credit limit here would cover
    let request = intake_service::create_request(&pool, &intake(station, customer, product, 5_000.0, 95.0))
        .await
        .unwrap();

    let outcome = completion_service::complete_request(&pool, request.id, &complete_payload())
        .await
        .unwrap();

    assert!(matches!(outcome, CompletionOutcome::Completed(_)));

    let balance = balance_repo::find_by_customer(&pool, customer)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(balance.day_amount_used_minor, 47_500_000);
    assert_eq!(balance.running_balance_minor, 47_500_000);
    assert_eq!(balance.credit_used_minor, 0);

    cleanup_station(&pool, station).await;
    cleanup_customer(&pool, customer).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a local Postgres (DATABASE_URL)"]
async fn test_day_limit_expiry_deactivates_record() {
    let pool = get_test_pool().await;
    let (station, product, customer) = (9106, 1, 9106);
    cleanup_station(&pool, station).await;
    cleanup_customer(&pool, customer).await;

    seed_stock(&pool, station, product, 100.0).await;
    setup_day_limit_customer(
        &pool,
        customer,
        15,
        Some(chrono::Utc::now() - chrono::Duration::hours(1)),
        true,
    )
    .await;

    let request = intake_service::create_request(&pool, &intake(station, customer, product, 40.0, 10.0))
        .await
        .unwrap();

    let outcome = completion_service::complete_request(&pool, request.id, &complete_payload())
        .await
        .unwrap();

    match outcome {
        CompletionOutcome::NotFunded { reason } => {
            assert_eq!(reason.code(), "day_limit_expired");
        }
        other => panic!("Expected NotFunded, got {:?}", other),
    }

    // The deactivation persisted even though the completion was rejected
    let balance = balance_repo::find_by_customer(&pool, customer)
        .await
        .unwrap()
        .unwrap();
    assert!(!balance.is_active);

    // A second attempt now reports the record inactive
    let outcome = completion_service::complete_request(&pool, request.id, &complete_payload())
        .await
        .unwrap();
    match outcome {
        CompletionOutcome::NotFunded { reason } => {
            assert_eq!(reason.code(), "day_limit_inactive");
        }
        other => panic!("Expected NotFunded, got {:?}", other),
    }

    cleanup_station(&pool, station).await;
    cleanup_customer(&pool, customer).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a local Postgres (DATABASE_URL)"]
async fn test_completed_request_is_terminal() {
    let pool = get_test_pool().await;
    let (station, product, customer) = (9107, 1, 9107);
    cleanup_station(&pool, station).await;
    cleanup_customer(&pool, customer).await;

    seed_stock(&pool, station, product, 100.0).await;
    setup_credit_customer(&pool, customer, 1_000_000, 0).await;

    let request = intake_service::create_request(&pool, &intake(station, customer, product, 40.0, 10.0))
        .await
        .unwrap();

    let outcome = completion_service::complete_request(&pool, request.id, &complete_payload())
        .await
        .unwrap();
    assert!(matches!(outcome, CompletionOutcome::Completed(_)));

    // Completing again must not double-deduct
    let err = completion_service::complete_request(&pool, request.id, &complete_payload())
        .await
        .unwrap_err();
    assert!(matches!(err, CompletionError::WrongState { .. }));

    let balance = balance_repo::find_by_customer(&pool, customer)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(balance.credit_used_minor, 40_000);

    cleanup_station(&pool, station).await;
    cleanup_customer(&pool, customer).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a local Postgres (DATABASE_URL)"]
async fn test_stale_pending_sweep_is_idempotent() {
    let pool = get_test_pool().await;
    let (station, product, customer) = (9108, 1, 9108);
    cleanup_station(&pool, station).await;
    cleanup_customer(&pool, customer).await;

    setup_credit_customer(&pool, customer, 100_000, 0).await;

    let request = intake_service::create_request(&pool, &intake(station, customer, product, 40.0, 10.0))
        .await
        .unwrap();

    // Backdate past the 72-hour window
    sqlx::query("UPDATE dispatch_requests SET created_at = NOW() - INTERVAL '80 hours' WHERE id = $1")
        .bind(request.id)
        .execute(&pool)
        .await
        .unwrap();

    status_service::sweep_stale(&pool).await.unwrap();

    let swept = request_repo::find_by_id(&pool, request.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(swept.status, RequestStatus::Cancelled);
    assert_eq!(swept.status_changed_by, None);

    // Re-running the sweep leaves the row as-is
    status_service::sweep_stale(&pool).await.unwrap();

    let after = request_repo::find_by_id(&pool, request.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.status, RequestStatus::Cancelled);
    assert_eq!(after.status_changed_at, swept.status_changed_at);

    cleanup_station(&pool, station).await;
    cleanup_customer(&pool, customer).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a local Postgres (DATABASE_URL)"]
async fn test_processing_then_complete_flow() {
    let pool = get_test_pool().await;
    let (station, product, customer) = (9109, 1, 9109);
    cleanup_station(&pool, station).await;
    cleanup_customer(&pool, customer).await;

    seed_stock(&pool, station, product, 100.0).await;
    setup_credit_customer(&pool, customer, 1_000_000, 0).await;

    let request = intake_service::create_request(&pool, &intake(station, customer, product, 40.0, 10.0))
        .await
        .unwrap();

    let request = status_service::mark_processing(
        &pool,
        request.id,
        &dispatch_rs::contracts::ProcessingRequestV1 {
            sub_product_id: None,
            remarks: Some("tanker assigned".to_string()),
            attachment_1: None,
            attachment_2: None,
            attachment_3: None,
            actor_id: ACTOR,
        },
    )
    .await
    .unwrap();
    assert_eq!(request.status, RequestStatus::Processing);

    // Processing requests complete the same way Pending ones do
    let outcome = completion_service::complete_request(&pool, request.id, &complete_payload())
        .await
        .unwrap();
    assert!(matches!(outcome, CompletionOutcome::Completed(_)));

    cleanup_station(&pool, station).await;
    cleanup_customer(&pool, customer).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a local Postgres (DATABASE_URL)"]
async fn test_ledger_reconciles_after_mixed_flow() {
    let pool = get_test_pool().await;
    let (station, product, customer) = (9110, 1, 9110);
    cleanup_station(&pool, station).await;
    cleanup_customer(&pool, customer).await;

    setup_credit_customer(&pool, customer, 10_000_000, 0).await;

    // Inward 100, dispatch 40, inward 25, dispatch 10
    seed_stock(&pool, station, product, 100.0).await;

    let r1 = intake_service::create_request(&pool, &intake(station, customer, product, 40.0, 10.0))
        .await
        .unwrap();
    completion_service::complete_request(&pool, r1.id, &complete_payload())
        .await
        .unwrap();

    seed_stock(&pool, station, product, 25.0).await;

    let r2 = intake_service::create_request(&pool, &intake(station, customer, product, 10.0, 10.0))
        .await
        .unwrap();
    completion_service::complete_request(&pool, r2.id, &complete_payload())
        .await
        .unwrap();

    let report = reconciliation_service::reconcile_pair(&pool, station, product)
        .await
        .unwrap();
    assert!(report.consistent());
    assert_eq!(report.level_centi, 7_500);
    assert_eq!(report.ledger_sum_centi, 7_500);

    cleanup_station(&pool, station).await;
    cleanup_customer(&pool, customer).await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a local Postgres (DATABASE_URL)"]
async fn test_unknown_request_id_errors() {
    let pool = get_test_pool().await;

    let err = completion_service::complete_request(&pool, Uuid::new_v4(), &complete_payload())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CompletionError::Request(request_repo::RequestError::NotFound(_))
    ));
}
