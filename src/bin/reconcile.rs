//! Stock reconciliation tool
//!
//! Admin-only check that the append-only stock ledger still reproduces the
//! materialized stock levels: for each (station, product), the sum of
//! movement deltas must equal the current level. Exits non-zero on any
//! mismatch so it can gate a deployment or run from cron.
//!
//! # Usage
//! ```bash
//! ./reconcile                      # every pair with ledger entries
//! ./reconcile --station 3 --product 2
//! ```

use std::env;

use dispatch_rs::services::reconciliation_service;

/// Parse command-line arguments manually (no external crate needed)
struct Args {
    station_id: Option<i64>,
    product_id: Option<i64>,
}

impl Args {
    fn parse() -> Result<Self, String> {
        let args: Vec<String> = env::args().collect();

        let mut station_id = None;
        let mut product_id = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--station" => {
                    if i + 1 < args.len() {
                        station_id = Some(
                            args[i + 1]
                                .parse::<i64>()
                                .map_err(|e| format!("Invalid --station value: {}", e))?,
                        );
                        i += 2;
                    } else {
                        return Err("--station requires a value".to_string());
                    }
                }
                "--product" => {
                    if i + 1 < args.len() {
                        product_id = Some(
                            args[i + 1]
                                .parse::<i64>()
                                .map_err(|e| format!("Invalid --product value: {}", e))?,
                        );
                        i += 2;
                    } else {
                        return Err("--product requires a value".to_string());
                    }
                }
                other => {
                    return Err(format!(
                        "Unknown argument: {}. Usage: reconcile [--station ID --product ID]",
                        other
                    ));
                }
            }
        }

        if station_id.is_some() != product_id.is_some() {
            return Err("--station and --product must be given together".to_string());
        }

        Ok(Args {
            station_id,
            product_id,
        })
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = match Args::parse() {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}", msg);
            std::process::exit(2);
        }
    };

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = dispatch_rs::db::init_pool(&database_url)
        .await
        .expect("Failed to connect to database");

    let reports = match (args.station_id, args.product_id) {
        (Some(station_id), Some(product_id)) => {
            vec![
                reconciliation_service::reconcile_pair(&pool, station_id, product_id)
                    .await
                    .expect("Reconciliation query failed"),
            ]
        }
        _ => reconciliation_service::reconcile_all(&pool)
            .await
            .expect("Reconciliation query failed"),
    };

    let mut mismatches = 0;
    for report in &reports {
        if report.consistent() {
            tracing::info!(
                station_id = report.station_id,
                product_id = report.product_id,
                level_centi = report.level_centi,
                "OK"
            );
        } else {
            mismatches += 1;
            tracing::error!(
                station_id = report.station_id,
                product_id = report.product_id,
                ledger_sum_centi = report.ledger_sum_centi,
                level_centi = report.level_centi,
                "MISMATCH: ledger does not reproduce stock level"
            );
        }
    }

    tracing::info!(
        pairs_checked = reports.len(),
        mismatches,
        "Reconciliation finished"
    );

    if mismatches > 0 {
        std::process::exit(1);
    }
}
