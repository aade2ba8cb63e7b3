//! Stock Inward Request V1 Contract Types

use serde::{Deserialize, Serialize};

/// Payload for recording an inbound stock movement at a station
///
/// The increment counterpart of completion's decrement; wrapped in the
/// same lock-update-append transactional unit so ledger replay stays exact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StockInwardRequestV1 {
    pub station_id: i64,

    pub product_id: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_product_id: Option<i64>,

    /// Quantity received, in dispensing units (must be > 0)
    pub quantity: f64,

    /// Purchase amount for the movement, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,

    /// User recording the movement; required, no sentinel fallback
    pub actor_id: i64,
}
