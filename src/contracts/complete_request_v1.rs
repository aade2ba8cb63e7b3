//! Dispatch Completion Request V1 Contract Types

use serde::{Deserialize, Serialize};

/// Payload for transitioning a dispatch request to Completed
///
/// Completion is the only transition with financial side effects: it
/// resolves the applicable price, checks the customer's funding policy,
/// decrements station stock, and appends the ledger entries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CompleteRequestV1 {
    /// Quantity actually dispensed, in dispensing units. Defaults to the
    /// requested quantity when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_quantity: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,

    /// User performing the completion; required, no sentinel fallback
    pub actor_id: i64,
}
