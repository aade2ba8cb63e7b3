//! Dispatch Intake Request V1 Contract Types

use serde::{Deserialize, Serialize};

/// Payload for creating a new dispatch request (enters Pending)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IntakeRequestV1 {
    /// Filling station the fuel is drawn from
    pub station_id: i64,

    /// Customer the dispatch is billed to
    pub customer_id: i64,

    /// Product being dispatched
    pub product_id: i64,

    /// Optional sub-product (grade/variant); positive identifiers only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_product_id: Option<i64>,

    /// Requested quantity in dispensing units (must be > 0)
    pub quantity: f64,

    /// Price per unit submitted by the requester; used as the resolution
    /// fallback when no deal price matches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,

    /// Opaque attachment paths, passed through unchanged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_1: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_2: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_3: Option<String>,

    /// User creating the request; required, no sentinel fallback
    pub actor_id: i64,
}
