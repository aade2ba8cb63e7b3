//! Status Transition Request V1 Contract Types
//!
//! Processing and cancellation transitions carry no financial effect;
//! funds are never reserved while a request is Pending or Processing.

use serde::{Deserialize, Serialize};

/// Payload for transitioning a Pending request to Processing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProcessingRequestV1 {
    /// Optional sub-product correction applied while processing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_product_id: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_1: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_2: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_3: Option<String>,

    /// User processing the request; required, no sentinel fallback
    pub actor_id: i64,
}

/// Payload for manually cancelling a Pending or Processing request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CancelRequestV1 {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_1: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_2: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_3: Option<String>,

    /// User cancelling the request; required, no sentinel fallback
    pub actor_id: i64,
}
