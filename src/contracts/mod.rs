//! Contract types for the dispatch HTTP API
//!
//! One explicit request schema per mutating endpoint. Unknown fields are
//! rejected at deserialization so each endpoint accepts exactly one shape.

pub mod complete_request_v1;
pub mod intake_request_v1;
pub mod status_update_request_v1;
pub mod stock_inward_request_v1;

pub use complete_request_v1::*;
pub use intake_request_v1::*;
pub use status_update_request_v1::*;
pub use stock_inward_request_v1::*;
