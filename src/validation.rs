//! Validation logic for dispatch API payloads
//!
//! Payloads are rejected here before any lookup or write is attempted.

use crate::contracts::{
    CancelRequestV1, CompleteRequestV1, IntakeRequestV1, ProcessingRequestV1,
    StockInwardRequestV1,
};
use thiserror::Error;

const MAX_REMARKS_LEN: usize = 500;

/// Validation errors for dispatch payloads
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("actor_id must be a positive identifier, got {0}")]
    InvalidActor(i64),

    #[error("station_id must be a positive identifier, got {0}")]
    InvalidStation(i64),

    #[error("customer_id must be a positive identifier, got {0}")]
    InvalidCustomer(i64),

    #[error("product_id must be a positive identifier, got {0}")]
    InvalidProduct(i64),

    #[error("quantity must be positive and finite, got {0}")]
    InvalidQuantity(f64),

    #[error("price must be non-negative and finite, got {0}")]
    InvalidPrice(f64),

    #[error("amount must be non-negative and finite, got {0}")]
    InvalidAmount(f64),

    #[error("remarks exceeds {MAX_REMARKS_LEN} characters, got {0}")]
    RemarksTooLong(usize),
}

/// Validate a request-intake payload
pub fn validate_intake(payload: &IntakeRequestV1) -> Result<(), ValidationError> {
    validate_actor(payload.actor_id)?;

    if payload.station_id <= 0 {
        return Err(ValidationError::InvalidStation(payload.station_id));
    }
    if payload.customer_id <= 0 {
        return Err(ValidationError::InvalidCustomer(payload.customer_id));
    }
    if payload.product_id <= 0 {
        return Err(ValidationError::InvalidProduct(payload.product_id));
    }

    validate_quantity(payload.quantity)?;

    if let Some(price) = payload.price {
        if !price.is_finite() || price < 0.0 {
            return Err(ValidationError::InvalidPrice(price));
        }
    }

    validate_remarks(payload.remarks.as_deref())?;

    Ok(())
}

/// Validate a completion payload
pub fn validate_completion(payload: &CompleteRequestV1) -> Result<(), ValidationError> {
    validate_actor(payload.actor_id)?;

    if let Some(qty) = payload.actual_quantity {
        validate_quantity(qty)?;
    }

    validate_remarks(payload.remarks.as_deref())?;

    Ok(())
}

/// Validate a processing-transition payload
pub fn validate_processing(payload: &ProcessingRequestV1) -> Result<(), ValidationError> {
    validate_actor(payload.actor_id)?;
    validate_remarks(payload.remarks.as_deref())?;
    Ok(())
}

/// Validate a cancellation payload
pub fn validate_cancel(payload: &CancelRequestV1) -> Result<(), ValidationError> {
    validate_actor(payload.actor_id)?;
    validate_remarks(payload.remarks.as_deref())?;
    Ok(())
}

/// Validate an inward stock movement payload
pub fn validate_inward(payload: &StockInwardRequestV1) -> Result<(), ValidationError> {
    validate_actor(payload.actor_id)?;

    if payload.station_id <= 0 {
        return Err(ValidationError::InvalidStation(payload.station_id));
    }
    if payload.product_id <= 0 {
        return Err(ValidationError::InvalidProduct(payload.product_id));
    }

    validate_quantity(payload.quantity)?;

    if let Some(amount) = payload.amount {
        if !amount.is_finite() || amount < 0.0 {
            return Err(ValidationError::InvalidAmount(amount));
        }
    }

    Ok(())
}

fn validate_actor(actor_id: i64) -> Result<(), ValidationError> {
    if actor_id <= 0 {
        return Err(ValidationError::InvalidActor(actor_id));
    }
    Ok(())
}

fn validate_quantity(qty: f64) -> Result<(), ValidationError> {
    if !qty.is_finite() || qty <= 0.0 {
        return Err(ValidationError::InvalidQuantity(qty));
    }
    Ok(())
}

fn validate_remarks(remarks: Option<&str>) -> Result<(), ValidationError> {
    if let Some(r) = remarks {
        if r.len() > MAX_REMARKS_LEN {
            return Err(ValidationError::RemarksTooLong(r.len()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_intake() -> IntakeRequestV1 {
        IntakeRequestV1 {
            station_id: 3,
            customer_id: 17,
            product_id: 2,
            sub_product_id: None,
            quantity: 40.0,
            price: Some(102.5),
            remarks: None,
            attachment_1: None,
            attachment_2: None,
            attachment_3: None,
            actor_id: 9,
        }
    }

    #[test]
    fn test_valid_intake() {
        assert!(validate_intake(&valid_intake()).is_ok());
    }

    #[test]
    fn test_intake_zero_quantity() {
        let mut payload = valid_intake();
        payload.quantity = 0.0;
        assert_eq!(
            validate_intake(&payload),
            Err(ValidationError::InvalidQuantity(0.0))
        );
    }

    #[test]
    fn test_intake_negative_quantity() {
        let mut payload = valid_intake();
        payload.quantity = -5.0;
        assert_eq!(
            validate_intake(&payload),
            Err(ValidationError::InvalidQuantity(-5.0))
        );
    }

    #[test]
    fn test_intake_nan_quantity() {
        let mut payload = valid_intake();
        payload.quantity = f64::NAN;
        assert!(validate_intake(&payload).is_err());
    }

    #[test]
    fn test_intake_missing_actor() {
        let mut payload = valid_intake();
        payload.actor_id = 0;
        assert_eq!(
            validate_intake(&payload),
            Err(ValidationError::InvalidActor(0))
        );
    }

    #[test]
    fn test_intake_negative_price() {
        let mut payload = valid_intake();
        payload.price = Some(-1.0);
        assert_eq!(
            validate_intake(&payload),
            Err(ValidationError::InvalidPrice(-1.0))
        );
    }

    #[test]
    fn test_intake_remarks_too_long() {
        let mut payload = valid_intake();
        payload.remarks = Some("x".repeat(501));
        assert_eq!(
            validate_intake(&payload),
            Err(ValidationError::RemarksTooLong(501))
        );
    }

    #[test]
    fn test_completion_defaults_are_valid() {
        let payload = CompleteRequestV1 {
            actual_quantity: None,
            remarks: None,
            actor_id: 4,
        };
        assert!(validate_completion(&payload).is_ok());
    }

    #[test]
    fn test_completion_zero_actual_quantity() {
        let payload = CompleteRequestV1 {
            actual_quantity: Some(0.0),
            remarks: None,
            actor_id: 4,
        };
        assert_eq!(
            validate_completion(&payload),
            Err(ValidationError::InvalidQuantity(0.0))
        );
    }

    #[test]
    fn test_completion_missing_actor() {
        let payload = CompleteRequestV1 {
            actual_quantity: Some(10.0),
            remarks: None,
            actor_id: -1,
        };
        assert_eq!(
            validate_completion(&payload),
            Err(ValidationError::InvalidActor(-1))
        );
    }

    #[test]
    fn test_inward_zero_quantity() {
        let payload = StockInwardRequestV1 {
            station_id: 3,
            product_id: 2,
            sub_product_id: None,
            quantity: 0.0,
            amount: None,
            actor_id: 1,
        };
        assert_eq!(
            validate_inward(&payload),
            Err(ValidationError::InvalidQuantity(0.0))
        );
    }
}
