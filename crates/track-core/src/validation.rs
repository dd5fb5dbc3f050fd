//! # Validation Module
//!
//! Input validation for the billing engine's operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                           │
//! │                                                                  │
//! │  Layer 1: Caller (terminal UI, API layer - out of scope here)    │
//! │           │                                                      │
//! │           ▼                                                      │
//! │  Layer 2: THIS MODULE - shape checks before business logic       │
//! │           │                                                      │
//! │           ▼                                                      │
//! │  Layer 3: Engine guards - state machine, stock, capabilities     │
//! │                                                                  │
//! │  Defense in depth: each layer catches different mistakes         │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{ValidationError, ValidationResult};
use crate::{MAX_PARTY_SIZE, MAX_SERVICE_QUANTITY};

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a party size (people on the track under one ticket).
///
/// ## Rules
/// - Must be at least 1
/// - Must not exceed MAX_PARTY_SIZE
pub fn validate_party_size(party_size: i64) -> ValidationResult<()> {
    if party_size < 1 || party_size > MAX_PARTY_SIZE {
        return Err(ValidationError::OutOfRange {
            field: "party_size".to_string(),
            min: 1,
            max: MAX_PARTY_SIZE,
        });
    }
    Ok(())
}

/// Validates a service quantity against the absolute ceiling.
///
/// The per-service `max_per_ticket` limit is a business rule the engine
/// checks separately; this only rejects nonsense input.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if qty > MAX_SERVICE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_SERVICE_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a price in cents.
///
/// ## Rules
/// - Must be non-negative (zero is allowed: complimentary services exist)
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a discount percent (0-100).
pub fn validate_discount_percent(percent: u32) -> ValidationResult<()> {
    if percent > 100 {
        return Err(ValidationError::OutOfRange {
            field: "discount_percent".to_string(),
            min: 0,
            max: 100,
        });
    }
    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a free-form reason string (cancellations).
///
/// ## Returns
/// The trimmed reason.
pub fn validate_reason(reason: &str) -> ValidationResult<String> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }
    if reason.len() > 500 {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: 500,
        });
    }

    Ok(reason.to_string())
}

/// Validates a UUID string format.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_party_size() {
        assert!(validate_party_size(1).is_ok());
        assert!(validate_party_size(8).is_ok());
        assert!(validate_party_size(MAX_PARTY_SIZE).is_ok());

        assert!(validate_party_size(0).is_err());
        assert!(validate_party_size(-1).is_err());
        assert!(validate_party_size(MAX_PARTY_SIZE + 1).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_SERVICE_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(MAX_SERVICE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_price_cents() {
        assert!(validate_price_cents(0).is_ok());
        assert!(validate_price_cents(15000).is_ok());
        assert!(validate_price_cents(-1).is_err());
    }

    #[test]
    fn test_validate_reason_trims() {
        assert_eq!(validate_reason("  cliente se retiró  ").unwrap(), "cliente se retiró");
        assert!(validate_reason("").is_err());
        assert!(validate_reason("   ").is_err());
        assert!(validate_reason(&"x".repeat(501)).is_err());
    }

    #[test]
    fn test_validate_discount_percent() {
        assert!(validate_discount_percent(0).is_ok());
        assert!(validate_discount_percent(15).is_ok());
        assert!(validate_discount_percent(100).is_ok());
        assert!(validate_discount_percent(101).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
