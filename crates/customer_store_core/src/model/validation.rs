//! Field validation shared by every entity write path.

use super::{AddressId, CustomerId};
use thiserror::Error;

/// Entity state that must not reach storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{entity}.{field} is required")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },
    #[error("{entity}.{field} must be at most {max} characters, got {actual}")]
    FieldTooLong {
        entity: &'static str,
        field: &'static str,
        max: usize,
        actual: usize,
    },
    #[error("nil uuid is not a valid {entity} id")]
    NilId { entity: &'static str },
    #[error("address {address} belongs to customer {owner}, not {customer}")]
    ForeignAddress {
        address: AddressId,
        owner: CustomerId,
        customer: CustomerId,
    },
}

/// Checks one required, length-limited text field.
///
/// Whitespace-only values count as missing.
pub(crate) fn require_text(
    entity: &'static str,
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField { entity, field });
    }

    let actual = value.chars().count();
    if actual > max {
        return Err(ValidationError::FieldTooLong {
            entity,
            field,
            max,
            actual,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{require_text, ValidationError};

    #[test]
    fn blank_values_are_missing() {
        assert_eq!(
            require_text("address", "name", "   ", 20),
            Err(ValidationError::MissingField {
                entity: "address",
                field: "name"
            })
        );
    }

    #[test]
    fn limits_count_characters_not_bytes() {
        assert!(require_text("address", "zip_code", "ÄÖÜäöüßéèà", 10).is_ok());
        assert_eq!(
            require_text("address", "zip_code", "12345678901", 10),
            Err(ValidationError::FieldTooLong {
                entity: "address",
                field: "zip_code",
                max: 10,
                actual: 11
            })
        );
    }
}
