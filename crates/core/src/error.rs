//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Failure raised by a domain rule.
///
/// Lookups and access control are not domain rules: missing records are
/// reported by the store, and role checks by `demeter-auth`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or out-of-range input (blank SKU, non-positive quantity).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation would break a stock or lifecycle rule (overdraw, expired batch).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier did not parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The record is in a state that forbids the transition (completing a cancelled sale).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        assert_eq!(
            DomainError::validation("sku cannot be blank").to_string(),
            "validation failed: sku cannot be blank"
        );
        assert_eq!(
            DomainError::invariant("quantity cannot go negative").to_string(),
            "invariant violated: quantity cannot go negative"
        );
        assert_eq!(
            DomainError::conflict("sale S-1 is CANCELLED").to_string(),
            "conflict: sale S-1 is CANCELLED"
        );
    }
}
