//! Small input validation helpers shared by the domain crates.

use rust_decimal::Decimal;

use crate::error::{DomainError, DomainResult};

/// Require a non-blank string of at most `max` characters; returns it trimmed.
pub fn required_text(field: &str, value: &str, max: usize) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be blank")));
    }
    if trimmed.chars().count() > max {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Optional text: blank becomes `None`, otherwise bounded like [`required_text`].
pub fn optional_text(field: &str, value: Option<&str>, max: usize) -> DomainResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => required_text(field, v, max).map(Some),
    }
}

pub fn non_negative(field: &str, value: Decimal) -> DomainResult<Decimal> {
    if value < Decimal::ZERO {
        return Err(DomainError::validation(format!("{field} cannot be negative")));
    }
    Ok(value)
}

pub fn positive(field: &str, value: Decimal) -> DomainResult<Decimal> {
    if value <= Decimal::ZERO {
        return Err(DomainError::validation(format!("{field} must be greater than zero")));
    }
    Ok(value)
}

/// `a * b`, or a validation error naming `field` when the product does not fit.
pub fn checked_mul(field: &str, a: Decimal, b: Decimal) -> DomainResult<Decimal> {
    a.checked_mul(b)
        .ok_or_else(|| DomainError::validation(format!("{field} is out of range")))
}

/// `a + b`, or a validation error naming `field` on overflow.
pub fn checked_add(field: &str, a: Decimal, b: Decimal) -> DomainResult<Decimal> {
    a.checked_add(b)
        .ok_or_else(|| DomainError::validation(format!("{field} is out of range")))
}

/// Sum of `values`, failing instead of overflowing.
pub fn checked_sum(field: &str, values: impl IntoIterator<Item = Decimal>) -> DomainResult<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| checked_add(field, acc, v))
}

/// ISO-4217 style currency code (three ASCII letters), normalized to upper case.
pub fn currency(value: Option<&str>) -> DomainResult<String> {
    let code = value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or("USD");
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(DomainError::validation(format!(
            "currency '{code}' must be a three-letter code"
        )));
    }
    Ok(code.to_ascii_uppercase())
}

/// Custom attributes must be a JSON object when present.
pub fn attributes(value: Option<serde_json::Value>) -> DomainResult<Option<serde_json::Value>> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v @ serde_json::Value::Object(_)) => Ok(Some(v)),
        Some(_) => Err(DomainError::validation("customAttributes must be a JSON object")),
    }
}

/// Confidence scores from the ML pipeline are probabilities.
pub fn confidence(field: &str, value: f64) -> DomainResult<f64> {
    if !(0.0..=1.0).contains(&value) {
        return Err(DomainError::validation(format!("{field} must be between 0 and 1")));
    }
    Ok(value)
}
