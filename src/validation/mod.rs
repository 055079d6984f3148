use sqlx::types::BigDecimal;
use std::fmt;

pub const REFERENCE_MAX_LEN: usize = 64;
pub const PHONE_MIN_LEN: usize = 10;
pub const PHONE_MAX_LEN: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_amount(field: &'static str, amount: &BigDecimal) -> ValidationResult {
    if amount <= &BigDecimal::from(0) {
        return Err(ValidationError::new(field, "must be greater than zero"));
    }

    Ok(())
}

pub fn validate_reference(reference: &str) -> ValidationResult {
    let reference = sanitize_string(reference);
    if reference.is_empty() {
        return Err(ValidationError::new("reference", "must not be empty"));
    }

    if reference.len() > REFERENCE_MAX_LEN {
        return Err(ValidationError::new(
            "reference",
            format!("must be at most {} characters", REFERENCE_MAX_LEN),
        ));
    }

    Ok(())
}

/// MSISDN in international format without the plus, e.g. 2348012345678.
pub fn validate_recipient_phone(phone: &str) -> ValidationResult {
    let phone = sanitize_string(phone);

    if phone.len() < PHONE_MIN_LEN || phone.len() > PHONE_MAX_LEN {
        return Err(ValidationError::new(
            "recipient_phone",
            format!(
                "must be between {} and {} digits",
                PHONE_MIN_LEN, PHONE_MAX_LEN
            ),
        ));
    }

    if !phone.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ValidationError::new(
            "recipient_phone",
            "must contain only digits",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_validate_amount_positive() {
        let amount = BigDecimal::from_str("50.00").unwrap();
        assert!(validate_amount("amount", &amount).is_ok());
    }

    #[test]
    fn test_validate_amount_zero_rejected() {
        assert!(validate_amount("amount", &BigDecimal::from(0)).is_err());
    }

    #[test]
    fn test_validate_amount_negative_rejected() {
        let amount = BigDecimal::from_str("-1.00").unwrap();
        assert!(validate_amount("amount", &amount).is_err());
    }

    #[test]
    fn test_validate_recipient_phone_ok() {
        assert!(validate_recipient_phone("2348012345678").is_ok());
    }

    #[test]
    fn test_validate_recipient_phone_too_short() {
        assert!(validate_recipient_phone("080123").is_err());
    }

    #[test]
    fn test_validate_recipient_phone_non_digit() {
        assert!(validate_recipient_phone("23480123456ab").is_err());
    }

    #[test]
    fn test_validate_reference_empty() {
        assert!(validate_reference("").is_err());
        assert!(validate_reference("   ").is_err());
    }

    #[test]
    fn test_sanitize_strips_control_chars() {
        assert_eq!(sanitize_string("DEP-\u{0000}1\n  x"), "DEP-1 x");
    }
}
