//! Request validation.

use txwatch_core::types::Address;

use crate::error::{ApiError, FieldError};

/// Check that `raw` is a `0x`-prefixed, 40-hex-digit address and return its
/// canonical lowercase form.
pub fn validate_address(raw: &str) -> Result<Address, ApiError> {
    if raw.is_empty() {
        return Err(ApiError::Validation(vec![FieldError::new(
            "`address` field is required",
        )]));
    }

    let valid = raw.len() == 42
        && (raw.starts_with("0x") || raw.starts_with("0X"))
        && raw[2..].bytes().all(|b| b.is_ascii_hexdigit());
    if !valid {
        return Err(ApiError::Validation(vec![FieldError::new(
            "the value of `address` field should be a 0x-prefixed 20-byte hex address",
        )]));
    }

    Ok(format!("0x{}", raw[2..].to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_and_lowercases() {
        let addr = validate_address("0xD8dA6BF26964aF9D7eEd9e03E53415D37aA96045").unwrap();
        assert_eq!(addr, "0xd8da6bf26964af9d7eed9e03e53415d37aa96045");
    }

    #[test]
    fn rejects_missing_and_malformed() {
        for raw in ["", "0x1234", "d8da6bf26964af9d7eed9e03e53415d37aa9604500", "0xzz000000000000000000000000000000000000zz"] {
            assert!(
                matches!(validate_address(raw), Err(ApiError::Validation(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn non_ascii_input_does_not_panic() {
        let raw = format!("0x{}é", "a".repeat(38));
        assert!(validate_address(&raw).is_err());
    }
}
