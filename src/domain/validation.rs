//! Validation predicates for book records.
//!
//! Pure checks over the typed fields of a record. Every predicate must hold
//! before the parser service persists a record; the first failing predicate
//! rejects the whole record.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Maximum accepted length of a book name, in characters.
pub const MAX_NAME_LENGTH: usize = 256;

// UPC must be exactly 16 alphanumeric characters
static UPC_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{16}$").expect("UPC pattern is valid"));

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("invalid Name: empty string")]
    EmptyName,

    #[error("invalid Name: too long ({length} chars)")]
    NameTooLong { length: usize },

    #[error("invalid UPC format or length: '{upc}' (must be 16 alphanumeric characters)")]
    InvalidUpcFormat { upc: String },

    #[error("invalid {field}: negative value {value}")]
    NegativePriceOrTax { field: &'static str, value: f64 },

    #[error("invalid Availability: negative amount {amount}")]
    NegativeAvailability { amount: i64 },

    #[error("invalid URL: outside base domain '{url}'")]
    UrlOutsideBaseDomain { url: String },
}

/// Name must be non-empty and at most [`MAX_NAME_LENGTH`] characters.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    let length = name.chars().count();
    if length > MAX_NAME_LENGTH {
        return Err(ValidationError::NameTooLong { length });
    }
    Ok(())
}

/// UPC must match the 16-character alphanumeric format exactly.
pub fn validate_upc(upc: &str) -> Result<(), ValidationError> {
    if !UPC_PATTERN.is_match(upc) {
        return Err(ValidationError::InvalidUpcFormat {
            upc: upc.to_string(),
        });
    }
    Ok(())
}

/// Price and tax values must be finite and non-negative.
pub fn validate_price_tax(value: f64, field: &'static str) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::NegativePriceOrTax { field, value });
    }
    Ok(())
}

/// Availability must be a non-negative amount.
pub fn validate_availability(amount: i64) -> Result<(), ValidationError> {
    if amount < 0 {
        return Err(ValidationError::NegativeAvailability { amount });
    }
    Ok(())
}

/// The record's URL must start with the configured base URL, verbatim.
pub fn validate_url(url: &str, base_url: &str) -> Result<(), ValidationError> {
    if !url.starts_with(base_url) {
        return Err(ValidationError::UrlOutsideBaseDomain {
            url: url.to_string(),
        });
    }
    Ok(())
}

/// Run every predicate over the typed fields of a record, reporting the
/// first failure.
pub fn validate_book(
    name: &str,
    upc: &str,
    price_excl_tax: f64,
    tax: f64,
    availability: u32,
    url: &str,
    base_url: &str,
) -> Result<(), ValidationError> {
    validate_name(name)?;
    validate_upc(upc)?;
    validate_price_tax(price_excl_tax, "Price_excl_tax")?;
    validate_price_tax(tax, "Tax")?;
    validate_availability(i64::from(availability))?;
    validate_url(url, base_url)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_name_is_rejected() {
        assert_eq!(validate_name(""), Err(ValidationError::EmptyName));
    }

    #[test]
    fn overlong_name_is_rejected() {
        let name = "A".repeat(300);
        assert_eq!(
            validate_name(&name),
            Err(ValidationError::NameTooLong { length: 300 })
        );
    }

    #[test]
    fn name_length_boundaries() {
        assert!(validate_name(&"A".repeat(256)).is_ok());
        assert!(validate_name(&"A".repeat(257)).is_err());
        assert!(validate_name("A").is_ok());
    }

    #[test]
    fn name_length_counts_characters_not_bytes() {
        // 256 two-byte characters is 512 bytes but still within bounds
        let name = "é".repeat(256);
        assert!(validate_name(&name).is_ok());
    }

    #[test]
    fn upc_requires_exactly_16_alphanumerics() {
        assert!(validate_upc("A1B2C3D4E5F6G7H8").is_ok());
        assert!(validate_upc("").is_err());
        assert!(validate_upc("123").is_err());
        assert!(validate_upc("INVALID!@#%^").is_err());
        assert!(validate_upc("A1B2C3D4E5F6G7H").is_err()); // 15 chars
        assert!(validate_upc("A1B2C3D4E5F6G7H89").is_err()); // 17 chars
        assert!(validate_upc("A1B2C3D4E5F6G7H!").is_err()); // symbol
    }

    #[test]
    fn negative_price_or_tax_is_rejected() {
        assert!(validate_price_tax(-1.0, "Price_excl_tax").is_err());
        assert!(validate_price_tax(0.0, "Price_excl_tax").is_ok());
        assert!(validate_price_tax(12.34, "Tax").is_ok());
    }

    #[test]
    fn non_finite_price_is_rejected() {
        assert!(validate_price_tax(f64::NAN, "Price_excl_tax").is_err());
        assert!(validate_price_tax(f64::INFINITY, "Tax").is_err());
    }

    #[test]
    fn negative_availability_is_rejected() {
        assert!(validate_availability(-5).is_err());
        assert!(validate_availability(0).is_ok());
        assert!(validate_availability(10).is_ok());
    }

    #[test]
    fn url_must_be_inside_base_domain() {
        let base = "https://books.toscrape.com/";
        assert!(validate_url("https://books.toscrape.com/x", base).is_ok());
        assert!(validate_url("https://other.com/x", base).is_err());
        // Prefix match is verbatim, scheme included
        assert!(validate_url("http://books.toscrape.com/x", base).is_err());
    }

    #[test]
    fn validate_book_accepts_a_fully_valid_record() {
        assert!(
            validate_book(
                "Book",
                "1234567890ABCDEF",
                10.0,
                2.0,
                3,
                "https://books.toscrape.com/foo",
                "https://books.toscrape.com/",
            )
            .is_ok()
        );
    }

    proptest! {
        #[test]
        fn names_within_bounds_are_accepted(name in "[a-zA-Z0-9 ]{1,256}") {
            prop_assert!(validate_name(&name).is_ok());
        }

        #[test]
        fn sixteen_alphanumerics_are_always_valid_upcs(upc in "[A-Za-z0-9]{16}") {
            prop_assert!(validate_upc(&upc).is_ok());
        }

        #[test]
        fn other_lengths_are_never_valid_upcs(upc in "[A-Za-z0-9]{0,15}|[A-Za-z0-9]{17,32}") {
            prop_assert!(validate_upc(&upc).is_err());
        }

        #[test]
        fn non_negative_amounts_pass(value in 0.0f64..1e9) {
            prop_assert!(validate_price_tax(value, "Price_excl_tax").is_ok());
        }

        #[test]
        fn negative_amounts_fail(value in -1e9f64..-0.0001) {
            prop_assert!(validate_price_tax(value, "Tax").is_err());
        }
    }
}
