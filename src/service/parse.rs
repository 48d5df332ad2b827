//! ParseBook pipeline
//!
//! The ordered validation pipeline behind the service's single operation:
//! parse the free-text availability, parse the money fields, run the
//! validation predicates, then perform the atomic acceptance step against
//! the store. Every outcome is an explicit value; rejection never unwinds.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::book::{ParsedBook, RawBook};
use crate::domain::validation::{self, ValidationError};
use crate::infrastructure::book_store::{AcceptOutcome, BookStore, StoreError};

static AVAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((\d+) available\)").expect("availability pattern is valid"));

/// Why a record was not accepted.
#[derive(Debug, Error)]
pub enum ParseRejection {
    #[error("invalid availability: '{text}'")]
    UnparseableAvailability { text: String },

    #[error("invalid price or tax: '{price}', '{tax}'")]
    UnparseableMoney { price: String, tax: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("duplicate UPC {upc}")]
    Duplicate { upc: String },

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Parse the stock count out of the availability free text, which carries
/// it as "(N available)".
pub fn parse_availability(text: &str) -> Option<u32> {
    AVAIL_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
}

/// Assemble the typed record from the raw fields.
///
/// The [`ParsedBook`] is only constructed after every field has parsed and
/// every validation predicate has passed.
pub fn assemble_book(raw: &RawBook, base_url: &str) -> Result<ParsedBook, ParseRejection> {
    let availability = parse_availability(&raw.availability).ok_or_else(|| {
        warn!(upc = %raw.upc, text = %raw.availability, "could not parse availability");
        ParseRejection::UnparseableAvailability {
            text: raw.availability.clone(),
        }
    })?;

    let parsed_money = (
        raw.price_excl_tax.trim().parse::<f64>(),
        raw.tax.trim().parse::<f64>(),
    );
    let (price_excl_tax, tax) = match parsed_money {
        (Ok(price), Ok(tax)) => (price, tax),
        _ => {
            warn!(
                upc = %raw.upc,
                price = %raw.price_excl_tax,
                tax = %raw.tax,
                "invalid price or tax"
            );
            return Err(ParseRejection::UnparseableMoney {
                price: raw.price_excl_tax.clone(),
                tax: raw.tax.clone(),
            });
        }
    };

    if let Err(e) = validation::validate_book(
        &raw.name,
        &raw.upc,
        price_excl_tax,
        tax,
        availability,
        &raw.url,
        base_url,
    ) {
        warn!(upc = %raw.upc, error = %e, "validation failed");
        return Err(e.into());
    }

    Ok(ParsedBook {
        name: raw.name.clone(),
        upc: raw.upc.clone(),
        price_excl_tax,
        tax,
        availability,
        url: raw.url.clone(),
    })
}

/// The full `ParseBook` operation: assemble the typed record, then run the
/// atomic acceptance step against the store.
pub async fn parse_book(
    store: &BookStore,
    base_url: &str,
    raw: &RawBook,
) -> Result<ParsedBook, ParseRejection> {
    let book = assemble_book(raw, base_url)?;

    match store.accept(&book).await {
        Ok(AcceptOutcome::Accepted) => {
            info!(upc = %book.upc, name = %book.name, "stored record");
            Ok(book)
        }
        Ok(AcceptOutcome::Duplicate) => {
            warn!(upc = %book.upc, "duplicate UPC, skipping");
            Err(ParseRejection::Duplicate { upc: book.upc })
        }
        Err(e) => {
            warn!(upc = %book.upc, error = %e, "storage error");
            Err(e.into())
        }
    }
}
