use serde::{Deserialize, Serialize};

/// Raw book record as extracted from a product detail page.
///
/// All fields are the untrimmed-of-meaning strings the page carried; nothing
/// has been type-checked yet. This is the request payload of the parser
/// service's `ParseBook` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBook {
    pub name: String,
    pub upc: String,
    pub price_excl_tax: String,
    pub tax: String,
    /// Free text containing the stock count, e.g. "In stock (22 available)".
    pub availability: String,
    pub url: String,
}

/// Validated book record, as acknowledged to the crawler and appended to the
/// durable log.
///
/// The serde names are the canonical field names of the JSONL log format.
/// The parser service only builds one of these after every field has been
/// parsed and every validation predicate has passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedBook {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "UPC")]
    pub upc: String,
    #[serde(rename = "Price_excl_tax")]
    pub price_excl_tax: f64,
    #[serde(rename = "Tax")]
    pub tax: f64,
    #[serde(rename = "Availability")]
    pub availability: u32,
    #[serde(rename = "URL")]
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_book_uses_log_field_names() {
        let book = ParsedBook {
            name: "Sharp Objects".to_string(),
            upc: "e00eb4fd7b871a48".to_string(),
            price_excl_tax: 47.82,
            tax: 0.0,
            availability: 20,
            url: "https://books.toscrape.com/catalogue/sharp-objects_997/index.html"
                .to_string(),
        };

        let line = serde_json::to_string(&book).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["Name"], "Sharp Objects");
        assert_eq!(value["UPC"], "e00eb4fd7b871a48");
        assert_eq!(value["Price_excl_tax"], 47.82);
        assert_eq!(value["Tax"], 0.0);
        assert_eq!(value["Availability"], 20);
        assert_eq!(
            value["URL"],
            "https://books.toscrape.com/catalogue/sharp-objects_997/index.html"
        );
    }

    #[test]
    fn parsed_book_round_trips_through_log_line() {
        let line = r#"{"Name":"Soumission","UPC":"f77dbf2323deb740","Price_excl_tax":50.1,"Tax":0.0,"Availability":20,"URL":"https://books.toscrape.com/catalogue/soumission_998/index.html"}"#;
        let book: ParsedBook = serde_json::from_str(line).unwrap();
        assert_eq!(book.upc, "f77dbf2323deb740");
        assert_eq!(book.availability, 20);
    }
}
