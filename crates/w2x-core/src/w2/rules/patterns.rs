//! Common regex patterns for W-2 value shapes.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // US monetary amount: optional $, plain or comma-grouped digits, up to 2 decimals
    pub static ref CURRENCY: Regex = Regex::new(
        r"^\$?\s*(\d{1,3}(?:,\d{3})+|\d+)(?:\.(\d{1,2}))?$"
    ).unwrap();

    // Amount written without symbols or grouping
    pub static ref PLAIN_AMOUNT: Regex = Regex::new(
        r"^\d+(?:\.\d{1,2})?$"
    ).unwrap();

    pub static ref PERCENTAGE: Regex = Regex::new(
        r"^(\d{1,3}(?:\.\d+)?)\s*%?$"
    ).unwrap();

    // Separators tolerated inside EIN/SSN-like identifiers
    pub static ref IDENTIFIER_SEPARATORS: Regex = Regex::new(
        r"[\s\-./]"
    ).unwrap();

    pub static ref WHITESPACE_RUN: Regex = Regex::new(
        r"\s+"
    ).unwrap();

    // Amount bleeding into a name from the neighbouring box, and whatever follows it
    pub static ref TRAILING_AMOUNT: Regex = Regex::new(
        r"\s+\$?\d[\d,]*\.\d{2}\b.*$"
    ).unwrap();
}
