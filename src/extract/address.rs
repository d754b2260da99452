use serde::Serialize;
use tracing::{debug, warn};

use crate::TARGET_CONVERTER;

/// Outcome of reading the city/state/postal-code line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AddressStatus {
    Parsed,
    /// No address lines at all.
    Missing,
    /// The last line had an unexpected comma shape; holds that line.
    Unrecognized(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedAddress {
    /// The line immediately preceding the city/state/postal-code line.
    pub mail_address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub status: AddressStatus,
}

impl ParsedAddress {
    fn empty(status: AddressStatus) -> Self {
        ParsedAddress {
            mail_address: String::new(),
            city: String::new(),
            state: String::new(),
            postal_code: String::new(),
            status,
        }
    }

    pub fn is_parsed(&self) -> bool {
        self.status == AddressStatus::Parsed
    }
}

/// Parses address lines whose last non-empty line reads `City, ST ZIP`.
///
/// A trailing line repeated after a second comma (`Fort Worth, TX 76177, TX
/// 76177`) is a known artifact of the source and is read as its two-segment
/// form. Any other shape leaves city, state and postal code empty and is
/// reported; it is never an error.
pub fn parse_address<S: AsRef<str>>(lines: &[S]) -> ParsedAddress {
    let lines: Vec<&str> = lines
        .iter()
        .map(|l| l.as_ref().trim())
        .filter(|l| !l.is_empty())
        .collect();

    let Some((last, street)) = lines.split_last() else {
        debug!(target: TARGET_CONVERTER, "No address lines to parse");
        return ParsedAddress::empty(AddressStatus::Missing);
    };

    let mut address = ParsedAddress::empty(AddressStatus::Parsed);
    address.mail_address = street.last().map(|s| s.to_string()).unwrap_or_default();

    let segments: Vec<&str> = last.split(',').map(str::trim).collect();
    let (city, state_zip) = match segments.as_slice() {
        [city, state_zip] => (*city, *state_zip),
        [city, state_zip, repeated] if state_zip == repeated => (*city, *state_zip),
        _ => {
            warn!(target: TARGET_CONVERTER, "Unrecognized address format: {}", last);
            address.status = AddressStatus::Unrecognized(last.to_string());
            return address;
        }
    };

    let tokens: Vec<&str> = state_zip.split_whitespace().collect();
    match tokens.split_last() {
        Some((zip, state)) if !state.is_empty() => {
            address.postal_code = zip.to_string();
            address.state = state.join(" ");
        }
        Some((only, _)) if only.chars().all(|c| c.is_ascii_digit() || c == '-') => {
            address.postal_code = only.to_string();
        }
        Some((only, _)) => {
            address.state = only.to_string();
        }
        None => {
            warn!(target: TARGET_CONVERTER, "Address line has no state or postal code: {}", last);
        }
    }
    address.city = city.to_string();
    address
}
