//! Opaque pagination cursors.
//!
//! A cursor is the base64 encoding (standard alphabet, padded) of the decimal
//! text of a row offset: offset `10` is the text `"10"`, encoded `"MTA="`.

use crate::error::{OrmError, OrmResult};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest page a single request may fetch.
pub const MAX_PAGE_SIZE: u64 = 100;

/// An encoded row position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    /// Encode a row position.
    ///
    /// Positions are signed because the end cursor of an empty page sits one
    /// before its start cursor.
    pub fn encode(position: i64) -> Self {
        Self(STANDARD.encode(position.to_string()))
    }

    /// Encode a non-negative offset.
    pub fn from_offset(offset: u64) -> Self {
        Self(STANDARD.encode(offset.to_string()))
    }

    /// Decode back to a non-negative offset.
    pub fn offset(&self) -> OrmResult<u64> {
        decode(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Cursor> for String {
    fn from(cursor: Cursor) -> Self {
        cursor.0
    }
}

/// Decode an encoded cursor string to its offset.
///
/// Accepts padded or unpadded, standard or URL-safe base64. Anything that does
/// not decode to the canonical decimal text of a non-negative integer (as
/// produced by [`encode`]) is an [`OrmError::InvalidCursor`].
pub fn decode(encoded: &str) -> OrmResult<u64> {
    let bytes = [STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD]
        .iter()
        .find_map(|engine| engine.decode(encoded).ok())
        .ok_or_else(|| OrmError::invalid_cursor(encoded, "not valid base64"))?;

    let text = String::from_utf8(bytes)
        .map_err(|_| OrmError::invalid_cursor(encoded, "payload is not UTF-8"))?;

    if !is_canonical_offset(&text) {
        return Err(OrmError::invalid_cursor(
            encoded,
            format!("'{}' is not a non-negative offset", text),
        ));
    }
    text.parse::<u64>().map_err(|_| OrmError::invalid_cursor(encoded, "offset out of range"))
}

/// Decimal digits only, without a sign, whitespace or leading zeros.
fn is_canonical_offset(text: &str) -> bool {
    let digits = !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit());
    digits && (text == "0" || !text.starts_with('0'))
}

/// Encode an offset as a cursor string.
pub fn encode(offset: u64) -> String {
    Cursor::from_offset(offset).into()
}
