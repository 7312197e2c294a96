use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AddressError;

/// Zero-based spreadsheet coordinate, written in A1 notation
/// (`A`..`Z`, `AA`.. for columns; 1-based row numbers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CellAddress {
    pub column: usize,
    pub row: usize,
}

impl CellAddress {
    pub fn new(column: usize, row: usize) -> Self {
        CellAddress { column, row }
    }

    /// Parse `[A-Za-z]+[0-9]+`, case-insensitively.
    pub fn parse(text: &str) -> Result<CellAddress, AddressError> {
        let invalid = || AddressError::InvalidAddress(text.to_string());

        let split = text
            .find(|c: char| !c.is_ascii_alphabetic())
            .ok_or_else(invalid)?;
        let (letters, digits) = text.split_at(split);
        if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let column = column_index(letters).ok_or_else(invalid)?;
        let row_number: usize = digits.parse().map_err(|_| invalid())?;
        if row_number == 0 {
            return Err(invalid());
        }
        Ok(CellAddress {
            column,
            row: row_number - 1,
        })
    }

    /// Canonical uppercase A1 text. Every address formats, but one built by
    /// hand past what [`CellAddress::parse`] accepts does not parse back.
    pub fn format(&self) -> String {
        format!("{}{}", column_letters(self.column), self.row as u128 + 1)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl FromStr for CellAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellAddress::parse(s.trim())
    }
}

impl TryFrom<String> for CellAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CellAddress> for String {
    fn from(a: CellAddress) -> Self {
        a.format()
    }
}

/// Bijective base-26 letters for a zero-based column index (0 → `A`, 26 → `AA`).
pub fn column_letters(index: usize) -> String {
    let mut out = Vec::new();
    let mut n = index;
    loop {
        out.push(b'A' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Zero-based column index for letters like `B` or `aa`. `None` for empty,
/// non-alphabetic, or overflowing input.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut n: usize = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        let digit = (b.to_ascii_uppercase() - b'A') as usize + 1;
        n = n.checked_mul(26)?.checked_add(digit)?;
    }
    Some(n - 1)
}
