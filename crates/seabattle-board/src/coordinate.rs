//! Grid coordinates written the way players type them: `A1`, `J10`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::BoardError;

/// A cell position: a column letter and a 1-based row number.
///
/// Coordinates are parsed without knowing the board they will be used on,
/// so `Z99` is a valid coordinate. Whether it lies on a particular board is
/// answered by [`Board::contains`](crate::Board::contains).
///
/// On the wire and in snapshots a coordinate is the plain string `"B7"`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Coordinate {
    col: char,
    row: u8,
}

impl Coordinate {
    /// Creates a coordinate. The column letter is upper-cased.
    pub fn new(col: char, row: u8) -> Self {
        Self {
            col: col.to_ascii_uppercase(),
            row,
        }
    }

    /// Column letter, always upper case.
    pub fn col(&self) -> char {
        self.col
    }

    /// Row number, starting at 1.
    pub fn row(&self) -> u8 {
        self.row
    }

    /// Parses `<letter><1-2 digits>`, e.g. `a1`, `C10`.
    ///
    /// Surrounding whitespace is ignored. Row `0` is rejected here since no
    /// board has it.
    pub fn parse(token: &str) -> Result<Self, BoardError> {
        let malformed = || BoardError::MalformedCoordinate(token.to_string());

        let token = token.trim();
        let mut chars = token.chars();
        let col = chars.next().filter(char::is_ascii_alphabetic).ok_or_else(malformed)?;

        let digits = chars.as_str();
        if digits.is_empty()
            || digits.len() > 2
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(malformed());
        }
        let row: u8 = digits.parse().map_err(|_| malformed())?;
        if row == 0 {
            return Err(malformed());
        }

        Ok(Self::new(col, row))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.col, self.row)
    }
}

impl FromStr for Coordinate {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Coordinate {
    type Error = BoardError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Coordinate> for String {
    fn from(value: Coordinate) -> Self {
        value.to_string()
    }
}
