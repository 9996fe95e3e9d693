//! Rectangular cell regions.

use std::fmt;
use std::str::FromStr;

use crate::direction::Direction;
use crate::error::{Result, XlTemplateError};
use crate::position::Position;

/// An inclusive rectangle of cells, always normalized (`min <= max`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    min_row: u32,
    max_row: u32,
    min_col: u32,
    max_col: u32,
}

impl Range {
    /// Bounds outside the sheet fail with a position error, inverted bounds
    /// with a range error.
    pub fn new(min_row: u32, max_row: u32, min_col: u32, max_col: u32) -> Result<Self> {
        Self::from_signed(
            i64::from(min_row),
            i64::from(max_row),
            i64::from(min_col),
            i64::from(max_col),
        )
    }

    fn from_signed(min_row: i64, max_row: i64, min_col: i64, max_col: i64) -> Result<Self> {
        let top_left = Position::from_signed(min_col, min_row)?;
        let bottom_right = Position::from_signed(max_col, max_row)?;
        if top_left.row() > bottom_right.row() {
            return Err(XlTemplateError::range(format!(
                "min_row {min_row} > max_row {max_row}"
            )));
        }
        if top_left.col() > bottom_right.col() {
            return Err(XlTemplateError::range(format!(
                "min_col {min_col} > max_col {max_col}"
            )));
        }
        Ok(Self {
            min_row: top_left.row(),
            max_row: bottom_right.row(),
            min_col: top_left.col(),
            max_col: bottom_right.col(),
        })
    }

    /// Smallest range covering both corners, given in any order.
    pub fn from_positions(a: Position, b: Position) -> Self {
        Self {
            min_row: a.row().min(b.row()),
            max_row: a.row().max(b.row()),
            min_col: a.col().min(b.col()),
            max_col: a.col().max(b.col()),
        }
    }

    pub const fn min_row(&self) -> u32 {
        self.min_row
    }

    pub const fn max_row(&self) -> u32 {
        self.max_row
    }

    pub const fn min_col(&self) -> u32 {
        self.min_col
    }

    pub const fn max_col(&self) -> u32 {
        self.max_col
    }

    pub fn is_inside(&self, pos: &Position) -> bool {
        (self.min_row..=self.max_row).contains(&pos.row())
            && (self.min_col..=self.max_col).contains(&pos.col())
    }

    /// Move the edge facing `direction` outward by `n` cells.
    ///
    /// A negative `n` is treated as `|n|` in the opposite direction, so
    /// `extended(Left, -1)` equals `extended(Right, 1)`.
    pub fn extended(&self, direction: Direction, n: i64) -> Result<Self> {
        let overflow =
            || XlTemplateError::position(format!("Cannot extend {self} {direction} by {n}"));
        let (direction, n) = if n < 0 {
            (direction.opposite(), n.checked_neg().ok_or_else(overflow)?)
        } else {
            (direction, n)
        };
        let (mut min_row, mut max_row) = (i64::from(self.min_row), i64::from(self.max_row));
        let (mut min_col, mut max_col) = (i64::from(self.min_col), i64::from(self.max_col));
        let edge = match direction {
            Direction::Up => &mut min_row,
            Direction::Down => &mut max_row,
            Direction::Left => &mut min_col,
            Direction::Right => &mut max_col,
        };
        let step = if direction.is_forward() { n } else { -n };
        *edge = edge.checked_add(step).ok_or_else(overflow)?;
        Self::from_signed(min_row, max_row, min_col, max_col)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}{}",
            crate::cell_ref::col_to_letter(self.min_col),
            self.min_row,
            crate::cell_ref::col_to_letter(self.max_col),
            self.max_row
        )
    }
}

impl FromStr for Range {
    type Err = XlTemplateError;

    /// `A1:C3`; the corners may come in any order.
    fn from_str(s: &str) -> Result<Self> {
        let (a, b) = s
            .split_once(':')
            .ok_or_else(|| XlTemplateError::range(format!("Invalid range string: {s}")))?;
        Ok(Self::from_positions(a.parse()?, b.parse()?))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn rg(s: &str) -> Range {
        s.parse().unwrap()
    }

    fn pos(s: &str) -> Position {
        s.parse().unwrap()
    }

    #[test_case("A1", "C3" ; "ordered corners")]
    #[test_case("C3", "A1" ; "reversed corners")]
    #[test_case("A3", "C1" ; "crossed corners")]
    fn test_from_positions(a: &str, b: &str) {
        assert_eq!(Range::from_positions(pos(a), pos(b)).to_string(), "A1:C3");
    }

    #[test_case("A1:D10")]
    #[test_case("D10:XFD1048576")]
    #[test_case("B2:B2")]
    fn test_string_roundtrip(s: &str) {
        assert_eq!(rg(s).to_string(), s);
    }

    #[test]
    fn test_new_errors() {
        assert!(matches!(
            Range::new(10, 5, 1, 2),
            Err(XlTemplateError::Range(_))
        ));
        assert!(matches!(
            Range::new(1, 2, 10, 5),
            Err(XlTemplateError::Range(_))
        ));
        assert!(matches!(
            Range::new(0, 2, 5, 10),
            Err(XlTemplateError::Position(_))
        ));
        assert_eq!(Range::new(2, 10, 2, 4).unwrap(), rg("B2:D10"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "A1".parse::<Range>(),
            Err(XlTemplateError::Range(_))
        ));
        assert!(matches!(
            "A1:ZZZZ1".parse::<Range>(),
            Err(XlTemplateError::Position(_))
        ));
    }

    #[test]
    fn test_is_inside() {
        let r = rg("B2:D10");
        assert!(r.is_inside(&pos("B6")));
        assert!(r.is_inside(&pos("D10")));
        assert!(!r.is_inside(&pos("A1")));
        assert!(!r.is_inside(&pos("E2")));
    }

    #[test_case(Direction::Right, 1, "B2:E10")]
    #[test_case(Direction::Down, 1, "B2:D11")]
    #[test_case(Direction::Up, 1, "B1:D10")]
    #[test_case(Direction::Left, 1, "A2:D10")]
    #[test_case(Direction::Down, -1, "B1:D10" ; "negative flips to the opposite edge")]
    #[test_case(Direction::Right, 0, "B2:D10" ; "zero is identity")]
    fn test_extended(direction: Direction, n: i64, expected: &str) {
        assert_eq!(rg("B2:D10").extended(direction, n).unwrap(), rg(expected));
    }

    #[test_case(Direction::Up, i64::MIN ; "negative min")]
    #[test_case(Direction::Down, i64::MAX ; "positive max")]
    #[test_case(Direction::Left, i64::MAX ; "left max")]
    fn test_extended_extreme(direction: Direction, n: i64) {
        assert!(matches!(
            rg("B2:D10").extended(direction, n),
            Err(XlTemplateError::Position(_))
        ));
    }

    #[test]
    fn test_negative_matches_opposite() {
        let r = rg("B2:D10");
        assert_eq!(
            r.extended(Direction::Left, -1).unwrap(),
            r.extended(Direction::Right, 1).unwrap()
        );
    }

    #[test]
    fn test_extended_errors() {
        assert!(matches!(
            rg("A1:B2").extended(Direction::Up, 1),
            Err(XlTemplateError::Position(_))
        ));
        assert!(matches!(
            rg("XFD1:XFD1").extended(Direction::Left, -1),
            Err(XlTemplateError::Position(_))
        ));
    }
}
