//! Single-cell addresses and directional navigation.

use std::fmt;
use std::str::FromStr;

use crate::cell_ref::{col_to_letter, letter_to_col, quote_sheet_name, split_abs_ref, split_coord};
use crate::cell_ref::{MAX_COL, MAX_ROW};
use crate::direction::{Axis, Direction};
use crate::error::{Result, XlTemplateError};
use crate::grid::Grid;
use crate::types::CellValue;

/// A cell address, 1-based: column `1..=16384`, row `1..=1048576`.
///
/// Positions are plain values and carry no sheet; markers bind them to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    col: u32,
    row: u32,
}

impl Position {
    pub fn new(col: u32, row: u32) -> Result<Self> {
        Self::from_signed(i64::from(col), i64::from(row))
    }

    /// Validate possibly negative coordinates produced by arithmetic.
    pub(crate) fn from_signed(col: i64, row: i64) -> Result<Self> {
        let col = u32::try_from(col)
            .ok()
            .filter(|c| (1..=MAX_COL).contains(c))
            .ok_or_else(|| XlTemplateError::position(format!("Column index out of range: {col}")))?;
        let row = u32::try_from(row)
            .ok()
            .filter(|r| (1..=MAX_ROW).contains(r))
            .ok_or_else(|| XlTemplateError::position(format!("Row index out of range: {row}")))?;
        Ok(Self { col, row })
    }

    /// Build from column letters and a row (`("AB", 12)`).
    pub fn from_letters(letters: &str, row: u32) -> Result<Self> {
        let col = letter_to_col(letters)
            .ok_or_else(|| XlTemplateError::position(format!("Invalid column index: {letters}")))?;
        Self::new(col, row)
    }

    /// Parse an absolute reference such as `Sheet1!$A$4` or `'My Sheet'!$B$2`.
    ///
    /// Returns the position and the (unquoted) sheet name.
    pub fn from_abs_string(s: &str) -> Result<(Self, String)> {
        let invalid = || XlTemplateError::position(format!("Invalid position string: {s}"));
        let abs = split_abs_ref(s).ok_or_else(invalid)?;
        let row: u32 = abs.row.parse().map_err(|_| invalid())?;
        let pos = Self::from_letters(abs.col, row)?;
        Ok((pos, abs.sheet.replace("''", "'")))
    }

    /// Absolute form, `Sheet1!$A$4`.
    pub fn to_abs_string(&self, sheet: &str) -> String {
        format!(
            "{}!${}${}",
            quote_sheet_name(sheet),
            col_to_letter(self.col),
            self.row
        )
    }

    pub const fn col(&self) -> u32 {
        self.col
    }

    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Row index for `Axis::Row`, column index for `Axis::Column`.
    pub const fn coord(&self, axis: Axis) -> u32 {
        match axis {
            Axis::Row => self.row,
            Axis::Column => self.col,
        }
    }

    /// Move `distance` steps in `direction` (negative distances move backwards).
    pub fn shifted(&self, direction: Direction, distance: i64) -> Result<Self> {
        let (dc, dr) = direction.delta();
        let step = |from: u32, delta: i64| {
            delta
                .checked_mul(distance)
                .and_then(|d| i64::from(from).checked_add(d))
        };
        match (step(self.col, dc), step(self.row, dr)) {
            (Some(col), Some(row)) => Self::from_signed(col, row),
            _ => Err(XlTemplateError::position(format!(
                "Cannot shift {self} {direction} by {distance}"
            ))),
        }
    }

    pub fn shifted_one(&self, direction: Direction) -> Result<Self> {
        self.shifted(direction, 1)
    }

    /// Like [`shifted`](Self::shifted), with `None` when leaving the sheet.
    pub fn checked_shifted(&self, direction: Direction, distance: i64) -> Option<Self> {
        self.shifted(direction, distance).ok()
    }

    /// Signed number of `direction` steps from `self` to `other`.
    ///
    /// Only the component along `direction` counts, so for positions on the
    /// same line `self.shifted(d, self.dir_distance(&other, d)) == other`.
    pub fn dir_distance(&self, other: &Self, direction: Direction) -> i64 {
        let (dc, dr) = direction.delta();
        dc * (i64::from(other.col) - i64::from(self.col))
            + dr * (i64::from(other.row) - i64::from(self.row))
    }

    /// Keep this position's coordinate on `axis`, take `other`'s on the other axis.
    #[must_use]
    pub const fn combine(&self, axis: Axis, other: &Self) -> Self {
        match axis {
            Axis::Row => Self {
                col: other.col,
                row: self.row,
            },
            Axis::Column => Self {
                col: self.col,
                row: other.row,
            },
        }
    }

    /// Keep this position's coordinate on `axis`, use `index` on the other axis.
    pub fn combine_index(&self, axis: Axis, index: u32) -> Result<Self> {
        match axis {
            Axis::Row => Self::new(index, self.row),
            Axis::Column => Self::new(self.col, index),
        }
    }

    /// Inside the sheet's used range.
    pub fn is_in<G: Grid + ?Sized>(&self, grid: &G) -> bool {
        grid.sheet_bounds().contains(self.row, self.col)
    }

    /// No value, no comment and no applied style.
    pub fn is_cell_empty<G: Grid + ?Sized>(&self, grid: &G) -> bool {
        self.value(grid).is_none()
            && !grid.cell_has_comment(self.row, self.col)
            && !grid.cell_has_style(self.row, self.col)
    }

    /// Cell value, with empty text reported as no value.
    pub fn value<G: Grid + ?Sized>(&self, grid: &G) -> Option<CellValue> {
        grid.cell_value(self.row, self.col)
            .filter(|v| !v.is_empty_text())
    }

    pub fn set_value<G: Grid + ?Sized>(&self, grid: &mut G, value: Option<CellValue>) {
        grid.set_cell_value(self.row, self.col, value);
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", col_to_letter(self.col), self.row)
    }
}

impl FromStr for Position {
    type Err = XlTemplateError;

    /// Strict `B4` form: uppercase letters then digits, nothing else.
    fn from_str(s: &str) -> Result<Self> {
        let (letters, digits) = split_coord(s)
            .ok_or_else(|| XlTemplateError::position(format!("Invalid coord string: {s}")))?;
        let row: i64 = digits
            .parse()
            .map_err(|_| XlTemplateError::position(format!("Invalid coord string: {s}")))?;
        let col = letter_to_col(letters)
            .ok_or_else(|| XlTemplateError::position(format!("Invalid column index: {letters}")))?;
        Self::from_signed(i64::from(col), row)
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

    fn pos(s: &str) -> Position {
        s.parse().unwrap()
    }

    #[test_case("A1", 1, 1)]
    #[test_case("B3", 2, 3)]
    #[test_case("AB12", 28, 12)]
    #[test_case("XFD1048576", 16_384, 1_048_576)]
    fn test_parse_and_display(s: &str, col: u32, row: u32) {
        let p = pos(s);
        assert_eq!((p.col(), p.row()), (col, row));
        assert_eq!(p.to_string(), s);
        assert_eq!(Position::new(col, row).unwrap(), p);
    }

    #[test]
    fn test_from_letters() {
        assert_eq!(Position::from_letters("C", 6).unwrap(), pos("C6"));
        let err = Position::from_letters("#", 1).unwrap_err();
        assert_eq!(err.to_string(), "Invalid position: Invalid column index: #");
    }

    #[test_case("XFE1048576" ; "column past XFD")]
    #[test_case("A1048577" ; "row past max")]
    #[test_case("F" ; "no row")]
    #[test_case("#1" ; "bad letter")]
    #[test_case("A0" ; "row zero")]
    #[test_case("b4" ; "lowercase")]
    fn test_parse_errors(s: &str) {
        assert!(matches!(
            s.parse::<Position>(),
            Err(XlTemplateError::Position(_))
        ));
    }

    #[test]
    fn test_out_of_range_messages() {
        let err = Position::new(16_385, 1).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid position: Column index out of range: 16385"
        );
        let err = Position::new(1, 0).unwrap_err();
        assert_eq!(err.to_string(), "Invalid position: Row index out of range: 0");
    }

    #[test_case("Sheet1!$A$4", "A4", "Sheet1")]
    #[test_case("Sheet1!$B$3:$G$3", "B3", "Sheet1" ; "range resolves to its first corner")]
    #[test_case("SheetX!$ZA$115", "ZA115", "SheetX")]
    #[test_case("'My Sheet'!$B$2", "B2", "My Sheet")]
    fn test_from_abs_string(abs: &str, coord: &str, sheet: &str) {
        let (p, name) = Position::from_abs_string(abs).unwrap();
        assert_eq!(p, pos(coord));
        assert_eq!(name, sheet);
        assert_eq!(Position::from_abs_string(&p.to_abs_string(&name)).unwrap(), (p, name));
    }

    #[test_case("XYZ")]
    #[test_case("Sheet1!$A$B")]
    #[test_case("Sheet1!$A$0")]
    fn test_from_abs_string_errors(abs: &str) {
        assert!(Position::from_abs_string(abs).is_err());
    }

    #[test]
    fn test_shift_roundtrip() {
        let p = pos("D10");
        for d in Direction::ALL {
            for n in [0, 1, 3] {
                let moved = p.shifted(d, n).unwrap();
                assert_eq!(moved.shifted(d.opposite(), n).unwrap(), p);
                assert_eq!(moved.shifted(d, -n).unwrap(), p);
            }
        }
    }

    #[test]
    fn test_shift_off_sheet() {
        assert!(pos("A1").shifted_one(Direction::Up).is_err());
        assert!(pos("A1").checked_shifted(Direction::Left, 1).is_none());
        assert_eq!(
            pos("A1").checked_shifted(Direction::Right, 2),
            Some(pos("C1"))
        );
    }

    #[test_case(Direction::Down, i64::MAX ; "down by max")]
    #[test_case(Direction::Up, i64::MAX ; "up by max")]
    #[test_case(Direction::Right, i64::MIN ; "right by min")]
    #[test_case(Direction::Left, i64::MIN ; "left by min")]
    fn test_shift_extreme_distance(direction: Direction, distance: i64) {
        let err = pos("A1").shifted(direction, distance).unwrap_err();
        assert!(matches!(err, XlTemplateError::Position(_)), "{err}");
        assert!(pos("A1").checked_shifted(direction, distance).is_none());
    }

    #[test]
    fn test_dir_distance() {
        let a = pos("B3");
        let b = pos("B9");
        assert_eq!(a.dir_distance(&b, Direction::Down), 6);
        assert_eq!(a.dir_distance(&b, Direction::Up), -6);
        assert_eq!(a.dir_distance(&b, Direction::Right), 0);
        for d in Direction::ALL {
            let n = a.dir_distance(&b, d);
            if n != 0 {
                assert_eq!(a.shifted(d, n).unwrap(), b);
            }
        }
    }

    #[test]
    fn test_combine() {
        let cursor = pos("B7");
        let header = pos("E3");
        assert_eq!(cursor.combine(Axis::Row, &header), pos("E7"));
        assert_eq!(cursor.combine(Axis::Column, &header), pos("B3"));
        assert_eq!(cursor.combine_index(Axis::Row, 4).unwrap(), pos("D7"));
        assert_eq!(cursor.combine_index(Axis::Column, 1).unwrap(), pos("B1"));
        assert!(cursor.combine_index(Axis::Row, 0).is_err());
    }

    #[test]
    fn test_coord() {
        let p = pos("C5");
        assert_eq!(p.coord(Axis::Row), 5);
        assert_eq!(p.coord(Axis::Column), 3);
    }
}
