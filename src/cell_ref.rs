//! Utilities for parsing Excel-style cell references and ranges.
//!
//! All indices here are 1-based, the way they appear in references: column
//! `A` is 1 and the first row is 1.

/// Highest column index of a worksheet (`XFD`).
pub const MAX_COL: u32 = 16_384;

/// Highest row index of a worksheet.
pub const MAX_ROW: u32 = 1_048_576;

/// Convert a 1-based column index into its letter form (`1` → `A`, `28` → `AB`).
///
/// Returns an empty string for `0`.
pub fn col_to_letter(col: u32) -> String {
    let mut result = String::new();
    let mut n = col;
    while n > 0 {
        n -= 1;
        let c = char::from(b'A' + u8::try_from(n % 26).unwrap_or(0));
        result.insert(0, c);
        n /= 26;
    }
    result
}

/// Convert column letters into a 1-based index (`A` → 1, `XFD` → 16384).
///
/// Only uppercase ASCII letters are accepted, at most three of them. The
/// result is not bounds-checked beyond that.
pub fn letter_to_col(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut col: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_uppercase() {
            return None;
        }
        col = col * 26 + u32::from(b - b'A') + 1;
    }
    Some(col)
}

/// Split a strict coordinate like `B4` into its letter and digit parts.
///
/// No `$` anchors, whitespace or sheet prefix are allowed.
pub fn split_coord(coord: &str) -> Option<(&str, &str)> {
    let split = coord.find(|c: char| !c.is_ascii_uppercase())?;
    let (letters, digits) = coord.split_at(split);
    if letters.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((letters, digits))
}

/// Parse a cell reference like "A1" or "$B$10" into 1-based (col, row).
///
/// Lenient: `$` anchors are skipped and lowercase letters accepted. Used for
/// references read from worksheet XML.
pub fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    parse_cell_ref_bytes(cell_ref.trim().as_bytes())
}

/// Parse a cell reference from raw bytes (ASCII) into 1-based (col, row).
///
/// This is the bytes equivalent of [`parse_cell_ref`] for use when working with
/// raw XML attribute values (e.g., `attr.value` from quick-xml).
pub fn parse_cell_ref_bytes(ref_bytes: &[u8]) -> Option<(u32, u32)> {
    let mut col: u32 = 0;
    let mut row: u32 = 0;
    let mut saw_col = false;
    let mut saw_row = false;

    for &b in ref_bytes {
        if b == b'$' {
            continue;
        }
        if b.is_ascii_alphabetic() {
            if saw_row {
                return None;
            }
            let upper = b.to_ascii_uppercase();
            col = col.saturating_mul(26).saturating_add(u32::from(upper - b'A') + 1);
            saw_col = true;
        } else if b.is_ascii_digit() {
            row = row.saturating_mul(10).saturating_add(u32::from(b - b'0'));
            saw_row = true;
        } else {
            return None;
        }
    }

    if !saw_col || !saw_row || col == 0 || row == 0 {
        return None;
    }

    Some((col, row))
}

/// Components of an absolute reference such as `Sheet1!$A$4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbsRef<'a> {
    /// Sheet name with surrounding quotes removed (doubled quotes are kept as written).
    pub sheet: &'a str,
    /// Column letters.
    pub col: &'a str,
    /// Row digits.
    pub row: &'a str,
}

/// Split an absolute reference `sheet!$COL$ROW`.
///
/// Both `$` anchors are required, the sheet may be quoted (`'My Sheet'!$B$3`).
/// A range (`Sheet1!$B$3:$G$3`) yields its first corner.
pub fn split_abs_ref(reference: &str) -> Option<AbsRef<'_>> {
    let (sheet_part, cell_part) = reference.trim().rsplit_once('!')?;
    let sheet = match sheet_part
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
    {
        Some(quoted) => quoted,
        None => sheet_part,
    };
    if sheet.is_empty() {
        return None;
    }

    let (first, last) = match cell_part.split_once(':') {
        Some((first, last)) => (first, Some(last)),
        None => (cell_part, None),
    };
    let (col, row) = split_anchored(first)?;
    if let Some(last) = last {
        split_anchored(last)?;
    }
    Some(AbsRef { sheet, col, row })
}

/// `$COL$ROW` into its letter and digit parts.
fn split_anchored(cell: &str) -> Option<(&str, &str)> {
    let (col, row) = cell.strip_prefix('$')?.split_once('$')?;
    if col.is_empty()
        || row.is_empty()
        || !col.bytes().all(|b| b.is_ascii_alphabetic())
        || !row.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    Some((col, row))
}

/// Quote a sheet name for use in a reference when it needs it.
pub fn quote_sheet_name(name: &str) -> String {
    let plain = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if plain && !name.is_empty() {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
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

    #[test_case(1, "A")]
    #[test_case(26, "Z")]
    #[test_case(27, "AA")]
    #[test_case(28, "AB")]
    #[test_case(702, "ZZ")]
    #[test_case(703, "AAA")]
    #[test_case(MAX_COL, "XFD")]
    fn test_col_letters(col: u32, letters: &str) {
        assert_eq!(col_to_letter(col), letters);
        assert_eq!(letter_to_col(letters), Some(col));
    }

    #[test]
    fn test_letter_to_col_rejects() {
        assert_eq!(letter_to_col(""), None);
        assert_eq!(letter_to_col("a"), None);
        assert_eq!(letter_to_col("#"), None);
        assert_eq!(letter_to_col("ABCD"), None);
    }

    #[test]
    fn test_split_coord() {
        assert_eq!(split_coord("B4"), Some(("B", "4")));
        assert_eq!(split_coord("XFD1048576"), Some(("XFD", "1048576")));
        assert_eq!(split_coord("F"), None);
        assert_eq!(split_coord("12"), None);
        assert_eq!(split_coord("$A$1"), None);
        assert_eq!(split_coord("A1B"), None);
    }

    #[test]
    fn test_parse_cell_ref() {
        assert_eq!(parse_cell_ref("A1"), Some((1, 1)));
        assert_eq!(parse_cell_ref("$C$10"), Some((3, 10)));
        assert_eq!(parse_cell_ref("ab12"), Some((28, 12)));
        assert_eq!(parse_cell_ref("A"), None);
        assert_eq!(parse_cell_ref("1A"), None);
    }

    #[test]
    fn test_split_abs_ref() {
        let r = split_abs_ref("Sheet1!$A$4").unwrap();
        assert_eq!((r.sheet, r.col, r.row), ("Sheet1", "A", "4"));

        let r = split_abs_ref("'My Sheet'!$ZA$115").unwrap();
        assert_eq!((r.sheet, r.col, r.row), ("My Sheet", "ZA", "115"));

        let r = split_abs_ref("Sheet1!$B$3:$G$3").unwrap();
        assert_eq!((r.sheet, r.col, r.row), ("Sheet1", "B", "3"));
        assert!(split_abs_ref("Sheet1!$B$3:G3").is_none());
        assert!(split_abs_ref("Sheet1!$B$3:").is_none());

        assert!(split_abs_ref("XYZ").is_none());
        assert!(split_abs_ref("Sheet1!$A$B").is_none());
        assert!(split_abs_ref("Sheet1!A4").is_none());
    }

    #[test]
    fn test_quote_sheet_name() {
        assert_eq!(quote_sheet_name("Sheet1"), "Sheet1");
        assert_eq!(quote_sheet_name("My Sheet"), "'My Sheet'");
        assert_eq!(quote_sheet_name("O'Brien"), "'O''Brien'");
    }
}
