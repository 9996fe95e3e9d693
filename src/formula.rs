//! Reference translation for formulas of cells that move.
//!
//! When lines are inserted or deleted, the cells that move keep their formula
//! text but every relative reference in it is shifted by the same offset, the
//! way a spreadsheet application treats a cut-and-paste. `$`-anchored parts
//! stay put. A reference pushed off the sheet becomes `#REF!`.

use crate::cell_ref::{col_to_letter, letter_to_col, MAX_COL, MAX_ROW};

/// A single-cell reference token such as `B4`, `$B4` or `$B$4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CellToken {
    col: u32,
    row: u32,
    col_abs: bool,
    row_abs: bool,
}

impl CellToken {
    fn parse(token: &str) -> Option<Self> {
        let (col_abs, rest) = match token.strip_prefix('$') {
            Some(rest) => (true, rest),
            None => (false, token),
        };
        let split = rest.find(|c: char| !c.is_ascii_alphabetic())?;
        let (letters, rest) = rest.split_at(split);
        let (row_abs, digits) = match rest.strip_prefix('$') {
            Some(digits) => (true, digits),
            None => (false, rest),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let col = letter_to_col(&letters.to_ascii_uppercase())?;
        let row: u32 = digits.parse().ok()?;
        if col > MAX_COL || row == 0 || row > MAX_ROW {
            return None;
        }
        Some(Self {
            col,
            row,
            col_abs,
            row_abs,
        })
    }

    fn translated(self, row_offset: i64, col_offset: i64) -> Option<String> {
        let shift = |value: u32, abs: bool, offset: i64, max: u32| -> Option<u32> {
            if abs {
                return Some(value);
            }
            u32::try_from(i64::from(value) + offset)
                .ok()
                .filter(|v| (1..=max).contains(v))
        };
        let col = shift(self.col, self.col_abs, col_offset, MAX_COL)?;
        let row = shift(self.row, self.row_abs, row_offset, MAX_ROW)?;
        Some(format!(
            "{}{}{}{}",
            if self.col_abs { "$" } else { "" },
            col_to_letter(col),
            if self.row_abs { "$" } else { "" },
            row
        ))
    }
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'$') || !b.is_ascii()
}

/// Shift the relative cell references of `formula` by the given offsets.
///
/// Text inside string literals and quoted sheet names is left alone, as are
/// function names (`LOG10(`) and sheet prefixes (`AB1!`).
pub fn translate_formula(formula: &str, row_offset: i64, col_offset: i64) -> String {
    if row_offset == 0 && col_offset == 0 {
        return formula.to_string();
    }

    let bytes = formula.as_bytes();
    let mut out = String::with_capacity(formula.len());
    let mut flushed = 0;
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while let Some(&b) = bytes.get(i) {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        if b == b'"' || b == b'\'' {
            quote = Some(b);
            i += 1;
            continue;
        }

        let at_boundary = i == 0 || bytes.get(i - 1).is_some_and(|&p| !is_word_byte(p));
        if at_boundary && (b == b'$' || b.is_ascii_alphabetic()) {
            let mut end = i;
            while bytes.get(end).is_some_and(|&c| is_word_byte(c)) {
                end += 1;
            }
            let followed_by = bytes.get(end).copied();
            let token = formula
                .get(i..end)
                .filter(|_| !matches!(followed_by, Some(b'(' | b'!')))
                .and_then(CellToken::parse);
            if let Some(token) = token {
                out.push_str(formula.get(flushed..i).unwrap_or_default());
                match token.translated(row_offset, col_offset) {
                    Some(moved) => out.push_str(&moved),
                    None => out.push_str("#REF!"),
                }
                flushed = end;
            }
            i = end;
            continue;
        }
        i += 1;
    }

    out.push_str(formula.get(flushed..).unwrap_or_default());
    out
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

    #[test_case("A1", 1, 0, "A2" ; "plain row shift")]
    #[test_case("A1", 0, 2, "C1" ; "plain column shift")]
    #[test_case("SUM(B2:B9)", 3, 0, "SUM(B5:B12)" ; "range inside function")]
    #[test_case("$A$1+A1", 5, 5, "$A$1+F6" ; "anchored untouched")]
    #[test_case("$A1*A$1", 2, 2, "$A3*C$1" ; "mixed anchors")]
    #[test_case("A2-1", -1, 0, "A1-1" ; "negative shift")]
    #[test_case("A1", -1, 0, "#REF!" ; "off the top")]
    #[test_case("LOG10(A1)", 1, 0, "LOG10(A2)" ; "function name kept")]
    #[test_case("\"A1\"&A1", 1, 0, "\"A1\"&A2" ; "string literal kept")]
    #[test_case("'Q1 A1'!B2+Sheet2!C3", 1, 0, "'Q1 A1'!B3+Sheet2!C4" ; "sheet prefixes kept")]
    #[test_case("my_name+A1", 1, 0, "my_name+A2" ; "defined name kept")]
    fn test_translate(formula: &str, rows: i64, cols: i64, expected: &str) {
        assert_eq!(translate_formula(formula, rows, cols), expected);
    }

    #[test]
    fn test_zero_offset_is_identity() {
        assert_eq!(translate_formula("A1+'x'!B2", 0, 0), "A1+'x'!B2");
    }

    #[test]
    fn test_non_ascii_preserved() {
        assert_eq!(translate_formula("\"ü\"&Ä1&B1", 1, 0), "\"ü\"&Ä1&B2");
    }
}
