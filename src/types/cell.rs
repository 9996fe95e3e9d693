use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

/// A cell's value as stored in the grid.
///
/// Absence of a value is modelled as `Option<CellValue>::None`, never as an
/// empty string: setting `Text("")` on a sheet clears the value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    /// Error literal such as `#DIV/0!`.
    Error(String),
}

impl CellValue {
    /// Whether this is a text value with no characters.
    pub fn is_empty_text(&self) -> bool {
        matches!(self, Self::Text(s) if s.is_empty())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) | Self::Error(s) => f.write_str(s),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Bool(true) => f.write_str("TRUE"),
            Self::Bool(false) => f.write_str("FALSE"),
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Integral numbers print without a fractional part (`42`, not `42.0`).
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        Self::DateTime(dt)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        Self::DateTime(d.and_time(chrono::NaiveTime::MIN))
    }
}

/// A comment (note) attached to a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// The author of the comment (if available)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// The plain text content of the comment
    pub text: String,
}

/// A single cell: value plus the non-value properties that make it "occupied".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<CellValue>,
    /// Formula text without the leading `=` (preserved for roundtrip save).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
    /// Style index into the workbook's `cellXfs`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_idx: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<Comment>,
}

impl Cell {
    /// Style 0 is the workbook default and does not count as applied.
    pub fn has_style(&self) -> bool {
        self.style_idx.is_some_and(|s| s != 0)
    }

    pub fn has_comment(&self) -> bool {
        self.comment.is_some()
    }

    /// No value, no comment and no applied style.
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && !self.has_comment() && !self.has_style()
    }

    /// Whether the cell can be dropped from sparse storage.
    pub(crate) fn is_vacant(&self) -> bool {
        self.is_empty() && self.formula.is_none() && self.style_idx.is_none()
    }
}
