//! Structured error types for xltemplate.
//!
//! Every failure is raised where it is detected and handed back to the caller
//! unchanged; nothing in the crate retries.

/// All errors that can occur while resolving markers, processing tables or
/// loading/saving workbooks.
#[derive(Debug, thiserror::Error)]
pub enum XlTemplateError {
    /// Malformed or out-of-range coordinate, unresolvable marker or a
    /// position that belongs to another sheet.
    #[error("Invalid position: {0}")]
    Position(String),

    /// Malformed or inverted rectangle.
    #[error("Invalid range: {0}")]
    Range(String),

    /// One or more table headers could not be found.
    #[error("Could not find table headers: {}", .missing.join(", "))]
    TableParse {
        /// Unmatched field names in declaration order.
        missing: Vec<String>,
    },

    /// The sheet layout does not allow inserting/removing the space a write needs.
    #[error("Cannot adjust table space: {0}")]
    Structure(String),

    /// Invalid marker pattern.
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Unknown sheet in the workbook model.
    #[error("Sheet not found: {0}")]
    Sheet(String),

    /// XML parsing error from quick-xml.
    #[error("XML parsing: {0}")]
    Xml(#[from] quick_xml::Error),

    /// ZIP archive error.
    #[error("ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// JSON (de)serialization error.
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, XlTemplateError>;

impl XlTemplateError {
    pub(crate) fn position(msg: impl Into<String>) -> Self {
        Self::Position(msg.into())
    }

    pub(crate) fn range(msg: impl Into<String>) -> Self {
        Self::Range(msg.into())
    }

    pub(crate) fn structure(msg: impl Into<String>) -> Self {
        Self::Structure(msg.into())
    }
}
