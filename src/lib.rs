//! xltemplate - table templating for XLSX workbooks
//!
//! Locates tables in a worksheet through symbolic markers and reads or writes
//! typed records while keeping the rest of the sheet's layout intact:
//! - Coordinate algebra ([`Position`], [`Range`], [`Direction`])
//! - Markers resolving literal cells, defined names and pattern searches
//! - Fuzzy header discovery with blank tolerance
//! - Writes that insert or delete whole rows/columns to fit the new record count
//! - XLSX load and save that only rewrites modified sheets
//!
//! # Usage
//!
//! ```no_run
//! use xltemplate::{FieldType, Marker, Schema, Table, TableOptions, Template};
//!
//! # fn main() -> xltemplate::Result<()> {
//! let mut template = Template::from_file("report.xlsx")?;
//! let mut sheet = template.worksheet_mut("Sheet1")?;
//! let schema = Schema::new()
//!     .field("first_name", FieldType::Text)
//!     .field("height", FieldType::Float);
//! let marker = Marker::named("table_people");
//! let mut table = Table::new(&mut sheet, &marker, schema, TableOptions::default())?;
//! let mut records = table.read().to_vec();
//! records.truncate(1);
//! table.set_records(records);
//! table.write()?;
//! template.save_to("out.xlsx")?;
//! # Ok(())
//! # }
//! ```

pub mod cell_ref;
pub mod comments;
pub mod config;
pub mod direction;
pub mod error;
pub mod export;
pub mod formula;
pub mod grid;
pub mod marker;
pub mod numfmt;
pub mod parser;
pub mod position;
pub mod range;
pub mod table;
pub mod template;
pub mod types;
pub mod workbook_meta;
pub mod xml_helpers;

pub use config::{MarkerSpec, TableSpec};
pub use direction::{Axis, Direction};
pub use error::{Result, XlTemplateError};
pub use grid::{Grid, SheetBounds, Worksheet};
pub use marker::Marker;
pub use position::Position;
pub use range::Range;
pub use table::{Field, FieldType, FieldValue, Record, Schema, Table, TableOptions};
pub use template::Template;
pub use types::*;

/// Get the library version
#[must_use]
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
