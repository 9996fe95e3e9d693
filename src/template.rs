//! A loaded `.xlsx` template ready to be filled and saved.
//!
//! `Template` keeps the original bytes next to the parsed [`Workbook`] so that
//! saving only rewrites the sheets that were handed out for modification.

use std::collections::HashSet;
use std::path::Path;

use crate::error::{Result, XlTemplateError};
use crate::export::save_xlsx;
use crate::grid::Worksheet;
use crate::parser;
use crate::types::Workbook;

pub struct Template {
    original_bytes: Vec<u8>,
    workbook: Workbook,
    dirty_sheets: HashSet<usize>,
}

impl Template {
    /// Parse a template from XLSX bytes.
    pub fn load(data: Vec<u8>) -> Result<Self> {
        let workbook = parser::parse(&data)?;
        tracing::debug!(sheets = workbook.sheets.len(), "template loaded");
        Ok(Self {
            original_bytes: data,
            workbook,
            dirty_sheets: HashSet::new(),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::load(std::fs::read(path)?)
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    /// Grid over a sheet whose changes are not tracked: they are dropped at
    /// save unless the sheet is also marked with [`Template::mark_dirty`].
    ///
    /// Meant for reading; use [`Template::worksheet_mut`] to fill a sheet.
    pub fn worksheet_untracked(&mut self, name: &str) -> Result<Worksheet<'_>> {
        self.workbook.worksheet(name)
    }

    /// Grid over a sheet whose changes will be saved.
    pub fn worksheet_mut(&mut self, name: &str) -> Result<Worksheet<'_>> {
        let idx = self.index_of(name)?;
        self.dirty_sheets.insert(idx);
        self.workbook.worksheet_at(idx)
    }

    pub fn mark_dirty(&mut self, name: &str) -> Result<()> {
        let idx = self.index_of(name)?;
        self.dirty_sheets.insert(idx);
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty_sheets.is_empty()
    }

    /// XLSX bytes with every dirty sheet rewritten.
    pub fn save(&self) -> Result<Vec<u8>> {
        save_xlsx(&self.original_bytes, &self.workbook, &self.dirty_sheets)
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.save()?)?;
        Ok(())
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.workbook
            .sheet_index(name)
            .ok_or_else(|| XlTemplateError::Sheet(name.to_string()))
    }
}
