//! In-memory sheet model and name-marker handling.
//!
//! The engine never touches file formats; a reading collaborator hands it
//! [`Workbook`] values, each an ordered set of named [`Sheet`] grids of raw
//! cell strings. This module owns:
//!
//! - **Grid access**: bounds-tolerant cell reads (ragged trailing cells
//!   normalize to `""`).
//! - **Name markers**: the ignore prefixes, the column-orientation
//!   prefixes, and the `#` suffix separator stripped before sheet matching.
//! - **Comment lines**: recognition of secondary-axis lines whose leading
//!   cell starts with a comment prefix.
//! - **The [`WorkbookSource`] seam**: the engine drains one workbook at a
//!   time so each backing file can be opened, parsed, and released before
//!   the next is considered.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A sheet with this name prefix is excluded entirely.
pub const SHEET_IGNORE_MARKERS: [char; 2] = ['~', '#'];
/// Either prefix marks a sheet as column-oriented (axes swapped).
pub const COLUMN_MARKERS: [char; 2] = ['!', '@'];
/// Text after this separator is ignored when matching sheet or header names.
pub const NAME_SUFFIX_SEPARATOR: char = '#';
/// A header with either prefix drops that column/row from grouping.
pub const HEADER_IGNORE_MARKERS: [char; 2] = ['~', '#'];
/// A line whose leading cell starts with either prefix is a comment line.
pub const COMMENT_PREFIXES: [&str; 2] = ["//", "--"];

/// Which axis carries the headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    /// Headers in the first usable row, one record per subsequent row.
    #[default]
    RowMajor,
    /// Headers in the first usable column, one record per subsequent column.
    ColumnMajor,
}

/// Control markers parsed out of a raw sheet name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTag {
    pub ignored: bool,
    pub orientation: Option<Orientation>,
    /// Name with markers and the `#` suffix stripped, used for slot matching.
    pub base: String,
}

pub fn parse_sheet_name(raw: &str) -> SheetTag {
    let trimmed = raw.trim();
    if trimmed.starts_with(SHEET_IGNORE_MARKERS) {
        return SheetTag {
            ignored: true,
            orientation: None,
            base: String::new(),
        };
    }
    let (orientation, rest) = match trimmed.strip_prefix(COLUMN_MARKERS) {
        Some(rest) => (Some(Orientation::ColumnMajor), rest),
        None => (None, trimmed),
    };
    let base = rest
        .split(NAME_SUFFIX_SEPARATOR)
        .next()
        .unwrap_or("")
        .trim()
        .to_string();
    SheetTag {
        ignored: false,
        orientation,
        base,
    }
}

/// A rectangular grid of raw cell strings with a raw (marker-carrying) name.
#[derive(Debug, Clone)]
pub struct Sheet {
    name: String,
    rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    /// The name as authored, markers included.
    pub fn raw_name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> SheetTag {
        parse_sheet_name(&self.name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row; ragged rows read as `""` past their end.
    pub fn col_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Orientation-resolving view over a sheet.
///
/// `primary` indexes header positions, `secondary` indexes record positions,
/// regardless of how the grid is stored.
#[derive(Clone, Copy)]
pub(crate) struct AxisView<'a> {
    sheet: &'a Sheet,
    orientation: Orientation,
}

impl<'a> AxisView<'a> {
    pub(crate) fn new(sheet: &'a Sheet, orientation: Orientation) -> Self {
        Self { sheet, orientation }
    }

    pub(crate) fn primary_len(&self) -> usize {
        match self.orientation {
            Orientation::RowMajor => self.sheet.col_count(),
            Orientation::ColumnMajor => self.sheet.row_count(),
        }
    }

    pub(crate) fn secondary_len(&self) -> usize {
        match self.orientation {
            Orientation::RowMajor => self.sheet.row_count(),
            Orientation::ColumnMajor => self.sheet.col_count(),
        }
    }

    pub(crate) fn cell(&self, primary: usize, secondary: usize) -> &'a str {
        match self.orientation {
            Orientation::RowMajor => self.sheet.cell(secondary, primary),
            Orientation::ColumnMajor => self.sheet.cell(primary, secondary),
        }
    }

    /// A line is a comment when its leading cell carries a comment prefix.
    pub(crate) fn is_comment_line(&self, secondary: usize) -> bool {
        let lead = self.cell(0, secondary).trim_start();
        COMMENT_PREFIXES.iter().any(|p| lead.starts_with(p))
    }
}

/// One source file's worth of sheets, in authored order.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    name: String,
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sheets: Vec::new(),
        }
    }

    pub fn with_sheets(name: impl Into<String>, sheets: Vec<Sheet>) -> Self {
        Self {
            name: name.into(),
            sheets,
        }
    }

    pub fn push(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }
}

/// The reading collaborator's seam.
///
/// Implementations own file discovery, skip policy, and format decoding.
/// The engine pulls one workbook at a time and drops it before requesting
/// the next, so a source can scope each file handle to a single call.
pub trait WorkbookSource {
    fn next_workbook(&mut self) -> Result<Option<Workbook>>;
}
