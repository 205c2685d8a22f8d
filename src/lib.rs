//! Typed binding engine for spreadsheet-style tabular data.
//!
//! `sheetbind` turns in-memory sheets of raw cell strings into
//! strongly-typed records and places them into a destination container:
//! headers are grouped by base name (repeated `hp#1`/`hp#2` columns feed
//! one multi-valued field), cells are coerced through a layered parser
//! stack with default-value recovery, each record derives a key, and slots
//! of shape single/list/array/map receive the results under an explicit
//! duplicate-key policy.
//!
//! File formats are a collaborator's concern: implement [`WorkbookSource`]
//! (or hand over [`Workbook`] values directly) and register record types
//! with [`RecordSchema`] and containers with [`ContainerSchema`], an
//! explicit, built-once registration surface in place of run-time type
//! inspection.

pub mod convert;
pub mod error;
pub mod header;
pub mod loader;
pub mod record;
pub mod sheet;
pub mod slot;

pub use convert::{CellParse, FieldOptions, Vec2, Vec3, parse_enum};
pub use error::BindError;
pub use header::{HeaderGroups, HeaderLayout, RowTuple, group_headers, row_tuples};
pub use loader::ContainerSchema;
pub use record::RecordSchema;
pub use sheet::{Orientation, Sheet, SheetTag, Workbook, WorkbookSource, parse_sheet_name};
pub use slot::{DuplicatePolicy, SheetBinding, SlotShape};
