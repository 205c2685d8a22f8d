//! Load orchestration: sheet-to-slot matching and the load loop.
//!
//! A [`ContainerSchema`] registers every destination slot of a container
//! type, then drives workbooks through the pipeline: header grouping,
//! row-tuple extraction, record materialization, and slot placement.
//! Processing order (workbook, then sheet, then row) is deterministic;
//! it defines both "last value wins" and fallback-key semantics.

use std::rc::Rc;

use anyhow::{Context, Result};
use log::debug;

use crate::error::BindError;
use crate::header;
use crate::record::RecordSchema;
use crate::sheet::{Orientation, Sheet, Workbook, WorkbookSource};
use crate::slot::{SheetBinding, SlotShape};

pub struct ContainerSchema<C> {
    slots: Vec<Slot<C>>,
}

struct Slot<C> {
    field: String,
    binding: SheetBinding,
    #[allow(clippy::type_complexity)]
    ingest: Box<dyn Fn(&mut C, &Sheet, &str, Orientation) -> Result<(), BindError>>,
    populated: Box<dyn Fn(&mut C) -> bool>,
}

impl<C> Default for ContainerSchema<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ContainerSchema<C> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Registers one destination slot: the container field's name, its
    /// binding declaration, the record schema shared by every slot of that
    /// record type, and the storage shape.
    pub fn slot<R>(
        mut self,
        field: impl Into<String>,
        binding: SheetBinding,
        schema: Rc<RecordSchema<R>>,
        shape: SlotShape<C, R>,
    ) -> Self
    where
        R: Default + 'static,
        C: 'static,
    {
        let field = field.into();
        let field_for_ingest = field.clone();
        let policy = binding.duplicates;
        let shape = Rc::new(shape);
        let shape_for_populated = shape.clone();

        let ingest = Box::new(
            move |container: &mut C, sheet: &Sheet, base_name: &str, orientation: Orientation| {
                let Some(layout) = header::group_headers(sheet, orientation) else {
                    return Ok(());
                };
                for tuple in header::row_tuples(sheet, orientation, &layout) {
                    let (key, record) = schema.materialize(&tuple, base_name)?;
                    shape.bind(
                        container,
                        key.as_deref(),
                        record,
                        base_name,
                        &field_for_ingest,
                        policy,
                    )?;
                }
                Ok(())
            },
        );
        let populated = Box::new(move |container: &mut C| shape_for_populated.is_populated(container));

        self.slots.push(Slot {
            field,
            binding,
            ingest,
            populated,
        });
        self
    }

    /// Runs one workbook through every matching slot.
    ///
    /// Sheets with an ignore marker are skipped; each remaining sheet is
    /// offered to every slot whose declared sheet name (or field name)
    /// matches its stripped base name. Orientation comes from the sheet's
    /// name marker, else the slot's override, else row-major.
    pub fn load_workbook(&self, container: &mut C, book: &Workbook) -> Result<(), BindError> {
        for sheet in book.sheets() {
            let tag = sheet.tag();
            if tag.ignored {
                debug!(
                    "workbook '{}': sheet '{}' carries an ignore marker; skipped",
                    book.name(),
                    sheet.raw_name()
                );
                continue;
            }
            for slot in &self.slots {
                let declared = slot.binding.sheet.as_deref().unwrap_or(&slot.field);
                if !declared.eq_ignore_ascii_case(&tag.base) {
                    continue;
                }
                debug!(
                    "workbook '{}': sheet '{}' -> field '{}'",
                    book.name(),
                    tag.base,
                    slot.field
                );
                let orientation = tag
                    .orientation
                    .or(slot.binding.orientation)
                    .unwrap_or_default();
                (slot.ingest)(container, sheet, &tag.base, orientation)?;
            }
        }
        Ok(())
    }

    /// Final pass: every non-optional slot must have been written at least
    /// once across all loads.
    pub fn finish(&self, container: &mut C) -> Result<(), BindError> {
        for slot in &self.slots {
            if !slot.binding.optional && !(slot.populated)(container) {
                return Err(BindError::MissingSheet {
                    field: slot.field.clone(),
                });
            }
        }
        Ok(())
    }

    /// Loads a fixed set of workbooks, then runs the final required-slot
    /// pass.
    pub fn load_all(&self, container: &mut C, books: &[Workbook]) -> Result<(), BindError> {
        for book in books {
            self.load_workbook(container, book)?;
        }
        self.finish(container)
    }

    /// Drains a [`WorkbookSource`] one workbook at a time, so the source
    /// can scope each backing file to a single call, then runs the final
    /// pass.
    pub fn load_source<S>(&self, container: &mut C, source: &mut S) -> Result<()>
    where
        S: WorkbookSource,
    {
        loop {
            let Some(book) = source.next_workbook().context("reading next workbook")? else {
                break;
            };
            self.load_workbook(container, &book)
                .with_context(|| format!("loading workbook '{}'", book.name()))?;
        }
        self.finish(container).context("verifying required fields")?;
        Ok(())
    }
}
