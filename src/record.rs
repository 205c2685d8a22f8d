//! Record descriptors and materialization.
//!
//! A [`RecordSchema`] is the explicit, built-once registration that replaces
//! run-time type inspection: it enumerates a record type's bindable fields
//! (setter closures plus [`FieldOptions`]), its multi-column composites, and
//! an optional key function. Materializing a row tuple applies the coercion
//! engine per field, captures the fallback key, then resolves composites
//! and the final key.

use anyhow::Result;
use log::error;

use crate::convert::{self, CellParse, Diag, FieldOptions};
use crate::error::BindError;
use crate::header::RowTuple;

pub struct RecordSchema<R> {
    name: String,
    fields: Vec<FieldBinding<R>>,
    composites: Vec<CompositeBinding<R>>,
    key_fn: Option<Box<dyn Fn(&R) -> String>>,
}

struct FieldBinding<R> {
    field: String,
    /// Column name matched against row-tuple keys: the override if one was
    /// declared, else the field's own name.
    column: String,
    ignore: bool,
    required: bool,
    #[allow(clippy::type_complexity)]
    apply: Box<dyn Fn(&mut R, &[String], &str) -> Result<FieldOutcome, BindError>>,
}

struct CompositeBinding<R> {
    columns: Vec<String>,
    apply: Box<dyn Fn(&mut R, &[&str], &str)>,
}

pub(crate) struct FieldOutcome {
    defaulted: bool,
    key_text: Option<String>,
}

impl<R> RecordSchema<R> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            composites: Vec::new(),
            key_fn: None,
        }
    }

    /// Label used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers one bindable field: its column match name, coercion
    /// options, and a setter. Registration order is the field order used
    /// for fallback-key capture.
    pub fn field<T, F>(mut self, name: impl Into<String>, options: FieldOptions<T>, setter: F) -> Self
    where
        T: CellParse + Clone + 'static,
        F: Fn(&mut R, T) + 'static,
    {
        let field = name.into();
        let column = options.column.clone().unwrap_or_else(|| field.clone());
        let ignore = options.ignore;
        let required = options.required;
        let diag_field = field.clone();
        let apply = Box::new(move |record: &mut R, cells: &[String], sheet: &str| {
            let diag = Diag {
                sheet,
                field: &diag_field,
            };
            let converted = convert::convert_cells(cells, &options, &diag);
            if !converted.defaulted {
                convert::validate(&converted.value, &options, &diag)?;
            }
            let key_text = if converted.defaulted {
                None
            } else {
                converted.value.as_text()
            };
            let outcome = FieldOutcome {
                defaulted: converted.defaulted,
                key_text,
            };
            setter(record, converted.value);
            Ok(outcome)
        });
        self.fields.push(FieldBinding {
            field,
            column,
            ignore,
            required,
            apply,
        });
        self
    }

    /// Registers a multi-column composite: the value is built by `parser`
    /// from the first raw string of every referenced column group, applied
    /// only when all referenced columns are present in the row tuple.
    pub fn multi<T, P, F>(
        mut self,
        name: impl Into<String>,
        columns: &[&str],
        parser: P,
        setter: F,
    ) -> Self
    where
        T: 'static,
        P: Fn(&[&str]) -> Result<T> + 'static,
        F: Fn(&mut R, T) + 'static,
    {
        let field = name.into();
        let apply = Box::new(move |record: &mut R, values: &[&str], sheet: &str| {
            match parser(values) {
                Ok(value) => setter(record, value),
                Err(err) => error!(
                    "sheet '{sheet}': composite field '{field}' failed to parse {values:?}: {err}"
                ),
            }
        });
        self.composites.push(CompositeBinding {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            apply,
        });
        self
    }

    /// Key-deriving operation; when present its result always wins over
    /// the fallback key.
    pub fn key<F>(mut self, key_fn: F) -> Self
    where
        F: Fn(&R) -> String + 'static,
    {
        self.key_fn = Some(Box::new(key_fn));
        self
    }

    /// Builds one record from a row tuple, returning its derived key.
    ///
    /// The fallback key is the text of the first field, in registration
    /// order, that received a non-default value; the key function, when
    /// registered, supersedes it after every field is set. A record with
    /// neither has no key.
    pub(crate) fn materialize(
        &self,
        tuple: &RowTuple,
        sheet: &str,
    ) -> Result<(Option<String>, R), BindError>
    where
        R: Default,
    {
        let mut record = R::default();
        let mut fallback: Option<String> = None;

        for binding in &self.fields {
            if binding.ignore {
                continue;
            }
            let matched = tuple
                .iter()
                .find(|(base, _)| base.eq_ignore_ascii_case(&binding.column));
            let Some((_, cells)) = matched else {
                if binding.required {
                    return Err(BindError::RequiredColumn {
                        sheet: sheet.to_string(),
                        field: binding.field.clone(),
                        column: binding.column.clone(),
                    });
                }
                continue;
            };
            let outcome = (binding.apply)(&mut record, cells, sheet)?;
            if fallback.is_none()
                && !outcome.defaulted
                && let Some(text) = outcome.key_text
            {
                fallback = Some(text);
            }
        }

        for composite in &self.composites {
            let mut firsts = Vec::with_capacity(composite.columns.len());
            let complete = composite.columns.iter().all(|column| {
                match tuple
                    .iter()
                    .find(|(base, _)| base.eq_ignore_ascii_case(column))
                    .and_then(|(_, cells)| cells.first())
                {
                    Some(first) => {
                        firsts.push(first.as_str());
                        true
                    }
                    None => false,
                }
            });
            // Partial matches are skipped, not errors.
            if !complete {
                continue;
            }
            (composite.apply)(&mut record, &firsts, sheet);
        }

        let key = match &self.key_fn {
            Some(key_fn) => Some(key_fn(&record)),
            None => fallback,
        };
        Ok((key, record))
    }
}
