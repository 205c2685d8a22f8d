use thiserror::Error;

/// Unrecoverable load failures.
///
/// Everything else the engine encounters (unparsable cells, undersized
/// sheets, partially-matched composites) is recovered in place with a
/// logged diagnostic. The variants here abort the load.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("duplicate key '{key}' in map field '{field}' (sheet '{sheet}')")]
    DuplicateKey {
        sheet: String,
        field: String,
        key: String,
    },

    #[error("field '{field}' (sheet '{sheet}') value {value} out of range [{min}, {max}]")]
    RangeViolation {
        sheet: String,
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("field '{field}' (sheet '{sheet}') value '{value}' does not match pattern '{pattern}'")]
    PatternViolation {
        sheet: String,
        field: String,
        value: String,
        pattern: String,
    },

    #[error("required column '{column}' not found for field '{field}' (sheet '{sheet}')")]
    RequiredColumn {
        sheet: String,
        field: String,
        column: String,
    },

    #[error("record for map field '{field}' (sheet '{sheet}') has no key")]
    MissingKey { sheet: String, field: String },

    #[error("no sheet populated required field '{field}'")]
    MissingSheet { field: String },
}
