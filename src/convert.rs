//! Cell-to-value coercion.
//!
//! [`CellParse`] is the explicit registration surface replacing run-time
//! type inspection: every bindable value type states its zero value, an
//! optional type-intrinsic parser, and a catch-all string conversion.
//! [`FieldOptions`] carries the per-field metadata (override column,
//! default, separator, merge flag, validators, custom parser) that the
//! layered resolution order consults.
//!
//! Conversion failure is never fatal: the field falls back to its default
//! and the offending cell is logged. Only the post-conversion range and
//! pattern validators escalate to a hard error.

use std::fmt;

use anyhow::{Context, Result, anyhow, bail};
use chrono::{NaiveDate, NaiveDateTime};
use itertools::Itertools;
use log::error;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BindError;

/// Per-field coercion and validation metadata, registered alongside each
/// record field's setter.
pub struct FieldOptions<T> {
    pub(crate) column: Option<String>,
    pub(crate) ignore: bool,
    pub(crate) required: bool,
    pub(crate) default: Option<T>,
    pub(crate) separator: char,
    pub(crate) merge_cells: bool,
    pub(crate) range: Option<(f64, f64)>,
    pub(crate) pattern: Option<Regex>,
    #[allow(clippy::type_complexity)]
    pub(crate) parser: Option<Box<dyn Fn(&str) -> Result<T>>>,
}

impl<T> Default for FieldOptions<T> {
    fn default() -> Self {
        Self {
            column: None,
            ignore: false,
            required: false,
            default: None,
            separator: ',',
            merge_cells: false,
            range: None,
            pattern: None,
            parser: None,
        }
    }
}

impl<T> FieldOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match this column name instead of the field's own name.
    pub fn column(mut self, name: impl Into<String>) -> Self {
        self.column = Some(name.into());
        self
    }

    /// Register the field but never populate it.
    pub fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }

    /// Abort the load when no column matches this field.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value substituted for blank cells and failed conversions.
    pub fn default_value(mut self, value: T) -> Self {
        self.default = Some(value);
        self
    }

    /// Separator for sequence splitting and merged-cell joining.
    pub fn separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Join every non-empty contributed cell into one working string.
    pub fn merge_cells(mut self) -> Self {
        self.merge_cells = true;
        self
    }

    /// Inclusive numeric bounds; violation aborts the load.
    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    /// Pattern the converted value's text form must match; violation
    /// aborts the load.
    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Custom scalar parser, consulted after the type's intrinsic parser.
    pub fn parser(mut self, parser: impl Fn(&str) -> Result<T> + 'static) -> Self {
        self.parser = Some(Box::new(parser));
        self
    }
}

/// Sheet and field names threaded through for diagnostics.
pub(crate) struct Diag<'a> {
    pub sheet: &'a str,
    pub field: &'a str,
}

pub(crate) struct Conversion<T> {
    pub value: T,
    pub defaulted: bool,
}

/// Runs the layered resolution order over one header group's cells.
///
/// A blank primary cell short-circuits straight to the default; custom
/// parsers are never consulted for blanks. Failures in the later layers
/// are caught, logged with the sheet, field, and offending string, and
/// recovered with the same default.
pub(crate) fn convert_cells<T: CellParse + Clone>(
    cells: &[String],
    options: &FieldOptions<T>,
    diag: &Diag<'_>,
) -> Conversion<T> {
    let primary = cells.first().map(String::as_str).unwrap_or("");
    if primary.trim().is_empty() {
        return Conversion {
            value: configured_default(options),
            defaulted: true,
        };
    }

    let working = if options.merge_cells {
        cells
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .join(&options.separator.to_string())
    } else {
        primary.trim().to_string()
    };
    // Merged cells collapse to a single working string; sequence types
    // only see per-cell contributions when no merge happened.
    let contributed: &[String] = if options.merge_cells { &[] } else { cells };

    let attempt = || -> Result<T> {
        if let Some(parsed) = T::self_parse(&working) {
            return parsed;
        }
        if let Some(parser) = options.parser.as_ref() {
            return parser(&working);
        }
        T::parse_group(contributed, &working, options.separator)
    };

    match attempt() {
        Ok(value) => Conversion {
            value,
            defaulted: false,
        },
        Err(err) => {
            error!(
                "sheet '{}': field '{}' failed to convert '{}': {err}",
                diag.sheet, diag.field, working
            );
            Conversion {
                value: configured_default(options),
                defaulted: true,
            }
        }
    }
}

fn configured_default<T: CellParse + Clone>(options: &FieldOptions<T>) -> T {
    options
        .default
        .clone()
        .unwrap_or_else(T::intrinsic_default)
}

/// Range and pattern checks, applied only to successful non-default
/// conversions. These are the sole paths from conversion to a hard error.
pub(crate) fn validate<T: CellParse>(
    value: &T,
    options: &FieldOptions<T>,
    diag: &Diag<'_>,
) -> Result<(), BindError> {
    if let Some((min, max)) = options.range {
        let numeric = value.as_number().unwrap_or(0.0);
        if numeric < min || numeric > max {
            return Err(BindError::RangeViolation {
                sheet: diag.sheet.to_string(),
                field: diag.field.to_string(),
                value: numeric,
                min,
                max,
            });
        }
    }
    if let Some(pattern) = options.pattern.as_ref() {
        let text = value.as_text().unwrap_or_default();
        if !pattern.is_match(&text) {
            return Err(BindError::PatternViolation {
                sheet: diag.sheet.to_string(),
                field: diag.field.to_string(),
                value: text,
                pattern: pattern.as_str().to_string(),
            });
        }
    }
    Ok(())
}

/// A type that can be produced from raw cell strings.
pub trait CellParse: Sized {
    /// Zero value used when a cell is blank and no default is configured.
    fn intrinsic_default() -> Self;

    /// Type-intrinsic parser, consulted before any configured parser.
    /// Scalars without a dedicated string form return `None`.
    fn self_parse(_raw: &str) -> Option<Result<Self>> {
        None
    }

    /// Catch-all conversion from a single working string.
    fn parse_cell(raw: &str) -> Result<Self>;

    /// Sequence hook: sees the per-cell contributions of a multi-index
    /// group. The default ignores them and converts the working string.
    fn parse_group(contributed: &[String], working: &str, separator: char) -> Result<Self> {
        let _ = (contributed, separator);
        Self::parse_cell(working)
    }

    /// Numeric projection for range validation.
    fn as_number(&self) -> Option<f64> {
        None
    }

    /// Text projection for pattern validation and key fallback.
    fn as_text(&self) -> Option<String> {
        None
    }
}

/// Converts one sequence element: intrinsic parser first, catch-all after.
fn convert_element<E: CellParse>(raw: &str) -> Result<E> {
    if let Some(parsed) = E::self_parse(raw) {
        return parsed;
    }
    E::parse_cell(raw)
}

/// Case-insensitive enumeration lookup for `CellParse` impls on enums.
/// A miss is an ordinary conversion failure, recovered with the default.
pub fn parse_enum<T: Clone>(raw: &str, variants: &[(&str, T)]) -> Result<T> {
    let wanted = raw.trim();
    variants
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
        .map(|(_, value)| value.clone())
        .ok_or_else(|| anyhow!("unknown variant '{wanted}'"))
}

impl CellParse for String {
    fn intrinsic_default() -> Self {
        String::new()
    }

    fn parse_cell(raw: &str) -> Result<Self> {
        Ok(raw.to_string())
    }

    fn as_text(&self) -> Option<String> {
        Some(self.clone())
    }
}

impl CellParse for bool {
    fn intrinsic_default() -> Self {
        false
    }

    fn parse_cell(raw: &str) -> Result<Self> {
        let lowered = raw.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "true" | "t" | "yes" | "y" | "1" => Ok(true),
            "false" | "f" | "no" | "n" | "0" => Ok(false),
            _ => bail!("failed to parse '{raw}' as boolean"),
        }
    }

    fn as_number(&self) -> Option<f64> {
        Some(if *self { 1.0 } else { 0.0 })
    }

    fn as_text(&self) -> Option<String> {
        Some(self.to_string())
    }
}

macro_rules! impl_cell_parse_numeric {
    ($($ty:ty => $zero:expr),* $(,)?) => {
        $(
            impl CellParse for $ty {
                fn intrinsic_default() -> Self {
                    $zero
                }

                fn parse_cell(raw: &str) -> Result<Self> {
                    raw.trim().parse().with_context(|| {
                        format!("failed to parse '{raw}' as {}", stringify!($ty))
                    })
                }

                fn as_number(&self) -> Option<f64> {
                    Some(*self as f64)
                }

                fn as_text(&self) -> Option<String> {
                    Some(self.to_string())
                }
            }
        )*
    };
}

impl_cell_parse_numeric!(
    i8 => 0, i16 => 0, i32 => 0, i64 => 0,
    u8 => 0, u16 => 0, u32 => 0, u64 => 0,
    f32 => 0.0, f64 => 0.0,
);

impl CellParse for Decimal {
    fn intrinsic_default() -> Self {
        Decimal::ZERO
    }

    fn parse_cell(raw: &str) -> Result<Self> {
        raw.trim()
            .parse()
            .with_context(|| format!("failed to parse '{raw}' as decimal"))
    }

    fn as_number(&self) -> Option<f64> {
        self.to_f64()
    }

    fn as_text(&self) -> Option<String> {
        Some(self.to_string())
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

impl CellParse for NaiveDate {
    fn intrinsic_default() -> Self {
        NaiveDate::default()
    }

    fn parse_cell(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        for fmt in DATE_FORMATS {
            if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
                return Ok(parsed);
            }
        }
        bail!("failed to parse '{raw}' as date")
    }

    fn as_text(&self) -> Option<String> {
        Some(self.format("%Y-%m-%d").to_string())
    }
}

impl CellParse for NaiveDateTime {
    fn intrinsic_default() -> Self {
        NaiveDateTime::default()
    }

    fn parse_cell(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        for fmt in DATETIME_FORMATS {
            if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
                return Ok(parsed);
            }
        }
        bail!("failed to parse '{raw}' as datetime")
    }

    fn as_text(&self) -> Option<String> {
        Some(self.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}

impl CellParse for Uuid {
    fn intrinsic_default() -> Self {
        Uuid::nil()
    }

    fn parse_cell(raw: &str) -> Result<Self> {
        let trimmed = raw.trim().trim_matches(|c| matches!(c, '{' | '}'));
        Uuid::parse_str(trimmed).with_context(|| format!("failed to parse '{raw}' as GUID"))
    }

    fn as_text(&self) -> Option<String> {
        Some(self.to_string())
    }
}

/// Two-component numeric composite with a comma-separated string form.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Three-component numeric composite; missing trailing components are zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

/// Parses up to `N` comma-separated components, zero-filling the tail.
fn parse_components<const N: usize>(raw: &str) -> Result<[f32; N]> {
    let mut components = [0.0f32; N];
    for (slot, part) in components.iter_mut().zip(raw.split(',').take(N)) {
        let trimmed = part.trim();
        *slot = trimmed
            .parse()
            .with_context(|| format!("invalid numeric component '{trimmed}' in '{raw}'"))?;
    }
    Ok(components)
}

impl CellParse for Vec2 {
    fn intrinsic_default() -> Self {
        Self::ZERO
    }

    fn self_parse(raw: &str) -> Option<Result<Self>> {
        Some(Self::parse_cell(raw))
    }

    fn parse_cell(raw: &str) -> Result<Self> {
        let [x, y] = parse_components::<2>(raw)?;
        Ok(Self { x, y })
    }

    fn as_text(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl CellParse for Vec3 {
    fn intrinsic_default() -> Self {
        Self::ZERO
    }

    fn self_parse(raw: &str) -> Option<Result<Self>> {
        Some(Self::parse_cell(raw))
    }

    fn parse_cell(raw: &str) -> Result<Self> {
        let [x, y, z] = parse_components::<3>(raw)?;
        Ok(Self { x, y, z })
    }

    fn as_text(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl<E: CellParse> CellParse for Vec<E> {
    fn intrinsic_default() -> Self {
        Vec::new()
    }

    fn parse_cell(raw: &str) -> Result<Self> {
        Self::parse_group(&[], raw, ',')
    }

    // Multi-index contributions convert per cell; a lone cell splits on
    // the separator. Empty parts are dropped for list targets.
    fn parse_group(contributed: &[String], working: &str, separator: char) -> Result<Self> {
        if contributed.len() > 1 {
            contributed
                .iter()
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(convert_element)
                .collect()
        } else {
            working
                .split(separator)
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(convert_element)
                .collect()
        }
    }
}

impl<E: CellParse> CellParse for Box<[E]> {
    fn intrinsic_default() -> Self {
        Vec::new().into_boxed_slice()
    }

    fn parse_cell(raw: &str) -> Result<Self> {
        Self::parse_group(&[], raw, ',')
    }

    // Array targets keep empty parts positionally as element defaults.
    fn parse_group(contributed: &[String], working: &str, separator: char) -> Result<Self> {
        let convert_part = |part: &str| -> Result<E> {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                Ok(E::intrinsic_default())
            } else {
                convert_element(trimmed)
            }
        };
        let elements: Vec<E> = if contributed.len() > 1 {
            contributed
                .iter()
                .map(|c| convert_part(c))
                .collect::<Result<_>>()?
        } else {
            working
                .split(separator)
                .map(convert_part)
                .collect::<Result<_>>()?
        };
        Ok(elements.into_boxed_slice())
    }
}
