//! Destination slot shapes and placement.
//!
//! Each container field the loader can target is declared as one
//! [`SlotShape`] variant over an `Option`-wrapped store, so "never
//! populated" stays distinguishable from "populated empty". Placement
//! semantics per variant: overwrite, append, grow-and-copy, keyed insert
//! with duplicate policy, or keyed collection merge.

use std::rc::Rc;

use indexmap::IndexMap;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::BindError;
use crate::sheet::Orientation;

/// What happens when a map slot sees a key it already holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DuplicatePolicy {
    /// Collision aborts the load, naming the sheet, field, and key.
    #[default]
    Reject,
    /// The later record silently replaces the earlier one.
    Overwrite,
}

/// Per-slot binding declaration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SheetBinding {
    /// Sheet name this slot ingests; defaults to the slot's field name.
    pub sheet: Option<String>,
    /// Absence of any matching sheet is tolerated.
    pub optional: bool,
    pub duplicates: DuplicatePolicy,
    /// Forces an orientation for sheets without a name marker.
    pub orientation: Option<Orientation>,
}

impl SheetBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(mut self, name: impl Into<String>) -> Self {
        self.sheet = Some(name.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn on_duplicate(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn column_oriented(mut self) -> Self {
        self.orientation = Some(Orientation::ColumnMajor);
        self
    }
}

/// Borrow of a slot's backing store on the container.
pub type Accessor<C, S> = Rc<dyn Fn(&mut C) -> &mut S>;

/// A slot's storage shape, with one placement arm per variant.
///
/// The accessor closures tie the container type, the record type, and the
/// shape together at registration, so a shape/record mismatch cannot
/// reach the binder at run time.
pub enum SlotShape<C, R> {
    /// Bare value; the last record processed wins.
    Single(Accessor<C, Option<R>>),
    /// Ordered list; append in ingestion order.
    List(Accessor<C, Option<Vec<R>>>),
    /// Growable array; reallocated one longer per record, prior contents
    /// copied over.
    Array(Accessor<C, Option<Box<[R]>>>),
    /// Key-indexed map of single records.
    Map(Accessor<C, Option<IndexMap<String, R>>>),
    /// Key-indexed map whose values collect every record sharing a key.
    MapMany(Accessor<C, Option<IndexMap<String, Vec<R>>>>),
}

impl<C, R> SlotShape<C, R> {
    pub(crate) fn bind(
        &self,
        container: &mut C,
        key: Option<&str>,
        record: R,
        sheet: &str,
        field: &str,
        policy: DuplicatePolicy,
    ) -> Result<(), BindError> {
        match self {
            SlotShape::Single(access) => {
                *access(container) = Some(record);
            }
            SlotShape::List(access) => {
                access(container).get_or_insert_with(Vec::new).push(record);
            }
            SlotShape::Array(access) => {
                let slot = access(container);
                let existing = slot.take().unwrap_or_default();
                let mut grown = Vec::with_capacity(existing.len() + 1);
                grown.extend(existing.into_vec());
                grown.push(record);
                *slot = Some(grown.into_boxed_slice());
            }
            SlotShape::Map(access) => {
                let Some(key) = resolve_key(key, sheet, field, policy)? else {
                    return Ok(());
                };
                let map = access(container).get_or_insert_with(IndexMap::new);
                if map.contains_key(key) && policy == DuplicatePolicy::Reject {
                    return Err(BindError::DuplicateKey {
                        sheet: sheet.to_string(),
                        field: field.to_string(),
                        key: key.to_string(),
                    });
                }
                map.insert(key.to_string(), record);
            }
            SlotShape::MapMany(access) => {
                let Some(key) = resolve_key(key, sheet, field, policy)? else {
                    return Ok(());
                };
                // Colliding records grow the key's collection regardless of
                // policy; the first insertion wraps the record on its own.
                access(container)
                    .get_or_insert_with(IndexMap::new)
                    .entry(key.to_string())
                    .or_default()
                    .push(record);
            }
        }
        Ok(())
    }

    pub(crate) fn is_populated(&self, container: &mut C) -> bool {
        match self {
            SlotShape::Single(access) => access(container).is_some(),
            SlotShape::List(access) => access(container).is_some(),
            SlotShape::Array(access) => access(container).is_some(),
            SlotShape::Map(access) => access(container).is_some(),
            SlotShape::MapMany(access) => access(container).is_some(),
        }
    }
}

/// A keyless record cannot enter a map slot: `Reject` escalates, any other
/// policy drops the record with a warning. It is never coerced to `""`.
fn resolve_key<'k>(
    key: Option<&'k str>,
    sheet: &str,
    field: &str,
    policy: DuplicatePolicy,
) -> Result<Option<&'k str>, BindError> {
    match key {
        Some(key) => Ok(Some(key)),
        None if policy == DuplicatePolicy::Reject => Err(BindError::MissingKey {
            sheet: sheet.to_string(),
            field: field.to_string(),
        }),
        None => {
            warn!("sheet '{sheet}': record for map field '{field}' has no key; skipped");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Holder {
        single: Option<i32>,
        list: Option<Vec<i32>>,
        array: Option<Box<[i32]>>,
        map: Option<IndexMap<String, i32>>,
        map_many: Option<IndexMap<String, Vec<i32>>>,
    }

    fn single_shape() -> SlotShape<Holder, i32> {
        SlotShape::Single(Rc::new(|h: &mut Holder| &mut h.single))
    }

    #[test]
    fn single_slot_is_overwritten_by_later_records() {
        let shape = single_shape();
        let mut holder = Holder::default();
        shape
            .bind(&mut holder, None, 1, "S", "single", DuplicatePolicy::Reject)
            .unwrap();
        shape
            .bind(&mut holder, None, 2, "S", "single", DuplicatePolicy::Reject)
            .unwrap();
        assert_eq!(holder.single, Some(2));
    }

    #[test]
    fn list_and_array_slots_append_in_order() {
        let list = SlotShape::List(Rc::new(|h: &mut Holder| &mut h.list));
        let array = SlotShape::Array(Rc::new(|h: &mut Holder| &mut h.array));
        let mut holder = Holder::default();
        for value in [1, 2, 3] {
            list.bind(&mut holder, None, value, "S", "list", DuplicatePolicy::Reject)
                .unwrap();
            array
                .bind(&mut holder, None, value, "S", "array", DuplicatePolicy::Reject)
                .unwrap();
        }
        assert_eq!(holder.list, Some(vec![1, 2, 3]));
        assert_eq!(holder.array.as_deref(), Some(&[1, 2, 3][..]));
    }

    #[test]
    fn map_slot_rejects_duplicate_keys_by_default() {
        let shape = SlotShape::Map(Rc::new(|h: &mut Holder| &mut h.map));
        let mut holder = Holder::default();
        shape
            .bind(&mut holder, Some("potion"), 1, "ItemData", "map", DuplicatePolicy::Reject)
            .unwrap();
        let err = shape
            .bind(&mut holder, Some("potion"), 2, "ItemData", "map", DuplicatePolicy::Reject)
            .unwrap_err();
        assert!(matches!(err, BindError::DuplicateKey { key, .. } if key == "potion"));
    }

    #[test]
    fn map_slot_overwrite_policy_replaces_silently() {
        let shape = SlotShape::Map(Rc::new(|h: &mut Holder| &mut h.map));
        let mut holder = Holder::default();
        for value in [1, 2] {
            shape
                .bind(
                    &mut holder,
                    Some("potion"),
                    value,
                    "ItemData",
                    "map",
                    DuplicatePolicy::Overwrite,
                )
                .unwrap();
        }
        assert_eq!(holder.map.unwrap()["potion"], 2);
    }

    #[test]
    fn map_many_slot_collects_colliding_records() {
        let shape = SlotShape::MapMany(Rc::new(|h: &mut Holder| &mut h.map_many));
        let mut holder = Holder::default();
        for value in [1, 2] {
            shape
                .bind(
                    &mut holder,
                    Some("potion"),
                    value,
                    "ItemData",
                    "many",
                    DuplicatePolicy::Reject,
                )
                .unwrap();
        }
        assert_eq!(holder.map_many.unwrap()["potion"], vec![1, 2]);
    }

    #[test]
    fn keyless_record_at_map_slot_follows_policy() {
        let shape = SlotShape::Map(Rc::new(|h: &mut Holder| &mut h.map));
        let mut holder = Holder::default();
        let err = shape
            .bind(&mut holder, None, 1, "S", "map", DuplicatePolicy::Reject)
            .unwrap_err();
        assert!(matches!(err, BindError::MissingKey { .. }));

        shape
            .bind(&mut holder, None, 1, "S", "map", DuplicatePolicy::Overwrite)
            .unwrap();
        assert!(holder.map.is_none());
    }

    #[test]
    fn populated_tracks_first_write_not_content() {
        let shape = single_shape();
        let mut holder = Holder::default();
        assert!(!shape.is_populated(&mut holder));
        shape
            .bind(&mut holder, None, 1, "S", "single", DuplicatePolicy::Reject)
            .unwrap();
        assert!(shape.is_populated(&mut holder));
    }
}
