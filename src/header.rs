//! Header grouping and row-tuple extraction.
//!
//! Headers along the primary axis are grouped by *base name*: the header
//! text before the `#` disambiguation suffix. Repeated base names
//! (`hp#1`, `hp#2`) accumulate their physical indices in first-occurrence
//! order, which is how a single field receives values from several
//! columns. Leading comment lines shift the header position forward;
//! comment lines between data lines are skipped outright.

use indexmap::IndexMap;
use log::warn;

use crate::sheet::{AxisView, HEADER_IGNORE_MARKERS, NAME_SUFFIX_SEPARATOR, Orientation, Sheet};

/// Base name mapped to the physical indices sharing it, insertion-ordered.
pub type HeaderGroups = IndexMap<String, Vec<usize>>;

/// One secondary-axis position's cells, grouped by base name.
///
/// Each value keeps one trimmed cell per grouped index, positionally, so a
/// group of three columns always contributes three entries even when some
/// are blank.
pub type RowTuple = IndexMap<String, Vec<String>>;

/// Grouped headers plus the secondary-axis position they were read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLayout {
    pub groups: HeaderGroups,
    pub header_pos: usize,
}

/// Groups the header line of `sheet` under the given orientation.
///
/// Returns `None` when the sheet has fewer than two primary-axis
/// positions or comment lines consume every secondary-axis line. That is
/// a tolerated authoring state, reported as a warning, never an error.
pub fn group_headers(sheet: &Sheet, orientation: Orientation) -> Option<HeaderLayout> {
    let view = AxisView::new(sheet, orientation);

    let mut header_pos = 0;
    while header_pos < view.secondary_len() && view.is_comment_line(header_pos) {
        header_pos += 1;
    }
    if header_pos >= view.secondary_len() {
        warn!(
            "sheet '{}' has no header line after comment lines; skipping",
            sheet.raw_name()
        );
        return None;
    }

    if view.primary_len() < 2 {
        warn!(
            "sheet '{}' lacks enough {} for parsing; skipping",
            sheet.raw_name(),
            match orientation {
                Orientation::RowMajor => "columns",
                Orientation::ColumnMajor => "rows",
            }
        );
        return None;
    }

    let mut groups = HeaderGroups::new();
    for primary in 0..view.primary_len() {
        let raw = view.cell(primary, header_pos).trim();
        if raw.is_empty() || raw.starts_with(HEADER_IGNORE_MARKERS) {
            continue;
        }
        let base = raw
            .split(NAME_SUFFIX_SEPARATOR)
            .next()
            .unwrap_or("")
            .trim()
            .to_string();
        groups.entry(base).or_default().push(primary);
    }

    Some(HeaderLayout { groups, header_pos })
}

/// Extracts one row tuple per data position after the header.
///
/// Comment lines are skipped; the first tuple whose every cell is blank is
/// an end-of-data sentinel and terminates the sheet, whatever follows.
pub fn row_tuples(sheet: &Sheet, orientation: Orientation, layout: &HeaderLayout) -> Vec<RowTuple> {
    let view = AxisView::new(sheet, orientation);
    let mut tuples = Vec::new();

    for secondary in layout.header_pos + 1..view.secondary_len() {
        if view.is_comment_line(secondary) {
            continue;
        }

        let mut tuple = RowTuple::new();
        let mut has_data = false;
        for (base, indices) in &layout.groups {
            let cells: Vec<String> = indices
                .iter()
                .map(|&primary| view.cell(primary, secondary).trim().to_string())
                .collect();
            if cells.iter().any(|c| !c.is_empty()) {
                has_data = true;
            }
            tuple.insert(base.clone(), cells);
        }

        if !has_data {
            break;
        }
        tuples.push(tuple);
    }

    tuples
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sheet(name: &str, cells: &[&[&str]]) -> Sheet {
        Sheet::new(
            name,
            cells
                .iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn groups_repeated_base_names_in_first_occurrence_order() {
        let s = sheet("UnitData", &[&["id", "name", "hp#1", "hp#2"]]);
        let layout = group_headers(&s, Orientation::RowMajor).unwrap();
        let keys: Vec<_> = layout.groups.keys().cloned().collect();
        assert_eq!(keys, ["id", "name", "hp"]);
        assert_eq!(layout.groups["hp"], vec![2, 3]);
        assert_eq!(layout.header_pos, 0);
    }

    #[test]
    fn drops_blank_and_marked_headers() {
        let s = sheet("T", &[&["id", "", "~scratch", "#note", "name"]]);
        let layout = group_headers(&s, Orientation::RowMajor).unwrap();
        let keys: Vec<_> = layout.groups.keys().cloned().collect();
        assert_eq!(keys, ["id", "name"]);
        assert_eq!(layout.groups["name"], vec![4]);
    }

    #[test]
    fn leading_comment_lines_shift_the_header() {
        let s = sheet(
            "T",
            &[
                &["// authored 2024", ""],
                &["-- second note", ""],
                &["id", "name"],
                &["u1", "Goblin"],
            ],
        );
        let layout = group_headers(&s, Orientation::RowMajor).unwrap();
        assert_eq!(layout.header_pos, 2);
        let tuples = row_tuples(&s, Orientation::RowMajor, &layout);
        assert_eq!(tuples.len(), 1);
        assert_eq!(tuples[0]["id"], vec!["u1".to_string()]);
    }

    #[test]
    fn undersized_sheet_yields_none() {
        let s = sheet("T", &[&["only"], &["x"]]);
        assert!(group_headers(&s, Orientation::RowMajor).is_none());

        let all_comments = sheet("T", &[&["// a"], &["// b"]]);
        assert!(group_headers(&all_comments, Orientation::RowMajor).is_none());
    }

    #[test]
    fn column_major_groups_read_down_the_first_column() {
        let s = sheet("!PcData", &[&["id", "p1"], &["name", "Hero"]]);
        let layout = group_headers(&s, Orientation::ColumnMajor).unwrap();
        let keys: Vec<_> = layout.groups.keys().cloned().collect();
        assert_eq!(keys, ["id", "name"]);
        let tuples = row_tuples(&s, Orientation::ColumnMajor, &layout);
        assert_eq!(tuples.len(), 1);
        assert_eq!(tuples[0]["name"], vec!["Hero".to_string()]);
    }

    #[test]
    fn first_all_blank_tuple_ends_the_sheet() {
        let s = sheet(
            "T",
            &[
                &["id", "name"],
                &["u1", "Goblin"],
                &["", ""],
                &["u2", "Orc"],
            ],
        );
        let layout = group_headers(&s, Orientation::RowMajor).unwrap();
        let tuples = row_tuples(&s, Orientation::RowMajor, &layout);
        assert_eq!(tuples.len(), 1);
        assert_eq!(tuples[0]["id"], vec!["u1".to_string()]);
    }

    #[test]
    fn comment_lines_between_data_are_skipped_not_terminal() {
        let s = sheet(
            "T",
            &[
                &["id", "name"],
                &["u1", "Goblin"],
                &["// interlude", ""],
                &["u2", "Orc"],
            ],
        );
        let layout = group_headers(&s, Orientation::RowMajor).unwrap();
        let tuples = row_tuples(&s, Orientation::RowMajor, &layout);
        assert_eq!(tuples.len(), 2);
        assert_eq!(tuples[1]["id"], vec!["u2".to_string()]);
    }

    #[test]
    fn group_cells_stay_positional_when_partially_blank() {
        let s = sheet("T", &[&["id", "hp#1", "hp#2"], &["u1", "", "5"]]);
        let layout = group_headers(&s, Orientation::RowMajor).unwrap();
        let tuples = row_tuples(&s, Orientation::RowMajor, &layout);
        assert_eq!(tuples[0]["hp"], vec!["".to_string(), "5".to_string()]);
    }

    proptest! {
        #[test]
        fn grouping_is_idempotent_and_order_preserving(
            headers in proptest::collection::vec("[a-z]{1,6}(#[0-9])?", 2..8)
        ) {
            let row: Vec<&str> = headers.iter().map(String::as_str).collect();
            let s = sheet("P", &[&row[..]]);
            let first = group_headers(&s, Orientation::RowMajor).unwrap();
            let second = group_headers(&s, Orientation::RowMajor).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
