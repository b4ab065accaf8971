//! Filter engine
//!
//! Pure selection of directory records by exact category membership.
//! An empty selection selects nothing; there is no implicit "show all".

use std::collections::HashSet;

use crate::model::PoiRecord;

/// Records whose category is in `selected`, in directory order.
///
/// Matching is exact: no case folding, no prefix matching.
pub fn filter<'a, S>(directory: &'a [PoiRecord], selected: &HashSet<S>) -> Vec<&'a PoiRecord>
where
    S: std::borrow::Borrow<str> + std::hash::Hash + Eq,
{
    if selected.is_empty() {
        return Vec::new();
    }
    directory
        .iter()
        .filter(|record| selected.contains(record.category.as_str()))
        .collect()
}

/// Owned variant of [`filter`] for callers that need to keep the result
/// beyond the directory borrow.
pub fn filter_owned<S>(directory: &[PoiRecord], selected: &HashSet<S>) -> Vec<PoiRecord>
where
    S: std::borrow::Borrow<str> + std::hash::Hash + Eq,
{
    filter(directory, selected).into_iter().cloned().collect()
}
