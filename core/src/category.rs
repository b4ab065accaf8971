//! Category index
//!
//! A derived view over the directory: distinct, non-empty categories in
//! first-seen order. It is rebuilt whenever the directory changes and is
//! never persisted on its own.

use std::collections::HashSet;

use crate::model::PoiRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryIndex {
    categories: Vec<String>,
}

impl CategoryIndex {
    /// Rebuild from a directory. Same directory, same order, same result.
    pub fn rebuild(directory: &[PoiRecord]) -> Self {
        let mut seen = HashSet::new();
        let categories = directory
            .iter()
            .map(|record| record.category.as_str())
            .filter(|category| !category.is_empty())
            .filter(|category| seen.insert(*category))
            .map(str::to_string)
            .collect();
        Self { categories }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.categories
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(String::as_str)
    }
}
