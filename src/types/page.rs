//! Pagination bounds shared by every list operation.

use serde::{Deserialize, Serialize};

/// Optional `limit`/`offset` pair.
///
/// Pagination is all-or-nothing: it applies only when **both** bounds are
/// present. With either bound missing, list operations return the full
/// result set. A window is clamped to the result set, so an offset at or
/// past the end yields an empty page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Page {
    /// Maximum number of items to return.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Number of leading items to skip.
    #[serde(default)]
    pub offset: Option<usize>,
}

impl Page {
    /// No pagination.
    pub const ALL: Page = Page { limit: None, offset: None };

    /// Create bounds from two optional values.
    pub fn new(limit: Option<usize>, offset: Option<usize>) -> Self {
        Self { limit, offset }
    }

    /// Create a fully specified window.
    pub fn window(limit: usize, offset: usize) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }

    /// The effective `(limit, offset)` pair, or `None` if pagination is off.
    pub fn bounds(&self) -> Option<(usize, usize)> {
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => Some((limit, offset)),
            _ => None,
        }
    }

    /// True if this page actually restricts results.
    pub fn is_paginated(&self) -> bool {
        self.bounds().is_some()
    }

    /// Apply the window to an ordered sequence.
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        match self.bounds() {
            Some((limit, offset)) => items.into_iter().skip(offset).take(limit).collect(),
            None => items.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_clamps_to_set() {
        let items: Vec<u32> = (0..5).collect();

        assert_eq!(Page::window(2, 1).apply(items.clone()), vec![1, 2]);
        assert_eq!(Page::window(10, 3).apply(items.clone()), vec![3, 4]);
        assert!(Page::window(2, 5).apply(items.clone()).is_empty());
        assert!(Page::window(2, 50).apply(items.clone()).is_empty());
        assert!(Page::window(0, 0).apply(items).is_empty());
    }

    #[test]
    fn test_partial_bounds_disable_pagination() {
        let items: Vec<u32> = (0..5).collect();

        assert_eq!(Page::new(Some(2), None).apply(items.clone()).len(), 5);
        assert_eq!(Page::new(None, Some(3)).apply(items.clone()).len(), 5);
        assert_eq!(Page::ALL.apply(items).len(), 5);
        assert!(!Page::new(Some(1), None).is_paginated());
    }

    #[test]
    fn test_deserialize_from_query_shape() {
        let page: Page = serde_json::from_str(r#"{"limit": 3}"#).unwrap();
        assert_eq!(page, Page::new(Some(3), None));
        assert_eq!(page.bounds(), None);
    }
}
