//! Pagination for multi-order queries.

use serde::{Deserialize, Serialize};

/// A zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    /// Creates a page request. A zero size is bumped to one.
    pub fn of(page: usize, size: usize) -> Self {
        Self {
            page,
            size: size.max(1),
        }
    }

    /// Number of elements to skip before this page.
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }

    /// Returns the request for the following page.
    pub fn next(&self) -> Self {
        Self {
            page: self.page + 1,
            size: self.size,
        }
    }
}

/// One page of results plus the total number of matching elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub size: usize,
    pub total: usize,
}

impl<T> Page<T> {
    /// Builds a page from already-sliced items.
    pub fn new(items: Vec<T>, request: PageRequest, total: usize) -> Self {
        Self {
            items,
            page: request.page,
            size: request.size,
            total,
        }
    }

    /// Slices a full result set down to the requested page.
    pub fn from_all(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len();
        let items = all
            .into_iter()
            .skip(request.offset())
            .take(request.size)
            .collect();
        Self::new(items, request, total)
    }

    pub fn number_of_elements(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_pages(&self) -> usize {
        self.total.div_ceil(self.size.max(1))
    }

    pub fn is_last(&self) -> bool {
        self.page + 1 >= self.total_pages()
    }

    /// Maps every item, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total: self.total,
        }
    }
}
