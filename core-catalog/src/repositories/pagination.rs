//! Pagination helper types for repository queries

use serde::{Deserialize, Serialize};

/// Offset/limit window over a query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Number of rows to skip
    pub offset: u32,
    /// Maximum number of rows to return
    pub limit: u32,
}

impl PageRequest {
    pub fn new(offset: u32, limit: u32) -> Self {
        Self { offset, limit }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 100,
        }
    }
}

/// One window of results plus the total row count behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Rows inside the requested window
    pub items: Vec<T>,
    /// Total number of rows matching the query
    pub total: u64,
    /// The window that produced this page
    pub request: PageRequest,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            request,
        }
    }

    /// Whether rows exist beyond the end of this window.
    pub fn has_more(&self) -> bool {
        u64::from(self.request.offset) + (self.items.len() as u64) < self.total
    }

    /// Map the page items to a different type, keeping the window metadata.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            request: self.request,
        }
    }
}
