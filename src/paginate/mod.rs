//! Result pagination.
//!
//! Wraps a result set in a session-owned cursor that yields bounded pages.
//! The page size is fixed when the cursor is opened, so page boundaries are
//! stable across repeated advances; advancing past the end is a no-op, not
//! an error.

use crate::exec::{ColumnInfo, ResultSet, Row};

/// Default number of rows per page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// A bounded slice of a result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Column metadata for the result set.
    pub columns: Vec<ColumnInfo>,
    /// Rows in this page.
    pub rows: Vec<Row>,
    /// True if more rows remain beyond this page.
    pub has_more: bool,
    /// Total number of rows in the underlying result set.
    pub total_rows: usize,
}

impl Page {
    /// Returns the number of rows in this page.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if this page carries no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Per-session pagination state over one result set.
///
/// The cursor owns its result set; opening a new query for the session
/// replaces the cursor and drops the old rows with it.
///
/// Invariant: `0 <= offset <= total_rows`, and the offset only moves in
/// whole `page_size` steps.
#[derive(Debug, Clone)]
pub struct PageCursor {
    result: ResultSet,
    page_size: usize,
    offset: usize,
}

impl PageCursor {
    /// Opens a cursor over the result set at offset 0.
    ///
    /// A zero `page_size` is treated as 1 so the cursor always makes
    /// progress.
    pub fn open(result: ResultSet, page_size: usize) -> Self {
        Self {
            result,
            page_size: page_size.max(1),
            offset: 0,
        }
    }

    /// Returns the fixed page size.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the current offset into the result set.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the page at the current offset.
    ///
    /// Idempotent: calling this repeatedly without an intervening
    /// [`advance`](Self::advance) returns identical pages.
    pub fn current_page(&self) -> Page {
        let total = self.result.row_count();
        let start = self.offset.min(total);
        let end = (start + self.page_size).min(total);

        Page {
            columns: self.result.columns.clone(),
            rows: self.result.rows[start..end].to_vec(),
            has_more: self.offset + self.page_size < total,
            total_rows: total,
        }
    }

    /// Advances to the next page and returns it.
    ///
    /// When no more rows remain, returns an empty page and leaves the
    /// offset unchanged.
    pub fn advance(&mut self) -> Page {
        let current = self.current_page();
        if !current.has_more {
            return Page {
                columns: self.result.columns.clone(),
                rows: Vec::new(),
                has_more: false,
                total_rows: self.result.row_count(),
            };
        }

        self.offset += self.page_size;
        self.current_page()
    }
}
