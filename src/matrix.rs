//! Page-by-term matrices.
//!
//! Storage is sparse (a `(page, term)` [`CountTable`]) but the semantics are
//! dense: every page has a defined value for every term, zero when absent.
//! Asking about a term the document never uses is not an error either; it
//! is simply zero everywhere.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::table::{CountKey, CountTable};

/// A page × term frequency matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermMatrix {
    pages: Vec<u32>,
    vocabulary: BTreeSet<Arc<str>>,
    table: CountTable,
}

impl TermMatrix {
    /// Wrap a `(page, term)` table; `pages` lists every page of the
    /// document, including pages with no terms.
    pub(crate) fn new(pages: Vec<u32>, table: CountTable) -> Self {
        debug_assert!(!table.dims().section && !table.dims().tag);
        Self {
            pages,
            vocabulary: table.terms(),
            table,
        }
    }

    /// The value at `(page, term)`; zero for anything not stored.
    #[must_use]
    pub fn get(&self, page: u32, term: &str) -> u64 {
        self.table.get(&CountKey::term(term).with_row(page))
    }

    /// Row labels, in page order.
    #[must_use]
    pub fn pages(&self) -> &[u32] {
        &self.pages
    }

    /// Column labels, sorted.
    #[must_use]
    pub fn vocabulary(&self) -> &BTreeSet<Arc<str>> {
        &self.vocabulary
    }

    /// The sparse backing table.
    #[must_use]
    pub fn table(&self) -> &CountTable {
        &self.table
    }

    /// Number of non-zero cells.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.table.len()
    }

    /// One dense row, aligned with [`Self::vocabulary`].
    #[must_use]
    pub fn row(&self, page: u32) -> Vec<u64> {
        self.vocabulary
            .iter()
            .map(|term| self.table.get(&CountKey::term(Arc::clone(term)).with_row(page)))
            .collect()
    }

    /// One dense column, aligned with [`Self::pages`].
    #[must_use]
    pub fn column(&self, term: &str) -> Vec<u64> {
        self.pages.iter().map(|&page| self.get(page, term)).collect()
    }

    /// Every row, densely, in page order.
    pub fn dense_rows(&self) -> impl Iterator<Item = (u32, Vec<u64>)> + '_ {
        self.pages.iter().map(|&page| (page, self.row(page)))
    }
}
