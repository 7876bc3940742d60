//! Sparse count tables keyed by composite keys.
//!
//! ## Shape
//!
//! Every table carries a [`Dimensions`] descriptor naming which key
//! components are in use, in a fixed order:
//!
//! ```text
//! (row, section, term, tag) -> count
//!   |      |       |     |
//!   |      |       |     +-- part-of-speech tag       (optional)
//!   |      |       +-------- token or edge character  (optional)
//!   |      +---------------- header / body / footer   (optional)
//!   +----------------------- page or chunk number     (optional)
//! ```
//!
//! Unused components are `None` in every key of the table.
//!
//! ## Sparsity
//!
//! Absent keys are zero. Zero counts are never stored, so `len()` is the
//! number of non-zero cells.
//!
//! ## Regrouping
//!
//! All transformations (case folding, tag collapsing, section merging, page
//! to chunk relabeling) are the same operation: map each key to a coarser
//! key and sum whatever collides. Summation is commutative, so the result
//! never depends on iteration order, and the grand total is preserved.
//!
//! Keys are ordered row-first, which makes slicing one row a range scan.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::Arc;

use crate::section::Section;

/// What the row component of a key counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKind {
    /// 1-based page number.
    Page,
    /// 1-based chunk number.
    Chunk,
}

/// What the term component of a key holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    /// A token, as tagged.
    Token,
    /// A single line-edge character.
    Character,
}

/// Which key components a table uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    /// Row component, if any.
    pub row: Option<RowKind>,
    /// Whether keys carry a section.
    pub section: bool,
    /// Term component, if any.
    pub term: Option<TermKind>,
    /// Whether keys carry a tag.
    pub tag: bool,
}

impl Dimensions {
    /// `(page, section, token, tag)`: the shape records are read into.
    pub const GENERAL: Self = Self {
        row: Some(RowKind::Page),
        section: true,
        term: Some(TermKind::Token),
        tag: true,
    };

    /// `(page, section, character)`: the shape of edge-character tables.
    pub const EDGE_CHARS: Self = Self {
        row: Some(RowKind::Page),
        section: true,
        term: Some(TermKind::Character),
        tag: false,
    };

    /// Whether `key` has exactly the components these dimensions name.
    #[must_use]
    pub fn admits(&self, key: &CountKey) -> bool {
        self.row.is_some() == key.row.is_some()
            && self.section == key.section.is_some()
            && self.term.is_some() == key.term.is_some()
            && self.tag == key.tag.is_some()
    }
}

/// A composite key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CountKey {
    /// Page or chunk number.
    pub row: Option<u32>,
    /// Page section.
    pub section: Option<Section>,
    /// Token or character.
    pub term: Option<Arc<str>>,
    /// Part-of-speech tag.
    pub tag: Option<Arc<str>>,
}

impl CountKey {
    /// A fully general `(page, section, token, tag)` key.
    pub fn general(
        page: u32,
        section: Section,
        token: impl Into<Arc<str>>,
        tag: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            row: Some(page),
            section: Some(section),
            term: Some(token.into()),
            tag: Some(tag.into()),
        }
    }

    /// A key carrying only a term.
    pub fn term(term: impl Into<Arc<str>>) -> Self {
        Self {
            row: None,
            section: None,
            term: Some(term.into()),
            tag: None,
        }
    }

    /// Set the row component.
    #[must_use]
    pub fn with_row(mut self, row: u32) -> Self {
        self.row = Some(row);
        self
    }

    /// Set the section component.
    #[must_use]
    pub fn with_section(mut self, section: Section) -> Self {
        self.section = Some(section);
        self
    }

    /// Set the tag component.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<Arc<str>>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// The term as a string slice, if present.
    #[must_use]
    pub fn term_str(&self) -> Option<&str> {
        self.term.as_deref()
    }

    /// The smallest key with row `row`; every other key of that row sorts after it.
    fn row_floor(row: u32) -> Self {
        Self {
            row: Some(row),
            section: None,
            term: None,
            tag: None,
        }
    }
}

/// Lowercase a term, reusing the allocation when it is already lowercase.
pub(crate) fn fold_term(term: &Arc<str>) -> Arc<str> {
    let lower = term.to_lowercase();
    if lower == **term {
        Arc::clone(term)
    } else {
        Arc::from(lower)
    }
}

/// A sparse mapping from [`CountKey`] to a positive count.
///
/// ```rust
/// use folios::{CountKey, CountTable, Dimensions, Section};
///
/// let mut table = CountTable::new(Dimensions::GENERAL);
/// table.add(CountKey::general(1, Section::Body, "Cat", "NN"), 1);
/// table.add(CountKey::general(1, Section::Body, "cat", "NN"), 2);
///
/// let folded = table.fold_case().collapse_tag().merge_sections().drop_rows();
/// assert_eq!(folded.get(&CountKey::term("cat")), 3);
/// assert_eq!(folded.total(), table.total());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountTable {
    dims: Dimensions,
    counts: BTreeMap<CountKey, u64>,
}

impl CountTable {
    /// An empty table with the given shape.
    #[must_use]
    pub fn new(dims: Dimensions) -> Self {
        Self {
            dims,
            counts: BTreeMap::new(),
        }
    }

    /// The key shape of this table.
    #[must_use]
    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    /// Add `count` to `key`. Zero counts are ignored.
    ///
    /// # Panics
    ///
    /// Debug builds panic if `key` does not match the table's dimensions.
    pub fn add(&mut self, key: CountKey, count: u64) {
        debug_assert!(self.dims.admits(&key), "key {key:?} does not fit {:?}", self.dims);
        if count > 0 {
            *self.counts.entry(key).or_insert(0) += count;
        }
    }

    /// Sum every cell of `other` into this table.
    ///
    /// # Panics
    ///
    /// Debug builds panic if the two tables have different dimensions.
    pub fn merge(&mut self, other: &Self) {
        debug_assert_eq!(self.dims, other.dims, "merging tables of different shape");
        for (key, count) in &other.counts {
            *self.counts.entry(key.clone()).or_insert(0) += count;
        }
    }

    /// The count stored under `key` (zero if absent).
    #[must_use]
    pub fn get(&self, key: &CountKey) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    /// Iterate over non-zero cells.
    pub fn iter(&self) -> impl Iterator<Item = (&CountKey, u64)> + '_ {
        self.counts.iter().map(|(k, &v)| (k, v))
    }

    /// Non-zero cells, sorted by key.
    #[must_use]
    pub fn sorted(&self) -> Vec<(CountKey, u64)> {
        self.iter().map(|(k, v)| (k.clone(), v)).collect()
    }

    /// Number of non-zero cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether the table has no non-zero cells.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all cells.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Sum of all cells in one row.
    #[must_use]
    pub fn row_total(&self, row: u32) -> u64 {
        self.row_cells(row).map(|(_, v)| v).sum()
    }

    /// Sum of all cells matching `row` and `section` (`None` matches anything).
    #[must_use]
    pub fn section_total(&self, row: Option<u32>, section: Option<Section>) -> u64 {
        let in_section = |k: &CountKey| section.map_or(true, |s| k.section == Some(s));
        match row {
            Some(row) => self
                .row_cells(row)
                .filter(|(k, _)| in_section(k))
                .map(|(_, v)| v)
                .sum(),
            None => self
                .counts
                .iter()
                .filter(|(k, _)| in_section(k))
                .map(|(_, v)| v)
                .sum(),
        }
    }

    /// Distinct row numbers present.
    #[must_use]
    pub fn rows(&self) -> BTreeSet<u32> {
        self.counts.keys().filter_map(|k| k.row).collect()
    }

    /// Distinct terms present.
    #[must_use]
    pub fn terms(&self) -> BTreeSet<Arc<str>> {
        self.counts.keys().filter_map(|k| k.term.clone()).collect()
    }

    fn row_cells(&self, row: u32) -> impl Iterator<Item = (&CountKey, &u64)> + '_ {
        let upper = match row.checked_add(1) {
            Some(next) => Bound::Excluded(CountKey::row_floor(next)),
            None => Bound::Unbounded,
        };
        self.counts
            .range((Bound::Included(CountKey::row_floor(row)), upper))
    }

    /// Map every key through `f` into a table of shape `dims`, summing
    /// collisions. Keys mapped to `None` are dropped.
    pub fn regroup<F>(&self, dims: Dimensions, f: F) -> Self
    where
        F: FnMut(&CountKey) -> Option<CountKey>,
    {
        Self::regroup_cells(self.counts.iter(), dims, f)
    }

    pub(crate) fn regroup_row<F>(&self, row: u32, dims: Dimensions, f: F) -> Self
    where
        F: FnMut(&CountKey) -> Option<CountKey>,
    {
        Self::regroup_cells(self.row_cells(row), dims, f)
    }

    fn regroup_cells<'a, I, F>(cells: I, dims: Dimensions, mut f: F) -> Self
    where
        I: Iterator<Item = (&'a CountKey, &'a u64)>,
        F: FnMut(&CountKey) -> Option<CountKey>,
    {
        let mut out = Self::new(dims);
        for (key, &count) in cells {
            if let Some(mapped) = f(key) {
                out.add(mapped, count);
            }
        }
        out
    }

    /// Lowercase every token, summing tokens that collide.
    ///
    /// Character tables are returned unchanged.
    #[must_use]
    pub fn fold_case(&self) -> Self {
        if self.dims.term != Some(TermKind::Token) {
            return self.clone();
        }
        self.regroup(self.dims, |k| {
            Some(CountKey {
                term: k.term.as_ref().map(fold_term),
                ..k.clone()
            })
        })
    }

    /// Drop the tag dimension, summing tokens that collide.
    #[must_use]
    pub fn collapse_tag(&self) -> Self {
        let dims = Dimensions {
            tag: false,
            ..self.dims
        };
        self.regroup(dims, |k| {
            Some(CountKey {
                tag: None,
                ..k.clone()
            })
        })
    }

    /// Drop the section dimension, summing header, body and footer.
    #[must_use]
    pub fn merge_sections(&self) -> Self {
        let dims = Dimensions {
            section: false,
            ..self.dims
        };
        self.regroup(dims, |k| {
            Some(CountKey {
                section: None,
                ..k.clone()
            })
        })
    }

    /// Keep only cells of one section (the section dimension is kept).
    #[must_use]
    pub fn select_section(&self, section: Section) -> Self {
        self.regroup(self.dims, |k| (k.section == Some(section)).then(|| k.clone()))
    }

    /// Keep only cells of one row.
    #[must_use]
    pub fn restrict_row(&self, row: u32) -> Self {
        self.regroup_row(row, self.dims, |k| Some(k.clone()))
    }

    /// Drop the row dimension, summing over all rows.
    #[must_use]
    pub fn drop_rows(&self) -> Self {
        let dims = Dimensions {
            row: None,
            ..self.dims
        };
        self.regroup(dims, |k| {
            Some(CountKey {
                row: None,
                ..k.clone()
            })
        })
    }

    /// Relabel rows through `f`, summing rows that land on the same label.
    /// Rows mapped to `None` are dropped.
    #[must_use]
    pub fn regroup_rows<F>(&self, kind: RowKind, mut f: F) -> Self
    where
        F: FnMut(u32) -> Option<u32>,
    {
        let dims = Dimensions {
            row: Some(kind),
            ..self.dims
        };
        self.regroup(dims, |k| {
            let row = f(k.row?)?;
            Some(CountKey {
                row: Some(row),
                ..k.clone()
            })
        })
    }

    /// Replace every stored count with 1 (presence instead of frequency).
    #[must_use]
    pub fn page_frequency(&self) -> Self {
        Self {
            dims: self.dims,
            counts: self.counts.keys().map(|k| (k.clone(), 1)).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a CountTable {
    type Item = (&'a CountKey, &'a u64);
    type IntoIter = std::collections::btree_map::Iter<'a, CountKey, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.iter()
    }
}
