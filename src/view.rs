//! View parameters and the projection shared by every aggregation level.
//!
//! A view is one `(section, fold_case, collapse_tag)` combination. Pages and
//! documents both keep one fully general table `(page, section, token, tag)`
//! and derive every other view from it with [`ViewSpec::project`], so a view
//! computed from the document cache and the same view assembled page by page
//! go through identical code.

use std::sync::Arc;

use crate::section::SectionSelect;
use crate::table::{fold_term, CountKey, CountTable, Dimensions, TermKind};

/// Which view of a count table to produce.
///
/// ```rust
/// use folios::{SectionSelect, ViewSpec};
///
/// let view = ViewSpec::new(SectionSelect::Group).fold_case(true);
/// assert!(view.folds_case());
/// assert!(!view.collapses_tag());
/// assert!(ViewSpec::general().is_general());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewSpec {
    section: SectionSelect,
    fold_case: bool,
    collapse_tag: bool,
}

impl Default for ViewSpec {
    fn default() -> Self {
        Self::new(SectionSelect::default())
    }
}

impl ViewSpec {
    /// Case-preserving, tagged view of `section`.
    #[must_use]
    pub const fn new(section: SectionSelect) -> Self {
        Self {
            section,
            fold_case: false,
            collapse_tag: false,
        }
    }

    /// The view every other view is derived from: all sections kept
    /// separate, case preserved, tags kept.
    #[must_use]
    pub const fn general() -> Self {
        Self::new(SectionSelect::All)
    }

    /// Lowercase tokens, summing collisions.
    #[must_use]
    pub const fn fold_case(mut self, fold: bool) -> Self {
        self.fold_case = fold;
        self
    }

    /// Drop tags, summing collisions.
    #[must_use]
    pub const fn collapse_tag(mut self, collapse: bool) -> Self {
        self.collapse_tag = collapse;
        self
    }

    /// Replace the section selector.
    #[must_use]
    pub const fn with_section(mut self, section: SectionSelect) -> Self {
        self.section = section;
        self
    }

    /// The section selector.
    #[must_use]
    pub const fn section(&self) -> SectionSelect {
        self.section
    }

    /// Whether tokens are lowercased.
    #[must_use]
    pub const fn folds_case(&self) -> bool {
        self.fold_case
    }

    /// Whether tags are dropped.
    #[must_use]
    pub const fn collapses_tag(&self) -> bool {
        self.collapse_tag
    }

    /// Whether this is the fully general view.
    #[must_use]
    pub fn is_general(&self) -> bool {
        *self == Self::general()
    }

    /// Dimensions of the table this view produces from `source`.
    #[must_use]
    pub fn dims_for(&self, source: Dimensions, keep_rows: bool) -> Dimensions {
        Dimensions {
            row: source.row.filter(|_| keep_rows),
            section: source.section && self.section.keeps_section(),
            term: source.term,
            tag: source.tag && !self.collapse_tag,
        }
    }

    /// Derive this view from a table in one pass.
    ///
    /// `keep_rows = false` sums over rows; `row = Some(r)` slices a single row
    /// first. Folding only touches token terms, so character tables pass
    /// through unchanged apart from section handling.
    #[must_use]
    pub fn project(&self, source: &CountTable, keep_rows: bool, row: Option<u32>) -> CountTable {
        let dims = self.dims_for(source.dims(), keep_rows);
        let single = self.section.single();
        let fold = self.fold_case && source.dims().term == Some(TermKind::Token);
        let map = |k: &CountKey| -> Option<CountKey> {
            if single.is_some() && k.section != single {
                return None;
            }
            Some(CountKey {
                row: k.row.filter(|_| dims.row.is_some()),
                section: k.section.filter(|_| dims.section),
                term: if fold {
                    k.term.as_ref().map(fold_term)
                } else {
                    k.term.clone()
                },
                tag: k.tag.as_ref().filter(|_| dims.tag).map(Arc::clone),
            })
        };
        match row {
            Some(row) => source.regroup_row(row, dims, map),
            None => source.regroup(dims, map),
        }
    }
}
