//! Page-level aggregation with memoized views.
//!
//! A [`PageAggregate`] owns one [`RawPageRecord`] and answers count queries
//! about it. Views are built lazily:
//!
//! ```text
//! record --(read once)--> general view (All, case kept, tags kept)
//!                              |
//!                              +--> (Body, fold)        cached
//!                              +--> (Group, collapse)   cached
//!                              +--> ...                 cached
//! ```
//!
//! Only the general view touches the record; every other view is projected
//! from it. Each distinct [`ViewSpec`] is computed at most once per instance
//! (modulo races, see below) and repeated requests are map lookups.
//!
//! ## Concurrency
//!
//! Views are computed outside the cache lock and published first-writer-wins.
//! Two threads racing on the same cold view may both compute it; both
//! results are identical and only the first is kept.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::record::{AdvancedSource, RawPageRecord, SchemaVersion};
use crate::section::{Position, Scalar, ScalarValue, Section, SectionSelect};
use crate::table::{CountKey, CountTable, Dimensions};
use crate::view::ViewSpec;

/// Cache hit/miss counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests answered from the cache.
    pub hits: u64,
    /// Requests that had to compute a view.
    pub misses: u64,
}

#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheCounters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

pub(crate) type ViewCache<K> = Mutex<HashMap<K, Arc<CountTable>>>;

/// Look `key` up in `cache`, tallying the outcome.
pub(crate) fn lookup<K>(cache: &ViewCache<K>, counters: &CacheCounters, key: &K) -> Option<Arc<CountTable>>
where
    K: std::hash::Hash + Eq,
{
    let hit = cache
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(key)
        .cloned();
    if hit.is_some() {
        counters.hit();
    } else {
        counters.miss();
    }
    hit
}

/// Publish `table` under `key` unless another writer got there first.
pub(crate) fn publish<K>(cache: &ViewCache<K>, key: K, table: Arc<CountTable>) -> Arc<CountTable>
where
    K: std::hash::Hash + Eq,
{
    Arc::clone(
        cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert(table),
    )
}

/// One page of a document, with lazily built count views.
///
/// ```rust
/// use folios::{PageAggregate, PageInput, RawPageRecord, SchemaVersion, SectionInput,
///              SectionSelect, ViewSpec};
///
/// let body = SectionInput::from_triples([("The", "DT", 1), ("the", "DT", 2), ("end", "NN", 1)]);
/// let record = RawPageRecord::new("doc", SchemaVersion::V2, PageInput::with_body(1, body), None).unwrap();
/// let page = PageAggregate::new(record);
///
/// let folded = page.counts(ViewSpec::new(SectionSelect::Body).fold_case(true).collapse_tag(true));
/// assert_eq!(folded.total(), 4);
/// assert_eq!(folded.len(), 2);
/// ```
#[derive(Debug)]
pub struct PageAggregate {
    record: RawPageRecord,
    views: ViewCache<ViewSpec>,
    edges: [OnceLock<CountTable>; 2],
    edge_views: ViewCache<(SectionSelect, Position)>,
    stats: CacheCounters,
}

impl PageAggregate {
    /// Wrap a validated record.
    #[must_use]
    pub fn new(record: RawPageRecord) -> Self {
        Self {
            record,
            views: Mutex::new(HashMap::new()),
            edges: [OnceLock::new(), OnceLock::new()],
            edge_views: Mutex::new(HashMap::new()),
            stats: CacheCounters::default(),
        }
    }

    /// The underlying record.
    #[must_use]
    pub fn record(&self) -> &RawPageRecord {
        &self.record
    }

    /// 1-based page number.
    #[must_use]
    pub fn page_number(&self) -> u32 {
        self.record.page_number()
    }

    /// Identifier of the owning document.
    #[must_use]
    pub fn document_id(&self) -> &str {
        self.record.document_id()
    }

    /// Schema revision of the record.
    #[must_use]
    pub fn schema_version(&self) -> SchemaVersion {
        self.record.schema_version()
    }

    /// Whether advanced features (edge characters, capital runs) are available.
    #[must_use]
    pub fn has_advanced(&self) -> bool {
        self.record.advanced_source() != AdvancedSource::Missing
    }

    /// Hit/miss counts of the view cache.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Counts for one view of this page, keyed `(page, section?, token, tag?)`.
    pub fn counts(&self, view: ViewSpec) -> Arc<CountTable> {
        if let Some(hit) = lookup(&self.views, &self.stats, &view) {
            trace!(page = self.page_number(), ?view, "page view cache hit");
            return hit;
        }
        let table = if view.is_general() {
            self.read_record()
        } else {
            let general = self.counts(ViewSpec::general());
            view.project(&general, true, None)
        };
        debug!(page = self.page_number(), ?view, cells = table.len(), "built page view");
        publish(&self.views, view, Arc::new(table))
    }

    fn read_record(&self) -> CountTable {
        let page = self.page_number();
        let mut table = CountTable::new(Dimensions::GENERAL);
        for section in Section::ALL {
            for tc in self.record.tokens(section) {
                table.add(
                    CountKey {
                        row: Some(page),
                        section: Some(section),
                        term: Some(Arc::clone(&tc.token)),
                        tag: Some(Arc::clone(&tc.tag)),
                    },
                    tc.count,
                );
            }
        }
        table
    }

    /// Distinct terms of a view.
    pub fn tokens(&self, view: ViewSpec) -> BTreeSet<Arc<str>> {
        self.counts(view).terms()
    }

    /// Total tokens in the selected section(s), straight from the record.
    #[must_use]
    pub fn token_count(&self, section: SectionSelect) -> u64 {
        Section::ALL
            .into_iter()
            .filter(|&s| section.covers(s))
            .map(|s| self.record.section(s).token_total())
            .sum()
    }

    /// Line-edge character tallies, keyed `(page, section?, character)`.
    ///
    /// Memoized per section selection and position, like [`Self::counts`].
    ///
    /// # Errors
    ///
    /// [`Error::UnavailableFeature`] if the page's schema keeps these in a
    /// companion record that was not supplied.
    pub fn edge_chars(
        &self,
        section: SectionSelect,
        position: Position,
    ) -> Result<Arc<CountTable>> {
        let feature = match position {
            Position::Start => "beginLineChars",
            Position::End => "endLineChars",
        };
        if !self.has_advanced() {
            return Err(Error::UnavailableFeature {
                page: self.page_number(),
                feature,
            });
        }
        let key = (section, position);
        if let Some(hit) = lookup(&self.edge_views, &self.stats, &key) {
            return Ok(hit);
        }
        let slot = match position {
            Position::Start => &self.edges[0],
            Position::End => &self.edges[1],
        };
        let general = slot.get_or_init(|| {
            let page = self.page_number();
            let mut table = CountTable::new(Dimensions::EDGE_CHARS);
            for s in Section::ALL {
                let Ok(advanced) = self.record.advanced(s, feature) else {
                    continue;
                };
                for (ch, &count) in advanced.chars(position) {
                    table.add(
                        CountKey {
                            row: Some(page),
                            section: Some(s),
                            term: Some(Arc::clone(ch)),
                            tag: None,
                        },
                        count,
                    );
                }
            }
            debug!(page, ?position, cells = table.len(), "built edge character table");
            table
        });
        let table = ViewSpec::new(section).project(general, true, None);
        Ok(publish(&self.edge_views, key, Arc::new(table)))
    }

    /// A per-section scalar feature.
    ///
    /// A single section yields [`ScalarValue::Total`]; `Group` sums the three
    /// sections; `All` yields [`ScalarValue::PerSection`].
    ///
    /// # Errors
    ///
    /// [`Error::UnavailableFeature`] for [`Scalar::CapAlphaSeqMax`] when the
    /// companion record is missing.
    pub fn scalar(&self, name: Scalar, section: SectionSelect) -> Result<ScalarValue> {
        let value = |s: Section| -> Result<u64> {
            let rec = self.record.section(s);
            Ok(match name {
                Scalar::LineCount => rec.line_count(),
                Scalar::EmptyLineCount => rec.empty_line_count(),
                Scalar::SentenceCount => rec.sentence_count(),
                Scalar::CapAlphaSeqMax => self.record.advanced(s, name.name())?.cap_alpha_seq_max,
            })
        };
        if let Some(s) = section.single() {
            return value(s).map(ScalarValue::Total);
        }
        let per = [
            (Section::Header, value(Section::Header)?),
            (Section::Body, value(Section::Body)?),
            (Section::Footer, value(Section::Footer)?),
        ];
        Ok(match section {
            SectionSelect::All => ScalarValue::PerSection(per),
            _ => ScalarValue::Total(per.iter().map(|(_, n)| n).sum()),
        })
    }
}
