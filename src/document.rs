//! Document-level aggregation.
//!
//! ## The Whole-Document Cache
//!
//! Most document queries need every page. Rather than asking each page for
//! each view, the document builds one fully general table once:
//!
//! ```text
//! page 1 general ─┐
//! page 2 general ─┼─ union ──> (page, section, token, tag)   built once
//! page N general ─┘                     │
//!                                       ├─ project ──> (page, token)       view A
//!                                       ├─ project ──> (section, token)    view B
//!                                       └─ slice row ─> page 7 view        page lookup
//! ```
//!
//! After the cache exists, no query touches the pages again. Page lookups
//! through the document are served by slicing the cached table; the
//! projection code is the same one pages use, so both paths agree exactly.
//!
//! ## Ingestion
//!
//! [`DocumentAggregate::ingest`] validates pages one by one. A bad page is
//! reported in [`Ingested::rejected`] and the rest of the document is kept.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, OnceLock};

use tracing::{debug, trace, warn};

use crate::bounds::ChunkBounds;
use crate::error::{Error, PageError, Result};
use crate::greedy::GreedyChunker;
use crate::matrix::TermMatrix;
use crate::page::{lookup, publish, CacheCounters, CacheStats, PageAggregate, ViewCache};
use crate::record::{AdvancedPageInput, DocumentInput, RawPageRecord};
use crate::section::{Position, Scalar, ScalarValue, SectionSelect};
use crate::table::{CountTable, Dimensions, RowKind};
use crate::target::ChunkTarget;
use crate::view::ViewSpec;
use crate::Chunker;

/// Document-wide defaults.
///
/// ```rust
/// use folios::{DocumentConfig, SectionSelect};
///
/// let config = DocumentConfig::default().with_default_section(SectionSelect::Group);
/// assert_eq!(config.default_section(), SectionSelect::Group);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentConfig {
    default_section: SectionSelect,
}

impl DocumentConfig {
    /// Section used by queries that do not name one (body by default).
    #[must_use]
    pub const fn with_default_section(mut self, section: SectionSelect) -> Self {
        self.default_section = section;
        self
    }

    /// The default section.
    #[must_use]
    pub const fn default_section(&self) -> SectionSelect {
        self.default_section
    }
}

/// The outcome of ingesting a document.
#[derive(Debug)]
pub struct Ingested {
    /// The document built from every valid page.
    pub document: DocumentAggregate,
    /// Pages that failed validation.
    pub rejected: Vec<PageError>,
}

/// A chunked count table and the chunk boundaries it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunked {
    /// Counts keyed by chunk number instead of page number.
    pub table: CountTable,
    /// One entry per chunk, in order.
    pub boundaries: Vec<ChunkBounds>,
}

/// A document-level term total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermFrequency {
    /// The term.
    pub term: Arc<str>,
    /// Its tag, unless tags were collapsed.
    pub tag: Option<Arc<str>>,
    /// Occurrences, or pages containing it.
    pub count: u64,
}

/// An ordered collection of pages with document-wide views.
#[derive(Debug)]
pub struct DocumentAggregate {
    id: Arc<str>,
    config: DocumentConfig,
    pages: Vec<PageAggregate>,
    general: OnceLock<Arc<CountTable>>,
    views: ViewCache<(ViewSpec, bool)>,
    stats: CacheCounters,
}

impl DocumentAggregate {
    /// Build a document from already-validated pages.
    ///
    /// Pages are ordered by page number.
    ///
    /// # Errors
    ///
    /// [`Error::InconsistentSchema`] if two pages share a page number.
    pub fn new(
        id: impl Into<Arc<str>>,
        mut pages: Vec<PageAggregate>,
        config: DocumentConfig,
    ) -> Result<Self> {
        let id = id.into();
        pages.sort_by_key(PageAggregate::page_number);
        if let Some(w) = pages
            .windows(2)
            .find(|w| w[0].page_number() == w[1].page_number())
        {
            return Err(Error::inconsistent(
                w[1].page_number(),
                "duplicate page number",
            ));
        }
        for page in pages.iter().filter(|p| p.document_id() != &*id) {
            warn!(
                document = %id,
                page = page.page_number(),
                page_document = page.document_id(),
                "page record belongs to a different document"
            );
        }
        Ok(Self::from_sorted(id, pages, config))
    }

    fn from_sorted(id: Arc<str>, pages: Vec<PageAggregate>, config: DocumentConfig) -> Self {
        Self {
            id,
            config,
            pages,
            general: OnceLock::new(),
            views: Mutex::new(HashMap::new()),
            stats: CacheCounters::default(),
        }
    }

    /// Validate every page of `input` and build a document from the valid ones.
    ///
    /// Companion records are paired with basic records by page number.
    /// Companions without a matching page are logged and ignored. A page
    /// number already taken by an accepted page rejects the later page; a
    /// rejected page leaves its number free for a later valid one.
    pub fn ingest(input: DocumentInput, config: DocumentConfig) -> Ingested {
        let id: Arc<str> = Arc::from(input.id);
        let schema = input.schema_version;
        let companions: HashMap<u32, AdvancedPageInput> = input
            .advanced
            .unwrap_or_default()
            .into_iter()
            .map(|c| (c.page_number, c))
            .collect();

        // Only accepted pages claim their number
        let mut seen = HashSet::new();
        let mut declared = HashSet::new();
        let mut pages = Vec::with_capacity(input.pages.len());
        let mut rejected = Vec::new();

        for page in input.pages {
            let number = page.page_number;
            declared.insert(number);
            let result = if seen.contains(&number) {
                Err(Error::inconsistent(number, "duplicate page number"))
            } else {
                let companion = companions.get(&number).cloned();
                RawPageRecord::new(Arc::clone(&id), schema, page, companion)
            };
            match result {
                Ok(record) => {
                    seen.insert(number);
                    pages.push(PageAggregate::new(record));
                }
                Err(source) => {
                    warn!(document = %id, page = number, error = %source, "rejected page");
                    rejected.push(PageError {
                        page: number,
                        source,
                    });
                }
            }
        }

        for number in companions.keys().filter(|n| !declared.contains(*n)) {
            warn!(document = %id, page = number, "companion record has no matching page; ignored");
        }

        debug!(
            document = %id,
            %schema,
            pages = pages.len(),
            rejected = rejected.len(),
            "ingested document"
        );

        pages.sort_by_key(PageAggregate::page_number);
        Ingested {
            document: Self::from_sorted(id, pages, config),
            rejected,
        }
    }

    /// Document identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Document-wide defaults.
    #[must_use]
    pub fn config(&self) -> DocumentConfig {
        self.config
    }

    /// The default view: the configured section, case kept, tags kept.
    #[must_use]
    pub fn default_view(&self) -> ViewSpec {
        ViewSpec::new(self.config.default_section)
    }

    /// Pages in page-number order.
    #[must_use]
    pub fn pages(&self) -> &[PageAggregate] {
        &self.pages
    }

    /// Number of pages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether the document has no pages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Page numbers in order.
    #[must_use]
    pub fn page_numbers(&self) -> Vec<u32> {
        self.pages.iter().map(PageAggregate::page_number).collect()
    }

    /// Look up a page by number.
    ///
    /// # Errors
    ///
    /// [`Error::PageNotFound`] if no such page exists.
    pub fn page(&self, number: u32) -> Result<&PageAggregate> {
        self.pages
            .binary_search_by_key(&number, PageAggregate::page_number)
            .map(|i| &self.pages[i])
            .map_err(|_| Error::PageNotFound(number))
    }

    /// Hit/miss counts of the document view cache.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    /// Whether the whole-document table has been built.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.general.get().is_some()
    }

    fn general(&self) -> &Arc<CountTable> {
        self.general.get_or_init(|| {
            let mut table = CountTable::new(Dimensions::GENERAL);
            for page in &self.pages {
                table.merge(&page.counts(ViewSpec::general()));
            }
            debug!(
                document = %self.id,
                pages = self.pages.len(),
                cells = table.len(),
                "built whole-document table"
            );
            Arc::new(table)
        })
    }

    /// Counts for one view over the whole document.
    ///
    /// Rows are page numbers unless `drop_page_dimension`, in which case
    /// counts are document totals.
    pub fn counts(&self, view: ViewSpec, drop_page_dimension: bool) -> Arc<CountTable> {
        let key = (view, drop_page_dimension);
        if let Some(hit) = lookup(&self.views, &self.stats, &key) {
            trace!(document = %self.id, ?view, drop_page_dimension, "document view cache hit");
            return hit;
        }
        let general = self.general();
        let table = if view.is_general() && !drop_page_dimension {
            Arc::clone(general)
        } else {
            Arc::new(view.project(general, !drop_page_dimension, None))
        };
        publish(&self.views, key, table)
    }

    /// Counts for one view of one page.
    ///
    /// Served from the whole-document table once it exists, otherwise from
    /// the page itself.
    ///
    /// # Errors
    ///
    /// [`Error::PageNotFound`] if no such page exists.
    pub fn page_counts(&self, number: u32, view: ViewSpec) -> Result<Arc<CountTable>> {
        let page = self.page(number)?;
        match self.general.get() {
            Some(general) => Ok(Arc::new(view.project(general, true, Some(number)))),
            None => Ok(page.counts(view)),
        }
    }

    /// Distinct terms of the default view whose total count is at least
    /// `min_count`, optionally restricted to one page.
    ///
    /// # Errors
    ///
    /// [`Error::PageNotFound`] if `page` names a missing page.
    pub fn vocabulary(&self, min_count: u64, page: Option<u32>) -> Result<BTreeSet<Arc<str>>> {
        self.vocabulary_for(self.default_view(), min_count, page)
    }

    /// [`Self::vocabulary`] for an arbitrary view.
    ///
    /// # Errors
    ///
    /// [`Error::PageNotFound`] if `page` names a missing page.
    pub fn vocabulary_for(
        &self,
        view: ViewSpec,
        min_count: u64,
        page: Option<u32>,
    ) -> Result<BTreeSet<Arc<str>>> {
        let table = match page {
            Some(number) => self.page_counts(number, view)?,
            None => self.counts(view, true),
        };
        if min_count <= 1 {
            return Ok(table.terms());
        }
        let mut totals: HashMap<&Arc<str>, u64> = HashMap::new();
        for (key, count) in table.iter() {
            if let Some(term) = &key.term {
                *totals.entry(term).or_insert(0) += count;
            }
        }
        Ok(totals
            .into_iter()
            .filter(|&(_, total)| total >= min_count)
            .map(|(term, _)| Arc::clone(term))
            .collect())
    }

    /// Total tokens per page, in page order.
    #[must_use]
    pub fn tokens_per_page(&self, section: SectionSelect) -> Vec<u64> {
        self.pages.iter().map(|p| p.token_count(section)).collect()
    }

    /// A page × term matrix over the default section, tags collapsed.
    ///
    /// With `page_frequency`, cells are 1 where the term occurs at all.
    pub fn term_matrix(&self, page_frequency: bool, fold_case: bool) -> TermMatrix {
        let view = self.default_view().fold_case(fold_case).collapse_tag(true);
        let mut table = self.counts(view, false).merge_sections();
        if page_frequency {
            table = table.page_frequency();
        }
        TermMatrix::new(self.page_numbers(), table)
    }

    /// Document-level totals per term (and tag, unless the view collapses
    /// tags), sorted by descending count then term.
    ///
    /// With `page_frequency`, counts are the number of pages containing the
    /// term instead of occurrences.
    pub fn term_frequencies(&self, page_frequency: bool, view: ViewSpec) -> Vec<TermFrequency> {
        let table = if page_frequency {
            self.counts(view, false)
                .merge_sections()
                .page_frequency()
                .drop_rows()
        } else {
            self.counts(view, true).merge_sections()
        };
        let mut out: Vec<TermFrequency> = table
            .iter()
            .filter_map(|(key, count)| {
                Some(TermFrequency {
                    term: key.term.clone()?,
                    tag: key.tag.clone(),
                    count,
                })
            })
            .collect();
        out.sort_by(|a, b| {
            (Reverse(a.count), &a.term, &a.tag).cmp(&(Reverse(b.count), &b.term, &b.tag))
        });
        out
    }

    /// A scalar feature for every page, in page order.
    ///
    /// # Errors
    ///
    /// [`Error::UnavailableFeature`] from the first page lacking the feature.
    pub fn scalars(&self, name: Scalar, section: SectionSelect) -> Result<Vec<(u32, ScalarValue)>> {
        self.pages
            .iter()
            .map(|p| Ok((p.page_number(), p.scalar(name, section)?)))
            .collect()
    }

    /// Line-edge character tallies for every page, keyed by page.
    ///
    /// # Errors
    ///
    /// [`Error::UnavailableFeature`] from the first page whose companion
    /// record is missing.
    pub fn edge_chars(&self, section: SectionSelect, position: Position) -> Result<CountTable> {
        let mut table = CountTable::new(ViewSpec::new(section).dims_for(Dimensions::EDGE_CHARS, true));
        for page in &self.pages {
            table.merge(&*page.edge_chars(section, position)?);
        }
        Ok(table)
    }

    /// Group pages greedily into chunks of about `target_token_count` tokens
    /// and return `view` keyed by chunk.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTarget`] if `target_token_count == 0`.
    pub fn chunk(&self, target_token_count: u64, view: ViewSpec) -> Result<Chunked> {
        let chunker = GreedyChunker::new(ChunkTarget::new(target_token_count)?);
        Ok(self.chunk_with(&chunker, view))
    }

    /// Chunk boundaries for `target_token_count`, weighted by the default section.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTarget`] if `target_token_count == 0`.
    pub fn chunk_boundaries(&self, target_token_count: u64) -> Result<Vec<ChunkBounds>> {
        let chunker = GreedyChunker::new(ChunkTarget::new(target_token_count)?);
        Ok(chunker.partition(&self.weights(self.config.default_section)))
    }

    /// Chunk with any strategy. Pages are weighted by their token totals in
    /// the view's section.
    pub fn chunk_with(&self, chunker: &dyn Chunker, view: ViewSpec) -> Chunked {
        let boundaries = chunker.partition(&self.weights(view.section()));
        // Boundaries are ordered by page, so each page's chunk is a binary search away.
        let table = self.counts(view, false).regroup_rows(RowKind::Chunk, |page| {
            let i = boundaries.partition_point(|b| b.last_page < page);
            boundaries.get(i).filter(|b| b.contains(page)).map(|b| b.chunk)
        });
        debug!(
            document = %self.id,
            chunks = boundaries.len(),
            cells = table.len(),
            "chunked document"
        );
        Chunked { table, boundaries }
    }

    fn weights(&self, section: SectionSelect) -> Vec<(u32, u64)> {
        self.pages
            .iter()
            .map(|p| (p.page_number(), p.token_count(section)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{PageInput, SchemaVersion, SectionInput};
    use crate::section::Section;
    use crate::table::CountKey;

    fn term_total(table: &CountTable, term: &str) -> u64 {
        table
            .iter()
            .filter(|(k, _)| k.term_str() == Some(term))
            .map(|(_, v)| v)
            .sum()
    }

    fn input(pages: Vec<PageInput>) -> DocumentInput {
        DocumentInput {
            id: "test.0001".to_owned(),
            schema_version: SchemaVersion::V2,
            pages,
            advanced: None,
        }
    }

    fn body_page(number: u32, triples: &[(&str, &str, i64)]) -> PageInput {
        PageInput::with_body(number, SectionInput::from_triples(triples.iter().copied()))
    }

    fn two_pages() -> DocumentAggregate {
        let ingested = DocumentAggregate::ingest(
            input(vec![
                body_page(1, &[("cat", "NN", 2), ("Cat", "NN", 1)]),
                body_page(2, &[("cat", "NN", 1)]),
            ]),
            DocumentConfig::default(),
        );
        assert!(ingested.rejected.is_empty());
        ingested.document
    }

    #[test]
    fn test_cat_example() {
        let doc = two_pages();
        let view = ViewSpec::new(SectionSelect::Body)
            .fold_case(true)
            .collapse_tag(true);
        let t = doc.counts(view, true);
        assert_eq!(t.len(), 1);
        assert_eq!(
            t.get(&CountKey::term("cat").with_section(Section::Body)),
            4
        );
    }

    #[test]
    fn test_cache_built_once() {
        let doc = two_pages();
        assert!(!doc.is_cached());
        let _ = doc.counts(ViewSpec::new(SectionSelect::Body), false);
        assert!(doc.is_cached());
        let reads: Vec<_> = doc.pages().iter().map(|p| p.record().token_reads()).collect();

        let _ = doc.counts(ViewSpec::new(SectionSelect::Group).fold_case(true), true);
        let _ = doc.counts(ViewSpec::general().collapse_tag(true), false);
        let after: Vec<_> = doc.pages().iter().map(|p| p.record().token_reads()).collect();
        assert_eq!(reads, after);
    }

    #[test]
    fn test_repeated_view_hits_cache() {
        let doc = two_pages();
        let view = ViewSpec::new(SectionSelect::Body).fold_case(true);
        let a = doc.counts(view, false);
        let b = doc.counts(view, false);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(doc.cache_stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn test_concurrent_cold_reads_build_once() {
        let doc = two_pages();
        let view = ViewSpec::new(SectionSelect::Body).fold_case(true);
        let tables: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| doc.counts(view, false))).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(tables.iter().all(|t| Arc::ptr_eq(t, &tables[0])));
        for page in doc.pages() {
            assert_eq!(page.record().token_reads(), 3);
        }
        let stats = doc.cache_stats();
        assert_eq!(stats.hits + stats.misses, 8);
    }

    #[test]
    fn test_page_counts_from_cache_match_page() {
        let doc = two_pages();
        let view = ViewSpec::new(SectionSelect::Body).fold_case(true);
        let direct = doc.page_counts(1, view).unwrap();
        let _ = doc.counts(ViewSpec::general(), false);
        let sliced = doc.page_counts(1, view).unwrap();
        assert_eq!(direct, sliced);
    }

    #[test]
    fn test_page_not_found() {
        let doc = two_pages();
        assert_eq!(doc.page(9).unwrap_err(), Error::PageNotFound(9));
        assert!(doc.vocabulary(1, Some(9)).is_err());
    }

    #[test]
    fn test_vocabulary() {
        let doc = two_pages();
        let all: Vec<_> = doc.vocabulary(1, None).unwrap().into_iter().collect();
        assert_eq!(all, vec![Arc::<str>::from("Cat"), Arc::from("cat")]);
        let frequent = doc.vocabulary(2, None).unwrap();
        assert_eq!(frequent.len(), 1);
        assert!(frequent.contains("cat"));
        let page2 = doc.vocabulary(1, Some(2)).unwrap();
        assert_eq!(page2.len(), 1);
    }

    #[test]
    fn test_tokens_per_page() {
        let doc = two_pages();
        assert_eq!(doc.tokens_per_page(SectionSelect::Body), vec![3, 1]);
        assert_eq!(doc.tokens_per_page(SectionSelect::Header), vec![0, 0]);
    }

    #[test]
    fn test_term_matrix() {
        let doc = two_pages();
        let tf = doc.term_matrix(false, true);
        assert_eq!(tf.get(1, "cat"), 3);
        assert_eq!(tf.get(2, "cat"), 1);
        assert_eq!(tf.get(2, "dog"), 0);

        let pf = doc.term_matrix(true, false);
        assert_eq!(pf.get(1, "cat"), 1);
        assert_eq!(pf.get(1, "Cat"), 1);
        assert_eq!(pf.get(2, "Cat"), 0);
    }

    #[test]
    fn test_term_frequencies() {
        let doc = two_pages();
        let view = ViewSpec::new(SectionSelect::Body).collapse_tag(true);
        let freqs = doc.term_frequencies(false, view);
        assert_eq!(&*freqs[0].term, "cat");
        assert_eq!(freqs[0].count, 3);
        assert_eq!(freqs[0].tag, None);

        let pages = doc.term_frequencies(true, view);
        assert_eq!(pages[0].count, 2);
        assert_eq!(pages[1].count, 1);
    }

    #[test]
    fn test_ingest_reports_bad_pages() {
        let ingested = DocumentAggregate::ingest(
            input(vec![
                body_page(1, &[("a", "DT", 1)]),
                body_page(2, &[("b", "NN", -3)]),
                body_page(1, &[("c", "NN", 1)]),
                body_page(3, &[("d", "NN", 2)]),
            ]),
            DocumentConfig::default(),
        );
        assert_eq!(ingested.document.page_numbers(), vec![1, 3]);
        let rejected: Vec<_> = ingested.rejected.iter().map(|e| e.page).collect();
        assert_eq!(rejected, vec![2, 1]);
        assert!(ingested
            .rejected
            .iter()
            .all(|e| matches!(e.source, Error::InconsistentSchema { .. })));
    }

    #[test]
    fn test_pages_sorted() {
        let ingested = DocumentAggregate::ingest(
            input(vec![
                body_page(3, &[("c", "NN", 1)]),
                body_page(1, &[("a", "NN", 1)]),
            ]),
            DocumentConfig::default(),
        );
        assert_eq!(ingested.document.page_numbers(), vec![1, 3]);
    }

    #[test]
    fn test_new_rejects_duplicate_pages() {
        let page = |n| {
            PageAggregate::new(
                RawPageRecord::new("d", SchemaVersion::V2, body_page(n, &[]), None).unwrap(),
            )
        };
        let err = DocumentAggregate::new("d", vec![page(1), page(1)], DocumentConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::InconsistentSchema { page: 1, .. }));
    }

    #[test]
    fn test_chunk_example() {
        let pages = (1..=5)
            .map(|n| body_page(n, &[("w", "NN", 4)]))
            .collect();
        let doc = DocumentAggregate::ingest(input(pages), DocumentConfig::default()).document;
        let bounds = doc.chunk_boundaries(10).unwrap();
        assert_eq!(
            bounds,
            vec![ChunkBounds::new(1, 1, 3, 12), ChunkBounds::new(2, 4, 5, 8)]
        );

        let chunked = doc.chunk(10, ViewSpec::new(SectionSelect::Body)).unwrap();
        assert_eq!(chunked.table.dims().row, Some(RowKind::Chunk));
        assert_eq!(chunked.table.row_total(1), 12);
        assert_eq!(chunked.table.row_total(2), 8);
        assert_eq!(term_total(&chunked.table, "w"), 20);
    }

    #[test]
    fn test_chunk_invalid_target() {
        let doc = two_pages();
        assert_eq!(
            doc.chunk(0, ViewSpec::default()).unwrap_err(),
            Error::InvalidTarget(0)
        );
        assert!(doc.chunk_boundaries(0).is_err());
    }

    #[test]
    fn test_empty_document_has_no_chunks() {
        let doc = DocumentAggregate::ingest(input(vec![]), DocumentConfig::default()).document;
        let chunked = doc.chunk(10, ViewSpec::default()).unwrap();
        assert!(chunked.boundaries.is_empty());
        assert!(chunked.table.is_empty());
    }

    #[test]
    fn test_edge_chars_unavailable() {
        let doc = two_pages();
        assert!(matches!(
            doc.edge_chars(SectionSelect::Body, Position::End),
            Err(Error::UnavailableFeature { page: 1, .. })
        ));
        assert!(doc.scalars(Scalar::LineCount, SectionSelect::Body).is_ok());
    }
}
