//! # folios
//!
//! Hierarchical count aggregation over page-level text-analysis records.
//!
//! ## The Problem
//!
//! A digitized book arrives as one record per page: token counts split by
//! running header, body and footer, each token tagged with its part of
//! speech, plus line and sentence counts and tallies of the characters lines
//! start and end with. Questions about the book come at every level:
//!
//! - How often does "whale" appear on page 112?
//! - Which terms appear in the body of at least five pages?
//! - What does the vocabulary look like per 10,000-token chunk?
//!
//! Each answer is the same data regrouped: by page or by chunk, per section
//! or summed, case-sensitive or folded, tagged or not.
//!
//! ## The Model
//!
//! Everything is a sparse [`CountTable`] keyed by up to four dimensions:
//!
//! ```text
//!   row        section    term     tag
//! (page 12,    Body,      "Cat",   NNP)  -> 3
//! (page 12,    Body,      "cat",   NN )  -> 2
//! (page 13,    Header,    "CHAPTER", NN) -> 1
//! ```
//!
//! Views are derived from the fully general table in one pass:
//!
//! | Transformation | Effect |
//! |----------------|--------|
//! | fold case | lowercase terms, sum collisions |
//! | collapse tag | drop the tag, sum collisions |
//! | `Group` section | sum header, body and footer |
//! | single section | keep one section's cells |
//! | drop rows | document totals |
//! | chunk | relabel page rows as chunk rows |
//!
//! Every transformation preserves totals: summed over terms and tags, a
//! row's counts always equal the section's token total.
//!
//! ## Levels and Caching
//!
//! ```text
//! RawPageRecord ──> PageAggregate ──┐
//! RawPageRecord ──> PageAggregate ──┼──> DocumentAggregate ──> Chunked
//! RawPageRecord ──> PageAggregate ──┘
//! ```
//!
//! Pages memoize each view they are asked for. The document builds one
//! whole-document table on first use and derives every later request from
//! it, including single-page lookups.
//!
//! ## Quick Start
//!
//! ```rust
//! use folios::{DocumentAggregate, DocumentConfig, DocumentInput, PageInput,
//!              SchemaVersion, SectionInput, SectionSelect, ViewSpec};
//!
//! let input = DocumentInput {
//!     id: "mdp.39015012345678".into(),
//!     schema_version: SchemaVersion::V2,
//!     pages: vec![
//!         PageInput::with_body(1, SectionInput::from_triples([("cat", "NN", 2), ("Cat", "NN", 1)])),
//!         PageInput::with_body(2, SectionInput::from_triples([("cat", "NN", 1)])),
//!     ],
//!     advanced: None,
//! };
//! let doc = DocumentAggregate::ingest(input, DocumentConfig::default()).document;
//!
//! let view = ViewSpec::new(SectionSelect::Body).fold_case(true).collapse_tag(true);
//! let totals = doc.counts(view, true);
//! assert_eq!(totals.total(), 4);
//!
//! let chunks = doc.chunk_boundaries(3).unwrap();
//! assert_eq!(chunks.len(), 2);
//! ```
//!
//! ## Chunking Strategies
//!
//! | Strategy | Closes a chunk when | Slack goes to |
//! |----------|---------------------|---------------|
//! | [`GreedyChunker`] | running total >= target | the last chunk |
//! | [`EvenChunker`] | nearest boundary to the spread target, from both ends | every chunk |
//! | [`EndsChunker`] | as even, but the first round is not spread | the first and last chunk |

mod balance;
mod bounds;
mod document;
mod ends;
mod error;
mod even;
mod greedy;
mod matrix;
mod page;
mod record;
mod section;
mod table;
mod target;
mod view;

pub use bounds::ChunkBounds;
pub use document::{Chunked, DocumentAggregate, DocumentConfig, Ingested, TermFrequency};
pub use ends::EndsChunker;
pub use error::{Error, PageError, Result};
pub use even::EvenChunker;
pub use greedy::GreedyChunker;
pub use matrix::TermMatrix;
pub use page::{CacheStats, PageAggregate};
pub use record::{
    AdvancedPageInput, AdvancedSection, AdvancedSectionInput, AdvancedSource, DocumentInput,
    PageInput, RawPageRecord, SchemaVersion, SectionInput, SectionRecord, TokenCount, TokenEntry,
};
pub use section::{Position, Scalar, ScalarValue, Section, SectionSelect};
pub use table::{CountKey, CountTable, Dimensions, RowKind, TermKind};
pub use target::ChunkTarget;
pub use view::ViewSpec;

/// A page chunking strategy.
///
/// Chunkers see only `(page number, token weight)` pairs in page order and
/// return contiguous, 1-numbered chunks covering every page exactly once:
///
/// ```rust
/// use folios::{ChunkBounds, ChunkTarget, Chunker, EndsChunker, EvenChunker, GreedyChunker};
///
/// fn boundaries(chunker: &dyn Chunker, pages: &[(u32, u64)]) -> Vec<ChunkBounds> {
///     chunker.partition(pages)
/// }
///
/// let target = ChunkTarget::new(100).unwrap();
/// let pages: Vec<(u32, u64)> = (1..=12).map(|p| (p, 20)).collect();
///
/// assert_eq!(boundaries(&GreedyChunker::new(target), &pages).len(), 3);
/// assert_eq!(boundaries(&EvenChunker::new(target), &pages).len(), 2);
/// assert_eq!(boundaries(&EndsChunker::new(target), &pages).len(), 2);
/// ```
pub trait Chunker: Send + Sync {
    /// Group pages into chunks.
    fn partition(&self, pages: &[(u32, u64)]) -> Vec<ChunkBounds>;

    /// Estimate the number of chunks for a document of `total_tokens`.
    ///
    /// Useful for pre-allocation. May be approximate, but is 0 for an
    /// empty document.
    fn estimate_chunks(&self, total_tokens: u64) -> usize;
}
