//! Error types for folios.

/// Errors that can occur while building or querying aggregates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A feature only shipped in the companion "advanced" record was requested
    /// for a page whose companion record was never supplied.
    #[error("page {page}: {feature} unavailable (advanced companion record not supplied)")]
    UnavailableFeature {
        /// The page the feature was requested for.
        page: u32,
        /// Name of the missing feature.
        feature: &'static str,
    },

    /// Invalid chunk target (must be > 0).
    #[error("invalid chunk target: {0} (must be > 0)")]
    InvalidTarget(u64),

    /// The declared schema version disagrees with the data actually supplied.
    #[error("page {page}: inconsistent schema: {reason}")]
    InconsistentSchema {
        /// The offending page number as declared by the input.
        page: u32,
        /// What was wrong with it.
        reason: String,
    },

    /// The document holds no page with this number.
    #[error("page {0} not found in document")]
    PageNotFound(u32),
}

impl Error {
    pub(crate) fn inconsistent(page: u32, reason: impl Into<String>) -> Self {
        Self::InconsistentSchema {
            page,
            reason: reason.into(),
        }
    }
}

/// A page that was rejected while ingesting a document.
///
/// Ingestion never aborts the whole document: each rejected page is reported
/// with the error that disqualified it and the remaining pages are kept.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("rejected page {page}: {source}")]
pub struct PageError {
    /// Page number as declared by the input record.
    pub page: u32,
    /// Why the page was rejected.
    pub source: Error,
}

/// Result type for folios operations.
pub type Result<T> = std::result::Result<T, Error>;
