//! Chunk target configuration.
//!
//! ## The Problem
//!
//! Books are uneven. A page of dense prose can carry 500 tokens; a chapter
//! title page carries 5. Per-page statistics therefore mix very different
//! sample sizes. Grouping pages into chunks of a roughly fixed token weight
//! gives comparable units:
//!
//! ```text
//! Page tokens: [480, 12, 350, 410, 9, 0, 520, 300]
//! Target: 800
//!
//! Chunk 1: pages 1-3  (842)   <- closes once the running total >= 800
//! Chunk 2: pages 4-7  (939)
//! Chunk 3: page  8    (300)   <- final chunk keeps the remainder
//! ```
//!
//! Pages are indivisible, so chunks overshoot the target by up to one page.
//! `ChunkTarget` only states the goal; the strategy deciding where to close
//! a chunk lives in the chunkers.

use crate::error::{Error, Result};

/// Target token weight per chunk.
///
/// # Examples
///
/// ```rust
/// use folios::ChunkTarget;
///
/// let target = ChunkTarget::new(10_000).unwrap();
/// assert_eq!(target.tokens(), 10_000);
/// assert!(target.is_reached(10_000));
/// assert!(!target.is_reached(9_999));
///
/// // Zero is rejected
/// assert!(ChunkTarget::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkTarget {
    tokens: u64,
}

impl ChunkTarget {
    /// Create a target of `tokens` tokens per chunk.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTarget`] if `tokens == 0`.
    pub fn new(tokens: u64) -> Result<Self> {
        if tokens == 0 {
            Err(Error::InvalidTarget(tokens))
        } else {
            Ok(Self { tokens })
        }
    }

    /// The target weight.
    #[must_use]
    pub const fn tokens(&self) -> u64 {
        self.tokens
    }

    /// Whether a chunk holding `running` tokens should close.
    #[must_use]
    pub const fn is_reached(&self, running: u64) -> bool {
        running >= self.tokens
    }
}

impl Default for ChunkTarget {
    fn default() -> Self {
        // Roughly a chapter of prose.
        Self { tokens: 10_000 }
    }
}

impl TryFrom<u64> for ChunkTarget {
    type Error = Error;

    fn try_from(tokens: u64) -> Result<Self> {
        Self::new(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_target_rejected() {
        assert_eq!(ChunkTarget::new(0), Err(Error::InvalidTarget(0)));
        assert!(ChunkTarget::try_from(0).is_err());
    }

    #[test]
    fn test_is_reached() {
        let target = ChunkTarget::new(10).unwrap();
        assert!(!target.is_reached(9));
        assert!(target.is_reached(10));
        assert!(target.is_reached(12));
    }

    #[test]
    fn test_default() {
        assert_eq!(ChunkTarget::default().tokens(), 10_000);
    }
}
