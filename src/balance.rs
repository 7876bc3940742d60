//! Two-sided balanced breaks, shared by the even and ends strategies.
//!
//! Instead of walking forward until a target is reached, each round places
//! one break from the front and one from the back, each at the cumulative
//! page total *nearest* a local target. The local target absorbs part of
//! the overflow, the remainder left when the words still unassigned are
//! split into target-sized chunks:
//!
//! ```text
//! words_left = 1_030, target = 100
//! overflow   = 1_030 mod 100 = 30          (or overflow - target if closer)
//! spread     = 30 * 2 / round(10.3) = 6    (when spreading applies)
//! local      = 100 + 6 / 2 = 103
//! ```
//!
//! Rounds stop once fewer than 1.5 targets remain (the middle becomes one
//! chunk), or split the middle at its midpoint once fewer than 2.5 remain.

use crate::bounds::ChunkBounds;
use crate::target::ChunkTarget;

/// When the overflow is divided over the chunks still to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Spread {
    /// Every round: chunks come out near-equal.
    Every,
    /// Every round but the first: the outer chunks take the slack.
    AfterFirst,
}

/// Index of the first cumulative total nearest `goal`.
fn nearest(cumulative: impl Iterator<Item = u64>, goal: f64) -> usize {
    let mut best = (0, f64::INFINITY);
    for (i, total) in cumulative.enumerate() {
        let distance = (total as f64 - goal).abs();
        if distance < best.1 {
            best = (i, distance);
        }
    }
    best.0
}

fn local_target(words_left: f64, target: f64, spread: bool) -> f64 {
    let mut overflow = words_left % target;
    if target - overflow < overflow {
        overflow -= target;
    }
    if spread {
        let remaining = (words_left / target).round_ties_even();
        if remaining > 2.0 {
            overflow = overflow * 2.0 / remaining;
        }
    }
    target + overflow / 2.0
}

/// Break `pages` (page number, tokens) from both ends toward the middle.
pub(crate) fn two_sided(
    pages: &[(u32, u64)],
    target: ChunkTarget,
    spread: Spread,
) -> Vec<ChunkBounds> {
    let n = pages.len();
    let target = target.tokens() as f64;
    let prefix: Vec<u64> = std::iter::once(0)
        .chain(pages.iter().scan(0u64, |sum, &(_, t)| {
            *sum += t;
            Some(*sum)
        }))
        .collect();

    // starts[i]: a new chunk opens at page i
    let mut starts = vec![false; n];
    let (mut start, mut end) = (0, n);
    let mut round = 0;

    while start < end {
        let words_left = (prefix[end] - prefix[start]) as f64;
        if words_left < target * 1.5 {
            break;
        }
        let (lo, hi, sums) = (start, end, &prefix);
        let forward = (lo + 1..=hi).map(move |i| sums[i] - sums[lo]);
        let backward = (lo..hi).rev().map(move |i| sums[hi] - sums[i]);

        if words_left < target * 2.5 {
            let mid = start + nearest(forward, words_left / 2.0) + 1;
            if mid < end {
                starts[mid] = true;
            }
            break;
        }

        let spreading = spread == Spread::Every || round > 0;
        let local = local_target(words_left, target, spreading);
        round += 1;

        start += nearest(forward, local) + 1;
        if start >= n {
            break;
        }
        starts[start] = true;

        // Never reach back into the chunk just closed at the front
        end = (end - nearest(backward, local) - 1).max(start);
        if end < n {
            starts[end] = true;
        }
    }

    let mut chunks: Vec<ChunkBounds> = Vec::new();
    for (&(page, tokens), &opens) in pages.iter().zip(&starts) {
        if opens || chunks.is_empty() {
            chunks.push(ChunkBounds::new(chunks.len() as u32 + 1, page, page, tokens));
        } else if let Some(chunk) = chunks.last_mut() {
            chunk.last_page = page;
            chunk.tokens += tokens;
        }
    }
    chunks
}
