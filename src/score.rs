use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::stock::Bin;
use crate::types::Piece;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreStrategy {
    /// Bin whose remainder after the piece would be smallest.
    #[default]
    BestFit,
    /// Lowest-indexed bin that holds the piece.
    FirstFit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredBin {
    pub index: usize,
    /// Length that would remain in the bin, kerf not included.
    pub score: f64,
}

/// Picks the open bin `piece` should be cut from, or `None` when no open bin
/// is long enough.
///
/// `open` is keyed by bin index and iterated in ascending order, so equal
/// scores always resolve to the lowest index.
pub fn find_best(
    piece: &Piece,
    open: &BTreeMap<usize, Bin>,
    strategy: ScoreStrategy,
) -> Option<ScoredBin> {
    let mut candidates = open
        .values()
        .filter(|bin| bin.encloses(piece))
        .map(|bin| ScoredBin {
            index: bin.index,
            score: bin.length - piece.length,
        });

    match strategy {
        ScoreStrategy::FirstFit => candidates.next(),
        ScoreStrategy::BestFit => {
            let mut best: Option<ScoredBin> = None;
            for scored in candidates {
                if best.is_none_or(|b| scored.score < b.score) {
                    best = Some(scored);
                }
            }
            best
        }
    }
}
