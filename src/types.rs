use serde::{Deserialize, Serialize};

use crate::error::{PackError, Result};
use crate::score::ScoreStrategy;
use crate::stock::Bin;

/// A requested piece of stock, cut to `length`.
///
/// `x` and `index` stay empty until the packer places the piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    pub length: f64,
    /// Group label carried through from the cutlist, e.g. a part name.
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl Piece {
    pub fn new(length: f64, number: impl Into<String>) -> Self {
        Self {
            length,
            number: number.into(),
            x: None,
            index: None,
        }
    }

    pub fn is_placed(&self) -> bool {
        self.index.is_some()
    }
}

impl std::fmt::Display for Piece {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.length, self.number)
    }
}

/// One saw cut, at an absolute position along the bin it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cut {
    pub position: f64,
    pub bin_index: usize,
}

/// Unused stock left in a bin once packing is done.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Leftover {
    pub length: f64,
    pub x: f64,
}

/// Caller-supplied stock definition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinSpec {
    pub length: f64,
    #[serde(default)]
    pub origin: f64,
    pub index: usize,
}

impl BinSpec {
    pub fn new(length: f64, origin: f64, index: usize) -> Self {
        Self {
            length,
            origin,
            index,
        }
    }
}

/// Upper bound on the pieces a single run may expand to.
pub const MAX_PIECES: usize = 100_000;

/// A piece length wanted `qty` times, as entered in a cutlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Demand {
    pub length: f64,
    pub qty: u32,
    pub label: String,
}

/// Expands demands into one `BoxSpec` per piece. The total is checked
/// before anything is allocated.
pub fn expand_demands(demands: &[Demand]) -> Result<Vec<BoxSpec>> {
    let requested: u64 = demands.iter().map(|d| u64::from(d.qty)).sum();
    if requested > MAX_PIECES as u64 {
        return Err(PackError::TooManyPieces {
            requested,
            limit: MAX_PIECES,
        });
    }
    let mut boxes = Vec::with_capacity(requested as usize);
    for d in demands {
        boxes.extend((0..d.qty).map(|_| BoxSpec::new(d.length, d.label.clone())));
    }
    Ok(boxes)
}

/// Caller-supplied piece requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSpec {
    pub length: f64,
    pub group_label: String,
}

impl BoxSpec {
    pub fn new(length: f64, group_label: impl Into<String>) -> Self {
        Self {
            length,
            group_label: group_label.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackConfig {
    /// Length of the default bin, used when no bins are supplied.
    pub base_stock_length: f64,
    /// Material destroyed by each saw cut.
    pub saw_kerf: f64,
    /// Material removed from both ends of every bin before cutting.
    pub trim: f64,
    pub strategy: ScoreStrategy,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            base_stock_length: 2400.0,
            saw_kerf: 0.0,
            trim: 0.0,
            strategy: ScoreStrategy::default(),
        }
    }
}

/// Outcome of one packing run: every original bin enriched with its placed
/// pieces, leftovers and cuts, plus the pieces that could not be placed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackReport {
    pub bins: Vec<Bin>,
    pub unplaced: Vec<Piece>,
}

impl PackReport {
    pub fn used_bin_count(&self) -> usize {
        self.bins.iter().filter(|b| !b.boxes.is_empty()).count()
    }

    pub fn placed_count(&self) -> usize {
        self.bins.iter().map(|b| b.boxes.len()).sum()
    }

    pub fn total_leftover(&self) -> f64 {
        self.bins
            .iter()
            .flat_map(|b| &b.leftovers)
            .map(|l| l.length)
            .sum()
    }

    /// Share of stock in used bins not covered by a piece (kerf, trim and
    /// leftovers all count as waste here).
    pub fn total_waste_percent(&self) -> f64 {
        let used_bins = self.bins.iter().filter(|b| !b.boxes.is_empty());
        let (stock, used) = used_bins.fold((0.0, 0.0), |(stock, used), b| {
            (stock + b.length, used + b.used_length())
        });
        if stock == 0.0 {
            return 0.0;
        }
        (stock - used) / stock * 100.0
    }
}
