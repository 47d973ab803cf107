use serde::Serialize;

use crate::types::{BinSpec, Cut, Leftover, Piece};

/// A span of linear stock.
///
/// During packing a `Bin` is a working fragment: each cut replaces it with
/// the remainder it returns. In a finished report it is the original,
/// as-supplied stock with everything cut from it attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub length: f64,
    pub x: f64,
    pub index: usize,
    pub boxes: Vec<Piece>,
    pub leftovers: Vec<Leftover>,
    pub cuts: Vec<Cut>,
    pub cleaned: bool,
    pub cleancut: f64,
}

impl Bin {
    pub fn new(length: f64, x: f64, index: usize) -> Self {
        Self {
            length,
            x,
            index,
            boxes: Vec::new(),
            leftovers: Vec::new(),
            cuts: Vec::new(),
            cleaned: false,
            cleancut: 0.0,
        }
    }

    /// Trims `trim` off both ends. Must run at most once, before anything
    /// is cut from the bin.
    pub fn cleanup(&mut self, trim: f64) {
        debug_assert!(!self.cleaned, "bin #{} cleaned twice", self.index);
        if trim == 0.0 || self.cleaned {
            return;
        }
        self.length -= 2.0 * trim;
        self.x += trim;
        self.cleaned = true;
        self.cleancut = trim;
    }

    /// Returns what remains after cutting `length` plus one kerf from the
    /// front of this bin. A remainder shorter than a kerf is absorbed: the
    /// result is then an empty bin at origin 0.
    pub fn cut(&self, length: f64, kerf: f64) -> Bin {
        let (rest, x) = if self.length > length + kerf {
            (self.length - (length + kerf), self.x + length + kerf)
        } else {
            (0.0, 0.0)
        };
        Bin {
            cleaned: self.cleaned,
            cleancut: self.cleancut,
            ..Bin::new(rest, x, self.index)
        }
    }

    /// Capacity check. Kerf is not considered.
    pub fn encloses(&self, piece: &Piece) -> bool {
        self.length >= piece.length
    }

    /// Copies geometry and cleanup state into a fresh bin with nothing
    /// placed on it.
    pub fn snapshot(&self) -> Bin {
        Bin {
            cleaned: self.cleaned,
            cleancut: self.cleancut,
            ..Bin::new(self.length, self.x, self.index)
        }
    }

    pub fn used_length(&self) -> f64 {
        self.boxes.iter().map(|b| b.length).sum()
    }

    pub fn as_leftover(&self) -> Leftover {
        Leftover {
            length: self.length,
            x: self.x,
        }
    }
}

impl From<BinSpec> for Bin {
    fn from(spec: BinSpec) -> Self {
        Bin::new(spec.length, spec.origin, spec.index)
    }
}

impl std::fmt::Display for Bin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {} @ {}", self.index, self.length, self.x)
    }
}
