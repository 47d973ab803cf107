use crate::error::{PackError, Result};
use crate::packer::Packer;
use crate::stock::Bin;
use crate::types::{BinSpec, BoxSpec, PackConfig, PackReport, Piece};

/// Entry point for callers: turns stock and piece definitions into a
/// finished [`PackReport`].
pub struct PackEngine {
    config: PackConfig,
}

impl PackEngine {
    pub fn new(config: PackConfig) -> Self {
        Self { config }
    }

    /// Packs `boxes` into `bins`. With no bins, a single bin of the base
    /// stock length at origin 0 is used (and cloned as more are needed).
    pub fn run(&self, bins: Vec<BinSpec>, boxes: Vec<BoxSpec>) -> Result<PackReport> {
        let base = self.config.base_stock_length;
        if !base.is_finite() || base <= 0.0 {
            return Err(PackError::InvalidBin {
                index: 0,
                reason: format!("base stock length must be a finite positive number, got {base}"),
            });
        }

        let bins: Vec<Bin> = if bins.is_empty() {
            vec![Bin::new(base, 0.0, 0)]
        } else {
            bins.into_iter().map(Bin::from).collect()
        };
        let pieces: Vec<Piece> = boxes
            .into_iter()
            .map(|b| Piece::new(b.length, b.group_label))
            .collect();
        let requested = pieces.len();

        let mut packer = Packer::new(self.config.saw_kerf, self.config.trim, self.config.strategy);
        packer.pack(bins, pieces)?;
        let report = packer.into_report();

        tracing::info!(
            pieces = requested,
            placed = report.placed_count(),
            unplaced = report.unplaced.len(),
            bins = report.bins.len(),
            waste_percent = report.total_waste_percent(),
            "pack finished"
        );
        Ok(report)
    }
}

impl Default for PackEngine {
    fn default() -> Self {
        Self::new(PackConfig::default())
    }
}
