use std::collections::{BTreeMap, HashSet};

use crate::error::{PackError, Result};
use crate::score::{self, ScoreStrategy};
use crate::stock::Bin;
use crate::types::{Cut, PackReport, Piece};

/// Greedy best-fit-decreasing cutter for linear stock.
///
/// A packer runs once: construct it, call [`Packer::pack`], then read the
/// results back through the accessors or [`Packer::into_report`].
pub struct Packer {
    kerf: f64,
    trim: f64,
    strategy: ScoreStrategy,
    /// Bins as supplied (or synthesized), untouched by cutting.
    original_bins: Vec<Bin>,
    /// Working fragments, one per bin index, replaced on every cut.
    open: BTreeMap<usize, Bin>,
    placed: Vec<Piece>,
    unplaced: Vec<Piece>,
    cuts: Vec<Cut>,
    packed: bool,
}

impl Packer {
    pub fn new(kerf: f64, trim: f64, strategy: ScoreStrategy) -> Self {
        Self {
            kerf,
            trim,
            strategy,
            original_bins: Vec::new(),
            open: BTreeMap::new(),
            placed: Vec::new(),
            unplaced: Vec::new(),
            cuts: Vec::new(),
            packed: false,
        }
    }

    pub fn pack(&mut self, bins: Vec<Bin>, pieces: Vec<Piece>) -> Result<()> {
        if self.packed {
            return Err(PackError::AlreadyPacked);
        }
        self.validate(&bins, &pieces)?;
        self.packed = true;

        self.original_bins = bins.iter().map(Bin::snapshot).collect();
        for mut bin in bins {
            bin.cleanup(self.trim);
            self.open.insert(bin.index, bin);
        }

        // Stable: equal lengths keep their input order.
        let mut queue = pieces;
        queue.sort_by(|a, b| b.length.total_cmp(&a.length));

        for mut piece in queue {
            let target = match score::find_best(&piece, &self.open, self.strategy) {
                Some(scored) => self.open.remove(&scored.index),
                None => self.synthesize(&piece),
            };
            let Some(target) = target else {
                tracing::debug!(length = piece.length, number = %piece.number, "piece unplaceable");
                self.unplaced.push(piece);
                continue;
            };

            piece.x = Some(target.x);
            piece.index = Some(target.index);
            let remainder = target.cut(piece.length, self.kerf);
            self.cuts.push(Cut {
                position: target.x + piece.length,
                bin_index: target.index,
            });
            tracing::debug!(
                length = piece.length,
                bin = target.index,
                x = target.x,
                remainder = remainder.length,
                "piece placed"
            );
            self.placed.push(piece);
            self.open.insert(remainder.index, remainder);
        }

        self.fold();
        Ok(())
    }

    /// Opens a fresh bin cut from the reference stock, i.e. the first bin
    /// supplied. Returns `None` when even a fresh bin could not hold the
    /// piece, since every later bin would be the same length.
    fn synthesize(&mut self, piece: &Piece) -> Option<Bin> {
        let reference = self.original_bins.first()?;
        let (length, x) = (reference.length, reference.x);
        if piece.length >= length || piece.length > length - 2.0 * self.trim {
            return None;
        }

        // Indices only grow; once usize::MAX is taken no new bin can open.
        let index = match self.original_bins.iter().map(|b| b.index).max() {
            Some(max) => max.checked_add(1)?,
            None => 0,
        };
        let mut bin = Bin::new(length, x, index);
        self.original_bins.push(bin.snapshot());
        bin.cleanup(self.trim);
        tracing::debug!(bin = index, length, "synthesized bin");
        Some(bin)
    }

    /// Attaches placed pieces, surviving fragments and cuts to the original
    /// bin records they came from.
    fn fold(&mut self) {
        let position: BTreeMap<usize, usize> = self
            .original_bins
            .iter()
            .enumerate()
            .map(|(pos, bin)| (bin.index, pos))
            .collect();

        for piece in &self.placed {
            if let Some(&pos) = piece.index.and_then(|i| position.get(&i)) {
                self.original_bins[pos].boxes.push(piece.clone());
            }
        }
        for (index, fragment) in &self.open {
            if let Some(&pos) = position.get(index) {
                let bin = &mut self.original_bins[pos];
                bin.leftovers.push(fragment.as_leftover());
                bin.cleaned = fragment.cleaned;
                bin.cleancut = fragment.cleancut;
            }
        }
        for cut in &self.cuts {
            if let Some(&pos) = position.get(&cut.bin_index) {
                self.original_bins[pos].cuts.push(*cut);
            }
        }
    }

    fn validate(&self, bins: &[Bin], pieces: &[Piece]) -> Result<()> {
        if !self.kerf.is_finite() || self.kerf < 0.0 {
            return Err(PackError::InvalidKerf(self.kerf));
        }
        if !self.trim.is_finite() || self.trim < 0.0 {
            return Err(PackError::InvalidTrim(self.trim));
        }

        let mut seen = HashSet::new();
        for bin in bins {
            let invalid = |reason: &str| PackError::InvalidBin {
                index: bin.index,
                reason: reason.to_string(),
            };
            if !bin.length.is_finite() || bin.length <= 0.0 {
                return Err(invalid("length must be a finite positive number"));
            }
            if !bin.x.is_finite() {
                return Err(invalid("origin must be finite"));
            }
            if bin.length <= 2.0 * self.trim {
                return Err(invalid("trim consumes the whole bin"));
            }
            if !seen.insert(bin.index) {
                return Err(PackError::DuplicateBinIndex(bin.index));
            }
        }

        for piece in pieces {
            if !piece.length.is_finite() || piece.length <= 0.0 {
                return Err(PackError::InvalidBox {
                    number: piece.number.clone(),
                    reason: "length must be a finite positive number".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn original_bins(&self) -> &[Bin] {
        &self.original_bins
    }

    pub fn placed_boxes(&self) -> &[Piece] {
        &self.placed
    }

    pub fn unplaced_boxes(&self) -> &[Piece] {
        &self.unplaced
    }

    pub fn cuts(&self) -> &[Cut] {
        &self.cuts
    }

    pub fn into_report(self) -> PackReport {
        PackReport {
            bins: self.original_bins,
            unplaced: self.unplaced,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn bins(lengths: &[f64]) -> Vec<Bin> {
        lengths
            .iter()
            .enumerate()
            .map(|(i, &len)| Bin::new(len, 0.0, i))
            .collect()
    }

    fn pieces(lengths: &[f64]) -> Vec<Piece> {
        lengths
            .iter()
            .enumerate()
            .map(|(i, &len)| Piece::new(len, format!("p{i}")))
            .collect()
    }

    fn run(kerf: f64, trim: f64, stock: &[f64], wanted: &[f64]) -> Packer {
        let mut packer = Packer::new(kerf, trim, ScoreStrategy::BestFit);
        packer.pack(bins(stock), pieces(wanted)).unwrap();
        packer
    }

    /// Placed + kerf per cut + leftovers + trim adds back up to the bin.
    /// Only a bin cut down to an empty leftover may have absorbed a partial
    /// kerf, overshooting by at most one kerf.
    fn assert_conserved(bin: &Bin, kerf: f64) {
        let trim = if bin.cleaned { 2.0 * bin.cleancut } else { 0.0 };
        let leftover: f64 = bin.leftovers.iter().map(|l| l.length).sum();
        let total = bin.used_length() + kerf * bin.cuts.len() as f64 + leftover + trim;
        let excess = total - bin.length;
        let absorbed = bin.leftovers.last().is_some_and(|l| l.length == 0.0);
        let slack = if absorbed { kerf } else { 0.0 };
        assert!(
            excess > -EPS && excess < slack + EPS,
            "bin #{} not conserved: {} accounted vs length {}",
            bin.index,
            total,
            bin.length
        );
    }

    /// Every input piece ends up exactly once, either placed or unplaced.
    fn assert_complete(packer: &Packer, expected: usize) {
        let placed: usize = packer.original_bins().iter().map(|b| b.boxes.len()).sum();
        assert_eq!(placed, packer.placed_boxes().len());
        assert_eq!(placed + packer.unplaced_boxes().len(), expected);
        assert!(packer.placed_boxes().iter().all(Piece::is_placed));
        assert!(packer.unplaced_boxes().iter().all(|p| !p.is_placed()));
    }

    #[test]
    fn test_two_pieces_share_a_bin_third_opens_another() {
        let packer = run(3.0, 0.0, &[2400.0], &[1000.0, 1000.0, 1000.0]);
        let report = packer.into_report();
        assert_eq!(report.bins.len(), 2);
        assert!(report.unplaced.is_empty());

        let first = &report.bins[0];
        assert_eq!(first.length, 2400.0);
        assert_eq!(first.boxes.len(), 2);
        assert_eq!(first.boxes[0].x, Some(0.0));
        assert_eq!(first.boxes[1].x, Some(1003.0));
        assert_eq!(first.leftovers.len(), 1);
        assert_eq!(first.leftovers[0].length, 394.0);
        assert_eq!(first.leftovers[0].x, 2006.0);
        let positions: Vec<f64> = first.cuts.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![1000.0, 2003.0]);

        let second = &report.bins[1];
        assert_eq!(second.index, 1);
        assert_eq!(second.length, 2400.0);
        assert_eq!(second.boxes.len(), 1);
        assert_eq!(second.boxes[0].index, Some(1));
        assert_eq!(second.leftovers[0].length, 1397.0);

        for bin in &report.bins {
            assert_conserved(bin, 3.0);
            let total = bin.used_length()
                + 3.0 * bin.cuts.len() as f64
                + bin.leftovers.iter().map(|l| l.length).sum::<f64>();
            assert_eq!(total, bin.length);
        }
    }

    #[test]
    fn test_piece_longer_than_reference_is_unplaced() {
        let packer = run(0.0, 0.0, &[500.0], &[600.0]);
        assert_complete(&packer, 1);
        assert_eq!(packer.unplaced_boxes().len(), 1);
        assert_eq!(packer.unplaced_boxes()[0].length, 600.0);
        // No bin was synthesized for it.
        assert_eq!(packer.original_bins().len(), 1);
        assert!(packer.cuts().is_empty());
    }

    #[test]
    fn test_piece_equal_to_reference_is_unplaced_once_stock_is_used() {
        let packer = run(0.0, 0.0, &[500.0], &[500.0, 500.0]);
        assert_complete(&packer, 2);
        assert_eq!(packer.placed_boxes().len(), 1);
        assert_eq!(packer.unplaced_boxes().len(), 1);
        assert_eq!(packer.original_bins().len(), 1);
    }

    #[test]
    fn test_trim_exact_fit_leaves_nothing() {
        let packer = run(0.0, 10.0, &[1000.0], &[980.0]);
        let report = packer.into_report();
        let bin = &report.bins[0];
        assert_eq!(bin.length, 1000.0);
        assert_eq!(bin.x, 0.0);
        assert!(bin.cleaned);
        assert_eq!(bin.cleancut, 10.0);
        assert_eq!(bin.boxes[0].x, Some(10.0));
        assert_eq!(bin.leftovers.len(), 1);
        assert_eq!(bin.leftovers[0].length, 0.0);
        assert_eq!(bin.cuts[0].position, 990.0);
        assert_conserved(bin, 0.0);
    }

    #[test]
    fn test_trim_rules_out_synthesis_for_long_piece() {
        // 990 is shorter than the 1000 stock but longer than its usable 980.
        let packer = run(0.0, 10.0, &[1000.0], &[990.0, 300.0]);
        assert_complete(&packer, 2);
        assert_eq!(packer.unplaced_boxes()[0].length, 990.0);
        assert_eq!(packer.original_bins().len(), 1);
    }

    #[test]
    fn test_unused_bin_reports_itself_as_leftover() {
        let packer = run(2.0, 5.0, &[1000.0, 300.0], &[800.0]);
        let report = packer.into_report();
        let spare = &report.bins[1];
        assert!(spare.boxes.is_empty());
        assert!(spare.cuts.is_empty());
        assert_eq!(spare.leftovers[0].length, 290.0);
        assert_eq!(spare.leftovers[0].x, 5.0);
        for bin in &report.bins {
            assert_conserved(bin, 2.0);
        }
    }

    #[test]
    fn test_reference_is_first_supplied_bin() {
        let packer = run(0.0, 0.0, &[500.0, 3000.0], &[2000.0, 900.0, 700.0]);
        assert_complete(&packer, 3);
        let placed: Vec<(f64, Option<usize>)> = packer
            .placed_boxes()
            .iter()
            .map(|p| (p.length, p.index))
            .collect();
        assert_eq!(placed, vec![(2000.0, Some(1)), (900.0, Some(1))]);
        // 700 fits no open bin and is not shorter than the 500 reference.
        assert_eq!(packer.unplaced_boxes()[0].length, 700.0);
    }

    #[test]
    fn test_best_fit_at_each_placement() {
        let packer = run(0.0, 0.0, &[1000.0, 700.0, 650.0], &[600.0, 400.0]);
        let placed: Vec<Option<usize>> = packer.placed_boxes().iter().map(|p| p.index).collect();
        // 600 -> 650 (rem 50); 400 -> 700 (rem 300) rather than 1000.
        assert_eq!(placed, vec![Some(2), Some(1)]);
    }

    #[test]
    fn test_first_fit_strategy() {
        let mut packer = Packer::new(0.0, 0.0, ScoreStrategy::FirstFit);
        packer
            .pack(bins(&[1000.0, 700.0, 650.0]), pieces(&[600.0, 400.0, 300.0]))
            .unwrap();
        let placed: Vec<Option<usize>> = packer.placed_boxes().iter().map(|p| p.index).collect();
        // 400 still fits the 400 left in bin 0; 300 moves on to bin 1.
        assert_eq!(placed, vec![Some(0), Some(0), Some(1)]);
    }

    #[test]
    fn test_equal_lengths_keep_input_order() {
        let packer = run(0.0, 0.0, &[1000.0], &[200.0, 500.0, 200.0, 200.0]);
        let numbers: Vec<&str> = packer
            .placed_boxes()
            .iter()
            .map(|p| p.number.as_str())
            .collect();
        assert_eq!(numbers, vec!["p1", "p0", "p2", "p3"]);
    }

    #[test]
    fn test_synthesized_indices_follow_supplied_ones() {
        let supplied = vec![Bin::new(1000.0, 0.0, 5), Bin::new(1000.0, 0.0, 2)];
        let mut packer = Packer::new(0.0, 0.0, ScoreStrategy::BestFit);
        packer
            .pack(supplied, pieces(&[900.0, 900.0, 900.0, 900.0]))
            .unwrap();
        let indices: Vec<usize> = packer.original_bins().iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![5, 2, 6, 7]);
        assert_complete(&packer, 4);
    }

    #[test]
    fn test_no_synthesis_past_largest_index() {
        let supplied = vec![Bin::new(1000.0, 0.0, usize::MAX), Bin::new(10.0, 0.0, 0)];
        let mut packer = Packer::new(0.0, 0.0, ScoreStrategy::BestFit);
        packer.pack(supplied, pieces(&[900.0, 900.0])).unwrap();

        let indices: Vec<usize> = packer.original_bins().iter().map(|b| b.index).collect();
        assert_eq!(indices, vec![usize::MAX, 0]);
        assert_complete(&packer, 2);
        assert_eq!(packer.unplaced_boxes().len(), 1);
        // Bin #0 keeps its own leftover.
        let small = &packer.original_bins()[1];
        assert_eq!(small.leftovers.len(), 1);
        assert_eq!(small.leftovers[0].length, 10.0);
        for bin in packer.original_bins() {
            assert_conserved(bin, 0.0);
        }
    }

    #[test]
    fn test_kerf_leftover_shorter_than_kerf_is_kept() {
        // 1000 - 995 - 3 leaves 2, less than a kerf but still reported.
        let packer = run(3.0, 0.0, &[1000.0], &[995.0]);
        let bin = &packer.original_bins()[0];
        assert_eq!(bin.leftovers[0].length, 2.0);
        assert_conserved(bin, 3.0);
    }

    #[test]
    fn test_synthesized_bin_copies_reference_origin() {
        let supplied = vec![Bin::new(1000.0, 250.0, 0)];
        let mut packer = Packer::new(0.0, 0.0, ScoreStrategy::BestFit);
        packer.pack(supplied, pieces(&[800.0, 800.0])).unwrap();
        let synthesized = &packer.original_bins()[1];
        assert_eq!(synthesized.x, 250.0);
        assert_eq!(synthesized.boxes[0].x, Some(250.0));
    }

    #[test]
    fn test_mixed_batch_conserves_and_completes() {
        let wanted = [
            1200.0, 830.0, 830.0, 640.0, 455.0, 455.0, 455.0, 300.0, 2100.0, 90.0, 3000.0, 720.0,
        ];
        let packer = run(3.0, 12.5, &[2440.0, 1800.0], &wanted);
        assert_complete(&packer, wanted.len());
        assert_eq!(packer.unplaced_boxes().len(), 1);
        assert_eq!(packer.unplaced_boxes()[0].length, 3000.0);
        for bin in packer.original_bins() {
            assert_conserved(bin, 3.0);
            for piece in &bin.boxes {
                let x = piece.x.unwrap();
                assert!(x >= bin.x + bin.cleancut - EPS);
                assert!(x + piece.length <= bin.x + bin.length - bin.cleancut + EPS);
            }
        }
    }

    #[test]
    fn test_repeat_runs_are_identical() {
        let wanted = [610.0, 610.0, 1220.0, 305.0, 915.0, 610.0, 1830.0, 455.0];
        let first = run(3.2, 0.0, &[2440.0], &wanted).into_report();
        let second = run(3.2, 0.0, &[2440.0], &wanted).into_report();
        assert_eq!(first, second);
    }

    #[test]
    fn test_no_pieces() {
        let packer = run(3.0, 0.0, &[2400.0], &[]);
        assert_complete(&packer, 0);
        let bin = &packer.original_bins()[0];
        assert_eq!(bin.leftovers[0].length, 2400.0);
    }

    #[test]
    fn test_no_bins_leaves_everything_unplaced() {
        let packer = run(0.0, 0.0, &[], &[100.0, 200.0]);
        assert_complete(&packer, 2);
        assert_eq!(packer.unplaced_boxes().len(), 2);
    }

    #[test]
    fn test_pack_runs_once() {
        let mut packer = Packer::new(0.0, 0.0, ScoreStrategy::BestFit);
        packer.pack(bins(&[100.0]), pieces(&[50.0])).unwrap();
        let again = packer.pack(bins(&[100.0]), pieces(&[50.0]));
        assert_eq!(again, Err(PackError::AlreadyPacked));
        assert_eq!(packer.placed_boxes().len(), 1);
    }

    #[test]
    fn test_invalid_input_rejected() {
        let mut packer = Packer::new(-1.0, 0.0, ScoreStrategy::BestFit);
        assert_eq!(
            packer.pack(bins(&[100.0]), vec![]),
            Err(PackError::InvalidKerf(-1.0))
        );

        let mut packer = Packer::new(0.0, f64::NAN, ScoreStrategy::BestFit);
        assert!(matches!(
            packer.pack(bins(&[100.0]), vec![]),
            Err(PackError::InvalidTrim(_))
        ));

        let mut packer = Packer::new(0.0, 0.0, ScoreStrategy::BestFit);
        assert!(matches!(
            packer.pack(bins(&[0.0]), vec![]),
            Err(PackError::InvalidBin { index: 0, .. })
        ));

        let mut packer = Packer::new(0.0, 50.0, ScoreStrategy::BestFit);
        assert!(matches!(
            packer.pack(bins(&[100.0]), vec![]),
            Err(PackError::InvalidBin { index: 0, .. })
        ));

        let mut packer = Packer::new(0.0, 0.0, ScoreStrategy::BestFit);
        assert_eq!(
            packer.pack(vec![Bin::new(10.0, 0.0, 1), Bin::new(20.0, 0.0, 1)], vec![]),
            Err(PackError::DuplicateBinIndex(1))
        );

        let mut packer = Packer::new(0.0, 0.0, ScoreStrategy::BestFit);
        assert!(matches!(
            packer.pack(bins(&[100.0]), pieces(&[-5.0])),
            Err(PackError::InvalidBox { .. })
        ));
        // A rejected run leaves the packer usable.
        assert!(packer.pack(bins(&[100.0]), pieces(&[5.0])).is_ok());
    }
}
