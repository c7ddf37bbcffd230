//! Expected read counts and the Poisson cutoffs derived from them.
use crate::distribution::Poisson;
use crate::error::{PeakCallError, Result};
use crate::redundancy::ReadStack;
use crate::source::ReadSource;
use definitions::{Chromosome, Interval};

/// Half widths of the local background windows around a peak midpoint.
const HALF_10KB: usize = 5_000;
const HALF_5KB: usize = 2_500;
const HALF_1KB: usize = 500;

/// The expected number of reads in a window of `window_size` bp when `total_count` reads
/// fall uniformly on `total_length` bp.
/// Reads longer than one base also hit the window from its upstream neighbour,
/// so the count is inflated by `(mean_read_length - 1) / window_size`.
pub fn expected_count_per_window(
    total_count: u64,
    total_length: u64,
    window_size: usize,
    mean_read_length: usize,
) -> f64 {
    let window_size = window_size as f64;
    let expected = total_count as f64 / (total_length as f64 / window_size);
    let read_overlap = (mean_read_length as f64 - 1f64) / window_size;
    expected + expected * read_overlap
}

/// The read count a window must exceed to be significant at `p_value` under Poisson(`density`).
pub fn poisson_cutoff(density: f64, p_value: f64) -> Result<u64> {
    Poisson::new(density)?.inverse_cdf(1f64 - p_value)
}

/// Genome-wide threshold for the candidate scan.
pub fn global_cutoff(density: f64, p_value: f64) -> Result<u64> {
    poisson_cutoff(density, p_value)
}

/// Everything needed to compute the local background of a peak.
#[derive(Debug, Clone)]
pub struct LocalModel<'a, R: ReadSource> {
    /// The samples the background is measured on. Controls if there are any, the signal samples otherwise.
    pub sources: &'a [R],
    /// Non-redundant read total of `sources`.
    pub total_count: u64,
    pub genome_length: u64,
    pub mean_read_length: usize,
    /// Scales control densities to the depth of the signal samples.
    pub input_correction: f64,
    /// Whether `sources` are control samples. Only then the 1kb window is used.
    pub use_control: bool,
    pub cap: Option<usize>,
    pub p_value: f64,
}

/// The background densities around one peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalBackground {
    pub genome: f64,
    pub kb10: f64,
    pub kb5: f64,
    pub kb1: f64,
    /// The density actually used.
    pub max: f64,
    pub cutoff: u64,
}

impl<'a, R: ReadSource> LocalModel<'a, R> {
    fn window(peak: &Interval, chr: &Chromosome, half: usize) -> (usize, usize) {
        let mid = peak.middle();
        let start = mid.saturating_sub(half).max(1);
        let end = (mid + half - 1).min(chr.length);
        (start, end)
    }
    /// The maximum of the genome-wide, 10kb, 5kb and (with controls) 1kb densities around `peak`,
    /// and the Poisson cutoff at that density.
    pub fn local_cutoff(&self, peak: &Interval, chr: &Chromosome) -> Result<LocalBackground> {
        if !peak.is_within(chr.length) {
            let msg = format!("{} lies outside {} ({}bp)", peak, chr.name, chr.length);
            return Err(PeakCallError::Computation(msg));
        }
        let region10kb = Self::window(peak, chr, HALF_10KB);
        let region5kb = Self::window(peak, chr, HALF_5KB);
        let region1kb = Self::window(peak, chr, HALF_1KB);
        let stack = ReadStack::collect(self.sources, chr, region10kb, 0, self.cap);
        let count10kb = stack.len() as u64;
        let count5kb = stack.count_in(region5kb.0, region5kb.1);
        let count1kb = stack.count_in(region1kb.0, region1kb.1);
        let width = peak.len();
        let rlen = self.mean_read_length;
        let density = |count: u64, (start, end): (usize, usize)| {
            let length = (end - start + 1) as u64;
            expected_count_per_window(count, length, width, rlen) * self.input_correction
        };
        let genome = expected_count_per_window(self.total_count, self.genome_length, width, rlen)
            * self.input_correction;
        let kb10 = density(count10kb, region10kb);
        let kb5 = density(count5kb, region5kb);
        let kb1 = density(count1kb, region1kb);
        let mut max = genome.max(kb10).max(kb5);
        if self.use_control {
            max = max.max(kb1);
        }
        let cutoff = poisson_cutoff(max, self.p_value)?;
        trace!(
            "LOCAL\t{}\t{:.3}\t{:.3}\t{:.3}\t{:.3}\t{}",
            peak,
            genome,
            kb10,
            kb5,
            kb1,
            cutoff
        );
        Ok(LocalBackground {
            genome,
            kb10,
            kb5,
            kb1,
            max,
            cutoff,
        })
    }
}
