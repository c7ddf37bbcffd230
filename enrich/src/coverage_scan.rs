//! Sliding window scan over a chromosome.
//!
//! Windows of a fixed width start at position 1 and advance by a fixed step.
//! Qualifying windows which overlap are merged into one interval. When an interval is closed,
//! the predicate is evaluated again on its whole extent, since merging can dilute the density.
use crate::cancel::CancellationToken;
use crate::error::Result;
use crate::redundancy::ReadStack;
use crate::source::ReadSource;
use definitions::{Chromosome, Interval};

/// How the reads in a window are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tally {
    /// Sum of the (unclipped) lengths of the overlapping reads.
    ReadLength,
    /// Number of overlapping reads.
    ReadCount,
}

#[derive(Debug, Clone, Copy)]
pub struct ScanConfig {
    pub window_size: usize,
    pub step_size: usize,
}

impl ScanConfig {
    pub fn new(window_size: usize, step_size: usize) -> Self {
        assert!(0 < window_size && 0 < step_size);
        Self {
            window_size,
            step_size,
        }
    }
    /// Start positions of the windows lying entirely in a chromosome of length `len`.
    pub fn window_starts(&self, len: usize) -> impl Iterator<Item = usize> {
        let width = self.window_size;
        (1..)
            .step_by(self.step_size)
            .take_while(move |&start| start + width - 1 <= len)
    }
}

/// Measures a region of a chromosome from a set of read sources.
#[derive(Debug, Clone)]
pub struct WindowCounter<'a, R: ReadSource> {
    sources: &'a [R],
    chr: &'a Chromosome,
    shift: usize,
    cap: Option<usize>,
    tally: Tally,
}

impl<'a, R: ReadSource> WindowCounter<'a, R> {
    pub fn new(sources: &'a [R], chr: &'a Chromosome, tally: Tally) -> Self {
        Self {
            sources,
            chr,
            shift: 0,
            cap: None,
            tally,
        }
    }
    /// Move reads toward the fragment centre by `shift` before counting.
    pub fn shift(mut self, shift: usize) -> Self {
        self.shift = shift;
        self
    }
    /// Cap exact duplicates at `cap` copies before counting. `None` keeps every read.
    pub fn cap(mut self, cap: Option<usize>) -> Self {
        self.cap = cap;
        self
    }
    pub fn count(&self, start: usize, end: usize) -> u64 {
        let stack = ReadStack::collect(self.sources, self.chr, (start, end), self.shift, self.cap);
        match self.tally {
            Tally::ReadLength => stack.length_in(start, end),
            Tally::ReadCount => stack.count_in(start, end),
        }
    }
}

/// Scan `chr` and return the merged qualifying intervals, ordered by position.
/// `measure(start, end)` gives the amount of reads in [start, end], and
/// `predicate(amount, length)` tells whether a region qualifies.
pub fn scan<F, P>(
    chr: &Chromosome,
    config: &ScanConfig,
    mut measure: F,
    predicate: P,
    cancel: &CancellationToken,
) -> Result<Vec<Interval>>
where
    F: FnMut(usize, usize) -> u64,
    P: Fn(u64, usize) -> bool,
{
    // The last element is the open interval while `is_open` holds.
    let mut regions: Vec<(usize, usize)> = vec![];
    let mut is_open = false;
    for start in config.window_starts(chr.length) {
        cancel.check()?;
        let end = start + config.window_size - 1;
        if !predicate(measure(start, end), config.window_size) {
            continue;
        }
        let extends = is_open && regions.last().is_some_and(|last| start <= last.1);
        if extends {
            if let Some(last) = regions.last_mut() {
                last.1 = last.1.max(end);
            }
        } else {
            if is_open {
                close_last(&mut regions, &mut measure, &predicate);
            }
            regions.push((start, end));
            is_open = true;
        }
    }
    if is_open {
        close_last(&mut regions, &mut measure, &predicate);
    }
    let intervals = regions
        .into_iter()
        .map(|(start, end)| Interval::new(&chr.name, start, end))
        .collect();
    Ok(intervals)
}

fn close_last<F, P>(regions: &mut Vec<(usize, usize)>, measure: &mut F, predicate: &P)
where
    F: FnMut(usize, usize) -> u64,
    P: Fn(u64, usize) -> bool,
{
    if let Some(&(start, end)) = regions.last() {
        let length = end - start + 1;
        if !predicate(measure(start, end), length) {
            trace!("SCAN\tDiluted\t{}\t{}", start, end);
            regions.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PeakCallError;
    use definitions::{Read, Sample, Strand};
    // Per-base depth profile; a window's amount is the sum of the depth over it.
    fn depth_measure(depth: &[u64]) -> impl FnMut(usize, usize) -> u64 + '_ {
        move |start, end| depth[start - 1..end].iter().sum()
    }
    #[test]
    fn window_positions() {
        let config = ScanConfig::new(10, 5);
        let starts: Vec<_> = config.window_starts(30).collect();
        assert_eq!(starts, vec![1, 6, 11, 16, 21]);
        assert_eq!(config.window_starts(9).count(), 0);
        assert_eq!(config.window_starts(10).count(), 1);
    }
    #[test]
    fn merge_overlapping_windows() {
        let chr = Chromosome::new("chr1", 100);
        let mut depth = vec![0; 100];
        depth[20..45].iter_mut().for_each(|x| *x = 10);
        depth[70..75].iter_mut().for_each(|x| *x = 10);
        let config = ScanConfig::new(10, 5);
        let cancel = CancellationToken::new();
        let pred = |amount: u64, len: usize| amount as f64 / len as f64 >= 2f64;
        let intervals = scan(&chr, &config, depth_measure(&depth), pred, &cancel).unwrap();
        assert_eq!(intervals.len(), 2);
        assert_eq!((intervals[0].start, intervals[0].end), (16, 50));
        assert_eq!((intervals[1].start, intervals[1].end), (66, 80));
        assert!(intervals.iter().all(|i| i.strand == Strand::Unknown));
        assert!(!intervals[0].overlaps(&intervals[1]));
    }
    #[test]
    fn boundary_passes_inclusive_band() {
        let chr = Chromosome::new("chr1", 10);
        let depth = vec![3; 10];
        let config = ScanConfig::new(10, 5);
        let cancel = CancellationToken::new();
        let pred = |amount: u64, len: usize| 3 * len as u64 <= amount;
        let intervals = scan(&chr, &config, depth_measure(&depth), pred, &cancel).unwrap();
        assert_eq!(intervals.len(), 1);
        let pred = |amount: u64, _len: usize| amount > 30;
        let intervals = scan(&chr, &config, depth_measure(&depth), pred, &cancel).unwrap();
        assert!(intervals.is_empty());
    }
    #[test]
    fn diluted_interval_is_dropped() {
        let chr = Chromosome::new("chr1", 40);
        // Every window over 1-25 qualifies alone, but the merged region breaks the length bound.
        let mut depth = vec![0; 40];
        depth[0..10].iter_mut().for_each(|x| *x = 5);
        depth[10..20].iter_mut().for_each(|x| *x = 5);
        let config = ScanConfig::new(10, 5);
        let cancel = CancellationToken::new();
        let pred = |amount: u64, len: usize| {
            let density = amount as f64 / len as f64;
            (2.5..=5f64).contains(&density) && len <= 15
        };
        let intervals = scan(&chr, &config, depth_measure(&depth), pred, &cancel).unwrap();
        assert!(intervals.is_empty());
    }
    #[test]
    fn scan_is_deterministic() {
        let chr = Chromosome::new("chr1", 1_000);
        let depth: Vec<u64> = (0..1_000).map(|i| ((i * 37) % 11) as u64).collect();
        let config = ScanConfig::new(50, 25);
        let cancel = CancellationToken::new();
        let pred = |amount: u64, len: usize| amount as f64 / len as f64 > 5.1;
        let first = scan(&chr, &config, depth_measure(&depth), pred, &cancel).unwrap();
        let second = scan(&chr, &config, depth_measure(&depth), pred, &cancel).unwrap();
        assert_eq!(first, second);
        for pair in first.windows(2) {
            assert!(pair[0].end < pair[1].start);
        }
        assert!(first.iter().all(|i| i.is_within(chr.length)));
    }
    #[test]
    fn cancelled_scan() {
        let chr = Chromosome::new("chr1", 100);
        let config = ScanConfig::new(10, 5);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = scan(&chr, &config, |_, _| 100, |_, _| true, &cancel);
        assert!(matches!(result, Err(PeakCallError::Cancelled)));
    }
    #[test]
    fn counter_tallies() {
        let chr = Chromosome::new("chr1", 1_000);
        let mut sample = Sample::new("s");
        sample.push_with_count("chr1", Read::new(100, 149, Strand::Forward), 10);
        sample.push("chr1", Read::new(180, 229, Strand::Reverse));
        let samples = vec![sample];
        let lengths = WindowCounter::new(&samples, &chr, Tally::ReadLength);
        assert_eq!(lengths.count(140, 190), 11 * 50);
        let counts = WindowCounter::new(&samples, &chr, Tally::ReadCount).cap(Some(2));
        assert_eq!(counts.count(140, 190), 3);
        // After shifting by 30, the forward reads cover 130-179 and the reverse read 150-199.
        let shifted = WindowCounter::new(&samples, &chr, Tally::ReadCount).shift(30);
        assert_eq!(shifted.count(100, 125), 0);
        assert_eq!(shifted.count(150, 160), 11);
    }
}
