//! Capping duplicated reads.
//!
//! If reads fell uniformly on the genome, the number of reads sharing one exact position would follow
//! Binomial(total reads, 1/genome length). Any stack taller than a far tail of that distribution
//! is treated as an artefact (PCR or alignment), and only the first `cap` copies of it are kept.
use crate::cancel::CancellationToken;
use crate::distribution::Binomial;
use crate::error::{PeakCallError, Result};
use crate::source::{gather_chromosome, gather_reads, GenomeIndex, ReadSource};
use definitions::{Chromosome, Read};
use rayon::prelude::*;

/// The largest number of exact duplicates retained at one position. At least 1.
pub fn redundancy_cutoff(total_reads: u64, genome_length: u64, significance: f64) -> Result<usize> {
    if genome_length == 0 {
        let msg = "genome length is zero".to_string();
        return Err(PeakCallError::Computation(msg));
    }
    let binom = Binomial::new(total_reads, 1f64 / genome_length as f64)?;
    let cutoff = binom.inverse_cdf(1f64 - significance)?;
    Ok((cutoff as usize).max(1))
}

/// Keep at most `cap` copies of each run of exact duplicates. `reads` should be sorted.
pub fn deduplicate(reads: &[Read], cap: usize) -> Vec<Read> {
    let mut passed = Vec::with_capacity(reads.len());
    let mut run = 0;
    for (i, read) in reads.iter().enumerate() {
        match i > 0 && reads[i - 1] == *read {
            true => run += 1,
            false => run = 1,
        }
        if run <= cap {
            passed.push(*read);
        }
    }
    passed
}

/// The reads of one region, sorted and capped. Built for a single computation and then thrown away.
#[derive(Debug, Clone)]
pub struct ReadStack {
    reads: Vec<Read>,
}

impl ReadStack {
    /// Reads of all the sources overlapping [start, end] after the strand shift,
    /// deduplicated with `cap` unless `cap` is `None`.
    pub fn collect<R: ReadSource>(
        sources: &[R],
        chr: &Chromosome,
        (start, end): (usize, usize),
        shift: usize,
        cap: Option<usize>,
    ) -> Self {
        let reads = gather_reads(sources, chr, start, end, shift);
        Self::from_reads(reads, cap)
    }
    pub fn from_reads(mut reads: Vec<Read>, cap: Option<usize>) -> Self {
        reads.sort_unstable();
        let reads = match cap {
            Some(cap) => deduplicate(&reads, cap),
            None => reads,
        };
        Self { reads }
    }
    pub fn reads(&self) -> &[Read] {
        &self.reads
    }
    pub fn len(&self) -> usize {
        self.reads.len()
    }
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }
    /// The number of reads overlapping [start, end].
    pub fn count_in(&self, start: usize, end: usize) -> u64 {
        self.reads.iter().filter(|r| r.overlaps(start, end)).count() as u64
    }
    /// The summed length of the reads overlapping [start, end]. Reads are not clipped.
    pub fn length_in(&self, start: usize, end: usize) -> u64 {
        self.reads
            .iter()
            .filter(|r| r.overlaps(start, end))
            .map(|r| r.len() as u64)
            .sum()
    }
}

/// Total number of reads genome-wide after the cap is applied on each chromosome.
pub fn non_redundant_count<G, R>(
    genome: &G,
    sources: &[R],
    cap: Option<usize>,
    cancel: &CancellationToken,
) -> Result<u64>
where
    G: GenomeIndex + Sync,
    R: ReadSource + Sync,
{
    let counts: Result<Vec<u64>> = genome
        .chromosomes()
        .par_iter()
        .map(|chr| {
            cancel.check()?;
            let reads = gather_chromosome(sources, chr);
            let raw = reads.len();
            let stack = ReadStack::from_reads(reads, cap);
            trace!("NONRED\t{}\t{}\t{}", chr.name, raw, stack.len());
            Ok(stack.len() as u64)
        })
        .collect();
    Ok(counts?.iter().sum())
}
