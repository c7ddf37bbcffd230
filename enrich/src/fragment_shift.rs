//! Estimate the distance between the forward and reverse pileups of a fragment.
//!
//! In a real binding site, forward reads pile up on the upstream side of the fragment and reverse reads
//! on the downstream side. Half of the fragment length can be recovered as the median distance between
//! the two pileup summits over many high-confidence regions.
use crate::cancel::CancellationToken;
use crate::config::PeakCallConfig;
use crate::error::{PeakCallError, Result};
use crate::source::{GenomeIndex, ReadSource};
use definitions::{Chromosome, Interval, Strand};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use std::collections::HashMap;

/// The median distance from the forward summit to the reverse summit over a random subset of `seeds`.
/// Never negative.
pub fn estimate_shift<G: GenomeIndex, R: ReadSource>(
    genome: &G,
    seeds: &[Interval],
    sources: &[R],
    config: &PeakCallConfig,
    cancel: &CancellationToken,
) -> Result<usize> {
    if seeds.is_empty() {
        return Err(PeakCallError::EmptySeedSet);
    }
    let chromosomes: HashMap<_, _> = genome
        .chromosomes()
        .iter()
        .map(|c| (c.name.as_str(), c))
        .collect();
    let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(config.seed);
    let mut sampled: Vec<&Interval> = seeds.iter().collect();
    sampled.shuffle(&mut rng);
    sampled.truncate(config.max_shift_samples);
    // Visit them in genomic order.
    sampled.sort_by(|a, b| (&a.chromosome, a.start).cmp(&(&b.chromosome, b.start)));
    let mut distances = Vec::with_capacity(sampled.len());
    for seed in sampled {
        cancel.check()?;
        match chromosomes.get(seed.chromosome.as_str()) {
            Some(chr) => distances.push(inter_strand_distance(seed, chr, sources)),
            None => warn!("SHIFT\tUnknownChromosome\t{}", seed),
        }
    }
    let median = median(&mut distances).max(0) as usize;
    debug!("SHIFT\tMedian\t{}\t{}", median, distances.len());
    Ok(median)
}

/// Position of the reverse pileup summit minus position of the forward pileup summit within `interval`.
/// The first position wins a tie.
pub fn inter_strand_distance<R: ReadSource>(
    interval: &Interval,
    chr: &Chromosome,
    sources: &[R],
) -> i64 {
    let len = interval.len();
    let mut forward = vec![0u32; len];
    let mut reverse = vec![0u32; len];
    for source in sources.iter() {
        for read in source.reads_in(chr, interval.start, interval.end) {
            let pileup = match read.strand {
                Strand::Forward => &mut forward,
                Strand::Reverse => &mut reverse,
                Strand::Unknown => continue,
            };
            let start = read.start.max(interval.start) - interval.start;
            let end = read.end.min(interval.end) - interval.start;
            pileup[start..=end].iter_mut().for_each(|x| *x += 1);
        }
    }
    summit(&reverse) as i64 - summit(&forward) as i64
}

fn summit(pileup: &[u32]) -> usize {
    let (mut max_idx, mut max_count) = (0, 0);
    for (idx, &count) in pileup.iter().enumerate() {
        if max_count < count {
            max_idx = idx;
            max_count = count;
        }
    }
    max_idx
}

/// Median of the values. The mean of the two central values is taken for an even length,
/// rounded toward zero. Zero for an empty slice.
pub fn median(xs: &mut [i64]) -> i64 {
    if xs.is_empty() {
        return 0;
    }
    xs.sort_unstable();
    let half = xs.len() / 2;
    match xs.len() % 2 {
        1 => xs[half],
        _ => (xs[half - 1] + xs[half]) / 2,
    }
}
