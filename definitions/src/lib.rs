//! Definitions -- A tiny data model for the enrichment peak caller.
//! Every coordinate in this crate is 1-based and inclusive on both ends, the way a genome browser shows it.
//! The engine itself lives in the `enrich` crate; this crate only carries plain data that can be passed around,
//! serialized into JSON, or loaded from simple text files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strand {
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
    #[serde(rename = ".")]
    Unknown,
}

impl Strand {
    pub fn symbol(&self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
            Strand::Unknown => '.',
        }
    }
    pub fn from_symbol(symbol: &str) -> Self {
        match symbol {
            "+" => Strand::Forward,
            "-" => Strand::Reverse,
            _ => Strand::Unknown,
        }
    }
}

impl std::fmt::Display for Strand {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Chromosome {
    pub name: String,
    /// Length in base pairs.
    pub length: usize,
}

impl Chromosome {
    pub fn new(name: &str, length: usize) -> Self {
        Self {
            name: name.to_string(),
            length,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Genome {
    pub chromosomes: Vec<Chromosome>,
}

impl Genome {
    pub fn new(chromosomes: Vec<Chromosome>) -> Self {
        Self { chromosomes }
    }
    pub fn total_length(&self) -> u64 {
        self.chromosomes.iter().map(|c| c.length as u64).sum()
    }
    pub fn chromosome(&self, name: &str) -> Option<&Chromosome> {
        self.chromosomes.iter().find(|c| c.name == name)
    }
}

/// A single aligned read. The derived order is (start, end, strand),
/// so that exact duplicates are adjacent after sorting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Read {
    pub start: usize,
    pub end: usize,
    pub strand: Strand,
}

impl Read {
    pub fn new(start: usize, end: usize, strand: Strand) -> Self {
        assert!(start <= end, "{}-{}", start, end);
        Self { start, end, strand }
    }
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start <= end && start <= self.end
    }
}

/// A named collection of reads, kept sorted by start position on each chromosome.
#[derive(Debug, Clone, Serialize)]
pub struct Sample {
    name: String,
    reads: HashMap<String, Vec<Read>>,
    /// The longest read on each chromosome. Used to bound the binary search of a region query.
    max_read_len: HashMap<String, usize>,
    total_count: u64,
    total_length: u64,
}

impl Sample {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reads: HashMap::new(),
            max_read_len: HashMap::new(),
            total_count: 0,
            total_length: 0,
        }
    }
    /// Build a sample from (chromosome, read) records in any order.
    pub fn from_reads<I: IntoIterator<Item = (String, Read)>>(name: &str, records: I) -> Self {
        let mut sample = Self::new(name);
        for (chr, read) in records {
            sample.insert(chr, read, 1);
        }
        sample.sort();
        sample
    }
    /// Push a pre-aggregated read, which is expanded into `count` copies.
    pub fn push_with_count(&mut self, chr: &str, read: Read, count: usize) {
        self.insert(chr.to_string(), read, count);
        self.sort_chromosome(chr);
    }
    pub fn push(&mut self, chr: &str, read: Read) {
        self.push_with_count(chr, read, 1);
    }
    fn insert(&mut self, chr: String, read: Read, count: usize) {
        let max_len = self.max_read_len.entry(chr.clone()).or_default();
        *max_len = (*max_len).max(read.len());
        self.total_count += count as u64;
        self.total_length += (count * read.len()) as u64;
        self.reads
            .entry(chr)
            .or_default()
            .extend(std::iter::repeat(read).take(count));
    }
    fn sort(&mut self) {
        self.reads.values_mut().for_each(|reads| reads.sort());
    }
    fn sort_chromosome(&mut self, chr: &str) {
        if let Some(reads) = self.reads.get_mut(chr) {
            if !reads.is_sorted() {
                reads.sort();
            }
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn total_read_count(&self) -> u64 {
        self.total_count
    }
    pub fn total_read_length(&self) -> u64 {
        self.total_length
    }
    pub fn reads_in_chromosome(&self, chr: &str) -> &[Read] {
        self.reads.get(chr).map(|x| x.as_slice()).unwrap_or(&[])
    }
    /// All the reads overlapping [start, end] on `chr`, in sorted order.
    pub fn reads_in(&self, chr: &str, start: usize, end: usize) -> Vec<Read> {
        let reads = self.reads_in_chromosome(chr);
        let max_len = self.max_read_len.get(chr).copied().unwrap_or(0);
        // A read starting before this point can not reach `start`.
        let earliest = (start + 1).saturating_sub(max_len);
        let lower = reads.partition_point(|r| r.start < earliest);
        let upper = reads.partition_point(|r| r.start <= end);
        reads[lower..upper.max(lower)]
            .iter()
            .filter(|r| r.overlaps(start, end))
            .copied()
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interval {
    pub chromosome: String,
    pub start: usize,
    pub end: usize,
    pub strand: Strand,
    pub name: Option<String>,
}

impl Interval {
    pub fn new(chromosome: &str, start: usize, end: usize) -> Self {
        assert!(start <= end, "{}:{}-{}", chromosome, start, end);
        Self {
            chromosome: chromosome.to_string(),
            start,
            end,
            strand: Strand::Unknown,
            name: None,
        }
    }
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }
    pub fn middle(&self) -> usize {
        (self.start + self.end) / 2
    }
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.chromosome == other.chromosome && self.start <= other.end && other.start <= self.end
    }
    /// Check the interval lies within a chromosome of the given length.
    pub fn is_within(&self, length: usize) -> bool {
        1 <= self.start && self.start <= self.end && self.end <= length
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{}-{}", self.chromosome, self.start, self.end)
    }
}

/// The final, validated peaks of a run with the description of how they were made.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PeakSet {
    description: String,
    peaks: Vec<Interval>,
}

impl PeakSet {
    pub fn new(description: String, peaks: Vec<Interval>) -> Self {
        Self { description, peaks }
    }
    pub fn description(&self) -> &str {
        &self.description
    }
    pub fn peaks(&self) -> &[Interval] {
        &self.peaks
    }
    pub fn len(&self) -> usize {
        self.peaks.len()
    }
    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn read_order() {
        let mut reads = vec![
            Read::new(10, 20, Strand::Reverse),
            Read::new(10, 20, Strand::Forward),
            Read::new(5, 30, Strand::Forward),
            Read::new(10, 15, Strand::Forward),
        ];
        reads.sort();
        assert_eq!(reads[0], Read::new(5, 30, Strand::Forward));
        assert_eq!(reads[1], Read::new(10, 15, Strand::Forward));
        assert_eq!(reads[2], Read::new(10, 20, Strand::Forward));
        assert_eq!(reads[3], Read::new(10, 20, Strand::Reverse));
    }
    #[test]
    fn region_query() {
        let reads = vec![
            ("chr1".to_string(), Read::new(1, 50, Strand::Forward)),
            ("chr1".to_string(), Read::new(80, 90, Strand::Reverse)),
            ("chr1".to_string(), Read::new(95, 130, Strand::Forward)),
            ("chr2".to_string(), Read::new(95, 130, Strand::Forward)),
        ];
        let sample = Sample::from_reads("s", reads);
        assert_eq!(sample.total_read_count(), 4);
        assert_eq!(sample.total_read_length(), 50 + 11 + 36 + 36);
        let hits = sample.reads_in("chr1", 40, 85);
        assert_eq!(hits.len(), 2);
        let hits = sample.reads_in("chr1", 51, 79);
        assert!(hits.is_empty());
        let hits = sample.reads_in("chr1", 130, 200);
        assert_eq!(hits, vec![Read::new(95, 130, Strand::Forward)]);
        assert!(sample.reads_in("chr3", 1, 100).is_empty());
    }
    #[test]
    fn aggregated_reads() {
        let mut sample = Sample::new("s");
        sample.push_with_count("chr1", Read::new(10, 19, Strand::Forward), 3);
        sample.push("chr1", Read::new(1, 5, Strand::Reverse));
        assert_eq!(sample.total_read_count(), 4);
        assert_eq!(sample.total_read_length(), 35);
        let reads = sample.reads_in_chromosome("chr1");
        assert_eq!(reads[0], Read::new(1, 5, Strand::Reverse));
        assert_eq!(reads.len(), 4);
    }
    #[test]
    fn interval_geometry() {
        let a = Interval::new("chr1", 101, 200);
        let b = Interval::new("chr1", 200, 300);
        let c = Interval::new("chr2", 150, 160);
        assert_eq!(a.len(), 100);
        assert_eq!(a.middle(), 150);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(a.is_within(200));
        assert!(!b.is_within(299));
    }
}
