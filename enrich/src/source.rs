//! The collaborators of the engine: a genome catalogue and read stores.
//! The in-memory types of the `definitions` crate implement both of them.
use definitions::{Chromosome, Genome, Read, Sample, Strand};

pub trait GenomeIndex {
    fn chromosomes(&self) -> &[Chromosome];
    fn total_length(&self) -> u64;
}

pub trait ReadSource {
    fn name(&self) -> &str;
    /// Reads overlapping [start, end] on `chr`.
    fn reads_in(&self, chr: &Chromosome, start: usize, end: usize) -> Vec<Read>;
    fn reads_in_chromosome(&self, chr: &Chromosome) -> Vec<Read>;
    fn total_read_count(&self) -> u64;
    fn total_read_length(&self) -> u64;
}

impl GenomeIndex for Genome {
    fn chromosomes(&self) -> &[Chromosome] {
        &self.chromosomes
    }
    fn total_length(&self) -> u64 {
        Genome::total_length(self)
    }
}

impl ReadSource for Sample {
    fn name(&self) -> &str {
        Sample::name(self)
    }
    fn reads_in(&self, chr: &Chromosome, start: usize, end: usize) -> Vec<Read> {
        Sample::reads_in(self, &chr.name, start, end)
    }
    fn reads_in_chromosome(&self, chr: &Chromosome) -> Vec<Read> {
        Sample::reads_in_chromosome(self, &chr.name).to_vec()
    }
    fn total_read_count(&self) -> u64 {
        Sample::total_read_count(self)
    }
    fn total_read_length(&self) -> u64 {
        Sample::total_read_length(self)
    }
}

impl<R: ReadSource + ?Sized> ReadSource for &R {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn reads_in(&self, chr: &Chromosome, start: usize, end: usize) -> Vec<Read> {
        (**self).reads_in(chr, start, end)
    }
    fn reads_in_chromosome(&self, chr: &Chromosome) -> Vec<Read> {
        (**self).reads_in_chromosome(chr)
    }
    fn total_read_count(&self) -> u64 {
        (**self).total_read_count()
    }
    fn total_read_length(&self) -> u64 {
        (**self).total_read_length()
    }
}

impl<R: ReadSource + ?Sized> ReadSource for std::sync::Arc<R> {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn reads_in(&self, chr: &Chromosome, start: usize, end: usize) -> Vec<Read> {
        (**self).reads_in(chr, start, end)
    }
    fn reads_in_chromosome(&self, chr: &Chromosome) -> Vec<Read> {
        (**self).reads_in_chromosome(chr)
    }
    fn total_read_count(&self) -> u64 {
        (**self).total_read_count()
    }
    fn total_read_length(&self) -> u64 {
        (**self).total_read_length()
    }
}

/// Move a read toward the fragment centre: forward reads go downstream,
/// reverse reads upstream, both clamped to the chromosome.
pub fn shift_read(read: Read, shift: usize, chr_len: usize) -> Read {
    match read.strand {
        Strand::Forward => Read {
            start: (read.start + shift).min(chr_len),
            end: (read.end + shift).min(chr_len),
            ..read
        },
        Strand::Reverse => Read {
            start: read.start.saturating_sub(shift).max(1),
            end: read.end.saturating_sub(shift).max(1),
            ..read
        },
        Strand::Unknown => read,
    }
}

/// Union of the reads of all the sources for [start, end], shifted by `shift`.
/// The query is widened by `shift` on both sides so reads moving into the region are not missed.
/// The result is not sorted.
pub fn gather_reads<R: ReadSource>(
    sources: &[R],
    chr: &Chromosome,
    start: usize,
    end: usize,
    shift: usize,
) -> Vec<Read> {
    let (start, end) = match shift {
        0 => (start, end),
        _ => (start.saturating_sub(shift).max(1), (end + shift).min(chr.length)),
    };
    let mut reads = Vec::new();
    for source in sources.iter() {
        let fetched = source.reads_in(chr, start, end);
        match shift {
            0 => reads.extend(fetched),
            _ => reads.extend(fetched.into_iter().map(|r| shift_read(r, shift, chr.length))),
        }
    }
    reads
}

pub fn gather_chromosome<R: ReadSource>(sources: &[R], chr: &Chromosome) -> Vec<Read> {
    sources
        .iter()
        .flat_map(|source| source.reads_in_chromosome(chr))
        .collect()
}

/// Mean read length over the samples, each sample weighted equally.
pub fn mean_read_length<R: ReadSource>(sources: &[R]) -> usize {
    let lengths: Vec<_> = sources
        .iter()
        .filter(|s| 0 < s.total_read_count())
        .map(|s| s.total_read_length() / s.total_read_count())
        .collect();
    match lengths.is_empty() {
        true => 0,
        false => (lengths.iter().sum::<u64>() / lengths.len() as u64) as usize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn sample() -> Sample {
        let reads = vec![
            ("chr1".to_string(), Read::new(100, 149, Strand::Forward)),
            ("chr1".to_string(), Read::new(200, 249, Strand::Reverse)),
            ("chr1".to_string(), Read::new(5, 20, Strand::Reverse)),
            ("chr1".to_string(), Read::new(980, 999, Strand::Forward)),
            ("chr1".to_string(), Read::new(500, 519, Strand::Unknown)),
        ];
        Sample::from_reads("s1", reads)
    }
    #[test]
    fn shift_reads() {
        let read = Read::new(100, 149, Strand::Forward);
        assert_eq!(shift_read(read, 30, 1000), Read::new(130, 179, Strand::Forward));
        let read = Read::new(980, 999, Strand::Forward);
        assert_eq!(shift_read(read, 30, 1000), Read::new(1000, 1000, Strand::Forward));
        let read = Read::new(5, 20, Strand::Reverse);
        assert_eq!(shift_read(read, 30, 1000), Read::new(1, 1, Strand::Reverse));
        let read = Read::new(500, 519, Strand::Unknown);
        assert_eq!(shift_read(read, 30, 1000), read);
    }
    #[test]
    fn gather_shifted() {
        let chr = Chromosome::new("chr1", 1000);
        let samples = vec![sample(), sample()];
        let reads = gather_reads(&samples, &chr, 160, 190, 0);
        assert!(reads.is_empty());
        // The forward read moves into [160,190] and the reverse read moves into it as well.
        let reads = gather_reads(&samples, &chr, 160, 190, 40);
        assert_eq!(reads.len(), 4);
        assert!(reads.contains(&Read::new(140, 189, Strand::Forward)));
        assert!(reads.contains(&Read::new(160, 209, Strand::Reverse)));
        assert_eq!(gather_chromosome(&samples, &chr).len(), 10);
        assert_eq!(mean_read_length(&samples), (50 + 50 + 16 + 20 + 20) / 5);
    }
}
