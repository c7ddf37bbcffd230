use definitions::{Chromosome, Genome, Interval, Read, Strand};
use log::debug;
use rand::Rng;
use rand_distr::{Distribution, Normal, Poisson};
use std::io::Write;

/// Shape of the simulated sequencing fragments.
#[derive(Debug, Clone, Copy)]
pub struct FragmentProfile {
    pub read_length: usize,
    pub mean: f64,
    pub sd: f64,
}

impl FragmentProfile {
    pub fn new(read_length: usize, mean: f64, sd: f64) -> Self {
        assert!(0 < read_length && 0f64 < sd);
        Self {
            read_length,
            mean,
            sd,
        }
    }
    fn fragment_length<R: Rng>(&self, rng: &mut R) -> usize {
        let normal = Normal::new(self.mean, self.sd).unwrap();
        let len = normal.sample(rng).round().max(self.read_length as f64);
        len as usize
    }
}

/// One end of a fragment starting at `start`, on a random strand, clipped to the chromosome.
pub fn sequence_fragment<R: Rng>(
    chr: &Chromosome,
    start: usize,
    fragment_len: usize,
    read_len: usize,
    rng: &mut R,
) -> Read {
    let start = start.clamp(1, chr.length);
    let end = (start + fragment_len - 1).min(chr.length);
    if rng.gen_bool(0.5) {
        Read::new(start, (start + read_len - 1).min(end), Strand::Forward)
    } else {
        Read::new((end + 1).saturating_sub(read_len).max(start), end, Strand::Reverse)
    }
}

/// Uniformly placed fragments at `coverage` reads per read length.
pub fn background_reads<R: Rng>(
    genome: &Genome,
    coverage: f64,
    profile: &FragmentProfile,
    rng: &mut R,
) -> Vec<(String, Read)> {
    let mut reads = vec![];
    for chr in genome.chromosomes.iter() {
        let count = (coverage * chr.length as f64 / profile.read_length as f64).round() as usize;
        for _ in 0..count {
            let start = rng.gen_range(1..=chr.length);
            let len = profile.fragment_length(rng);
            let read = sequence_fragment(chr, start, len, profile.read_length, rng);
            reads.push((chr.name.clone(), read));
        }
        debug!("SIM\tBackground\t{}\t{}", chr.name, count);
    }
    reads
}

/// `num` binding sites placed at random, away from the chromosome ends.
pub fn binding_sites<R: Rng>(genome: &Genome, num: usize, width: usize, rng: &mut R) -> Vec<Interval> {
    let chromosomes: Vec<_> = genome
        .chromosomes
        .iter()
        .filter(|c| 4 * width < c.length)
        .collect();
    if chromosomes.is_empty() {
        return vec![];
    }
    let mut sites: Vec<_> = (0..num)
        .map(|_| {
            let chr = chromosomes[rng.gen_range(0..chromosomes.len())];
            let start = rng.gen_range(width..chr.length - 2 * width);
            Interval::new(&chr.name, start, start + width - 1)
        })
        .collect();
    sites.sort_by(|a, b| (&a.chromosome, a.start).cmp(&(&b.chromosome, b.start)));
    sites
}

/// Fragments around each site. Each site gets Poisson(`depth`) fragments
/// centred on a uniformly drawn position within it.
pub fn site_reads<R: Rng>(
    genome: &Genome,
    sites: &[Interval],
    depth: f64,
    profile: &FragmentProfile,
    rng: &mut R,
) -> Vec<(String, Read)> {
    let poisson = Poisson::new(depth).unwrap();
    let mut reads = vec![];
    for site in sites.iter() {
        let chr = match genome.chromosome(&site.chromosome) {
            Some(chr) => chr,
            None => continue,
        };
        let count = poisson.sample(rng) as usize;
        for _ in 0..count {
            let centre = rng.gen_range(site.start..=site.end);
            let len = profile.fragment_length(rng);
            let start = centre.saturating_sub(len / 2).max(1);
            let read = sequence_fragment(chr, start, len, profile.read_length, rng);
            reads.push((chr.name.clone(), read));
        }
    }
    reads
}

pub fn write_chrom_sizes<W: Write>(genome: &Genome, mut wtr: W) -> std::io::Result<()> {
    for chr in genome.chromosomes.iter() {
        writeln!(wtr, "{}\t{}", chr.name, chr.length)?;
    }
    wtr.flush()
}

/// Reads in BED, 0-based half-open.
pub fn write_reads_bed<W: Write>(reads: &[(String, Read)], mut wtr: W) -> std::io::Result<()> {
    for (i, (chr, read)) in reads.iter().enumerate() {
        let strand = read.strand.symbol();
        writeln!(wtr, "{}\t{}\t{}\tr{}\t0\t{}", chr, read.start - 1, read.end, i, strand)?;
    }
    wtr.flush()
}

/// The fraction of `sites` overlapped by some peak.
pub fn recall(sites: &[Interval], peaks: &[Interval]) -> f64 {
    if sites.is_empty() {
        return 1f64;
    }
    let found = sites
        .iter()
        .filter(|site| peaks.iter().any(|p| p.overlaps(site)))
        .count();
    found as f64 / sites.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use enrich::io::parse_bed_sample;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256StarStar;
    #[test]
    fn fragment_ends() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(4);
        let chr = Chromosome::new("chr1", 1_000);
        for _ in 0..100 {
            let read = sequence_fragment(&chr, 100, 200, 36, &mut rng);
            match read.strand {
                Strand::Forward => assert_eq!((read.start, read.end), (100, 135)),
                Strand::Reverse => assert_eq!((read.start, read.end), (264, 299)),
                Strand::Unknown => panic!(),
            }
        }
        let read = sequence_fragment(&chr, 990, 200, 36, &mut rng);
        assert!(read.end <= 1_000 && read.start <= read.end);
    }
    #[test]
    fn simulated_reads_parse_back() {
        let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(7);
        let genome = Genome::new(vec![Chromosome::new("chr1", 50_000)]);
        let profile = FragmentProfile::new(36, 200f64, 20f64);
        let mut reads = background_reads(&genome, 0.5, &profile, &mut rng);
        let sites = binding_sites(&genome, 5, 300, &mut rng);
        assert_eq!(sites.len(), 5);
        assert!(sites.iter().all(|s| s.is_within(50_000)));
        reads.extend(site_reads(&genome, &sites, 100f64, &profile, &mut rng));
        let mut bed = vec![];
        write_reads_bed(&reads, &mut bed).unwrap();
        let sample = parse_bed_sample("sim", bed.as_slice(), &genome).unwrap();
        assert_eq!(sample.total_read_count(), reads.len() as u64);
    }
    #[test]
    fn recall_of_sites() {
        let sites = vec![Interval::new("chr1", 100, 200), Interval::new("chr1", 500, 600)];
        let peaks = vec![Interval::new("chr1", 150, 450)];
        assert!((recall(&sites, &peaks) - 0.5).abs() < 1e-10);
        assert_eq!(recall(&[], &peaks), 1f64);
    }
}
