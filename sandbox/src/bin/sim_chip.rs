use clap::Parser;
use definitions::{Chromosome, Genome, Sample};
use enrich::{CancellationToken, LogListener, PeakCallConfig, PeakCaller};
use log::info;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;
use sandbox::*;
use std::{io::BufWriter, path::PathBuf};

#[derive(Parser, Debug)]
#[clap(name = "SimChIP")]
#[clap(author = "Bansho Masutani<ban-m@g.ecc.u-tokyo.ac.jp>")]
#[clap(version = "1.0")]
#[clap(author,version,about,long_about=None)]
struct Args {
    /// Set the seed of a pseudorandom number generator.
    #[clap(short, long, default_value_t = 7)]
    seed: u64,
    /// Set the number of chromosomes.
    #[clap(short, long, default_value_t = 2)]
    chromosomes: usize,
    /// Set the length of each chromosome.
    #[clap(short, long, default_value_t = 1_000_000)]
    length: usize,
    /// Set the number of binding sites.
    #[clap(short = 'n', long, default_value_t = 50)]
    sites: usize,
    /// Set the mean number of fragments per binding site.
    #[clap(short, long, default_value_t = 200f64)]
    depth: f64,
    /// Set the background coverage of both the signal and the control.
    #[clap(short, long, default_value_t = 0.5)]
    background: f64,
    #[clap(long, default_value_t = 36)]
    read_length: usize,
    #[clap(long, default_value_t = 250f64)]
    fragment_mean: f64,
    #[clap(long, default_value_t = 30f64)]
    fragment_sd: f64,
    /// Call peaks on the simulated data and report the recall.
    #[clap(long)]
    call: bool,
    #[clap(short, long, default_value = "./")]
    output_dir: PathBuf,
}

fn main() -> std::io::Result<()> {
    let args = Args::parse();
    env_logger::init();
    std::fs::create_dir_all(&args.output_dir)?;
    let mut rng: Xoshiro256StarStar = SeedableRng::seed_from_u64(args.seed);
    let chromosomes = (0..args.chromosomes)
        .map(|i| Chromosome::new(&format!("chr{}", i + 1), args.length))
        .collect();
    let genome = Genome::new(chromosomes);
    let profile = FragmentProfile::new(args.read_length, args.fragment_mean, args.fragment_sd);
    let sites = binding_sites(&genome, args.sites, args.read_length * 8, &mut rng);
    let mut chip = background_reads(&genome, args.background, &profile, &mut rng);
    chip.extend(site_reads(&genome, &sites, args.depth, &profile, &mut rng));
    let input = background_reads(&genome, args.background, &profile, &mut rng);
    let create = |name: &str| std::fs::File::create(args.output_dir.join(name)).map(BufWriter::new);
    write_chrom_sizes(&genome, create("genome.sizes")?)?;
    write_reads_bed(&chip, create("chip.bed")?)?;
    write_reads_bed(&input, create("input.bed")?)?;
    let truth: Vec<_> = sites
        .iter()
        .map(|s| (s.chromosome.clone(), definitions::Read::new(s.start, s.end, s.strand)))
        .collect();
    write_reads_bed(&truth, create("sites.bed")?)?;
    info!("SIM\tReads\t{}\t{}", chip.len(), input.len());
    if args.call {
        let signal = vec![Sample::from_reads("chip", chip)];
        let control = vec![Sample::from_reads("input", input)];
        let config = PeakCallConfig {
            fragment_size: args.fragment_mean.round() as usize,
            seed: args.seed,
            ..PeakCallConfig::default()
        };
        let cancel = CancellationToken::new();
        let to_io = |e: enrich::PeakCallError| std::io::Error::new(std::io::ErrorKind::Other, e.to_string());
        let caller = PeakCaller::new(&genome, &signal, &control, &config, cancel).map_err(to_io)?;
        let outcome = caller.run(&mut LogListener).map_err(to_io)?;
        let peaks = outcome.peaks();
        println!("{}\t{}\t{:.3}", sites.len(), peaks.len(), recall(&sites, peaks));
    }
    Ok(())
}
