//! Pipelines -- reading the inputs, calling peaks, and writing them out.
//!
//! A run is fully described by a [PipelineConfig], either written by hand as a TOML profile
//! or assembled from the command line arguments.
use definitions::{Genome, PeakSet, Sample};
use enrich::io::{read_bed_sample, read_chrom_sizes, write_peaks_bed, write_peaks_json};
use enrich::{CancellationToken, LogListener, Outcome, PeakCallConfig, PeakCallError, PeakCaller};
use serde::{Deserialize, Serialize};
use std::io::BufWriter;
use std::path::PathBuf;

fn default_threads() -> usize {
    1
}

fn to_io(e: PeakCallError) -> std::io::Error {
    match e {
        PeakCallError::Io(e) => e,
        e => std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
    }
}

/// The configuration of the pipeline.
/// The input and output files and the engine parameters in the `[params]` table.
/// Parameters not written in the profile take their default values.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PipelineConfig {
    /// Chromosome sizes, `name<TAB>length`.
    genome: PathBuf,
    /// BED files of the signal samples.
    signal: Vec<PathBuf>,
    /// BED files of the control samples.
    #[serde(default)]
    control: Vec<PathBuf>,
    /// The peaks in BED.
    output: PathBuf,
    /// The peaks in JSON.
    #[serde(default)]
    json: Option<PathBuf>,
    #[serde(default)]
    verbose: usize,
    #[serde(default = "default_threads")]
    threads: usize,
    #[serde(default)]
    params: PeakCallConfig,
}

impl PipelineConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        genome: PathBuf,
        signal: Vec<PathBuf>,
        control: Vec<PathBuf>,
        output: PathBuf,
        json: Option<PathBuf>,
        verbose: usize,
        threads: usize,
        params: PeakCallConfig,
    ) -> Self {
        Self {
            genome,
            signal,
            control,
            output,
            json,
            verbose,
            threads,
            params,
        }
    }
    pub fn from_toml(profile: &str) -> std::io::Result<Self> {
        toml::from_str(profile)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }
    pub fn params(&self) -> &PeakCallConfig {
        &self.params
    }
}

/// Set up logging and threads, then call and write the peaks.
pub fn run_pipeline(config: &PipelineConfig) -> std::io::Result<()> {
    let level = match config.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    if let Err(why) = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build_global()
    {
        warn!("THREADS\t{}", why);
    }
    let peaks = call_peaks(config)?;
    let wtr = std::fs::File::create(&config.output).map(BufWriter::new)?;
    write_peaks_bed(&peaks, wtr).map_err(to_io)?;
    if let Some(json) = config.json.as_ref() {
        let wtr = std::fs::File::create(json).map(BufWriter::new)?;
        write_peaks_json(&peaks, wtr).map_err(to_io)?;
    }
    info!("END\t{}\t{}", peaks.len(), config.output.display());
    Ok(())
}

fn load_samples(paths: &[PathBuf], genome: &Genome) -> std::io::Result<Vec<Sample>> {
    paths
        .iter()
        .map(|path| {
            debug!("INPUT\tOpening\t{}", path.display());
            read_bed_sample(path, genome).map_err(to_io)
        })
        .collect()
}

/// Read the inputs and run the engine. No peaks is an empty set, not an error.
pub fn call_peaks(config: &PipelineConfig) -> std::io::Result<PeakSet> {
    let genome = read_chrom_sizes(&config.genome).map_err(to_io)?;
    let signal = load_samples(&config.signal, &genome)?;
    let control = load_samples(&config.control, &genome)?;
    let cancel = CancellationToken::new();
    let caller =
        PeakCaller::new(&genome, &signal, &control, &config.params, cancel).map_err(to_io)?;
    let peaks = match caller.run(&mut LogListener).map_err(to_io)? {
        Outcome::Complete(peaks) => peaks,
        Outcome::NoPeaksFound => PeakSet::new(caller.description(), vec![]),
        Outcome::Cancelled => {
            let msg = "the run was cancelled";
            return Err(std::io::Error::new(std::io::ErrorKind::Interrupted, msg));
        }
    };
    Ok(peaks)
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn minimal_profile() {
        let profile = r#"
genome = "hg.sizes"
signal = ["chip1.bed", "chip2.bed"]
output = "peaks.bed"
"#;
        let config = PipelineConfig::from_toml(profile).unwrap();
        assert_eq!(config.signal.len(), 2);
        assert!(config.control.is_empty());
        assert_eq!(config.threads, 1);
        assert_eq!(config.params(), &PeakCallConfig::default());
    }
    #[test]
    fn profile_with_params() {
        let profile = r#"
genome = "hg.sizes"
signal = ["chip.bed"]
control = ["input.bed"]
output = "peaks.bed"
json = "peaks.json"
verbose = 2
threads = 4

[params]
p_value = 1e-3
fragment_size = 200
skip_deduplication = true
"#;
        let config = PipelineConfig::from_toml(profile).unwrap();
        assert_eq!(config.control, vec![PathBuf::from("input.bed")]);
        assert_eq!(config.json, Some(PathBuf::from("peaks.json")));
        let params = config.params();
        assert_eq!(params.fragment_size, 200);
        assert!(params.skip_deduplication);
        assert!((params.p_value - 1e-3).abs() < 1e-12);
        assert_eq!(params.seed, enrich::config::SEED);
        assert!(PipelineConfig::from_toml("genome = 3").is_err());
    }
    #[test]
    fn peaks_from_files() {
        let dir = std::env::temp_dir().join(format!("enrich_pipeline_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let genome = dir.join("genome.sizes");
        std::fs::write(&genome, "chr1\t10000\n").unwrap();
        let mut bed = String::new();
        for (k, start) in (0..9_951).step_by(50).enumerate() {
            let strand = if k % 2 == 0 { '+' } else { '-' };
            bed += &format!("chr1\t{}\t{}\tr\t0\t{}\n", start, start + 50, strand);
        }
        for i in 0..250 {
            let start = 5_000 + i % 225;
            bed += &format!("chr1\t{}\t{}\tf\t0\t+\n", start, start + 50);
            let start = 5_225 + i % 225;
            bed += &format!("chr1\t{}\t{}\tr\t0\t-\n", start, start + 50);
        }
        let signal = dir.join("chip.bed");
        std::fs::write(&signal, bed).unwrap();
        let params = PeakCallConfig::new(1e-5, 200, false, 42).with_fold_enrichment(5f64, 100f64);
        let output = dir.join("peaks.bed");
        let config = PipelineConfig::new(genome, vec![signal], vec![], output, None, 0, 1, params);
        let peaks = call_peaks(&config).unwrap();
        assert_eq!(peaks.len(), 1);
        assert!(peaks.description().contains("chip"));
        std::fs::remove_dir_all(&dir).ok();
    }
    #[test]
    fn missing_genome_keeps_io_kind() {
        let dir = std::env::temp_dir().join(format!("enrich_missing_{}", std::process::id()));
        let params = PeakCallConfig::default();
        let output = dir.join("peaks.bed");
        let signal = vec![dir.join("chip.bed")];
        let config = PipelineConfig::new(dir.join("none.sizes"), signal, vec![], output, None, 0, 1, params);
        let err = call_peaks(&config).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
