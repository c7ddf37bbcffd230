//! The peak calling pipeline.
//!
//! A run goes through the phases in order, never going back:
//! 1. Seed discovery. Windows whose signal coverage lies in a fold-enrichment band are merged into
//!    high-confidence regions.
//! 2. Shift and thresholds. The fragment shift is estimated on the seeds, duplicated reads are capped,
//!    and the genome-wide Poisson cutoff is computed.
//! 3. Candidate discovery. Windows with more shifted, deduplicated reads than the global cutoff are merged.
//! 4. Local validation. Each candidate is tested against the maximum of several local backgrounds.
use crate::background::{expected_count_per_window, global_cutoff, LocalModel};
use crate::cancel::CancellationToken;
use crate::config::PeakCallConfig;
use crate::coverage_scan::{scan, ScanConfig, Tally, WindowCounter};
use crate::error::{PeakCallError, Result};
use crate::fragment_shift::estimate_shift;
use crate::progress::{ChannelListener, Event, ProgressListener};
use crate::redundancy::{non_redundant_count, redundancy_cutoff, ReadStack};
use crate::source::{mean_read_length, GenomeIndex, ReadSource};
use definitions::{Chromosome, Interval, PeakSet};
use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver};

/// Candidates between two progress reports during validation.
const VALIDATION_REPORT_INTERVAL: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    SeedDiscovery,
    ShiftAndThresholds,
    CandidateDiscovery,
    LocalValidation,
    Complete,
}

/// How a run ended, if it did not fail.
#[derive(Debug)]
pub enum Outcome {
    Complete(PeakSet),
    /// No high-confidence region was found. Nothing else could be computed.
    NoPeaksFound,
    Cancelled,
}

impl Outcome {
    /// The called peaks. Empty unless the run completed.
    pub fn peaks(&self) -> &[Interval] {
        match self {
            Outcome::Complete(peaks) => peaks.peaks(),
            _ => &[],
        }
    }
}

/// The quantities computed between seed discovery and the candidate scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    pub shift: usize,
    /// Maximum copies of an identical read. `None` when deduplication is skipped.
    pub cap: Option<usize>,
    pub signal_non_redundant: u64,
    /// Zero without control samples.
    pub control_non_redundant: u64,
    pub mean_read_length: usize,
    /// Expected number of signal reads in a window of the fragment size.
    pub window_density: f64,
    pub global_cutoff: u64,
}

/// A single peak calling run over a genome, signal samples, and (optionally) control samples.
#[derive(Debug, Clone)]
pub struct PeakCaller<'a, G, R> {
    genome: &'a G,
    signal: &'a [R],
    control: &'a [R],
    config: &'a PeakCallConfig,
    cancel: CancellationToken,
}

fn check_launch<G: GenomeIndex, R>(genome: &G, signal: &[R], config: &PeakCallConfig) -> Result<()> {
    config.validate()?;
    if signal.is_empty() {
        let msg = "at least one signal sample is needed".to_string();
        return Err(PeakCallError::Configuration(msg));
    }
    if genome.total_length() == 0 {
        let msg = "the genome has no bases".to_string();
        return Err(PeakCallError::Configuration(msg));
    }
    Ok(())
}

impl<'a, G, R> PeakCaller<'a, G, R>
where
    G: GenomeIndex + Sync,
    R: ReadSource + Sync,
{
    pub fn new(
        genome: &'a G,
        signal: &'a [R],
        control: &'a [R],
        config: &'a PeakCallConfig,
        cancel: CancellationToken,
    ) -> Result<Self> {
        check_launch(genome, signal, config)?;
        Ok(Self {
            genome,
            signal,
            control,
            config,
            cancel,
        })
    }
    fn scan_config(&self) -> ScanConfig {
        ScanConfig::new(self.config.fragment_size, self.config.step_size())
    }
    /// Run the whole pipeline. Exactly one of the terminal callbacks of `listener` is called.
    /// Failures are returned after `on_exception`; cancellation and empty seeds are not failures.
    pub fn run(&self, listener: &mut dyn ProgressListener) -> Result<Outcome> {
        match self.call(listener) {
            Ok(peaks) => {
                debug!("PHASE\t{:?}\t{}", Phase::Complete, peaks.len());
                listener.on_complete(&peaks);
                Ok(Outcome::Complete(peaks))
            }
            Err(PeakCallError::EmptySeedSet) => {
                warn!("PHASE\tNoPeaksFound\tNo high-confidence regions in the signal samples");
                listener.on_complete(&PeakSet::new(self.description(), vec![]));
                Ok(Outcome::NoPeaksFound)
            }
            Err(PeakCallError::Cancelled) => {
                info!("PHASE\tCancelled");
                listener.on_cancelled();
                Ok(Outcome::Cancelled)
            }
            Err(error) => {
                listener.on_exception(&error);
                Err(error)
            }
        }
    }
    fn call(&self, listener: &mut dyn ProgressListener) -> Result<PeakSet> {
        debug!("PHASE\t{:?}", Phase::SeedDiscovery);
        let seeds = self.find_seeds(listener)?;
        if seeds.is_empty() {
            return Err(PeakCallError::EmptySeedSet);
        }
        debug!("PHASE\t{:?}\t{}", Phase::ShiftAndThresholds, seeds.len());
        let thresholds = self.thresholds(&seeds, listener)?;
        debug!("PHASE\t{:?}", Phase::CandidateDiscovery);
        let candidates = self.find_candidates(&thresholds, listener)?;
        debug!("PHASE\t{:?}\t{}", Phase::LocalValidation, candidates.len());
        let peaks = self.validate(&candidates, &thresholds, listener)?;
        Ok(PeakSet::new(self.description(), peaks))
    }
    /// Merged windows whose summed signal read length is within the fold-enrichment band
    /// of the average per-base coverage.
    pub fn find_seeds(&self, listener: &mut dyn ProgressListener) -> Result<Vec<Interval>> {
        let genome_length = self.genome.total_length();
        let total_length: u64 = self.signal.iter().map(|s| s.total_read_length()).sum();
        if total_length == 0 {
            warn!("SEED\tNoSignalReads");
            return Ok(vec![]);
        }
        let coverage = total_length as f64 / genome_length as f64;
        let lower = self.config.min_fold_enrichment * coverage;
        let upper = self.config.max_fold_enrichment * coverage;
        debug!("SEED\tCoverage\t{:.3}\t{:.3}\t{:.3}", coverage, lower, upper);
        let in_band = |amount: u64, len: usize| {
            let (amount, len) = (amount as f64, len as f64);
            lower * len <= amount && amount <= upper * len
        };
        let scan_config = self.scan_config();
        let chromosomes = self.genome.chromosomes();
        let mut seeds = vec![];
        for (i, chr) in chromosomes.iter().enumerate() {
            self.cancel.check()?;
            let message = format!("Finding high confidence peaks on {}", chr.name);
            listener.on_progress(&message, i, chromosomes.len());
            let counter = WindowCounter::new(self.signal, chr, Tally::ReadLength);
            let measure = |start, end| counter.count(start, end);
            let found = scan(chr, &scan_config, measure, in_band, &self.cancel)?;
            debug!("SEED\t{}\t{}", chr.name, found.len());
            seeds.extend(found);
        }
        Ok(seeds)
    }
    pub fn thresholds(
        &self,
        seeds: &[Interval],
        listener: &mut dyn ProgressListener,
    ) -> Result<Thresholds> {
        listener.on_progress("Estimating fragment shift", 0, 3);
        let shift = estimate_shift(self.genome, seeds, self.signal, self.config, &self.cancel)?;
        let genome_length = self.genome.total_length();
        let total_reads: u64 = self.signal.iter().map(|s| s.total_read_count()).sum();
        let redundancy = redundancy_cutoff(
            total_reads,
            genome_length,
            self.config.redundancy_significance,
        )?;
        let cap = match self.config.skip_deduplication {
            true => None,
            false => Some(redundancy),
        };
        listener.on_progress("Counting non-redundant reads", 1, 3);
        let signal_non_redundant = non_redundant_count(self.genome, self.signal, cap, &self.cancel)?;
        let control_non_redundant = match self.control.is_empty() {
            true => 0,
            false => non_redundant_count(self.genome, self.control, cap, &self.cancel)?,
        };
        listener.on_progress("Computing the global threshold", 2, 3);
        let mean_read_length = mean_read_length(self.signal);
        let window_density = expected_count_per_window(
            signal_non_redundant,
            genome_length,
            self.config.fragment_size,
            mean_read_length,
        );
        let global_cutoff = global_cutoff(window_density, self.config.p_value)?;
        debug!(
            "THRESHOLD\tShift:{}\tCap:{:?}\tNonRedundant:{}\tControl:{}\tReadLength:{}",
            shift, cap, signal_non_redundant, control_non_redundant, mean_read_length
        );
        debug!("THRESHOLD\tGlobal\t{:.3}\t{}", window_density, global_cutoff);
        Ok(Thresholds {
            shift,
            cap,
            signal_non_redundant,
            control_non_redundant,
            mean_read_length,
            window_density,
            global_cutoff,
        })
    }
    /// Merged windows with strictly more shifted reads than the global cutoff.
    pub fn find_candidates(
        &self,
        thresholds: &Thresholds,
        listener: &mut dyn ProgressListener,
    ) -> Result<Vec<Interval>> {
        let cutoff = thresholds.global_cutoff;
        let scan_config = self.scan_config();
        let chromosomes = self.genome.chromosomes();
        let mut candidates = vec![];
        for (i, chr) in chromosomes.iter().enumerate() {
            self.cancel.check()?;
            let message = format!("Finding candidate peaks on {}", chr.name);
            listener.on_progress(&message, i, chromosomes.len());
            let counter = WindowCounter::new(self.signal, chr, Tally::ReadCount)
                .shift(thresholds.shift)
                .cap(thresholds.cap);
            let measure = |start, end| counter.count(start, end);
            let above = |count: u64, _len: usize| count > cutoff;
            let found = scan(chr, &scan_config, measure, above, &self.cancel)?;
            debug!("CANDIDATE\t{}\t{}", chr.name, found.len());
            candidates.extend(found);
        }
        Ok(candidates)
    }
    fn local_model(&self, thresholds: &Thresholds) -> Result<LocalModel<'a, R>> {
        let use_control = !self.control.is_empty();
        let (sources, total_count, input_correction) = if use_control {
            if thresholds.control_non_redundant == 0 {
                let msg = "the control samples have no reads".to_string();
                return Err(PeakCallError::Computation(msg));
            }
            let correction =
                thresholds.signal_non_redundant as f64 / thresholds.control_non_redundant as f64;
            (self.control, thresholds.control_non_redundant, correction)
        } else {
            (self.signal, thresholds.signal_non_redundant, 1f64)
        };
        debug!("VALIDATE\tInputCorrection\t{:.4}", input_correction);
        Ok(LocalModel {
            sources,
            total_count,
            genome_length: self.genome.total_length(),
            mean_read_length: thresholds.mean_read_length,
            input_correction,
            use_control,
            cap: thresholds.cap,
            p_value: self.config.p_value,
        })
    }
    /// The candidates with strictly more shifted reads than their local cutoff.
    pub fn validate(
        &self,
        candidates: &[Interval],
        thresholds: &Thresholds,
        listener: &mut dyn ProgressListener,
    ) -> Result<Vec<Interval>> {
        let model = self.local_model(thresholds)?;
        let chromosomes: HashMap<&str, &Chromosome> = self
            .genome
            .chromosomes()
            .iter()
            .map(|c| (c.name.as_str(), c))
            .collect();
        let mut peaks = vec![];
        for (i, candidate) in candidates.iter().enumerate() {
            self.cancel.check()?;
            if i % VALIDATION_REPORT_INTERVAL == 0 {
                listener.on_progress("Validating candidate peaks", i, candidates.len());
            }
            let chr = match chromosomes.get(candidate.chromosome.as_str()) {
                Some(&chr) if candidate.is_within(chr.length) => chr,
                _ => {
                    warn!("VALIDATE\tOutOfRange\t{}", candidate);
                    continue;
                }
            };
            let background = model.local_cutoff(candidate, chr)?;
            let region = (candidate.start, candidate.end);
            let count = ReadStack::collect(self.signal, chr, region, thresholds.shift, thresholds.cap)
                .count_in(candidate.start, candidate.end);
            trace!("VALIDATE\t{}\t{}\t{}", candidate, count, background.cutoff);
            if count > background.cutoff {
                peaks.push(candidate.clone());
            }
        }
        debug!("VALIDATE\tPassed\t{}\t{}", peaks.len(), candidates.len());
        Ok(peaks)
    }
    /// Which data and parameters produced the peaks.
    pub fn description(&self) -> String {
        let names = |xs: &[R]| xs.iter().map(|x| x.name()).collect::<Vec<_>>().join(", ");
        let control = match self.control.is_empty() {
            true => "no control samples".to_string(),
            false => format!("control samples {}", names(self.control)),
        };
        let dedup = match self.config.skip_deduplication {
            true => " Deduplication was skipped.",
            false => "",
        };
        format!(
            "Enriched regions in signal samples {} against {}. Fragment size {}bp, p-value {:e}.{}",
            names(self.signal),
            control,
            self.config.fragment_size,
            self.config.p_value,
            dedup
        )
    }
}

/// A run executing on a background thread.
#[derive(Debug)]
pub struct PeakCallHandle {
    cancel: CancellationToken,
    events: Receiver<Event>,
    worker: std::thread::JoinHandle<Result<Outcome>>,
}

impl PeakCallHandle {
    /// Request cancellation. The worker stops at its next poll and reports `Event::Cancelled`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
    pub fn events(&self) -> &Receiver<Event> {
        &self.events
    }
    pub fn join(self) -> Result<Outcome> {
        match self.worker.join() {
            Ok(result) => result,
            Err(_) => Err(PeakCallError::Computation("the worker panicked".to_string())),
        }
    }
}

/// Start a run on a new thread. Invalid parameters are reported here, before anything is launched.
pub fn spawn<G, R>(
    genome: G,
    signal: Vec<R>,
    control: Vec<R>,
    config: PeakCallConfig,
) -> Result<PeakCallHandle>
where
    G: GenomeIndex + Send + Sync + 'static,
    R: ReadSource + Send + Sync + 'static,
{
    check_launch(&genome, &signal, &config)?;
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let (sender, events) = channel();
    let worker = std::thread::spawn(move || {
        let caller = PeakCaller::new(&genome, &signal, &control, &config, token)?;
        let mut listener = ChannelListener::new(sender);
        caller.run(&mut listener)
    });
    Ok(PeakCallHandle {
        cancel,
        events,
        worker,
    })
}
