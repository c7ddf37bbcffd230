use crate::pipeline::PipelineConfig;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use enrich::PeakCallConfig;
use std::path::PathBuf;

fn subcommand_call() -> Command {
    Command::new("call")
        .version("0.2")
        .author("Bansho Masutani")
        .about("Call enriched regions from signal (and control) reads in BED.")
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("Debug mode"),
        )
        .arg(
            Arg::new("genome")
                .long("genome")
                .short('g')
                .value_name("SIZES")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Chromosome sizes, <name>TAB<length> per line."),
        )
        .arg(
            Arg::new("signal")
                .long("signal")
                .short('s')
                .value_name("BED")
                .required(true)
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf))
                .help("Reads of a signal sample. Repeat for more samples."),
        )
        .arg(
            Arg::new("control")
                .long("control")
                .short('c')
                .value_name("BED")
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf))
                .help("Reads of a control sample. Repeat for more samples."),
        )
        .arg(
            Arg::new("p_value")
                .long("p-value")
                .value_name("P")
                .default_value("0.00001")
                .value_parser(value_parser!(f64))
                .help("Significance threshold of the Poisson tests."),
        )
        .arg(
            Arg::new("fragment_size")
                .long("fragment-size")
                .value_name("BP")
                .default_value("300")
                .value_parser(value_parser!(usize))
                .help("Width of the scanning windows."),
        )
        .arg(
            Arg::new("skip_dedup")
                .long("skip-dedup")
                .action(ArgAction::SetTrue)
                .help("Count every read, even the duplicated ones."),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .default_value("42")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .default_value("1")
                .value_parser(value_parser!(usize))
                .help("number of threads"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("PATH")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Peaks in BED."),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Peaks in JSON, with the description of the run."),
        )
}

fn subcommand_pipeline() -> Command {
    Command::new("pipeline")
        .version("0.2")
        .author("BanshoMasutani")
        .about("Run pipeline based on the given TOML file.")
        .arg(
            Arg::new("profile")
                .short('p')
                .long("profile")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file."),
        )
}

pub fn enrich_parser() -> Command {
    Command::new("enrich")
        .version("0.2")
        .author("Bansho Masutani <ban-m@g.ecc.u-tokyo.ac.jp>")
        .about("Enriched region caller for ChIP-seq reads")
        .arg_required_else_help(true)
        .subcommand(subcommand_call())
        .subcommand(subcommand_pipeline())
}

/// The run described by the arguments of `call`.
pub fn call_config(matches: &ArgMatches) -> PipelineConfig {
    let paths = |id: &str| -> Vec<PathBuf> {
        matches
            .get_many::<PathBuf>(id)
            .map(|paths| paths.cloned().collect())
            .unwrap_or_default()
    };
    let p_value = *matches.get_one::<f64>("p_value").unwrap();
    let fragment_size = *matches.get_one::<usize>("fragment_size").unwrap();
    let skip_dedup = matches.get_flag("skip_dedup");
    let seed = *matches.get_one::<u64>("seed").unwrap();
    let params = PeakCallConfig::new(p_value, fragment_size, skip_dedup, seed);
    let genome = matches.get_one::<PathBuf>("genome").unwrap().clone();
    let output = matches.get_one::<PathBuf>("output").unwrap().clone();
    let json = matches.get_one::<PathBuf>("json").cloned();
    let verbose = matches.get_count("verbose") as usize;
    let threads = *matches.get_one::<usize>("threads").unwrap();
    PipelineConfig::new(
        genome,
        paths("signal"),
        paths("control"),
        output,
        json,
        verbose,
        threads,
        params,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn parse_call() {
        let args = [
            "enrich", "call", "-g", "hg.sizes", "-s", "a.bed", "-s", "b.bed", "-c", "in.bed",
            "--p-value", "0.001", "--skip-dedup", "-o", "out.bed", "-vv",
        ];
        let matches = enrich_parser().try_get_matches_from(args).unwrap();
        let (name, sub_m) = matches.subcommand().unwrap();
        assert_eq!(name, "call");
        let config = call_config(sub_m);
        let params = config.params();
        assert!(params.skip_deduplication);
        assert_eq!(params.fragment_size, 300);
        assert!((params.p_value - 0.001).abs() < 1e-12);
        assert!(params.validate().is_ok());
    }
    #[test]
    fn signal_is_required() {
        let args = ["enrich", "call", "-g", "hg.sizes", "-o", "out.bed"];
        assert!(enrich_parser().try_get_matches_from(args).is_err());
        let args = ["enrich", "call", "-g", "hg.sizes", "-s", "a.bed", "-o", "out.bed", "--fragment-size", "x"];
        assert!(enrich_parser().try_get_matches_from(args).is_err());
    }
}
