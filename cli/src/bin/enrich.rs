use enrich_cli::enrich_commands::{call_config, enrich_parser};
use enrich_cli::pipeline::{run_pipeline, PipelineConfig};
use std::path::PathBuf;

fn main() -> std::io::Result<()> {
    let matches = enrich_parser().get_matches();
    let config = match matches.subcommand() {
        Some(("pipeline", sub_m)) => {
            let path: &PathBuf = sub_m.get_one("profile").unwrap();
            let profile = std::fs::read_to_string(path)?;
            PipelineConfig::from_toml(&profile)?
        }
        Some(("call", sub_m)) => call_config(sub_m),
        _ => unreachable!(),
    };
    run_pipeline(&config)
}
