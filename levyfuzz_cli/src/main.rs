use levyfuzz_core::config::LevyConfig;
use levyfuzz_core::controller::MutationParameters;
use levyfuzz_core::executor::ShowmapExecutor;
use levyfuzz_core::fuzzer::Fuzzer;
use levyfuzz_core::mutator::LevyFlightMutator;
use levyfuzz_core::testcase::TestCase;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const DEFAULT_CONFIG_FILE: &str = "levyfuzz.toml";

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// TOML file with run settings; flags below override its values.
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    /// Input seed.
    #[clap(long)]
    seed: Option<PathBuf>,
    /// Directory to store generated test cases.
    #[clap(long)]
    output: Option<PathBuf>,
    /// Number of test cases generated per round.
    #[clap(long)]
    size: Option<usize>,
    /// Command under test; `@@` is replaced by the test case path.
    #[clap(long)]
    cmd: Option<String>,
    /// Number of segments the seed is split into.
    #[clap(long)]
    segment_count: Option<u64>,
    /// Path to afl-showmap.
    #[clap(long)]
    afl_showmap_path: Option<PathBuf>,
    /// Seed for the random source, for reproducible runs.
    #[clap(long)]
    rng_seed: Option<u64>,
    #[clap(long)]
    bias1: Option<f64>,
    #[clap(long)]
    bias2: Option<f64>,
}

impl Cli {
    fn apply_to(self, config: &mut LevyConfig) {
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(output) = self.output {
            config.output_dir = Some(output);
        }
        if let Some(size) = self.size {
            config.round_size = Some(size);
        }
        if let Some(cmd) = self.cmd {
            config.target_command = Some(cmd);
        }
        if let Some(segment_count) = self.segment_count {
            config.segment_count = Some(segment_count);
        }
        if let Some(showmap_path) = self.afl_showmap_path {
            config.showmap_path = Some(showmap_path);
        }
        if let Some(rng_seed) = self.rng_seed {
            config.engine.rng_seed = Some(rng_seed);
        }
        if let Some(bias1) = self.bias1 {
            config.engine.bias1 = bias1;
        }
        if let Some(bias2) = self.bias2 {
            config.engine.bias2 = bias2;
        }
    }
}

fn load_config(config_file: Option<&PathBuf>) -> Result<LevyConfig, anyhow::Error> {
    match config_file {
        Some(config_path) => {
            info!("Loading configuration from specified path: {config_path:?}");
            LevyConfig::load_from_file(config_path)
        }
        None => {
            let default_config_path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if default_config_path.exists() {
                info!("No config file specified, loading default: {default_config_path:?}");
                LevyConfig::load_from_file(&default_config_path)
            } else {
                Ok(LevyConfig::default())
            }
        }
    }
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config_file.as_ref())?;
    cli.apply_to(&mut config);

    let run = config.validate().context("Invalid configuration")?;
    run.prepare_output_dir()?;
    info!("Effective configuration: {run:#?}");

    let mut rng = match run.rng_seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_rng(&mut rand::rng()),
    };

    let seed = TestCase::new(&run.seed, run.segment_count)
        .with_context(|| format!("Unable to build seed from {:?}", run.seed))?;
    let params = MutationParameters::random(&mut rng, seed.segment_count());

    let mut fuzzer = Fuzzer::bootstrap(
        LevyFlightMutator::new(rng),
        ShowmapExecutor::new(run.executor_config()),
        run.controller(),
        params,
        seed,
        run.output_dir.clone(),
        run.round_size,
    )
    .context("Unable to execute seed")?;

    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        warn!("Interrupt received, stopping after the current round");
        handler_flag.store(true, Ordering::Relaxed);
    })
    .context("Unable to install Ctrl-C handler")?;

    info!(
        "Starting fuzz loop: {} test cases per round, a1 {:.4}, a2 {:.4}, offset {}",
        run.round_size, params.offset_diffusivity, params.byte_diffusivity, params.offset
    );
    let rounds = fuzzer.run(&stop)?;
    info!(
        "Fuzz loop finished after {rounds} rounds, {} test cases in corpus",
        fuzzer.corpus().len()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_file_settings() {
        let mut config: LevyConfig = toml_config("round-size = 500\nsegment-count = 4\n");
        let cli = Cli::parse_from([
            "levyfuzz",
            "--seed",
            "seed.bin",
            "--output",
            "out",
            "--size",
            "32",
            "--cmd",
            "./target @@",
            "--afl-showmap-path",
            "/opt/afl/afl-showmap",
            "--bias2",
            "5.5",
        ]);
        cli.apply_to(&mut config);

        let run = config.validate().unwrap();
        assert_eq!(run.round_size, 32);
        assert_eq!(run.segment_count, 4);
        assert_eq!(run.showmap_path, PathBuf::from("/opt/afl/afl-showmap"));
        assert_eq!(run.bias1, 3.0);
        assert_eq!(run.bias2, 5.5);
    }

    #[test]
    fn missing_flags_fail_validation() {
        let mut config = LevyConfig::default();
        Cli::parse_from(["levyfuzz", "--seed", "seed.bin"]).apply_to(&mut config);
        assert!(config.validate().is_err());
    }

    fn toml_config(content: &str) -> LevyConfig {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, content).unwrap();
        load_config(Some(&path)).unwrap()
    }
}
