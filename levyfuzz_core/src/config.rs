use crate::controller::AdaptiveController;
use crate::executor::ShowmapExecutorConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required `{0}` setting")]
    Missing(&'static str),
    #[error("invalid `{field}` setting: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("unable to prepare output directory {path:?}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct EngineSettings {
    #[serde(default = "default_bias")]
    pub bias1: f64,
    #[serde(default = "default_bias")]
    pub bias2: f64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u64,
    /// Fixed RNG seed for reproducible runs; OS entropy when absent.
    pub rng_seed: Option<u64>,
}

pub fn default_bias() -> f64 {
    3.0
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_memory_limit_mb() -> u64 {
    2048
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            bias1: default_bias(),
            bias2: default_bias(),
            timeout_ms: default_timeout_ms(),
            memory_limit_mb: default_memory_limit_mb(),
            rng_seed: None,
        }
    }
}

/// Run settings as read from a TOML file and/or the command line.
///
/// Every top-level field is required by the time [`LevyConfig::validate`] runs;
/// they are optional here so the CLI can fill in what the file leaves out.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct LevyConfig {
    pub seed: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub round_size: Option<usize>,
    pub target_command: Option<String>,
    pub segment_count: Option<u64>,
    pub showmap_path: Option<PathBuf>,
    #[serde(default)]
    pub engine: EngineSettings,
}

impl LevyConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        let config: LevyConfig = toml::from_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })?;

        Ok(config)
    }

    /// Checks that every required setting is present and sane.
    pub fn validate(self) -> Result<RunConfig, ConfigError> {
        let seed = self.seed.ok_or(ConfigError::Missing("seed"))?;
        let output_dir = self.output_dir.ok_or(ConfigError::Missing("output"))?;
        let round_size = self.round_size.ok_or(ConfigError::Missing("size"))?;
        let target_command = self.target_command.ok_or(ConfigError::Missing("cmd"))?;
        let segment_count = self
            .segment_count
            .ok_or(ConfigError::Missing("segment-count"))?;
        let showmap_path = self
            .showmap_path
            .ok_or(ConfigError::Missing("afl-showmap-path"))?;

        if round_size == 0 {
            return Err(ConfigError::Invalid {
                field: "size",
                reason: "round size must be greater than 0".to_string(),
            });
        }
        if segment_count == 0 {
            return Err(ConfigError::Invalid {
                field: "segment-count",
                reason: "segment count must be greater than 0".to_string(),
            });
        }

        let target_command: Vec<String> = target_command
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if target_command.is_empty() {
            return Err(ConfigError::Invalid {
                field: "cmd",
                reason: "target command is empty".to_string(),
            });
        }

        for (field, bias) in [("bias1", self.engine.bias1), ("bias2", self.engine.bias2)] {
            if !bias.is_finite() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{bias} is not a finite number"),
                });
            }
        }

        Ok(RunConfig {
            seed,
            output_dir,
            round_size,
            target_command,
            segment_count,
            showmap_path,
            bias1: self.engine.bias1,
            bias2: self.engine.bias2,
            timeout: Duration::from_millis(self.engine.timeout_ms),
            memory_limit_mb: self.engine.memory_limit_mb,
            rng_seed: self.engine.rng_seed,
        })
    }
}

/// A complete, validated set of run settings.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub seed: PathBuf,
    pub output_dir: PathBuf,
    pub round_size: usize,
    pub target_command: Vec<String>,
    pub segment_count: u64,
    pub showmap_path: PathBuf,
    pub bias1: f64,
    pub bias2: f64,
    pub timeout: Duration,
    pub memory_limit_mb: u64,
    pub rng_seed: Option<u64>,
}

impl RunConfig {
    /// Creates the output directory if it does not exist yet.
    pub fn prepare_output_dir(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| ConfigError::OutputDir {
            path: self.output_dir.clone(),
            source,
        })
    }

    pub fn controller(&self) -> AdaptiveController {
        AdaptiveController::new(self.bias1, self.bias2)
    }

    pub fn executor_config(&self) -> ShowmapExecutorConfig {
        ShowmapExecutorConfig {
            showmap_path: self.showmap_path.clone(),
            command: self.target_command.clone(),
            timeout: self.timeout,
            memory_limit_mb: self.memory_limit_mb,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> LevyConfig {
        LevyConfig {
            seed: Some(PathBuf::from("seeds/input.bin")),
            output_dir: Some(PathBuf::from("out")),
            round_size: Some(500),
            target_command: Some("./target -f @@".to_string()),
            segment_count: Some(16),
            showmap_path: Some(PathBuf::from("/usr/local/bin/afl-showmap")),
            engine: EngineSettings::default(),
        }
    }

    #[test]
    fn complete_config_validates() {
        let run = complete().validate().unwrap();
        assert_eq!(run.round_size, 500);
        assert_eq!(run.segment_count, 16);
        assert_eq!(run.target_command, ["./target", "-f", "@@"]);
        assert_eq!(run.bias1, 3.0);
        assert_eq!(run.timeout, Duration::from_millis(2000));
        assert_eq!(run.memory_limit_mb, 2048);
        assert_eq!(run.controller(), AdaptiveController::new(3.0, 3.0));
    }

    #[test]
    fn each_missing_setting_is_reported() {
        let cases: [(fn(&mut LevyConfig), &str); 6] = [
            (|c| c.seed = None, "seed"),
            (|c| c.output_dir = None, "output"),
            (|c| c.round_size = None, "size"),
            (|c| c.target_command = None, "cmd"),
            (|c| c.segment_count = None, "segment-count"),
            (|c| c.showmap_path = None, "afl-showmap-path"),
        ];
        for (clear, name) in cases {
            let mut config = complete();
            clear(&mut config);
            match config.validate() {
                Err(ConfigError::Missing(missing)) => assert_eq!(missing, name),
                other => panic!("Expected Missing({name}), got {other:?}"),
            }
        }
    }

    #[test]
    fn zero_segment_count_is_rejected() {
        let mut config = complete();
        config.segment_count = Some(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "segment-count",
                ..
            })
        ));
    }

    #[test]
    fn zero_round_size_and_blank_command_are_rejected() {
        let mut config = complete();
        config.round_size = Some(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "size", .. })
        ));

        let mut config = complete();
        config.target_command = Some("   ".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "cmd", .. })
        ));
    }

    #[test]
    fn parses_toml_with_engine_overrides() {
        let config: LevyConfig = toml::from_str(
            r#"
            seed = "seed.bin"
            output-dir = "out"
            round-size = 64
            target-command = "./target @@"
            segment-count = 8
            showmap-path = "afl-showmap"

            [engine]
            bias1 = 2.5
            rng-seed = 1234
            "#,
        )
        .unwrap();

        let run = config.validate().unwrap();
        assert_eq!(run.round_size, 64);
        assert_eq!(run.bias1, 2.5);
        assert_eq!(run.bias2, 3.0);
        assert_eq!(run.rng_seed, Some(1234));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed: Result<LevyConfig, _> = toml::from_str("seed = \"a\"\nmystery = 1\n");
        assert!(parsed.is_err());
    }

    #[test]
    fn load_from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("levyfuzz.toml");
        std::fs::write(&path, "round-size = 12\n[engine]\ntimeout-ms = 500\n").unwrap();

        let config = LevyConfig::load_from_file(&path).unwrap();
        assert_eq!(config.round_size, Some(12));
        assert_eq!(config.engine.timeout_ms, 500);
        assert!(LevyConfig::load_from_file(&dir.path().join("absent.toml")).is_err());
    }

    #[test]
    fn prepare_output_dir_creates_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = complete();
        config.output_dir = Some(dir.path().join("a/b/out"));

        let run = config.validate().unwrap();
        run.prepare_output_dir().unwrap();
        assert!(run.output_dir.is_dir());
    }
}
