use crate::observer::{CoverageMapError, map_path_for, read_coverage_map};
use crate::testcase::TestCase;
use log::debug;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;

/// Placeholder in the target command that is replaced by the candidate's path.
pub const INPUT_PLACEHOLDER: &str = "@@";

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Failed to spawn coverage tool {tool:?}: {source}")]
    Spawn {
        tool: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Coverage tool failed on {input:?}: {status}")]
    Failed { input: PathBuf, status: ExitStatus },
    #[error("Error collecting coverage data: {0}")]
    CoverageMap(#[from] CoverageMapError),
}

/// Runs a test case against the target and records the coverage it reached.
pub trait Executor {
    /// On success the test case's coverage has been assigned.
    fn execute(&mut self, test_case: &mut TestCase) -> Result<(), ExecutorError>;
}

pub struct ShowmapExecutorConfig {
    /// Path to the `afl-showmap` binary.
    pub showmap_path: PathBuf,
    /// Target command line; `@@` marks where the input path goes.
    pub command: Vec<String>,
    pub timeout: Duration,
    pub memory_limit_mb: u64,
}

/// Collects coverage by running the target under `afl-showmap`, which writes
/// one `<id>:<hits>` record per reached edge to `<input>.map`.
///
/// Timeouts and memory limits are enforced by the tool itself.
pub struct ShowmapExecutor {
    config: ShowmapExecutorConfig,
}

impl ShowmapExecutor {
    pub fn new(config: ShowmapExecutorConfig) -> Self {
        Self { config }
    }

    fn build_command(&self, test_case: &TestCase) -> Command {
        let input = test_case.path().to_string_lossy();
        let map_path = map_path_for(test_case.path());

        let mut cmd = Command::new(&self.config.showmap_path);
        cmd.arg("-t")
            .arg(self.config.timeout.as_millis().to_string())
            .arg("-m")
            .arg(self.config.memory_limit_mb.to_string())
            .arg("-o")
            .arg(map_path)
            .arg("-q")
            .arg("-e")
            .arg("--");
        for part in &self.config.command {
            cmd.arg(part.replace(INPUT_PLACEHOLDER, &input));
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }
}

impl Executor for ShowmapExecutor {
    fn execute(&mut self, test_case: &mut TestCase) -> Result<(), ExecutorError> {
        let status = self
            .build_command(test_case)
            .status()
            .map_err(|source| ExecutorError::Spawn {
                tool: self.config.showmap_path.clone(),
                source,
            })?;

        if !status.success() {
            return Err(ExecutorError::Failed {
                input: test_case.path().to_path_buf(),
                status,
            });
        }

        let coverage = read_coverage_map(&map_path_for(test_case.path()))?;
        debug!("{:?} reached {} points", test_case.path(), coverage.len());
        test_case.set_coverage(coverage);
        Ok(())
    }
}
