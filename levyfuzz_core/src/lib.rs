//! Coverage-guided mutation engine driven by Lévy flights.
//!
//! Each round copies the newest corpus entry, mutates one segment per copy,
//! runs every copy through an external coverage tool, scores the batch by how
//! much new coverage it reveals, and retunes mutation aggressiveness from that
//! score.

pub mod config;
pub mod controller;
pub mod corpus;
pub mod coverage;
pub mod executor;
pub mod feedback;
pub mod fuzzer;
pub mod mutator;
pub mod observer;
pub mod testcase;

pub use config::{ConfigError, LevyConfig, RunConfig};
pub use controller::{AdaptiveController, MutationParameters, update_parameters};
pub use corpus::Corpus;
pub use coverage::{CoverageSet, PointId, difference_count};
pub use executor::{Executor, ExecutorError, ShowmapExecutor, ShowmapExecutorConfig};
pub use feedback::{FeedbackError, compile_coverage, score};
pub use fuzzer::{FuzzError, Fuzzer, RoundReport};
pub use mutator::{GeneratedBatch, LevyFlightMutator, Mutator, MutatorError, flight, wrap};
pub use observer::{CoverageMapError, read_coverage_map};
pub use testcase::{HasCoverage, TestCase, TestCaseError};
