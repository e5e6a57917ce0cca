use crate::controller::{AdaptiveController, MutationParameters};
use crate::corpus::Corpus;
use crate::coverage::CoverageSet;
use crate::executor::{Executor, ExecutorError};
use crate::feedback::{FeedbackError, score};
use crate::mutator::{Mutator, MutatorError};
use crate::testcase::{HasCoverage, TestCase};
use log::info;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FuzzError {
    #[error("Unable to create test cases: {0}")]
    Mutation(#[from] MutatorError),
    #[error("Unable to execute test case: {0}")]
    Execution(#[from] ExecutorError),
    #[error("Unable to evaluate test cases: {0}")]
    Evaluation(#[from] FeedbackError),
    #[error("Corpus is empty, no seed to mutate")]
    EmptyCorpus,
}

/// What happened in one round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
    pub round: u64,
    pub score: i64,
    /// Parameters that the next round will use.
    pub params: MutationParameters,
    pub baseline_growth: usize,
    pub baseline_len: usize,
    pub corpus_len: usize,
}

/// Drives the generate → execute → score → adapt → absorb cycle.
///
/// The loop has no termination criterion of its own; [`Fuzzer::run`] keeps
/// going until the stop flag is raised or a round fails.
pub struct Fuzzer<M: Mutator, E: Executor> {
    mutator: M,
    executor: E,
    controller: AdaptiveController,
    params: MutationParameters,
    corpus: Corpus,
    output_dir: PathBuf,
    round_size: usize,
    rounds: u64,
}

impl<M: Mutator, E: Executor> Fuzzer<M, E> {
    /// Executes `seed` to obtain the starting baseline and sets up the loop.
    pub fn bootstrap(
        mutator: M,
        mut executor: E,
        controller: AdaptiveController,
        params: MutationParameters,
        mut seed: TestCase,
        output_dir: PathBuf,
        round_size: usize,
    ) -> Result<Self, FuzzError> {
        executor.execute(&mut seed)?;
        info!(
            "Seed {:?} reached {} points",
            seed.path(),
            seed.coverage().map_or(0, CoverageSet::len)
        );

        Ok(Self {
            mutator,
            executor,
            controller,
            params,
            corpus: Corpus::with_seed(seed),
            output_dir,
            round_size,
            rounds: 0,
        })
    }

    /// Runs a single round against the newest corpus entry.
    pub fn run_round(&mut self) -> Result<RoundReport, FuzzError> {
        let seed = self.corpus.newest().ok_or(FuzzError::EmptyCorpus)?;
        let batch = self
            .mutator
            .generate(seed, &self.output_dir, &self.params, self.round_size)?;
        self.params.offset = batch.final_offset;

        let mut test_cases = batch.test_cases;
        for test_case in test_cases.iter_mut() {
            self.executor.execute(test_case)?;
        }

        let score = score(&test_cases, self.corpus.baseline())?;
        self.controller.adapt(score, &mut self.params);
        let baseline_growth = self.corpus.absorb(test_cases);
        self.rounds += 1;

        let report = RoundReport {
            round: self.rounds,
            score,
            params: self.params,
            baseline_growth,
            baseline_len: self.corpus.baseline().len(),
            corpus_len: self.corpus.len(),
        };
        info!(
            "round {} score {} a1 {:.4} a2 {:.4} offset {} baseline {} (+{}) corpus {}",
            report.round,
            report.score,
            report.params.offset_diffusivity,
            report.params.byte_diffusivity,
            report.params.offset,
            report.baseline_len,
            report.baseline_growth,
            report.corpus_len
        );
        Ok(report)
    }

    /// Runs rounds until `stop` is set, checking it before each round.
    ///
    /// Returns the number of rounds completed by this call. Any failure aborts
    /// the run; nothing is retried.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<u64, FuzzError> {
        let mut completed = 0;
        while !stop.load(Ordering::Relaxed) {
            self.run_round()?;
            completed += 1;
        }
        info!(
            "Stopped after {} rounds, corpus holds {} test cases covering {} points",
            self.rounds,
            self.corpus.len(),
            self.corpus.baseline().len()
        );
        Ok(completed)
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn params(&self) -> &MutationParameters {
        &self.params
    }

    pub fn rounds(&self) -> u64 {
        self.rounds
    }
}
