use crate::controller::MutationParameters;
use crate::testcase::{TestCase, TestCaseError};
use log::debug;
use rand::Rng;
use rand::distr::{Alphanumeric, Distribution};
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Length of generated test case file names.
pub const FILENAME_LEN: usize = 10;

/// Largest step a single byte mutation can take.
const MAX_BYTE_STEP: i64 = 255;

#[derive(Error, Debug)]
pub enum MutatorError {
    #[error("Unable to copy seed {seed:?} to {destination:?}: {source}")]
    Duplicate {
        seed: PathBuf,
        destination: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to create new test case: {0}")]
    TestCase(#[from] TestCaseError),
    #[error("Unable to mutate test case {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Segment {offset} of {path:?} is empty")]
    EmptySegment { path: PathBuf, offset: u64 },
}

/// Output of one batch: the new test cases and where the offset cursor ended up.
#[derive(Debug)]
pub struct GeneratedBatch {
    pub test_cases: Vec<TestCase>,
    pub final_offset: u64,
}

/// Produces batches of mutated test cases from a seed.
pub trait Mutator {
    /// Derives `count` new test cases from `seed`, writing them under `output_dir`.
    ///
    /// The offset cursor starts at `params.offset`; the returned
    /// [`GeneratedBatch::final_offset`] is meant to be carried into the next call.
    fn generate(
        &mut self,
        seed: &TestCase,
        output_dir: &Path,
        params: &MutationParameters,
        count: usize,
    ) -> Result<GeneratedBatch, MutatorError>;
}

/// Mutates one segment per copy of the seed, with both the segment drift and
/// the byte step drawn from a Lévy flight.
///
/// The random source is owned by the mutator so a run can be replayed from a
/// fixed RNG seed.
pub struct LevyFlightMutator<R: Rng> {
    rng: R,
}

impl<R: Rng> LevyFlightMutator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Generates `count` test cases from `seed`.
    ///
    /// For every copy the cursor first drifts by `flight(segment_count, a1)` and
    /// is wrapped into `[0, segment_count)`, then the segment under the cursor
    /// is mutated with diffusivity `a2`. The first failure aborts the batch.
    pub fn generate_batch(
        &mut self,
        seed: &TestCase,
        output_dir: &Path,
        a1: f64,
        a2: f64,
        start_offset: u64,
        count: usize,
    ) -> Result<GeneratedBatch, MutatorError> {
        let segment_count = seed.segment_count() as i64;
        let mut offset = start_offset as i64;
        let mut test_cases = Vec::with_capacity(count);

        for _ in 0..count {
            offset += flight(&mut self.rng, segment_count, a1);
            offset = wrap(offset, segment_count - 1);

            let destination = random_filename(&mut self.rng, output_dir);
            fs::copy(seed.path(), &destination).map_err(|source| MutatorError::Duplicate {
                seed: seed.path().to_path_buf(),
                destination: destination.clone(),
                source,
            })?;

            let test_case = TestCase::new(destination, seed.segment_count())?;
            self.mutate_segment(&test_case, offset as u64, a2)?;
            debug!(
                "Generated {:?} (segment {}/{})",
                test_case.path(),
                offset,
                segment_count
            );
            test_cases.push(test_case);
        }

        Ok(GeneratedBatch {
            test_cases,
            final_offset: wrap(offset, segment_count - 1) as u64,
        })
    }

    /// Adds a Lévy-flight step to the last byte of segment `offset`, rippling
    /// any carry or borrow toward the start of the segment, and writes the
    /// segment back in place.
    pub fn mutate_segment(
        &mut self,
        test_case: &TestCase,
        offset: u64,
        diffusivity: f64,
    ) -> Result<(), MutatorError> {
        let path = test_case.path();
        let io_error = |source| MutatorError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(io_error)?;

        let start = offset * test_case.segment_size();
        file.seek(SeekFrom::Start(start)).map_err(io_error)?;
        let mut segment = Vec::with_capacity(test_case.segment_size() as usize);
        (&mut file)
            .take(test_case.segment_size())
            .read_to_end(&mut segment)
            .map_err(io_error)?;

        let Some(&anchor) = segment.last() else {
            return Err(MutatorError::EmptySegment {
                path: path.to_path_buf(),
                offset,
            });
        };

        let value = i64::from(anchor) + flight(&mut self.rng, MAX_BYTE_STEP, diffusivity);
        apply_with_carry(&mut segment, value);

        file.seek(SeekFrom::Start(start)).map_err(io_error)?;
        file.write_all(&segment).map_err(io_error)?;
        Ok(())
    }
}

impl<R: Rng> Mutator for LevyFlightMutator<R> {
    fn generate(
        &mut self,
        seed: &TestCase,
        output_dir: &Path,
        params: &MutationParameters,
        count: usize,
    ) -> Result<GeneratedBatch, MutatorError> {
        self.generate_batch(
            seed,
            output_dir,
            params.offset_diffusivity,
            params.byte_diffusivity,
            params.offset,
            count,
        )
    }
}

/// Samples a signed power-law step with magnitude in `[1, max_val]`.
///
/// With `d = diffusivity + 1`, `u` is drawn uniformly between `1^-d` and
/// `max_val^-d` and the magnitude is `u^(-1/d)`: small steps are common and
/// large ones rare. The sign is a fair coin.
pub fn flight<R: Rng + ?Sized>(rng: &mut R, max_val: i64, diffusivity: f64) -> i64 {
    let d = diffusivity + 1.0;
    let lo = 1f64.powf(-d);
    let hi = (max_val as f64).powf(-d);

    let u = rng.random::<f64>() * (hi - lo) + lo;
    // Rounding in powf can land a hair above max_val.
    let magnitude = (u.powf(-1.0 / d) as i64).min(max_val);
    if rng.random_bool(0.5) {
        -magnitude
    } else {
        magnitude
    }
}

/// Folds `value` into the closed interval `[0, max]`, as if by repeatedly
/// adding or subtracting `max + 1`.
pub fn wrap(value: i64, max: i64) -> i64 {
    value.rem_euclid(max + 1)
}

/// Stores `value` into the last byte of `segment`, propagating overflow or
/// underflow into earlier bytes like a multi-byte add with carry.
///
/// A carry out of the first byte is dropped. An empty segment is left as is.
pub fn apply_with_carry(segment: &mut [u8], mut value: i64) {
    let Some(mut index) = segment.len().checked_sub(1) else {
        return;
    };

    loop {
        if (0..=255).contains(&value) {
            segment[index] = value as u8;
            return;
        }
        segment[index] = wrap(value, 255) as u8;
        if index == 0 {
            return;
        }

        let carry = if value > 255 { 1 } else { -1 };
        index -= 1;
        value = i64::from(segment[index]) + carry;
    }
}

/// Random `FILENAME_LEN`-character alphanumeric path inside `directory`.
/// Collisions are not checked.
pub fn random_filename<R: Rng + ?Sized>(rng: &mut R, directory: &Path) -> PathBuf {
    let name: String = (0..FILENAME_LEN)
        .map(|_| char::from(Alphanumeric.sample(rng)))
        .collect();
    directory.join(name)
}
