use crate::coverage::CoverageSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestCaseError {
    #[error("Segment count must be greater than 0")]
    InvalidSegmentCount,
    #[error("Unable to access test case {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The content is shorter than the segment count, which would make every segment empty.
    #[error("Test case {path:?} is {len} bytes, too short for {segment_count} segments")]
    EmptySegment {
        path: PathBuf,
        len: u64,
        segment_count: u64,
    },
}

/// Anything that can report the coverage it produced.
///
/// Scoring only needs this capability, so test doubles and plain
/// [`CoverageSet`]s can be scored alongside real test cases.
pub trait HasCoverage {
    /// `None` until the item has been executed.
    fn coverage(&self) -> Option<&CoverageSet>;
}

impl HasCoverage for CoverageSet {
    fn coverage(&self) -> Option<&CoverageSet> {
        Some(self)
    }
}

/// A candidate input backed by a file on disk.
///
/// The content is split into `segment_count` equal-size segments of
/// `floor(len / segment_count)` bytes; a trailing remainder is never mutated.
#[derive(Debug, Clone)]
pub struct TestCase {
    path: PathBuf,
    segment_count: u64,
    segment_size: u64,
    coverage: Option<CoverageSet>,
}

impl TestCase {
    /// Creates a test case over an existing, readable file.
    pub fn new(path: impl Into<PathBuf>, segment_count: u64) -> Result<Self, TestCaseError> {
        let path = path.into();
        if segment_count == 0 {
            return Err(TestCaseError::InvalidSegmentCount);
        }

        // Opening (not just stat-ing) checks that the content is readable.
        let file = fs::File::open(&path).map_err(|source| TestCaseError::Io {
            path: path.clone(),
            source,
        })?;
        let len = file
            .metadata()
            .map_err(|source| TestCaseError::Io {
                path: path.clone(),
                source,
            })?
            .len();

        let segment_size = len / segment_count;
        if segment_size == 0 {
            return Err(TestCaseError::EmptySegment {
                path,
                len,
                segment_count,
            });
        }

        Ok(Self {
            path,
            segment_count,
            segment_size,
            coverage: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn segment_count(&self) -> u64 {
        self.segment_count
    }

    pub fn segment_size(&self) -> u64 {
        self.segment_size
    }

    pub fn is_executed(&self) -> bool {
        self.coverage.is_some()
    }

    /// Records the coverage observed when this test case was executed.
    pub fn set_coverage(&mut self, coverage: CoverageSet) {
        self.coverage = Some(coverage);
    }
}

impl HasCoverage for TestCase {
    fn coverage(&self) -> Option<&CoverageSet> {
        self.coverage.as_ref()
    }
}
