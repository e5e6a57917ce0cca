use crate::coverage::{CoverageSet, difference_count};
use crate::testcase::HasCoverage;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FeedbackError {
    #[error("Unable to determine score: no coverage data provided (insufficient data, not a zero score)")]
    InsufficientData,
    #[error("Unable to determine score: batch entry {0} has not been executed")]
    Unexecuted(usize),
}

/// Average number of points each batch entry reveals beyond `baseline`,
/// truncated toward zero.
///
/// The sum is order-independent, so the batch may have been executed in any order.
pub fn score<C: HasCoverage>(batch: &[C], baseline: &CoverageSet) -> Result<i64, FeedbackError> {
    if batch.is_empty() {
        return Err(FeedbackError::InsufficientData);
    }

    let mut sum_differences: u64 = 0;
    for (index, item) in batch.iter().enumerate() {
        let coverage = item.coverage().ok_or(FeedbackError::Unexecuted(index))?;
        sum_differences += difference_count(coverage, baseline) as u64;
    }

    Ok((sum_differences / batch.len() as u64) as i64)
}

/// Union of the coverage of every executed item; unexecuted items contribute nothing.
pub fn compile_coverage<C: HasCoverage>(items: &[C]) -> CoverageSet {
    let mut compiled = CoverageSet::empty();
    for coverage in items.iter().filter_map(|item| item.coverage()) {
        compiled.extend(coverage.iter());
    }
    compiled
}
