use crate::coverage::CoverageSet;
use crate::testcase::{HasCoverage, TestCase};

/// The append-only record of every test case generated during a run, together
/// with the baseline coverage they have revealed.
///
/// Entries are never removed or reordered. The baseline is the union of the
/// coverage of every executed entry and therefore only grows. Both are owned
/// by a single writer (the fuzz loop), which updates them in one step per round
/// through [`Corpus::absorb`].
#[derive(Debug, Default)]
pub struct Corpus {
    entries: Vec<TestCase>,
    baseline: CoverageSet,
}

impl Corpus {
    /// Creates a corpus holding only `seed`.
    ///
    /// If the seed has already been executed its coverage becomes the initial baseline.
    pub fn with_seed(seed: TestCase) -> Self {
        let mut corpus = Self::default();
        corpus.absorb(vec![seed]);
        corpus
    }

    /// Folds the coverage of every test case in `batch` into the baseline,
    /// then appends the batch in generation order.
    ///
    /// Returns the number of points the baseline grew by.
    pub fn absorb(&mut self, batch: Vec<TestCase>) -> usize {
        let before = self.baseline.len();
        for coverage in batch.iter().filter_map(|test_case| test_case.coverage()) {
            self.baseline.extend(coverage.iter());
        }
        self.entries.extend(batch);
        self.baseline.len() - before
    }

    /// The most recently appended entry, used as the next seed.
    pub fn newest(&self) -> Option<&TestCase> {
        self.entries.last()
    }

    pub fn get(&self, id: usize) -> Option<&TestCase> {
        self.entries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestCase> {
        self.entries.iter()
    }

    pub fn baseline(&self) -> &CoverageSet {
        &self.baseline
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
