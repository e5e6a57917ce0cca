use std::collections::HashSet;
use std::fmt;

/// Identifier of a single instrumentation point reported by the coverage tool.
pub type PointId = i64;

/// The set of instrumentation points reached by one or more executions.
///
/// A `CoverageSet` only ever grows: points are added with [`CoverageSet::add`]
/// or merged in with [`CoverageSet::union`]. Set algebra is value-producing, so
/// `union` leaves both operands untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageSet {
    points: HashSet<PointId>,
}

impl CoverageSet {
    /// Builds a set from any sequence of point identifiers, dropping duplicates.
    pub fn new<T: IntoIterator<Item = PointId>>(ids: T) -> Self {
        Self {
            points: ids.into_iter().collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Inserts `id`; adding a point that is already present is a no-op.
    pub fn add(&mut self, id: PointId) {
        self.points.insert(id);
    }

    pub fn contains(&self, id: PointId) -> bool {
        self.points.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = PointId> + '_ {
        self.points.iter().copied()
    }

    /// Returns `self ∪ other` as a new set.
    pub fn union(&self, other: &CoverageSet) -> CoverageSet {
        let mut points = HashSet::with_capacity(self.points.len().max(other.points.len()));
        points.extend(self.points.iter().copied());
        points.extend(other.points.iter().copied());
        CoverageSet { points }
    }
}

/// Number of points present in `a` but absent from `b`.
///
/// Equal to `|a ∪ b| - |b|`, computed here as `|a \ b|` without building the union.
pub fn difference_count(a: &CoverageSet, b: &CoverageSet) -> usize {
    a.points.difference(&b.points).count()
}

impl FromIterator<PointId> for CoverageSet {
    fn from_iter<T: IntoIterator<Item = PointId>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl Extend<PointId> for CoverageSet {
    fn extend<T: IntoIterator<Item = PointId>>(&mut self, iter: T) {
        self.points.extend(iter);
    }
}

impl fmt::Display for CoverageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<PointId> = self.iter().collect();
        ids.sort_unstable();
        write!(f, "<Coverage values={ids:?}>")
    }
}
