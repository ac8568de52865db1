//! Target × profile matrix and its resolution into work items

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A single (target, profile) pair, the unit of orchestration
///
/// Ordering is lexicographic by target, then by profile.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkItem {
    pub target: String,
    pub profile: String,
}

impl WorkItem {
    pub fn new(target: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            profile: profile.into(),
        }
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.target, self.profile)
    }
}

/// Mapping from target name to the set of profiles it is built with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matrix {
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl Matrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add profiles to a target, keeping the profiles it already has
    pub fn insert<I, S>(&mut self, target: impl Into<String>, profiles: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .entry(target.into())
            .or_default()
            .extend(profiles.into_iter().map(Into::into));
    }

    /// Union another matrix into this one; shared targets get the union of both profile sets
    pub fn merge(&mut self, other: &Matrix) {
        for (target, profiles) in &other.entries {
            self.insert(target.clone(), profiles.iter().cloned());
        }
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Profiles declared for `target`, if the target exists
    pub fn profiles_of(&self, target: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(target)
    }

    /// Every distinct profile used by any target
    pub fn profiles(&self) -> BTreeSet<&str> {
        self.entries
            .values()
            .flat_map(|profiles| profiles.iter().map(String::as_str))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.entries.iter().map(|(t, p)| (t.as_str(), p))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of (target, profile) pairs in the matrix
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }

    /// Compute the work items selected by `filter`
    ///
    /// A pair is selected iff its target passes the target filter, its profile
    /// passes the profile filter, and the profile is declared for that target.
    /// An empty filter set selects everything. The result is sorted.
    pub fn resolve(&self, filter: &MatrixFilter) -> Vec<WorkItem> {
        let mut items = Vec::new();
        for (target, profiles) in &self.entries {
            if !filter.accepts_target(target) {
                continue;
            }
            for profile in profiles {
                if filter.accepts_profile(profile) {
                    items.push(WorkItem::new(target.clone(), profile.clone()));
                }
            }
        }
        items
    }
}

impl<T, S> FromIterator<(T, S)> for Matrix
where
    T: Into<String>,
    S: IntoIterator,
    S::Item: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (T, S)>>(iter: I) -> Self {
        let mut matrix = Matrix::new();
        for (target, profiles) in iter {
            matrix.insert(target, profiles);
        }
        matrix
    }
}

/// Caller-supplied target and profile filters
///
/// Each set is independent; an empty set means "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatrixFilter {
    pub targets: BTreeSet<String>,
    pub profiles: BTreeSet<String>,
}

impl MatrixFilter {
    pub fn new<T, P>(targets: T, profiles: P) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            profiles: profiles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.targets.insert(target.into());
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profiles.insert(profile.into());
        self
    }

    pub fn accepts_target(&self, target: &str) -> bool {
        self.targets.is_empty() || self.targets.contains(target)
    }

    pub fn accepts_profile(&self, profile: &str) -> bool {
        self.profiles.is_empty() || self.profiles.contains(profile)
    }
}
