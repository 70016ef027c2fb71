use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

/// Opaque label of a chemical species.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Species(String);

impl Species {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Species {
    fn from(label: &str) -> Self {
        Self(label.to_owned())
    }
}

impl From<String> for Species {
    fn from(label: String) -> Self {
        Self(label)
    }
}

impl Borrow<str> for Species {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Population counts keyed by species.
///
/// Iteration follows species order, so `counts()` rows from two states over
/// the same species line up column for column.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChemicalState {
    counts: BTreeMap<Species, u64>,
}

impl ChemicalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`ChemicalState::insert`].
    pub fn with(mut self, species: impl Into<Species>, count: u64) -> Self {
        self.insert(species, count);
        self
    }

    /// Sets the count of `species`, returning the previous count if any.
    pub fn insert(&mut self, species: impl Into<Species>, count: u64) -> Option<u64> {
        self.counts.insert(species.into(), count)
    }

    pub fn get(&self, species: &str) -> Option<u64> {
        self.counts.get(species).copied()
    }

    /// Count of `species`, treating unknown species as absent (zero).
    pub fn count(&self, species: &str) -> u64 {
        self.get(species).unwrap_or(0)
    }

    pub fn contains(&self, species: &str) -> bool {
        self.counts.contains_key(species)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Species, u64)> + '_ {
        self.counts.iter().map(|(species, &count)| (species, count))
    }

    pub fn species(&self) -> impl Iterator<Item = &Species> + '_ {
        self.counts.keys()
    }

    /// Counts in species order.
    pub fn counts(&self) -> Vec<u64> {
        self.counts.values().copied().collect()
    }

    /// Weighted total `Σ w·count` for a declared conservation law. Species
    /// missing from the state contribute nothing.
    pub fn weighted_sum(&self, weights: &[(&str, i64)]) -> i128 {
        weights
            .iter()
            .map(|&(species, weight)| i128::from(weight) * i128::from(self.count(species)))
            .sum()
    }

    pub(crate) fn slot_mut(&mut self, species: &str) -> Option<&mut u64> {
        self.counts.get_mut(species)
    }

    /// Overwrites every count with the one in `source`, reusing this map's
    /// storage when both states cover the same species.
    pub(crate) fn copy_from(&mut self, source: &ChemicalState) {
        if self.counts.len() == source.counts.len()
            && self.counts.keys().eq(source.counts.keys())
        {
            for (dst, &src) in self.counts.values_mut().zip(source.counts.values()) {
                *dst = src;
            }
        } else {
            self.counts.clone_from(&source.counts);
        }
    }
}

impl<S: Into<Species>> FromIterator<(S, u64)> for ChemicalState {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        Self {
            counts: iter
                .into_iter()
                .map(|(species, count)| (species.into(), count))
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ChemicalState {
    type Item = (&'a Species, &'a u64);
    type IntoIter = btree_map::Iter<'a, Species, u64>;

    fn into_iter(self) -> Self::IntoIter {
        self.counts.iter()
    }
}
