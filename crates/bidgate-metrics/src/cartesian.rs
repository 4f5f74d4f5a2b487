// Copyright (C) 2026  winnyboy5
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! Cartesian expansion of label dimensions
//!
//! Expansion order is fixed: the outer loop runs over the assignments built
//! so far, the inner loop over the new dimension's domain. The position of an
//! assignment is therefore the mixed-radix number formed by its value
//! ordinals, most significant dimension first.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::labels::LabelDimension;

/// One value per dimension, in declared order
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LabelAssignment {
    pairs: Vec<(&'static str, &'static str)>,
}

impl LabelAssignment {
    /// Copy of `self` extended with one more pair
    pub fn with(&self, name: &'static str, value: &'static str) -> Self {
        let mut pairs = Vec::with_capacity(self.pairs.len() + 1);
        pairs.extend_from_slice(&self.pairs);
        pairs.push((name, value));
        Self { pairs }
    }

    /// Value bound to `name`
    pub fn get(&self, name: &str) -> Option<&'static str> {
        self.pairs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs in dimension order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.pairs.iter().copied()
    }

    /// Label map in the shape the prometheus client takes
    pub fn to_map(&self) -> HashMap<&'static str, &'static str> {
        self.pairs.iter().copied().collect()
    }

    /// True when every `(name, value)` in `wanted` is bound here
    pub fn matches(&self, wanted: &[(&str, &str)]) -> bool {
        wanted.len() == self.pairs.len()
            && wanted
                .iter()
                .all(|(name, value)| self.get(name) == Some(*value))
    }
}

/// Extend every assignment in `set` with each value of `dimension`
pub fn add_dimension(set: &[LabelAssignment], dimension: &LabelDimension) -> Vec<LabelAssignment> {
    let mut out = Vec::with_capacity(set.len() * dimension.len());
    for assignment in set {
        for value in dimension.domain() {
            out.push(assignment.with(dimension.name(), value));
        }
    }
    out
}

/// Full expansion from scratch.
///
/// No dimensions yields exactly one empty assignment; an empty domain
/// anywhere yields nothing.
pub fn cartesian(dimensions: &[LabelDimension]) -> Vec<LabelAssignment> {
    dimensions
        .iter()
        .fold(vec![LabelAssignment::default()], |set, dimension| {
            add_dimension(&set, dimension)
        })
}

/// Caching expander that starts each family from the longest prefix of
/// dimensions it has already expanded
#[derive(Debug, Default)]
pub struct Materializer {
    cache: HashMap<Vec<LabelDimension>, Arc<Vec<LabelAssignment>>>,
    reused: usize,
}

impl Materializer {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every assignment over `dimensions`, in cartesian order
    pub fn expand(&mut self, dimensions: &[LabelDimension]) -> Arc<Vec<LabelAssignment>> {
        if let Some(done) = self.cache.get(dimensions) {
            self.reused += 1;
            return Arc::clone(done);
        }

        let (start, mut set) = (1..dimensions.len())
            .rev()
            .find_map(|k| {
                self.cache
                    .get(&dimensions[..k])
                    .map(|prefix| (k, prefix.as_ref().clone()))
            })
            .unwrap_or_else(|| (0, vec![LabelAssignment::default()]));

        if start > 0 {
            self.reused += 1;
            debug!(
                prefix = start,
                dimensions = dimensions.len(),
                "Reusing cached label expansion"
            );
        }

        for (k, dimension) in dimensions.iter().enumerate().skip(start) {
            set = add_dimension(&set, dimension);
            if k + 1 < dimensions.len() {
                self.cache
                    .insert(dimensions[..=k].to_vec(), Arc::new(set.clone()));
            }
        }

        let set = Arc::new(set);
        self.cache.insert(dimensions.to_vec(), Arc::clone(&set));
        set
    }

    /// Number of expansions that started from a cached prefix
    pub fn reused(&self) -> usize {
        self.reused
    }

    /// Number of cached dimension sequences
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
