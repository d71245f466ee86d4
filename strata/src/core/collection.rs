//! Partitioning a cube stream by constraint, and merging each partition.

use crate::constraints::{Constraint, Constraints};
use crate::core::merge::Merge;
use crate::core::Cube;
use crate::prelude::*;
use tracing::debug;

/// A constraint together with the cubes currently matching it.
#[derive(Debug, Clone)]
pub struct ConstraintPair {
    pub constraint: Constraint,
    pub cubes: Vec<Cube>,
}

impl ConstraintPair {
    pub fn new(constraint: Constraint) -> Self {
        Self {
            constraint,
            cubes: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cubes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cubes.is_empty()
    }
}

/// An ordered sequence of [`ConstraintPair`]s, one per supplied constraint.
#[derive(Debug, Clone, Default)]
pub struct FilterCollection {
    pairs: Vec<ConstraintPair>,
}

impl FilterCollection {
    /// Classifies every cube of `cubes` against every constraint.
    ///
    /// Cubes are pulled one at a time; each is tested against all
    /// constraints, in order, before the next is pulled. A cube is appended
    /// to every pair whose constraint it satisfies. The first error from the
    /// stream aborts the partition.
    pub fn from_cubes<I>(cubes: I, constraints: impl Into<Constraints>) -> Result<Self>
    where
        I: IntoIterator<Item = Result<Cube>>,
    {
        let mut pairs: Vec<ConstraintPair> = constraints
            .into()
            .into_iter()
            .map(ConstraintPair::new)
            .collect();

        for cube in cubes {
            let cube = cube?;
            let hits: Vec<usize> = pairs
                .iter()
                .enumerate()
                .filter(|(_, pair)| pair.constraint.matches(&cube))
                .map(|(i, _)| i)
                .collect();
            debug!(cube = %cube, matches = hits.len(), "Partitioned cube");

            if let Some((&last, rest)) = hits.split_last() {
                for &i in rest {
                    pairs[i].cubes.push(cube.clone());
                }
                pairs[last].cubes.push(cube);
            }
        }

        Ok(Self { pairs })
    }

    pub fn pairs(&self) -> &[ConstraintPair] {
        &self.pairs
    }

    /// Merges each pair's cubes independently with `merger`.
    ///
    /// Pair order and constraints are unchanged.
    pub fn merged(self, merger: &dyn Merge) -> Result<Self> {
        let pairs = self
            .pairs
            .into_iter()
            .map(|pair| {
                let before = pair.cubes.len();
                let cubes = merger.merge(pair.cubes)?;
                debug!(
                    constraint = %pair.constraint,
                    before,
                    after = cubes.len(),
                    "Merged constraint pair"
                );
                Ok(ConstraintPair {
                    constraint: pair.constraint,
                    cubes,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { pairs })
    }

    /// Pairs whose cube count is not exactly one.
    pub fn mismatched(&self) -> Vec<&ConstraintPair> {
        self.pairs.iter().filter(|pair| pair.len() != 1).collect()
    }

    /// Total number of cubes across all pairs.
    pub fn len(&self) -> usize {
        self.pairs.iter().map(ConstraintPair::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenates every pair's cubes in pair order.
    ///
    /// A cube held by several pairs appears once per pair.
    pub fn cubes(self) -> Vec<Cube> {
        self.pairs.into_iter().flat_map(|pair| pair.cubes).collect()
    }
}
