//
// coordination.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use std::ops::Index;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::cluster::AtomType;
use crate::error::ExchangeError;
use crate::neighbor::NeighborGraph;

/// The number of neighbors of each atom which have a different type
///
/// For every atom `i` the tracker maintains
///
/// `counts[i] == |{ j in neighbors(i) : types[j] != types[i] }|`
///
/// which can either be computed from scratch with [`CoordinationTracker::recompute`], or kept up
/// to date after exchanging the types of two atoms with [`CoordinationTracker::apply_swap`].
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinationTracker {
    counts: Vec<usize>,
}

impl CoordinationTracker {
    pub fn recompute(graph: &NeighborGraph, types: &[AtomType]) -> Self {
        let counts = graph
            .iter()
            .enumerate()
            .map(|(i, list)| local_count(types, types[i], list))
            .collect();
        Self { counts }
    }

    /// Update the counts after the types of atoms `i` and `j` have been exchanged
    ///
    /// `types` is the typing *after* the exchange. Only `i`, `j` and their neighbors are
    /// modified, taking O(deg(i) + deg(j)) time. A typing which isn't an exchange of the tracked
    /// typing can drive a count below zero, which is an error leaving the counts unchanged.
    ///
    pub fn apply_swap(
        &mut self,
        i: usize,
        j: usize,
        graph: &NeighborGraph,
        types: &[AtomType],
    ) -> Result<(), ExchangeError> {
        let atoms = self.counts.len();
        if i == j || i >= atoms || j >= atoms || graph.len() != atoms || types.len() != atoms {
            return Err(ExchangeError::InvalidSwapIndices { i, j, atoms });
        }
        // Exchanging identical types changes nothing
        if types[i] == types[j] {
            return Ok(());
        }

        // After the exchange the previous type of `i` is the current type of `j`
        let mut changes = neighbor_changes(i, j, types[j], graph, types);
        changes.extend(neighbor_changes(j, i, types[i], graph, types));
        changes.sort_unstable_by_key(|&(k, _)| k);

        // No count is written until every change is valid
        let mut updated = Vec::with_capacity(changes.len());
        for (k, group) in &changes.into_iter().group_by(|&(k, _)| k) {
            let delta: isize = group.map(|(_, d)| d).sum();
            let count = self.counts[k] as isize + delta;
            if count < 0 {
                return Err(ExchangeError::InvalidSwapIndices { i, j, atoms });
            }
            updated.push((k, count as usize));
        }
        for (k, count) in updated {
            self.counts[k] = count;
        }

        self.counts[i] = local_count(types, types[i], graph.neighbors(i));
        self.counts[j] = local_count(types, types[j], graph.neighbors(j));
        Ok(())
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn get(&self, index: usize) -> Option<usize> {
        self.counts.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// The sum of the coordination over all atoms, twice the number of mixed pairs.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

impl Index<usize> for CoordinationTracker {
    type Output = usize;

    fn index(&self, index: usize) -> &usize {
        &self.counts[index]
    }
}

/// The change in count of every neighbor of `centre` due to its change of type.
///
/// The `partner` of the exchange is skipped, its count is rebuilt directly.
fn neighbor_changes(
    centre: usize,
    partner: usize,
    previous: AtomType,
    graph: &NeighborGraph,
    types: &[AtomType],
) -> Vec<(usize, isize)> {
    let current = types[centre];
    graph
        .neighbors(centre)
        .iter()
        .filter(|&&k| k != partner)
        .filter_map(|&k| match (types[k] != previous, types[k] != current) {
            (true, false) => Some((k, -1)),
            (false, true) => Some((k, 1)),
            _ => None,
        })
        .collect()
}

fn local_count(types: &[AtomType], atom_type: AtomType, neighbors: &[usize]) -> usize {
    neighbors.iter().filter(|&&k| types[k] != atom_type).count()
}
