//
// neighbor.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use itertools::Itertools;
use nalgebra::{distance, Point3};
use serde::{Deserialize, Serialize};

/// Cutoff used for detecting the structural neighbors of an atom
pub const STRUCTURAL_CUTOFF: f64 = 3.0;

/// Cutoff used when counting the coordination of an atom
pub const COORDINATION_CUTOFF: f64 = 3.5;

/// The atoms within a cutoff distance of each atom
///
/// The graph only depends on the positions of the atoms, so changing the types of the atoms
/// never invalidates it. Neighbor lists are stored in increasing index order and are symmetric,
/// when `j` is a neighbor of `i`, `i` is also a neighbor of `j`.
///
/// ```
/// use nalgebra::Point3;
/// use exchange_mc::NeighborGraph;
///
/// let positions = vec![
///     Point3::new(0., 0., 0.),
///     Point3::new(1., 0., 0.),
///     Point3::new(5., 0., 0.),
/// ];
/// let graph = NeighborGraph::build(&positions, 2.);
/// assert_eq!(graph.neighbors(0), &[1]);
/// assert!(graph.neighbors(2).is_empty());
/// ```
///
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborGraph {
    cutoff: f64,
    neighbors: Vec<Vec<usize>>,
}

impl NeighborGraph {
    /// Find all pairs of atoms which are strictly closer than `cutoff`.
    pub fn build(positions: &[Point3<f64>], cutoff: f64) -> Self {
        let mut neighbors = vec![Vec::new(); positions.len()];

        // Combinations are generated in lexicographic order, which keeps each list sorted.
        for (i, j) in (0..positions.len()).tuple_combinations() {
            if distance(&positions[i], &positions[j]) < cutoff {
                neighbors[i].push(j);
                neighbors[j].push(i);
            }
        }
        for list in neighbors.iter_mut() {
            list.sort_unstable();
        }

        Self { cutoff, neighbors }
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn neighbors(&self, index: usize) -> &[usize] {
        &self.neighbors[index]
    }

    pub fn degree(&self, index: usize) -> usize {
        self.neighbors[index].len()
    }

    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.neighbors
            .get(i)
            .map_or(false, |list| list.binary_search(&j).is_ok())
    }

    /// The number of atoms in the graph
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// The number of unique neighbor pairs
    pub fn edge_count(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum::<usize>() / 2
    }

    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.neighbors.iter().map(Vec::as_slice)
    }
}
