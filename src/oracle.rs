//
// oracle.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, bail, Error};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::cluster::{AtomType, Cluster};
use crate::error::OracleError;
use crate::neighbor::{NeighborGraph, COORDINATION_CUTOFF};
use crate::traits::{EnergyOracle, ToSVG};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BondEnergy {
    pub first: AtomType,
    pub second: AtomType,
    pub energy: f64,
}

/// The energy of a bond between each pair of species
///
/// Bonds are symmetric, the energy of an `(a, b)` bond is the same as a `(b, a)` bond. Pairs of
/// species without an explicit energy use the default value.
///
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BondEnergies {
    default: f64,
    pairs: Vec<BondEnergy>,
}

impl BondEnergies {
    pub fn new(default: f64) -> Self {
        Self {
            default,
            pairs: vec![],
        }
    }

    pub fn set(&mut self, first: AtomType, second: AtomType, energy: f64) -> &mut Self {
        match self.find(first, second) {
            Some(index) => self.pairs[index].energy = energy,
            None => self.pairs.push(BondEnergy {
                first,
                second,
                energy,
            }),
        }
        self
    }

    pub fn energy(&self, first: AtomType, second: AtomType) -> f64 {
        self.find(first, second)
            .map_or(self.default, |index| self.pairs[index].energy)
    }

    fn find(&self, first: AtomType, second: AtomType) -> Option<usize> {
        self.pairs.iter().position(|b| {
            (b.first == first && b.second == second) || (b.first == second && b.second == first)
        })
    }
}

/// A bond energy given in terms of chemical symbols, written as `A:B:energy`
///
/// ```
/// use exchange_mc::BondSpec;
/// let bond: BondSpec = "Pt:Ni:-0.35".parse().unwrap();
/// assert_eq!(bond.first, "Pt");
/// assert_eq!(bond.energy, -0.35);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BondSpec {
    pub first: String,
    pub second: String,
    pub energy: f64,
}

impl FromStr for BondSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        match parts.as_slice() {
            [first, second, energy] if !first.is_empty() && !second.is_empty() => Ok(Self {
                first: first.to_string(),
                second: second.to_string(),
                energy: energy
                    .parse()
                    .map_err(|_| anyhow!("Invalid bond energy '{}' in '{}'", energy, s))?,
            }),
            _ => bail!("Bond '{}' is not of the form A:B:energy", s),
        }
    }
}

impl BondSpec {
    /// Add this bond to `bonds`, resolving the symbols against the species of `cluster`.
    pub fn resolve(&self, cluster: &Cluster, bonds: &mut BondEnergies) -> Result<(), Error> {
        let first = cluster
            .find_species(&self.first)
            .ok_or_else(|| anyhow!("Species {} is not present in the cluster", self.first))?;
        let second = cluster
            .find_species(&self.second)
            .ok_or_else(|| anyhow!("Species {} is not present in the cluster", self.second))?;
        bonds.set(first, second, self.energy);
        Ok(())
    }
}

/// An oracle scoring a cluster by summing the energy of each bond
///
/// Every pair of atoms closer than the cutoff contributes the bond energy of their species. The
/// geometry is held fixed, so relaxation leaves the positions untouched. This gives a cheap
/// lattice-gas description of the chemical ordering of a cluster.
///
#[derive(Debug, Clone)]
pub struct PairBondOracle {
    cluster: Cluster,
    bonds: BondEnergies,
    graph: NeighborGraph,
    snapshot_dir: Option<PathBuf>,
    evaluations: usize,
}

impl PairBondOracle {
    pub fn new(cluster: Cluster, bonds: BondEnergies) -> Self {
        Self::with_cutoff(cluster, bonds, COORDINATION_CUTOFF)
    }

    pub fn with_cutoff(cluster: Cluster, bonds: BondEnergies, cutoff: f64) -> Self {
        let graph = NeighborGraph::build(&cluster.positions(), cutoff);
        Self {
            cluster,
            bonds,
            graph,
            snapshot_dir: None,
            evaluations: 0,
        }
    }

    /// Write each rendered snapshot as an SVG file within `directory`
    pub fn snapshots_to(mut self, directory: PathBuf) -> Self {
        self.snapshot_dir = Some(directory);
        self
    }

    pub fn energy(&self) -> f64 {
        self.graph
            .iter()
            .enumerate()
            .flat_map(|(i, list)| list.iter().filter(move |&&j| j > i).map(move |&j| (i, j)))
            .map(|(i, j)| {
                let atoms = self.cluster.atoms();
                self.bonds.energy(atoms[i].atom_type, atoms[j].atom_type)
            })
            .sum()
    }

    /// The number of times the configuration has been scored
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn into_cluster(self) -> Cluster {
        self.cluster
    }
}

impl EnergyOracle for PairBondOracle {
    fn atom_count(&self) -> usize {
        self.cluster.len()
    }

    fn positions(&self) -> Vec<Point3<f64>> {
        self.cluster.positions()
    }

    fn set_positions(&mut self, positions: &[Point3<f64>]) -> Result<(), OracleError> {
        let moved = self
            .cluster
            .atoms()
            .iter()
            .zip(positions)
            .any(|(atom, position)| atom.position != *position);
        self.cluster.set_positions(positions)?;
        if moved {
            self.graph = NeighborGraph::build(positions, self.graph.cutoff());
        }
        Ok(())
    }

    fn types(&self) -> Vec<AtomType> {
        self.cluster.types()
    }

    fn set_types(&mut self, types: &[AtomType]) -> Result<(), OracleError> {
        self.cluster.set_types(types)
    }

    fn relax_and_score(&mut self) -> Result<f64, OracleError> {
        self.evaluations += 1;
        Ok(self.energy())
    }

    fn render_snapshot(&mut self, label: &str) -> Result<(), OracleError> {
        if let Some(directory) = &self.snapshot_dir {
            let path = directory.join(label).with_extension("svg");
            svg::save(&path, &self.cluster.as_svg())
                .map_err(|e| OracleError::Render(format!("{}: {}", path.display(), e)))?;
        }
        Ok(())
    }
}
