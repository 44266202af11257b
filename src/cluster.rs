//
// cluster.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use std::fmt;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::error::OracleError;

/// The chemical identity of an atom
///
/// Types are categorical, the only meaningful comparison between two types is equality.
pub type AtomType = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub atom_type: AtomType,
    pub position: Point3<f64>,
}

impl Atom {
    pub fn new(atom_type: AtomType, position: Point3<f64>) -> Self {
        Self {
            atom_type,
            position,
        }
    }
}

/// A fixed size collection of atoms
///
/// The index of an atom within the cluster is its identity. Only the type and position of each
/// atom can be modified, the number of atoms is fixed once the cluster has been built.
///
/// Each type has an optional chemical symbol stored in `species`, with the type id being the
/// index into `species`. Types are registered in the order they are first seen.
///
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    species: Vec<String>,
    atoms: Vec<Atom>,
}

impl Cluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cluster from matching slices of positions and types
    pub fn from_parts(positions: &[Point3<f64>], types: &[AtomType]) -> Result<Self, OracleError> {
        if positions.len() != types.len() {
            return Err(OracleError::AtomCount {
                expected: positions.len(),
                found: types.len(),
            });
        }
        let atoms = positions
            .iter()
            .zip(types)
            .map(|(&position, &atom_type)| Atom::new(atom_type, position))
            .collect();
        Ok(Self {
            species: vec![],
            atoms,
        })
    }

    /// Find the type id of a chemical symbol, registering it when it hasn't been seen before.
    pub fn species_id(&mut self, symbol: &str) -> AtomType {
        match self.species.iter().position(|s| s == symbol) {
            Some(index) => index as AtomType,
            None => {
                self.species.push(symbol.to_string());
                (self.species.len() - 1) as AtomType
            }
        }
    }

    /// Find the type id of a chemical symbol without registering it.
    pub fn find_species(&self, symbol: &str) -> Option<AtomType> {
        self.species
            .iter()
            .position(|s| s == symbol)
            .map(|index| index as AtomType)
    }

    pub fn push(&mut self, symbol: &str, position: Point3<f64>) {
        let atom_type = self.species_id(symbol);
        self.atoms.push(Atom::new(atom_type, position));
    }

    pub fn symbol(&self, atom_type: AtomType) -> Option<&str> {
        self.species.get(atom_type as usize).map(String::as_str)
    }

    pub fn species(&self) -> &[String] {
        &self.species
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    pub fn types(&self) -> Vec<AtomType> {
        self.atoms.iter().map(|a| a.atom_type).collect()
    }

    pub fn set_positions(&mut self, positions: &[Point3<f64>]) -> Result<(), OracleError> {
        self.check_len(positions.len())?;
        for (atom, &position) in self.atoms.iter_mut().zip(positions) {
            atom.position = position;
        }
        Ok(())
    }

    pub fn set_types(&mut self, types: &[AtomType]) -> Result<(), OracleError> {
        self.check_len(types.len())?;
        for (atom, &atom_type) in self.atoms.iter_mut().zip(types) {
            atom.atom_type = atom_type;
        }
        Ok(())
    }

    /// The number of atoms of each type, indexed by the type id
    pub fn composition(&self) -> Vec<usize> {
        let mut counts = vec![];
        for atom in self.atoms.iter() {
            let index = atom.atom_type as usize;
            if counts.len() <= index {
                counts.resize(index + 1, 0);
            }
            counts[index] += 1;
        }
        counts
    }

    fn check_len(&self, found: usize) -> Result<(), OracleError> {
        if found != self.atoms.len() {
            return Err(OracleError::AtomCount {
                expected: self.atoms.len(),
                found,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Cluster {{ atoms: {}, composition: [", self.len())?;
        for (atom_type, count) in self.composition().iter().enumerate() {
            if atom_type > 0 {
                write!(f, ", ")?;
            }
            match self.symbol(atom_type as AtomType) {
                Some(symbol) => write!(f, "{}: {}", symbol, count)?,
                None => write!(f, "{}: {}", atom_type, count)?,
            }
        }
        write!(f, "] }}")
    }
}
