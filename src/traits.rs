//
// traits.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use nalgebra::Point3;

use crate::cluster::AtomType;
use crate::error::OracleError;

/// An external engine which relaxes and scores a configuration of atoms
///
/// The oracle owns the positions and types of every atom. The Monte-Carlo engine only ever
/// gathers and scatters these arrays as a whole, it makes no assumption about how the
/// relaxation is performed, only that the result is deterministic for the same positions and
/// types.
///
pub trait EnergyOracle {
    fn atom_count(&self) -> usize;

    fn positions(&self) -> Vec<Point3<f64>>;
    fn set_positions(&mut self, positions: &[Point3<f64>]) -> Result<(), OracleError>;

    fn types(&self) -> Vec<AtomType>;
    fn set_types(&mut self, types: &[AtomType]) -> Result<(), OracleError>;

    /// Relax the current configuration in place, returning the potential energy in eV.
    fn relax_and_score(&mut self) -> Result<f64, OracleError>;

    /// Render the current configuration for external visualisation.
    fn render_snapshot(&mut self, _label: &str) -> Result<(), OracleError> {
        Ok(())
    }
}

pub trait ToSVG {
    type Value: svg::Node;
    fn as_svg(&self) -> Self::Value;
}
