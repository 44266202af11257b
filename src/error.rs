//
// error.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use thiserror::Error;

use crate::proposer::Policy;

/// Failures reported by an [`EnergyOracle`](crate::traits::EnergyOracle).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OracleError {
    #[error("Structural relaxation failed: {0}")]
    Relaxation(String),

    #[error("Oracle returned a non-finite energy: {0}")]
    NonFiniteEnergy(f64),

    #[error("Expected data for {expected} atoms, found {found}")]
    AtomCount { expected: usize, found: usize },

    #[error("Unable to render snapshot: {0}")]
    Render(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExchangeError {
    /// No pair of atoms with differing types satisfies the constraints of the policy.
    #[error("No candidate move with differing types was found using the {policy} policy")]
    NoCandidateMove { policy: Policy },

    /// The oracle could not produce a scored configuration. This is fatal to a run.
    #[error("Oracle evaluation failed: {0}")]
    OracleEvaluation(#[from] OracleError),

    #[error("Invalid swap of atoms ({i}, {j}) in a cluster of {atoms} atoms")]
    InvalidSwapIndices { i: usize, j: usize, atoms: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
