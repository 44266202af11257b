//
// lib.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

//! Exchange Monte-Carlo search over the chemical ordering of atomic clusters
//!
//! The positions of the atoms in a cluster are fixed (up to relaxation), while the types of
//! pairs of atoms are exchanged. Each exchange is relaxed and scored by an external
//! [`EnergyOracle`] and accepted according to the Metropolis criterion. Alongside the search,
//! the number of neighbors of a different type is tracked for every atom, updated
//! incrementally after each accepted exchange.
//!
//! ```
//! use nalgebra::Point3;
//! use exchange_mc::{BondEnergies, BuildEngine, Cluster, PairBondOracle, Policy};
//!
//! let mut cluster = Cluster::new();
//! for i in 0..8 {
//!     let symbol = if i % 2 == 0 { "Cu" } else { "Au" };
//!     cluster.push(symbol, Point3::new(2.5 * i as f64, 0., 0.));
//! }
//! let mut bonds = BondEnergies::new(-1.);
//! bonds.set(0, 1, -1.2);
//!
//! let mut engine = BuildEngine::default()
//!     .seed(0)
//!     .build(PairBondOracle::new(cluster, bonds))
//!     .unwrap();
//! engine.run(100, 300., Policy::Neighbors, 1.).unwrap();
//!
//! assert!(engine.verify_coordination());
//! assert!(engine.minimum().energy <= engine.current_energy());
//! ```

pub mod cluster;
pub mod coordination;
pub mod engine;
pub mod error;
pub mod io;
pub mod neighbor;
pub mod oracle;
pub mod proposer;
pub mod to_svg;
pub mod traits;

pub use crate::cluster::{Atom, AtomType, Cluster};
pub use crate::coordination::CoordinationTracker;
pub use crate::engine::{
    acceptance_probability, BuildEngine, MetropolisEngine, MinimumState, RunSummary,
    StepOutcome, KB,
};
pub use crate::error::{ExchangeError, OracleError};
pub use crate::neighbor::{NeighborGraph, COORDINATION_CUTOFF, STRUCTURAL_CUTOFF};
pub use crate::oracle::{BondEnergies, BondSpec, PairBondOracle};
pub use crate::proposer::{MoveProposer, Policy, DEFAULT_ETA, DEFAULT_RETRY_BUDGET};
pub use crate::traits::{EnergyOracle, ToSVG};
