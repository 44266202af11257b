//
// proposer.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use clap::arg_enum;
use rand::distributions::Uniform;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cluster::AtomType;
use crate::coordination::CoordinationTracker;
use crate::error::ExchangeError;
use crate::neighbor::NeighborGraph;

/// The default number of draws before giving up on finding a pair with differing types
pub const DEFAULT_RETRY_BUDGET: usize = 10_000;

/// The default strength of the coordination bias for the tailored policy
pub const DEFAULT_ETA: f64 = 1.;

arg_enum! {
    /// Strategies for choosing the pair of atoms to exchange
    ///
    /// - `Neighbors` only exchanges atoms which are neighbors of each other.
    /// - `Tailored` biases the choice towards atoms with many neighbors of a different type.
    /// - `Random` chooses any two atoms of differing type.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum Policy {
        Neighbors,
        Tailored,
        Random,
    }
}

impl Default for Policy {
    fn default() -> Self {
        Policy::Neighbors
    }
}

/// Select a pair of atoms `(i, j)` with `types[i] != types[j]`
///
/// The only side effect of a proposal is drawing from the random number generator, the types
/// and coordination are only ever read.
///
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveProposer {
    policy: Policy,
    eta: f64,
    retry_budget: usize,
}

impl MoveProposer {
    /// Create a proposer, `eta` is the strength of the coordination bias of the tailored policy.
    pub fn new(policy: Policy, eta: f64, retry_budget: usize) -> Result<Self, ExchangeError> {
        if !eta.is_finite() || eta < 0. {
            return Err(ExchangeError::InvalidParameter(format!(
                "The bias strength eta must be a finite non-negative value, found {}",
                eta
            )));
        }
        if retry_budget == 0 {
            return Err(ExchangeError::InvalidParameter(String::from(
                "The retry budget must be at least one draw",
            )));
        }
        Ok(Self {
            policy,
            eta,
            retry_budget,
        })
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn eta(&self) -> f64 {
        self.eta
    }

    pub fn propose<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        types: &[AtomType],
        graph: &NeighborGraph,
        coordination: &CoordinationTracker,
    ) -> Result<(usize, usize), ExchangeError> {
        if graph.len() != types.len() || coordination.len() != types.len() {
            return Err(ExchangeError::InvalidParameter(format!(
                "Proposal for {} atoms with a neighbor graph of {} and coordination of {}",
                types.len(),
                graph.len(),
                coordination.len()
            )));
        }
        // Without two distinct types no policy can ever succeed
        let mixed = types.iter().any(|&t| t != types[0]);
        if !mixed {
            return Err(self.no_candidate());
        }

        match self.policy {
            Policy::Neighbors => self.propose_neighbors(rng, types, graph),
            Policy::Tailored => self.propose_tailored(rng, types, coordination),
            Policy::Random => self.propose_random(rng, types),
        }
    }

    fn no_candidate(&self) -> ExchangeError {
        ExchangeError::NoCandidateMove {
            policy: self.policy,
        }
    }

    /// Search the atoms in a random order for the first one with a neighbor of a different type
    fn propose_neighbors<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        types: &[AtomType],
        graph: &NeighborGraph,
    ) -> Result<(usize, usize), ExchangeError> {
        let mut order: Vec<usize> = (0..types.len()).collect();
        order.shuffle(rng);

        for i in order {
            let mut candidates = graph.neighbors(i).to_vec();
            candidates.shuffle(rng);
            if let Some(&j) = candidates.iter().find(|&&j| types[j] != types[i]) {
                return Ok((i, j));
            }
        }
        Err(self.no_candidate())
    }

    /// Draw atoms with a probability proportional to `eta * coordination + 1`
    fn propose_tailored<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        types: &[AtomType],
        coordination: &CoordinationTracker,
    ) -> Result<(usize, usize), ExchangeError> {
        let cumulative: Vec<f64> = coordination
            .counts()
            .iter()
            .scan(0., |total, &c| {
                *total += self.eta * c as f64 + 1.;
                Some(*total)
            })
            .collect();

        let mut first = None;
        for _ in 0..self.retry_budget {
            match first {
                None => first = sample_cumulative(rng, &cumulative),
                Some(i) => {
                    if let Some(j) = sample_cumulative(rng, &cumulative) {
                        if types[i] != types[j] {
                            return Ok((i, j));
                        }
                    }
                }
            }
        }
        Err(self.no_candidate())
    }

    fn propose_random<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        types: &[AtomType],
    ) -> Result<(usize, usize), ExchangeError> {
        let distribution = Uniform::new(0, types.len());
        for _ in 0..self.retry_budget {
            let i = distribution.sample(rng);
            let j = distribution.sample(rng);
            if types[i] != types[j] {
                return Ok((i, j));
            }
        }
        Err(self.no_candidate())
    }
}

/// Map a uniform draw through a cumulative weight array
///
/// Returns `None` when rounding places the draw beyond the final bin, in which case the caller
/// draws again.
fn sample_cumulative<R: Rng + ?Sized>(rng: &mut R, cumulative: &[f64]) -> Option<usize> {
    let total = *cumulative.last()?;
    let threshold = rng.gen::<f64>() * total;
    let index = cumulative.partition_point(|&c| c <= threshold);
    if index < cumulative.len() {
        Some(index)
    } else {
        None
    }
}
