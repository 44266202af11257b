//
// engine.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use log::{debug, info, trace, warn};
use nalgebra::Point3;
use rand::prelude::*;
use rand_pcg::Pcg64Mcg;
use serde::{Deserialize, Serialize};

use crate::cluster::AtomType;
use crate::coordination::CoordinationTracker;
use crate::error::{ExchangeError, OracleError};
use crate::neighbor::{NeighborGraph, COORDINATION_CUTOFF};
use crate::proposer::{MoveProposer, Policy, DEFAULT_RETRY_BUDGET};
use crate::traits::EnergyOracle;

/// The Boltzmann constant in eV/K
pub const KB: f64 = 8.617e-5;

/// Label passed to the oracle when rendering a new minimum
pub const MINIMUM_SNAPSHOT: &str = "min_auto";

/// The probability of moving from a configuration with energy `current` to one with `new`
///
/// Moves which don't increase the energy are always accepted. At a temperature of zero every
/// move which increases the energy is rejected.
///
/// ```
/// use exchange_mc::acceptance_probability;
/// assert_eq!(acceptance_probability(-1., 0., 300.), 1.);
/// assert_eq!(acceptance_probability(1., 0., 0.), 0.);
/// ```
///
pub fn acceptance_probability(new: f64, current: f64, temperature: f64) -> f64 {
    if new <= current {
        return 1.;
    }
    // The exponent is always negative here, so exp can't overflow.
    let exponent = -(new - current) / (KB * temperature);
    f64::min(f64::exp(exponent), 1.)
}

#[inline]
fn test_acceptance(threshold: f64, new: f64, current: f64, temperature: f64) -> bool {
    threshold < acceptance_probability(new, current, temperature)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildEngine {
    cutoff: f64,
    seed: Option<u64>,
    retry_budget: usize,
    log_coordination: bool,
    snapshot_minimum: bool,
}

impl Default for BuildEngine {
    fn default() -> Self {
        Self {
            cutoff: COORDINATION_CUTOFF,
            seed: None,
            retry_budget: DEFAULT_RETRY_BUDGET,
            log_coordination: true,
            snapshot_minimum: false,
        }
    }
}

impl BuildEngine {
    pub fn cutoff(&mut self, cutoff: f64) -> &mut Self {
        self.cutoff = cutoff;
        self
    }

    pub fn seed(&mut self, seed: u64) -> &mut Self {
        self.seed = Some(seed);
        self
    }

    pub fn retry_budget(&mut self, retry_budget: usize) -> &mut Self {
        self.retry_budget = retry_budget;
        self
    }

    pub fn log_coordination(&mut self, log_coordination: bool) -> &mut Self {
        self.log_coordination = log_coordination;
        self
    }

    pub fn snapshot_minimum(&mut self, snapshot_minimum: bool) -> &mut Self {
        self.snapshot_minimum = snapshot_minimum;
        self
    }

    /// Set up an engine for the configuration currently held by the oracle
    ///
    /// This computes the neighbor graph and coordination of the starting configuration, before
    /// relaxing it to find the initial energy. The relaxed configuration is the first minimum.
    ///
    pub fn build<O: EnergyOracle>(&self, oracle: O) -> Result<MetropolisEngine<O>, ExchangeError> {
        if !(self.cutoff > 0.) {
            return Err(ExchangeError::InvalidParameter(format!(
                "The neighbor cutoff must be positive, found {}",
                self.cutoff
            )));
        }
        if self.retry_budget == 0 {
            return Err(ExchangeError::InvalidParameter(String::from(
                "The retry budget must be at least one draw",
            )));
        }
        let seed = match self.seed {
            None => Pcg64Mcg::from_entropy().gen(),
            Some(x) => x,
        };
        debug!("Setting seed to: {}", seed);

        MetropolisEngine::setup(oracle, self, seed)
    }
}

/// The lowest energy configuration seen during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinimumState {
    pub energy: f64,
    pub positions: Vec<Point3<f64>>,
    pub types: Vec<AtomType>,
}

/// The result of a single Monte-Carlo step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// The atoms which had their types exchanged
    pub pair: (usize, usize),
    pub accepted: bool,
    /// The energy of the proposed configuration
    pub energy: f64,
    /// The energy of the configuration after the acceptance test
    pub current_energy: f64,
}

/// A serialisable record of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub seed: u64,
    pub steps: usize,
    pub accepted_moves: u64,
    pub acceptance_ratio: f64,
    pub proposed_energies: Vec<f64>,
    pub current_energies: Vec<f64>,
    pub minimum: MinimumState,
    pub coordination: Vec<usize>,
}

pub struct MetropolisEngine<O> {
    oracle: O,
    graph: NeighborGraph,
    coordination: CoordinationTracker,
    rng: Pcg64Mcg,
    seed: u64,
    retry_budget: usize,
    proposed_energies: Vec<f64>,
    current_energies: Vec<f64>,
    minimum: MinimumState,
    accepted_moves: u64,
    coordination_history: Option<Vec<Vec<usize>>>,
    snapshot_minimum: bool,
}

impl<O: EnergyOracle> MetropolisEngine<O> {
    fn setup(mut oracle: O, options: &BuildEngine, seed: u64) -> Result<Self, ExchangeError> {
        let positions = oracle.positions();
        let types = oracle.types();
        check_atom_count(&oracle, positions.len())?;
        check_atom_count(&oracle, types.len())?;

        let graph = NeighborGraph::build(&positions, options.cutoff);
        let coordination = CoordinationTracker::recompute(&graph, &types);
        debug!(
            "Found {} neighbor pairs between {} atoms",
            graph.edge_count(),
            graph.len()
        );

        let e_start = score(&mut oracle)?;
        debug!("Initial energy: {:.6} eV", e_start);

        let minimum = MinimumState {
            energy: e_start,
            positions: oracle.positions(),
            types: oracle.types(),
        };
        let coordination_history = if options.log_coordination {
            Some(vec![coordination.counts().to_vec()])
        } else {
            None
        };

        let mut engine = Self {
            oracle,
            graph,
            coordination,
            rng: Pcg64Mcg::seed_from_u64(seed),
            seed,
            retry_budget: options.retry_budget,
            proposed_energies: vec![e_start],
            current_energies: vec![e_start],
            minimum,
            accepted_moves: 0,
            coordination_history,
            snapshot_minimum: options.snapshot_minimum,
        };
        engine.snapshot(MINIMUM_SNAPSHOT);
        Ok(engine)
    }

    /// Perform a single exchange Monte-Carlo step
    ///
    /// The types of a pair of atoms chosen by `policy` are exchanged and the resulting
    /// configuration is relaxed and scored by the oracle. The move is accepted with the
    /// Metropolis probability at `temperature` (in K). A rejected move restores both the types
    /// and positions held by the oracle.
    ///
    /// When an error is returned, the state of the engine and the oracle are unchanged.
    ///
    pub fn step(
        &mut self,
        temperature: f64,
        policy: Policy,
        eta: f64,
    ) -> Result<StepOutcome, ExchangeError> {
        if temperature.is_nan() || temperature < 0. {
            return Err(ExchangeError::InvalidParameter(format!(
                "The temperature must be non-negative, found {}",
                temperature
            )));
        }
        let proposer = MoveProposer::new(policy, eta, self.retry_budget)?;

        // Owned copies, these are needed to undo a rejected move
        let positions_old = self.oracle.positions();
        let types_old = self.oracle.types();

        let (i, j) =
            proposer.propose(&mut self.rng, &types_old, &self.graph, &self.coordination)?;

        let mut types = types_old.clone();
        types.swap(i, j);
        self.oracle.set_types(&types)?;

        let e_new = match score(&mut self.oracle) {
            Ok(energy) => energy,
            Err(e) => {
                self.restore(&positions_old, &types_old)?;
                return Err(e);
            }
        };

        let e_current = self.current_energy();
        let threshold: f64 = self.rng.gen();
        let accepted = test_acceptance(threshold, e_new, e_current, temperature);

        if accepted {
            self.coordination.apply_swap(i, j, &self.graph, &types)?;
            self.accepted_moves += 1;
            self.proposed_energies.push(e_new);
            self.current_energies.push(e_new);
            if e_new < self.minimum.energy {
                info!(
                    "New minimum energy {:.6} eV after {} steps",
                    e_new,
                    self.steps()
                );
                self.minimum = MinimumState {
                    energy: e_new,
                    positions: self.oracle.positions(),
                    types: self.oracle.types(),
                };
                self.snapshot(MINIMUM_SNAPSHOT);
            }
        } else {
            self.restore(&positions_old, &types_old)?;
            self.proposed_energies.push(e_new);
            self.current_energies.push(e_current);
        }

        if let Some(history) = self.coordination_history.as_mut() {
            history.push(self.coordination.counts().to_vec());
        }

        trace!(
            "Exchanged ({}, {}), energy: {:.6}, accepted: {}",
            i,
            j,
            e_new,
            accepted
        );

        Ok(StepOutcome {
            pair: (i, j),
            accepted,
            energy: e_new,
            current_energy: self.current_energy(),
        })
    }

    /// Run `steps` Monte-Carlo steps at a fixed temperature, stopping at the first error.
    pub fn run(
        &mut self,
        steps: usize,
        temperature: f64,
        policy: Policy,
        eta: f64,
    ) -> Result<(), ExchangeError> {
        let accepted_start = self.accepted_moves;
        for _ in 0..steps {
            self.step(temperature, policy, eta)?;
        }
        debug!(
            "Energy: {:.6}, Minimum: {:.6}, Accepted Fraction: {:.2}%",
            self.current_energy(),
            self.minimum.energy,
            100. * (self.accepted_moves - accepted_start) as f64 / usize::max(steps, 1) as f64,
        );
        Ok(())
    }

    /// Render the minimum configuration, leaving the current configuration in place.
    pub fn render_minimum(&mut self, label: &str) -> Result<(), ExchangeError> {
        let positions = self.oracle.positions();
        let types = self.oracle.types();

        self.oracle.set_positions(&self.minimum.positions)?;
        self.oracle.set_types(&self.minimum.types)?;
        let rendered = self.oracle.render_snapshot(label);
        self.restore(&positions, &types)?;

        Ok(rendered?)
    }

    /// Render the current configuration
    pub fn render_current(&mut self, label: &str) -> Result<(), ExchangeError> {
        Ok(self.oracle.render_snapshot(label)?)
    }

    /// Check the tracked coordination against a full recomputation from the oracle's types
    pub fn verify_coordination(&self) -> bool {
        CoordinationTracker::recompute(&self.graph, &self.oracle.types()) == self.coordination
    }

    fn restore(
        &mut self,
        positions: &[Point3<f64>],
        types: &[AtomType],
    ) -> Result<(), ExchangeError> {
        self.oracle.set_types(types)?;
        self.oracle.set_positions(positions)?;
        Ok(())
    }

    fn snapshot(&mut self, label: &str) {
        if self.snapshot_minimum {
            if let Err(e) = self.oracle.render_snapshot(label) {
                warn!("Unable to render snapshot {}: {}", label, e);
            }
        }
    }

    /// The number of steps performed since setup
    pub fn steps(&self) -> usize {
        self.proposed_energies.len() - 1
    }

    pub fn accepted_moves(&self) -> u64 {
        self.accepted_moves
    }

    pub fn acceptance_ratio(&self) -> f64 {
        match self.steps() {
            0 => 0.,
            steps => self.accepted_moves as f64 / steps as f64,
        }
    }

    /// The energy of the most recently accepted configuration
    pub fn current_energy(&self) -> f64 {
        // Setup always records the starting energy
        self.current_energies[self.current_energies.len() - 1]
    }

    /// Every proposed energy, starting with the energy found at setup
    pub fn proposed_energies(&self) -> &[f64] {
        &self.proposed_energies
    }

    /// The energy after the acceptance test of every step, starting with the energy at setup
    pub fn current_energies(&self) -> &[f64] {
        &self.current_energies
    }

    pub fn minimum(&self) -> &MinimumState {
        &self.minimum
    }

    pub fn coordination(&self) -> &CoordinationTracker {
        &self.coordination
    }

    pub fn coordination_history(&self) -> Option<&[Vec<usize>]> {
        self.coordination_history.as_deref()
    }

    pub fn neighbor_graph(&self) -> &NeighborGraph {
        &self.graph
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn into_oracle(self) -> O {
        self.oracle
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            seed: self.seed,
            steps: self.steps(),
            accepted_moves: self.accepted_moves,
            acceptance_ratio: self.acceptance_ratio(),
            proposed_energies: self.proposed_energies.clone(),
            current_energies: self.current_energies.clone(),
            minimum: self.minimum.clone(),
            coordination: self.coordination.counts().to_vec(),
        }
    }
}

fn check_atom_count<O: EnergyOracle>(oracle: &O, found: usize) -> Result<(), OracleError> {
    let expected = oracle.atom_count();
    if expected != found {
        return Err(OracleError::AtomCount { expected, found });
    }
    Ok(())
}

/// Relax the configuration, only ever returning a finite energy
fn score<O: EnergyOracle>(oracle: &mut O) -> Result<f64, ExchangeError> {
    let energy = oracle.relax_and_score()?;
    if !energy.is_finite() {
        return Err(OracleError::NonFiniteEnergy(energy).into());
    }
    Ok(energy)
}
