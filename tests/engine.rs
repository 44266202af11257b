//
// engine.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use anyhow::{anyhow, Error};
use nalgebra::{Point3, Vector3};

use exchange_mc::{
    AtomType, BondEnergies, BuildEngine, Cluster, CoordinationTracker, EnergyOracle,
    ExchangeError, OracleError, PairBondOracle, Policy,
};

static POLICIES: &[Policy] = &[Policy::Neighbors, Policy::Tailored, Policy::Random];

#[derive(Debug, Clone, Copy)]
enum Scoring {
    /// The same energy for every configuration
    Fixed(f64),
    /// Every evaluation is one eV higher than the last
    Increasing,
    /// Relaxation fails from the given evaluation onwards
    FailFrom(usize),
    /// A non-finite energy is returned from the given evaluation onwards
    NonFiniteFrom(usize),
}

/// An oracle with a scripted energy, which moves the atoms when relaxing
#[derive(Debug, Clone)]
struct MockOracle {
    cluster: Cluster,
    scoring: Scoring,
    jitter: f64,
    evaluations: usize,
    scatter_fails: bool,
    renders: Vec<(String, Vec<AtomType>)>,
}

impl MockOracle {
    fn new(cluster: Cluster, scoring: Scoring) -> Self {
        Self {
            cluster,
            scoring,
            jitter: 0.,
            evaluations: 0,
            scatter_fails: false,
            renders: vec![],
        }
    }

    fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    /// Reject every attempt to set the positions
    fn with_failing_scatter(mut self) -> Self {
        self.scatter_fails = true;
        self
    }
}

impl EnergyOracle for MockOracle {
    fn atom_count(&self) -> usize {
        self.cluster.len()
    }

    fn positions(&self) -> Vec<Point3<f64>> {
        self.cluster.positions()
    }

    fn set_positions(&mut self, positions: &[Point3<f64>]) -> Result<(), OracleError> {
        if self.scatter_fails {
            return Err(OracleError::Relaxation(String::from("Unable to set positions")));
        }
        self.cluster.set_positions(positions)
    }

    fn types(&self) -> Vec<AtomType> {
        self.cluster.types()
    }

    fn set_types(&mut self, types: &[AtomType]) -> Result<(), OracleError> {
        self.cluster.set_types(types)
    }

    fn relax_and_score(&mut self) -> Result<f64, OracleError> {
        self.evaluations += 1;

        let relaxed: Vec<_> = self
            .cluster
            .atoms()
            .iter()
            .map(|a| a.position + Vector3::x() * self.jitter * (a.atom_type as f64 + 1.))
            .collect();
        self.cluster.set_positions(&relaxed)?;

        match self.scoring {
            Scoring::Fixed(energy) => Ok(energy),
            Scoring::Increasing => Ok(self.evaluations as f64),
            Scoring::FailFrom(n) if self.evaluations >= n => {
                Err(OracleError::Relaxation(String::from("Did not converge")))
            }
            Scoring::NonFiniteFrom(n) if self.evaluations >= n => Ok(f64::NAN),
            _ => Ok(-(self.evaluations as f64)),
        }
    }

    fn render_snapshot(&mut self, label: &str) -> Result<(), OracleError> {
        self.renders.push((label.to_string(), self.cluster.types()));
        Ok(())
    }
}

/// A simple cubic block of atoms with a spacing of 2.5, a third of which are Au
fn cubic_cluster(side: usize) -> Cluster {
    let mut cluster = Cluster::new();
    let mut index = 0;
    for x in 0..side {
        for y in 0..side {
            for z in 0..side {
                let symbol = if index % 3 == 0 { "Au" } else { "Cu" };
                cluster.push(
                    symbol,
                    Point3::new(2.5 * x as f64, 2.5 * y as f64, 2.5 * z as f64),
                );
                index += 1;
            }
        }
    }
    cluster
}

fn tetrahedron() -> Cluster {
    let mut cluster = Cluster::new();
    cluster.push("A", Point3::new(0., 0., 0.));
    cluster.push("A", Point3::new(2.5, 0., 0.));
    cluster.push("B", Point3::new(1.25, 2.165, 0.));
    cluster.push("B", Point3::new(1.25, 0.722, 2.041));
    cluster
}

#[test]
fn test_setup() -> Result<(), Error> {
    let engine = BuildEngine::default()
        .seed(0)
        .build(MockOracle::new(tetrahedron(), Scoring::Fixed(-4.)))?;

    assert_eq!(engine.proposed_energies(), &[-4.]);
    assert_eq!(engine.current_energies(), &[-4.]);
    assert_eq!(engine.accepted_moves(), 0);
    assert_eq!(engine.steps(), 0);
    assert_eq!(engine.minimum().energy, -4.);
    assert_eq!(engine.minimum().types, vec![0, 0, 1, 1]);
    assert_eq!(engine.coordination().counts(), &[2, 2, 2, 2]);
    assert_eq!(engine.neighbor_graph().edge_count(), 6);
    assert_eq!(engine.coordination_history().map(|h| h.len()), Some(1));
    Ok(())
}

#[test]
fn test_fixed_energy_accepts_every_step() -> Result<(), Error> {
    for &policy in POLICIES {
        let mut engine = BuildEngine::default()
            .seed(7)
            .build(MockOracle::new(cubic_cluster(3), Scoring::Fixed(-10.)))?;

        for _ in 0..50 {
            let outcome = engine.step(300., policy, 1.)?;
            assert!(outcome.accepted);
            assert_eq!(outcome.energy, -10.);
        }
        assert_eq!(engine.accepted_moves(), 50);
        assert_eq!(engine.acceptance_ratio(), 1.);
        assert!(engine.verify_coordination());
    }
    Ok(())
}

#[test]
fn test_tetrahedron_coordination() -> Result<(), Error> {
    let mut engine = BuildEngine::default()
        .seed(1)
        .build(MockOracle::new(tetrahedron(), Scoring::Fixed(0.)))?;

    for _ in 0..20 {
        let outcome = engine.step(300., Policy::Neighbors, 1.)?;
        let types = engine.oracle().types();
        assert_ne!(types[outcome.pair.0], types[outcome.pair.1]);
        assert_eq!(engine.coordination().counts(), &[2, 2, 2, 2]);
    }
    Ok(())
}

#[test]
fn test_coordination_invariant() -> Result<(), Error> {
    let mut bonds = BondEnergies::new(-1.);
    bonds.set(0, 1, -1.1);

    for &policy in POLICIES {
        let oracle = PairBondOracle::new(cubic_cluster(4), bonds.clone());
        let mut engine = BuildEngine::default().seed(11).build(oracle)?;

        for _ in 0..300 {
            engine.step(2000., policy, 2.)?;
            let recomputed =
                CoordinationTracker::recompute(engine.neighbor_graph(), &engine.oracle().types());
            assert_eq!(&recomputed, engine.coordination());
        }
        assert!(engine.accepted_moves() > 0);
    }
    Ok(())
}

#[test]
fn test_coordination_history() -> Result<(), Error> {
    let mut engine = BuildEngine::default()
        .seed(5)
        .build(MockOracle::new(cubic_cluster(3), Scoring::Increasing))?;
    engine.run(10, 300., Policy::Random, 1.)?;

    let history = engine
        .coordination_history()
        .ok_or_else(|| anyhow!("History should be logged by default"))?;
    assert_eq!(history.len(), 11);
    // Every move is rejected, so the coordination never changes
    assert!(history.iter().all(|c| c.as_slice() == engine.coordination().counts()));

    let quiet = BuildEngine::default()
        .seed(5)
        .log_coordination(false)
        .build(MockOracle::new(cubic_cluster(3), Scoring::Increasing))?;
    assert!(quiet.coordination_history().is_none());
    Ok(())
}

#[test]
fn test_rejection_is_invisible() -> Result<(), Error> {
    for &policy in POLICIES {
        let oracle = MockOracle::new(cubic_cluster(3), Scoring::Increasing).with_jitter(0.01);
        let mut engine = BuildEngine::default().seed(3).build(oracle)?;

        for _ in 0..25 {
            let positions = engine.oracle().positions();
            let types = engine.oracle().types();
            let coordination = engine.coordination().clone();

            let outcome = engine.step(300., policy, 1.)?;

            assert!(!outcome.accepted);
            assert_eq!(engine.oracle().positions(), positions);
            assert_eq!(engine.oracle().types(), types);
            assert_eq!(engine.coordination(), &coordination);
        }
        assert_eq!(engine.accepted_moves(), 0);
    }
    Ok(())
}

#[test]
fn test_current_energy_sticky_on_reject() -> Result<(), Error> {
    let mut engine = BuildEngine::default()
        .seed(0)
        .build(MockOracle::new(cubic_cluster(3), Scoring::Increasing))?;
    engine.run(5, 300., Policy::Neighbors, 1.)?;

    assert_eq!(engine.proposed_energies(), &[1., 2., 3., 4., 5., 6.]);
    assert_eq!(engine.current_energies(), &[1.; 6]);
    assert_eq!(engine.current_energy(), 1.);
    Ok(())
}

#[test]
fn test_zero_temperature_rejects_uphill() -> Result<(), Error> {
    for seed in 0..10 {
        for &temperature in &[0., 1e-3, 1.] {
            let mut engine = BuildEngine::default()
                .seed(seed)
                .build(MockOracle::new(cubic_cluster(3), Scoring::Increasing))?;
            engine.run(20, temperature, Policy::Random, 1.)?;
            assert_eq!(engine.accepted_moves(), 0);
        }
    }
    Ok(())
}

#[test]
fn test_downhill_always_accepted() -> Result<(), Error> {
    // Without a failure the energy decreases with every evaluation
    let mut engine = BuildEngine::default()
        .seed(2)
        .build(MockOracle::new(cubic_cluster(3), Scoring::FailFrom(usize::MAX)))?;
    engine.run(20, 0., Policy::Tailored, 1.)?;

    assert_eq!(engine.accepted_moves(), 20);
    assert_eq!(engine.minimum().energy, -21.);
    assert_eq!(engine.minimum().types, engine.oracle().types());
    Ok(())
}

#[test]
fn test_trace_lengths() -> Result<(), Error> {
    let mut bonds = BondEnergies::new(-1.);
    bonds.set(0, 1, -0.9);
    let mut engine = BuildEngine::default()
        .seed(9)
        .build(PairBondOracle::new(cubic_cluster(3), bonds))?;

    for n in 1..=40 {
        engine.step(500., Policy::Neighbors, 1.)?;
        assert_eq!(engine.proposed_energies().len(), n + 1);
        assert_eq!(engine.current_energies().len(), n + 1);
    }
    Ok(())
}

#[test]
fn test_minimum_tracking() -> Result<(), Error> {
    let mut bonds = BondEnergies::new(-1.);
    bonds.set(0, 1, -1.3);
    let mut engine = BuildEngine::default()
        .seed(4)
        .build(PairBondOracle::new(cubic_cluster(4), bonds))?;

    for _ in 0..200 {
        engine.step(1000., Policy::Random, 1.)?;
        let minimum = engine.minimum().energy;
        assert!(engine.current_energies().iter().all(|&e| minimum <= e));
        let lowest = engine
            .current_energies()
            .iter()
            .cloned()
            .fold(f64::INFINITY, f64::min);
        assert_eq!(minimum, lowest);
    }

    // The minimum snapshot reproduces the minimum energy
    let minimum = engine.minimum().clone();
    let mut oracle = engine.into_oracle();
    oracle.set_types(&minimum.types)?;
    oracle.set_positions(&minimum.positions)?;
    approx::assert_abs_diff_eq!(oracle.relax_and_score()?, minimum.energy, epsilon = 1e-9);
    Ok(())
}

#[test]
fn test_no_candidate_move() -> Result<(), Error> {
    let mut cluster = cubic_cluster(2);
    let types = vec![0; cluster.len()];
    cluster.set_types(&types)?;

    let mut engine = BuildEngine::default()
        .seed(0)
        .build(MockOracle::new(cluster, Scoring::Fixed(0.)))?;

    for &policy in POLICIES {
        assert_eq!(
            engine.step(300., policy, 1.),
            Err(ExchangeError::NoCandidateMove { policy })
        );
    }
    assert_eq!(engine.proposed_energies().len(), 1);
    assert_eq!(engine.current_energies().len(), 1);
    assert_eq!(engine.oracle().evaluations, 1);
    Ok(())
}

#[test]
fn test_oracle_failure_leaves_state() -> Result<(), Error> {
    let oracle = MockOracle::new(cubic_cluster(3), Scoring::FailFrom(3)).with_jitter(0.1);
    let mut engine = BuildEngine::default().seed(6).build(oracle)?;
    engine.step(300., Policy::Neighbors, 1.)?;

    let positions = engine.oracle().positions();
    let types = engine.oracle().types();
    let proposed = engine.proposed_energies().to_vec();
    let current = engine.current_energies().to_vec();
    let accepted = engine.accepted_moves();

    match engine.step(300., Policy::Neighbors, 1.) {
        Err(ExchangeError::OracleEvaluation(OracleError::Relaxation(_))) => (),
        other => panic!("Expected a relaxation failure, found {:?}", other),
    }

    assert_eq!(engine.oracle().positions(), positions);
    assert_eq!(engine.oracle().types(), types);
    assert_eq!(engine.proposed_energies(), proposed.as_slice());
    assert_eq!(engine.current_energies(), current.as_slice());
    assert_eq!(engine.accepted_moves(), accepted);
    assert!(engine.verify_coordination());
    Ok(())
}

#[test]
fn test_failed_restore_leaves_history() -> Result<(), Error> {
    let oracle = MockOracle::new(cubic_cluster(3), Scoring::Increasing).with_failing_scatter();
    let mut engine = BuildEngine::default().seed(2).build(oracle)?;

    // Every move is uphill, so it is rejected and the restore fails
    assert!(engine.step(1., Policy::Random, 1.).is_err());
    assert_eq!(engine.proposed_energies().len(), 1);
    assert_eq!(engine.current_energies().len(), 1);
    assert_eq!(engine.steps(), 0);
    assert_eq!(engine.accepted_moves(), 0);
    Ok(())
}

#[test]
fn test_non_finite_energy_rejected() -> Result<(), Error> {
    let mut engine = BuildEngine::default()
        .seed(6)
        .build(MockOracle::new(cubic_cluster(3), Scoring::NonFiniteFrom(2)))?;

    let result = engine.step(300., Policy::Random, 1.);
    assert!(matches!(
        result,
        Err(ExchangeError::OracleEvaluation(OracleError::NonFiniteEnergy(_)))
    ));
    assert!(engine.minimum().energy.is_finite());
    assert_eq!(engine.proposed_energies().len(), 1);

    // A non-finite starting energy can't be set up
    let failed = BuildEngine::default()
        .seed(6)
        .build(MockOracle::new(cubic_cluster(3), Scoring::NonFiniteFrom(1)));
    assert!(failed.is_err());
    Ok(())
}

#[test]
fn test_invalid_parameters() -> Result<(), Error> {
    let mut engine = BuildEngine::default()
        .seed(0)
        .build(MockOracle::new(tetrahedron(), Scoring::Fixed(0.)))?;

    assert!(matches!(
        engine.step(-1., Policy::Random, 1.),
        Err(ExchangeError::InvalidParameter(_))
    ));
    assert!(matches!(
        engine.step(f64::NAN, Policy::Random, 1.),
        Err(ExchangeError::InvalidParameter(_))
    ));
    assert!(matches!(
        engine.step(300., Policy::Tailored, -0.5),
        Err(ExchangeError::InvalidParameter(_))
    ));
    assert_eq!(engine.steps(), 0);

    assert!(BuildEngine::default()
        .cutoff(0.)
        .build(MockOracle::new(tetrahedron(), Scoring::Fixed(0.)))
        .is_err());
    assert!(BuildEngine::default()
        .retry_budget(0)
        .build(MockOracle::new(tetrahedron(), Scoring::Fixed(0.)))
        .is_err());
    Ok(())
}

#[test]
fn test_snapshots() -> Result<(), Error> {
    let mut engine = BuildEngine::default()
        .seed(0)
        .snapshot_minimum(true)
        .build(MockOracle::new(cubic_cluster(3), Scoring::FailFrom(usize::MAX)))?;
    engine.run(3, 300., Policy::Random, 1.)?;

    // One snapshot at setup and one for each new minimum
    let labels: Vec<_> = engine.oracle().renders.iter().map(|r| r.0.as_str()).collect();
    assert_eq!(labels, vec!["min_auto"; 4]);

    let current = engine.oracle().types();
    engine.render_minimum("min_geo")?;
    let (label, rendered) = engine
        .oracle()
        .renders
        .last()
        .cloned()
        .ok_or_else(|| anyhow!("Minimum was not rendered"))?;
    assert_eq!(label, "min_geo");
    assert_eq!(rendered, engine.minimum().types);
    assert_eq!(engine.oracle().types(), current);
    Ok(())
}

#[test]
fn test_render_current() -> Result<(), Error> {
    let mut engine = BuildEngine::default()
        .seed(3)
        .build(MockOracle::new(cubic_cluster(3), Scoring::Fixed(0.)))?;
    engine.run(5, 300., Policy::Neighbors, 1.)?;

    engine.render_current("current")?;
    let renders = &engine.oracle().renders;
    assert_eq!(renders.len(), 1);
    assert_eq!(renders[0].0, "current");
    assert_eq!(renders[0].1, engine.oracle().types());
    Ok(())
}

#[test]
fn test_reproducible_with_seed() -> Result<(), Error> {
    let run = |seed| -> Result<Vec<f64>, Error> {
        let mut bonds = BondEnergies::new(-1.);
        bonds.set(0, 1, -1.2);
        let mut engine = BuildEngine::default()
            .seed(seed)
            .build(PairBondOracle::new(cubic_cluster(3), bonds))?;
        engine.run(100, 800., Policy::Tailored, 1.)?;
        Ok(engine.summary().current_energies)
    };
    assert_eq!(run(42)?, run(42)?);
    Ok(())
}
