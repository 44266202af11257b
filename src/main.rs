//
// main.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use std::fs::File;
use std::io::prelude::*;
use std::path::PathBuf;

use anyhow::{anyhow, Error};
use log::{debug, info, LevelFilter};
use rand::prelude::*;
use rayon::prelude::*;
use structopt::StructOpt;

use exchange_mc::io::{read_xyz_file, write_xyz_file};
use exchange_mc::{
    BondEnergies, BondSpec, BuildEngine, Cluster, PairBondOracle, Policy, RunSummary, ToSVG,
    DEFAULT_RETRY_BUDGET,
};

#[derive(StructOpt, Debug, Clone)]
pub struct RunOptions {
    /// The number of exchange Monte-Carlo steps in each replication
    #[structopt(short, long, default_value = "1000")]
    steps: usize,

    /// The temperature (in K) used for the Metropolis acceptance of each exchange
    #[structopt(short, long, default_value = "300")]
    temperature: f64,

    /// How the pair of atoms to exchange is chosen
    #[structopt(short, long, possible_values = &Policy::variants(), case_insensitive = true, default_value = "Neighbors")]
    policy: Policy,

    /// The strength of the bias towards highly mixed atoms for the tailored policy
    #[structopt(long, default_value = "1")]
    eta: f64,

    /// Atoms closer than this distance are considered neighbors
    #[structopt(long, default_value = "3.5")]
    cutoff: f64,

    /// The number of draws before giving up on finding a pair of atoms to exchange
    #[structopt(long)]
    retry_budget: Option<usize>,

    /// The seed for the first replication, each following replication increments the seed
    #[structopt(long)]
    seed: Option<u64>,
}

#[derive(Debug, StructOpt)]
#[structopt(name = "exchange-mc")]
struct Args {
    /// Pass many times for more log output
    ///
    /// By default, only info messages are reported. Passing `-v` one time enables debug
    /// logging and `-vv` trace logging.
    #[structopt(long, short, parse(from_occurrences))]
    verbosity: u8,

    /// The starting geometry in the xyz format
    #[structopt(parse(from_os_str))]
    input: PathBuf,

    /// Where to save the lowest energy structure
    #[structopt(long, parse(from_os_str))]
    outfile: PathBuf,

    /// The energy of a bond between two species, given as A:B:energy
    #[structopt(short, long)]
    bond: Vec<BondSpec>,

    /// The energy of a bond between species without an explicit energy
    #[structopt(long, default_value = "-1")]
    default_bond: f64,

    /// Directory to save a snapshot whenever a new minimum is found
    #[structopt(long, parse(from_os_str))]
    snapshots: Option<PathBuf>,

    /// The number of independent replications of the search
    #[structopt(long, default_value = "1")]
    replications: u64,

    #[structopt(flatten)]
    run: RunOptions,
}

fn run_replication(
    cluster: &Cluster,
    bonds: &BondEnergies,
    options: &RunOptions,
    snapshots: Option<PathBuf>,
    seed: u64,
) -> Result<RunSummary, Error> {
    let mut oracle = PairBondOracle::with_cutoff(cluster.clone(), bonds.clone(), options.cutoff);
    if let Some(directory) = snapshots.as_ref() {
        let directory = directory.join(format!("replication_{}", seed));
        std::fs::create_dir_all(&directory)?;
        oracle = oracle.snapshots_to(directory);
    }

    let mut engine = BuildEngine::default()
        .cutoff(options.cutoff)
        .retry_budget(options.retry_budget.unwrap_or(DEFAULT_RETRY_BUDGET))
        .log_coordination(false)
        .snapshot_minimum(snapshots.is_some())
        .seed(seed)
        .build(oracle)?;

    engine.run(options.steps, options.temperature, options.policy, options.eta)?;
    debug!(
        "Replication {} minimum: {:.6} eV, accepted {} of {} moves",
        seed,
        engine.minimum().energy,
        engine.accepted_moves(),
        engine.steps()
    );
    Ok(engine.summary())
}

fn analyse_cluster(args: &Args, cluster: Cluster) -> Result<(), Error> {
    let mut bonds = BondEnergies::new(args.default_bond);
    for bond in args.bond.iter() {
        bond.resolve(&cluster, &mut bonds)?;
    }
    let seed_start = match args.run.seed {
        None => rand_pcg::Pcg64Mcg::from_entropy().gen(),
        Some(x) => x,
    };

    let summaries = (0..args.replications)
        .into_par_iter()
        .map(|index| {
            run_replication(
                &cluster,
                &bonds,
                &args.run,
                args.snapshots.clone(),
                seed_start.wrapping_add(index),
            )
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let best = summaries
        .into_iter()
        .min_by(|a, b| {
            a.minimum
                .energy
                .partial_cmp(&b.minimum.energy)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .ok_or_else(|| anyhow!("No replications were run."))?;

    info!(
        "Minimum energy: {:.6} eV from seed {}",
        best.minimum.energy, best.seed
    );

    let mut minimum = cluster;
    minimum.set_positions(&best.minimum.positions)?;
    minimum.set_types(&best.minimum.types)?;

    let serialised = serde_json::to_string(&best)?;
    File::create(args.outfile.with_extension("json"))?.write_all(serialised.as_bytes())?;
    write_xyz_file(
        args.outfile.with_extension("xyz"),
        &minimum,
        &format!("energy={:.8} seed={}", best.minimum.energy, best.seed),
    )?;
    svg::save(args.outfile.with_extension("svg"), &minimum.as_svg())?;

    Ok(())
}

#[paw::main]
fn main(args: Args) -> Result<(), Error> {
    let log_level = match args.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(log_level).init();

    debug!("Logging Level: {}", log_level);

    let cluster = read_xyz_file(&args.input)?;
    info!("Read {} from {}", cluster, args.input.display());
    debug!("Run options: {:?}", args.run);

    analyse_cluster(&args, cluster)
}
