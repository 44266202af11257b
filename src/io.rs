//
// io.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

//! Reading and writing clusters in the `.xyz` format
//!
//! An `.xyz` file has the number of atoms on the first line, a free-form comment on the
//! second line, followed by one line per atom of the form `symbol x y z`. Any columns after the
//! coordinates are ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Error};
use nalgebra::Point3;

use crate::cluster::Cluster;

pub fn read_xyz<R: BufRead>(reader: R) -> Result<Cluster, Error> {
    let mut lines = reader.lines();

    let count: usize = lines
        .next()
        .ok_or_else(|| anyhow!("Empty xyz input"))??
        .trim()
        .parse()
        .context("Invalid atom count on the first line")?;
    // Comment line
    lines
        .next()
        .ok_or_else(|| anyhow!("Missing the comment line"))??;

    let mut cluster = Cluster::new();
    for index in 0..count {
        let line = lines
            .next()
            .ok_or_else(|| anyhow!("Expected {} atoms, found {}", count, index))??;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            bail!("Line {} is not of the form 'symbol x y z': {}", index + 3, line);
        }
        let coords: Result<Vec<f64>, _> = fields[1..4].iter().map(|f| f.parse::<f64>()).collect();
        let coords = coords.with_context(|| format!("Invalid coordinate on line {}", index + 3))?;
        cluster.push(fields[0], Point3::new(coords[0], coords[1], coords[2]));
    }
    Ok(cluster)
}

pub fn read_xyz_file<P: AsRef<Path>>(path: P) -> Result<Cluster, Error> {
    let file = File::open(path.as_ref())
        .with_context(|| format!("Unable to open {}", path.as_ref().display()))?;
    read_xyz(BufReader::new(file))
}

/// Write the cluster, types without a registered symbol are written as `X<type>`
///
/// Only symbols are stored in the file. When it is read back, types are numbered by the first
/// appearance of each symbol, so the numbering can differ from that of `cluster` while every
/// atom keeps its symbol.
pub fn write_xyz<W: Write>(mut writer: W, cluster: &Cluster, comment: &str) -> Result<(), Error> {
    writeln!(writer, "{}", cluster.len())?;
    // The comment has to stay on a single line
    writeln!(writer, "{}", comment.replace('\n', " "))?;
    for atom in cluster.atoms() {
        let symbol = match cluster.symbol(atom.atom_type) {
            Some(symbol) => symbol.to_string(),
            None => format!("X{}", atom.atom_type),
        };
        writeln!(
            writer,
            "{} {:.8} {:.8} {:.8}",
            symbol, atom.position.x, atom.position.y, atom.position.z
        )?;
    }
    Ok(())
}

pub fn write_xyz_file<P: AsRef<Path>>(path: P, cluster: &Cluster, comment: &str) -> Result<(), Error> {
    let file = File::create(path.as_ref())
        .with_context(|| format!("Unable to create {}", path.as_ref().display()))?;
    write_xyz(file, cluster, comment)
}
