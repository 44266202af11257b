//
// to_svg.rs
// Copyright (C) 2019 Malcolm Ramsay <malramsay64@gmail.com>
// Distributed under terms of the MIT license.
//

use std::cmp::Ordering;

use svg::node::element;
use svg::Document;

use crate::cluster::{Atom, AtomType, Cluster};
use crate::traits::ToSVG;

/// Pixels per Angstrom
const SCALING: f64 = 20.;

/// The radius each atom is drawn with, in Angstrom
const ATOM_RADIUS: f64 = 1.2;

static COLOURS: &[&str] = &[
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
];

fn colour(atom_type: AtomType) -> &'static str {
    COLOURS[atom_type as usize % COLOURS.len()]
}

impl ToSVG for Atom {
    type Value = element::Circle;

    fn as_svg(&self) -> Self::Value {
        element::Circle::new()
            .set("cx", self.position.x * SCALING)
            .set("cy", self.position.y * SCALING)
            .set("r", ATOM_RADIUS * SCALING)
            .set("fill", colour(self.atom_type))
            .set("stroke", "black")
            .set("stroke-width", 0.05 * SCALING)
    }
}

/// Project the cluster onto the xy plane, looking down the z axis.
impl ToSVG for Cluster {
    type Value = Document;

    fn as_svg(&self) -> Self::Value {
        // Atoms furthest from the viewer are drawn first so nearer atoms sit on top.
        let mut atoms: Vec<&Atom> = self.atoms().iter().collect();
        atoms.sort_by(|a, b| {
            a.position
                .z
                .partial_cmp(&b.position.z)
                .unwrap_or(Ordering::Equal)
        });

        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for atom in atoms.iter() {
            min_x = min_x.min(atom.position.x);
            min_y = min_y.min(atom.position.y);
            max_x = max_x.max(atom.position.x);
            max_y = max_y.max(atom.position.y);
        }
        if atoms.is_empty() {
            min_x = 0.;
            min_y = 0.;
            max_x = 0.;
            max_y = 0.;
        }

        let margin = 2. * ATOM_RADIUS;
        let mut group = element::Group::new();
        for atom in atoms {
            group = group.add(atom.as_svg());
        }

        Document::new()
            .set(
                "viewBox",
                (
                    (min_x - margin) * SCALING,
                    (min_y - margin) * SCALING,
                    (max_x - min_x + 2. * margin) * SCALING,
                    (max_y - min_y + 2. * margin) * SCALING,
                ),
            )
            .add(group)
    }
}
