use super::params::{ParamSpec, ResolvedParams};
use super::{GenerationStep, body, distance, sphere, spring};
use crate::domain::entities::Shape;
use crate::domain::errors::SimError;
use serde_json::json;
use std::f64::consts::PI;

pub(super) const DNA_HELIX: &[ParamSpec] = &[
    ParamSpec::count("base_pairs", 10, 1, 200, "Number of base pairs"),
    ParamSpec::positive("radius", 1.0, "Helix radius"),
    ParamSpec::positive("pitch", 3.4, "Rise per full turn"),
    ParamSpec::non_negative("hbond_stiffness", 50.0, "Hydrogen bond stiffness"),
    ParamSpec::non_negative("backbone_stiffness", 300.0, "Sugar-phosphate backbone stiffness"),
];

pub(super) const CELL_MEMBRANE: &[ParamSpec] = &[
    ParamSpec::positive("width", 10.0, "Patch extent along x"),
    ParamSpec::positive("height", 10.0, "Patch extent along z"),
    ParamSpec::positive("spacing", 0.5, "Distance between neighbouring lipids"),
    ParamSpec::non_negative("head_tail_stiffness", 200.0, "Head to tail stiffness"),
    ParamSpec::non_negative("lateral_stiffness", 50.0, "Head to head stiffness"),
];

/// Base pairs per full helical turn.
const BASES_PER_TURN: usize = 10;
const BASES: [char; 4] = ['A', 'T', 'G', 'C'];
const NUCLEOTIDE_MASS: f64 = 300.0;

/// Upper bound on lipid sites per axis.
pub(super) const MAX_MEMBRANE_SITES: usize = 40;
const HEAD_Y: f64 = 2.0;
const TAIL_LENGTH: f64 = 1.5;
/// Distance between a head centre and its tail centre.
const HEAD_TAIL_REST: f64 = 1.25;

fn complement(base: char) -> char {
    match base {
        'A' => 'T',
        'T' => 'A',
        'G' => 'C',
        _ => 'G',
    }
}

fn base_color(base: char) -> &'static str {
    match base {
        'A' => "#00FF00",
        'T' => "#FF0000",
        'G' => "#FFFF00",
        _ => "#0000FF",
    }
}

pub(super) fn dna_helix(p: &ResolvedParams) -> Result<Vec<GenerationStep>, SimError> {
    let base_pairs = p.count("base_pairs")?;
    let radius = p.number("radius")?;
    let pitch = p.number("pitch")?;
    let hbond_stiffness = p.number("hbond_stiffness")?;
    let backbone_stiffness = p.number("backbone_stiffness")?;

    let rise = pitch / BASES_PER_TURN as f64;
    let strand_point = |i: usize, phase: f64| {
        let angle = i as f64 * 2.0 * PI / BASES_PER_TURN as f64 + phase;
        [radius * angle.cos(), i as f64 * rise, radius * angle.sin()]
    };
    // Consecutive nucleotides on a strand sit one chord and one rise apart.
    let backbone_rest = distance(strand_point(0, 0.0), strand_point(1, 0.0));

    let mut steps = Vec::with_capacity(base_pairs * 5);
    for i in 0..base_pairs {
        let base1 = BASES[i % BASES.len()];
        let base2 = complement(base1);

        for (strand, base, phase) in [(1, base1, 0.0), (2, base2, PI)] {
            steps.push(sphere(
                format!("dna_base{strand}_{i}"),
                0.3,
                NUCLEOTIDE_MASS,
                strand_point(i, phase),
                json!({
                    "name": format!("Base {base}"),
                    "base": base.to_string(),
                    "strand": strand,
                    "index": i,
                    "annotations": ["nucleotide", format!("strand {strand}")],
                    "color": base_color(base),
                }),
            ));
        }

        steps.push(spring(
            format!("dna_hbond_{i}"),
            format!("dna_base1_{i}"),
            format!("dna_base2_{i}"),
            hbond_stiffness,
            2.0 * radius,
            json!({
                "name": format!("{base1}-{base2} pair"),
                "bond_type": "hydrogen",
                "bonds": if matches!(base1, 'G' | 'C') { 3 } else { 2 },
            }),
        ));

        if i > 0 {
            for strand in [1, 2] {
                steps.push(spring(
                    format!("dna_backbone{strand}_{i}"),
                    format!("dna_base{strand}_{}", i - 1),
                    format!("dna_base{strand}_{i}"),
                    backbone_stiffness,
                    backbone_rest,
                    json!({ "name": "Backbone", "bond_type": "phosphodiester" }),
                ));
            }
        }
    }
    Ok(steps)
}

pub(super) fn cell_membrane(p: &ResolvedParams) -> Result<Vec<GenerationStep>, SimError> {
    let width = p.number("width")?;
    let height = p.number("height")?;
    let spacing = p.number("spacing")?;
    let head_tail_stiffness = p.number("head_tail_stiffness")?;
    let lateral_stiffness = p.number("lateral_stiffness")?;

    let sites_x = sites_along(width, spacing);
    let sites_z = sites_along(height, spacing);

    let mut steps = Vec::new();
    for i in 0..sites_x {
        for j in 0..sites_z {
            let x = i as f64 * spacing - width / 2.0;
            let z = j as f64 * spacing - height / 2.0;

            for (layer, sign) in [("upper", 1.0), ("lower", -1.0)] {
                let head = format!("lipid_head_{layer}_{i}_{j}");
                let tail = format!("lipid_tail_{layer}_{i}_{j}");
                steps.push(sphere(
                    head.clone(),
                    0.2,
                    50.0,
                    [x, sign * HEAD_Y, z],
                    json!({
                        "name": "Phospholipid head",
                        "layer": layer,
                        "annotations": ["hydrophilic", "phosphate"],
                        "color": "#FF6B6B",
                    }),
                ));
                steps.push(body(
                    tail.clone(),
                    Shape::Cylinder {
                        radius: 0.1,
                        height: TAIL_LENGTH,
                    },
                    200.0,
                    [x, sign * (HEAD_Y - HEAD_TAIL_REST), z],
                    json!({
                        "name": "Fatty acid tail",
                        "layer": layer,
                        "annotations": ["hydrophobic"],
                        "color": "#FFD93D",
                    }),
                ));
                steps.push(spring(
                    format!("lipid_bond_{layer}_{i}_{j}"),
                    head,
                    tail,
                    head_tail_stiffness,
                    HEAD_TAIL_REST,
                    json!({ "name": "Head-tail link" }),
                ));
            }

            for layer in ["upper", "lower"] {
                let here = format!("lipid_head_{layer}_{i}_{j}");
                if i > 0 {
                    steps.push(spring(
                        format!("lipid_lateral_{layer}_u_{i}_{j}"),
                        format!("lipid_head_{layer}_{}_{j}", i - 1),
                        here.clone(),
                        lateral_stiffness,
                        spacing,
                        json!({ "name": "Lateral link" }),
                    ));
                }
                if j > 0 {
                    steps.push(spring(
                        format!("lipid_lateral_{layer}_v_{i}_{j}"),
                        format!("lipid_head_{layer}_{i}_{}", j - 1),
                        here,
                        lateral_stiffness,
                        spacing,
                        json!({ "name": "Lateral link" }),
                    ));
                }
            }
        }
    }
    Ok(steps)
}

fn sites_along(extent: f64, spacing: f64) -> usize {
    ((extent / spacing).floor() as usize).clamp(1, MAX_MEMBRANE_SITES)
}
