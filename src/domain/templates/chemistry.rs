use super::params::{ParamSpec, ResolvedParams};
use super::{GenerationStep, sphere, spring};
use crate::domain::errors::SimError;
use serde_json::json;
use std::f64::consts::PI;

pub(super) const WATER_MOLECULE: &[ParamSpec] = &[
    ParamSpec::positive("bond_length", 0.96, "O-H bond length in angstroms"),
    ParamSpec::between("bond_angle_degrees", 104.5, 1.0, 179.0, "H-O-H angle"),
    ParamSpec::non_negative("stiffness", 500.0, "O-H bond stiffness"),
];

pub(super) const BENZENE_RING: &[ParamSpec] = &[
    ParamSpec::positive("radius", 1.4, "Ring radius (equal to the C-C bond length)"),
    ParamSpec::positive("ch_length", 1.1, "C-H bond length"),
    ParamSpec::non_negative("cc_stiffness", 600.0, "Aromatic C-C bond stiffness"),
    ParamSpec::non_negative("ch_stiffness", 400.0, "C-H bond stiffness"),
];

pub(super) const PROTEIN_CHAIN: &[ParamSpec] = &[
    ParamSpec::count("residues", 10, 1, 500, "Number of amino acid residues"),
    ParamSpec::positive("spacing", 3.8, "C-alpha to C-alpha distance in angstroms"),
    ParamSpec::non_negative("stiffness", 300.0, "Peptide bond stiffness"),
];

const CARBON_MASS: f64 = 12.011;
const HYDROGEN_MASS: f64 = 1.008;
const OXYGEN_MASS: f64 = 15.999;
const RESIDUE_MASS: f64 = 110.0;
const RESIDUE_CODES: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";
/// Half-angle of the backbone zig-zag.
const ZIGZAG: f64 = PI / 6.0;

pub(super) fn water_molecule(p: &ResolvedParams) -> Result<Vec<GenerationStep>, SimError> {
    let bond_length = p.number("bond_length")?;
    let half_angle = p.number("bond_angle_degrees")?.to_radians() / 2.0;
    let stiffness = p.number("stiffness")?;

    let h_x = bond_length * half_angle.sin();
    let h_y = bond_length * half_angle.cos();

    let mut steps = vec![sphere(
        "water_O",
        0.3,
        OXYGEN_MASS,
        [0.0, 0.0, 0.0],
        json!({
            "name": "Oxygen",
            "element": "O",
            "annotations": ["electronegative", "lone pairs"],
            "color": "#FF0D0D",
        }),
    )];
    for (n, x) in [(1, -h_x), (2, h_x)] {
        steps.push(sphere(
            format!("water_H{n}"),
            0.15,
            HYDROGEN_MASS,
            [x, h_y, 0.0],
            json!({
                "name": format!("Hydrogen {n}"),
                "element": "H",
                "annotations": ["partial positive"],
                "color": "#FFFFFF",
            }),
        ));
    }
    for n in [1, 2] {
        steps.push(spring(
            format!("water_bond_OH{n}"),
            "water_O",
            format!("water_H{n}"),
            stiffness,
            bond_length,
            json!({ "name": "O-H bond", "bond_type": "covalent" }),
        ));
    }
    Ok(steps)
}

pub(super) fn benzene_ring(p: &ResolvedParams) -> Result<Vec<GenerationStep>, SimError> {
    let radius = p.number("radius")?;
    let ch_length = p.number("ch_length")?;
    let cc_stiffness = p.number("cc_stiffness")?;
    let ch_stiffness = p.number("ch_stiffness")?;

    let mut steps = Vec::with_capacity(24);
    for i in 0..6 {
        let angle = i as f64 * PI / 3.0;
        let (sin, cos) = angle.sin_cos();
        steps.push(sphere(
            format!("benzene_C{i}"),
            0.25,
            CARBON_MASS,
            [radius * cos, 0.0, radius * sin],
            json!({
                "name": format!("Carbon {}", i + 1),
                "element": "C",
                "hybridization": "sp2",
                "color": "#909090",
            }),
        ));
        steps.push(sphere(
            format!("benzene_H{i}"),
            0.15,
            HYDROGEN_MASS,
            [(radius + ch_length) * cos, 0.0, (radius + ch_length) * sin],
            json!({ "name": format!("Hydrogen {}", i + 1), "element": "H", "color": "#FFFFFF" }),
        ));
        steps.push(spring(
            format!("benzene_CH{i}"),
            format!("benzene_C{i}"),
            format!("benzene_H{i}"),
            ch_stiffness,
            ch_length,
            json!({ "name": "C-H bond", "bond_type": "covalent" }),
        ));
    }
    // A regular hexagon's side equals its circumradius.
    for i in 0..6 {
        steps.push(spring(
            format!("benzene_CC{i}"),
            format!("benzene_C{i}"),
            format!("benzene_C{}", (i + 1) % 6),
            cc_stiffness,
            radius,
            json!({ "name": "C-C bond", "bond_type": "aromatic", "bond_order": 1.5 }),
        ));
    }
    Ok(steps)
}

pub(super) fn protein_chain(p: &ResolvedParams) -> Result<Vec<GenerationStep>, SimError> {
    let residues = p.count("residues")?;
    let spacing = p.number("spacing")?;
    let stiffness = p.number("stiffness")?;

    let dx = spacing * ZIGZAG.cos();
    let dy = spacing * ZIGZAG.sin();

    let mut steps = Vec::with_capacity(residues * 2);
    for i in 0..residues {
        let code = RESIDUE_CODES[i % RESIDUE_CODES.len()] as char;
        let y = if i % 2 == 0 { 0.0 } else { dy };
        steps.push(sphere(
            format!("protein_residue_{i}"),
            0.4,
            RESIDUE_MASS,
            [i as f64 * dx, y, 0.0],
            json!({
                "name": format!("Residue {}", i + 1),
                "residue": code.to_string(),
                "index": i,
                "annotations": ["amino acid", "c-alpha"],
                "color": residue_color(i, residues),
            }),
        ));
        if i > 0 {
            steps.push(spring(
                format!("protein_bond_{i}"),
                format!("protein_residue_{}", i - 1),
                format!("protein_residue_{i}"),
                stiffness,
                spacing,
                json!({ "name": "Peptide bond", "bond_type": "peptide" }),
            ));
        }
    }
    Ok(steps)
}

// Blue at the N-terminus fading to red at the C-terminus.
fn residue_color(index: usize, total: usize) -> String {
    let t = if total > 1 {
        index as f64 / (total - 1) as f64
    } else {
        0.0
    };
    let red = (255.0 * t) as u8;
    let blue = (255.0 * (1.0 - t)) as u8;
    format!("#{red:02X}40{blue:02X}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn resolve(schema: &[ParamSpec]) -> ResolvedParams {
        ResolvedParams::resolve(schema, &Map::new()).unwrap()
    }

    #[test]
    fn when_benzene_is_planned_then_it_has_twelve_atoms_and_twelve_bonds() {
        let steps = benzene_ring(&resolve(BENZENE_RING)).unwrap();
        let bodies = steps
            .iter()
            .filter(|s| matches!(s, GenerationStep::Body(_)))
            .count();
        assert_eq!(bodies, 12);
        assert_eq!(steps.len() - bodies, 12);
    }

    #[test]
    fn when_protein_chain_is_planned_then_bonds_link_consecutive_residues() {
        let steps = protein_chain(&resolve(PROTEIN_CHAIN)).unwrap();
        let bonds: Vec<(String, String)> = steps
            .into_iter()
            .filter_map(|s| match s {
                GenerationStep::Constraint(c) => Some((c.body_a, c.body_b)),
                _ => None,
            })
            .collect();
        assert_eq!(bonds.len(), 9);
        assert_eq!(
            bonds[0],
            ("protein_residue_0".to_string(), "protein_residue_1".to_string())
        );
    }

    #[test]
    fn when_residue_colors_are_computed_then_ends_are_blue_and_red() {
        assert_eq!(residue_color(0, 10), "#0040FF");
        assert_eq!(residue_color(9, 10), "#FF4000");
        assert_eq!(residue_color(0, 1), "#0040FF");
    }
}
