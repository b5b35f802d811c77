use super::params::{ParamSpec, ResolvedParams};
use super::{GenerationStep, sphere, spring};
use crate::domain::entities::Vec3;
use crate::domain::errors::SimError;
use serde_json::json;
use std::f64::consts::PI;

pub(super) const PARAMETRIC_SURFACE: &[ParamSpec] = &[
    ParamSpec::choice(
        "surface",
        &["torus", "sphere", "helicoid", "plane"],
        "torus",
        "Surface equations to sample",
    ),
    ParamSpec::interval("u_range", [-PI, PI], "Sampled range of u"),
    ParamSpec::interval("v_range", [-PI, PI], "Sampled range of v"),
    ParamSpec::count("resolution", 20, 1, 64, "Samples per parameter axis"),
    ParamSpec::non_negative("stiffness", 100.0, "Neighbour spring stiffness"),
    ParamSpec::positive("rest_length", 0.5, "Neighbour spring rest length"),
];

#[derive(Debug, Clone, Copy)]
enum Surface {
    Torus,
    Sphere,
    Helicoid,
    Plane,
}

impl Surface {
    fn from_choice(choice: &str) -> Self {
        match choice {
            "sphere" => Surface::Sphere,
            "helicoid" => Surface::Helicoid,
            "plane" => Surface::Plane,
            _ => Surface::Torus,
        }
    }

    fn point(self, u: f64, v: f64) -> Vec3 {
        match self {
            Surface::Torus => [u.cos() * (3.0 + v.cos()), u.sin() * (3.0 + v.cos()), v.sin()],
            Surface::Sphere => [2.0 * v.cos() * u.cos(), 2.0 * v.cos() * u.sin(), 2.0 * v.sin()],
            Surface::Helicoid => [v * u.cos(), v * u.sin(), u],
            Surface::Plane => [u, v, 0.0],
        }
    }
}

pub(super) fn parametric_surface(p: &ResolvedParams) -> Result<Vec<GenerationStep>, SimError> {
    let surface = Surface::from_choice(p.choice("surface")?);
    let u_range = p.interval("u_range")?;
    let v_range = p.interval("v_range")?;
    let resolution = p.count("resolution")?;
    let stiffness = p.number("stiffness")?;
    let rest_length = p.number("rest_length")?;

    let us = linspace(u_range, resolution);
    let vs = linspace(v_range, resolution);

    let mut steps = Vec::with_capacity(resolution * resolution * 3);
    for (i, &u) in us.iter().enumerate() {
        for (j, &v) in vs.iter().enumerate() {
            let id = point_id(i, j);
            let u_norm = normalized(u, u_range);
            let v_norm = normalized(v, v_range);
            steps.push(sphere(
                id.clone(),
                0.05,
                0.1,
                surface.point(u, v),
                json!({
                    "name": format!("Surface point ({i}, {j})"),
                    "u": u,
                    "v": v,
                    "annotations": ["mathematical", "surface"],
                    "color": surface_color(u_norm, v_norm),
                }),
            ));
            // Only link back to already created neighbours.
            if i > 0 {
                steps.push(spring(
                    format!("surface_spring_u_{i}_{j}"),
                    point_id(i - 1, j),
                    id.clone(),
                    stiffness,
                    rest_length,
                    json!({ "name": "Surface spring", "direction": "u" }),
                ));
            }
            if j > 0 {
                steps.push(spring(
                    format!("surface_spring_v_{i}_{j}"),
                    point_id(i, j - 1),
                    id,
                    stiffness,
                    rest_length,
                    json!({ "name": "Surface spring", "direction": "v" }),
                ));
            }
        }
    }
    Ok(steps)
}

fn point_id(i: usize, j: usize) -> String {
    format!("surface_point_{i}_{j}")
}

/// `n` evenly spaced samples including both ends.
fn linspace([start, end]: [f64; 2], n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }
    (0..n)
        .map(|k| start + (end - start) * k as f64 / (n - 1) as f64)
        .collect()
}

fn normalized(value: f64, [start, end]: [f64; 2]) -> f64 {
    ((value - start) / (end - start)).clamp(0.0, 1.0)
}

fn surface_color(u_norm: f64, v_norm: f64) -> String {
    let r = (255.0 * u_norm) as u8;
    let g = (255.0 * v_norm) as u8;
    let b = (255.0 * (1.0 - (u_norm + v_norm) / 2.0)) as u8;
    format!("#{r:02x}{g:02x}{b:02x}")
}
