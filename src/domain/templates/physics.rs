use super::params::{ParamSpec, ResolvedParams};
use super::{GenerationStep, rod, sphere};
use crate::domain::entities::BodySpec;
use crate::domain::errors::SimError;
use serde_json::json;
use std::f64::consts::PI;

const STANDARD_GRAVITY: f64 = 9.81;
/// Height of the fixed pivot for pendulums.
const PIVOT_HEIGHT: f64 = 2.0;

pub(super) const PENDULUM: &[ParamSpec] = &[
    ParamSpec::positive("length", 2.0, "Rod length in meters"),
    ParamSpec::positive("mass", 1.0, "Bob mass in kilograms"),
    ParamSpec::between(
        "initial_angle_degrees",
        30.0,
        -180.0,
        180.0,
        "Release angle measured from the vertical",
    ),
];

pub(super) const DOUBLE_PENDULUM: &[ParamSpec] = &[
    ParamSpec::positive("length1", 1.0, "Upper rod length in meters"),
    ParamSpec::positive("length2", 1.0, "Lower rod length in meters"),
    ParamSpec::positive("mass1", 1.0, "Upper bob mass in kilograms"),
    ParamSpec::positive("mass2", 1.0, "Lower bob mass in kilograms"),
    ParamSpec::between("initial_angle1_degrees", 90.0, -180.0, 180.0, "Upper rod angle"),
    ParamSpec::between("initial_angle2_degrees", 90.0, -180.0, 180.0, "Lower rod angle"),
];

pub(super) const SOLAR_SYSTEM: &[ParamSpec] = &[ParamSpec::between(
    "scale",
    1e-9,
    1e-12,
    1e-6,
    "Scale factor applied to masses, distances and velocities",
)];

const SUN_MASS: f64 = 1.989e30;
const EARTH_MASS: f64 = 5.972e24;
const EARTH_ORBIT_RADIUS: f64 = 1.496e11;
const EARTH_ORBIT_SPEED: f64 = 29_780.0;

pub(super) fn pendulum(p: &ResolvedParams) -> Result<Vec<GenerationStep>, SimError> {
    let length = p.number("length")?;
    let mass = p.number("mass")?;
    let angle = p.number("initial_angle_degrees")?.to_radians();

    let anchor = [0.0, PIVOT_HEIGHT, 0.0];
    let bob = hanging_from(anchor, length, angle);
    let period = 2.0 * PI * (length / STANDARD_GRAVITY).sqrt();
    let potential_energy = mass * STANDARD_GRAVITY * (bob[1] - (PIVOT_HEIGHT - length));

    Ok(vec![
        GenerationStep::Gravity([0.0, -STANDARD_GRAVITY, 0.0]),
        sphere(
            "pendulum_anchor",
            0.1,
            0.0,
            anchor,
            json!({
                "name": "Anchor Point",
                "description": "Fixed point of pendulum",
                "annotations": ["fixed", "anchor"],
                "color": "#666666",
            }),
        ),
        sphere(
            "pendulum_bob",
            0.2,
            mass,
            bob,
            json!({
                "name": "Pendulum Bob",
                "description": format!("Mass: {mass} kg"),
                "annotations": ["mass", "oscillating"],
                "color": "#FF6B6B",
                "measurements": {
                    "potential_energy": potential_energy,
                    "period": period,
                },
            }),
        ),
        rod(
            "pendulum_rod",
            "pendulum_anchor",
            "pendulum_bob",
            length,
            json!({
                "name": "Pendulum Rod",
                "description": format!("Length: {length} m"),
            }),
        ),
    ])
}

pub(super) fn double_pendulum(p: &ResolvedParams) -> Result<Vec<GenerationStep>, SimError> {
    let length1 = p.number("length1")?;
    let length2 = p.number("length2")?;
    let mass1 = p.number("mass1")?;
    let mass2 = p.number("mass2")?;
    let angle1 = p.number("initial_angle1_degrees")?.to_radians();
    let angle2 = p.number("initial_angle2_degrees")?.to_radians();

    let anchor = [0.0, PIVOT_HEIGHT, 0.0];
    let bob1 = hanging_from(anchor, length1, angle1);
    let bob2 = hanging_from(bob1, length2, angle2);

    Ok(vec![
        GenerationStep::Gravity([0.0, -STANDARD_GRAVITY, 0.0]),
        sphere(
            "double_pendulum_anchor",
            0.1,
            0.0,
            anchor,
            json!({ "name": "Anchor", "annotations": ["fixed"], "color": "#666666" }),
        ),
        sphere(
            "double_pendulum_bob1",
            0.15,
            mass1,
            bob1,
            json!({ "name": "Bob 1", "annotations": ["chaotic"], "color": "#4ECDC4" }),
        ),
        sphere(
            "double_pendulum_bob2",
            0.15,
            mass2,
            bob2,
            json!({ "name": "Bob 2", "annotations": ["chaotic"], "color": "#FFD93D" }),
        ),
        rod(
            "double_pendulum_rod1",
            "double_pendulum_anchor",
            "double_pendulum_bob1",
            length1,
            json!({ "name": "Upper Rod" }),
        ),
        rod(
            "double_pendulum_rod2",
            "double_pendulum_bob1",
            "double_pendulum_bob2",
            length2,
            json!({ "name": "Lower Rod" }),
        ),
    ])
}

pub(super) fn solar_system(p: &ResolvedParams) -> Result<Vec<GenerationStep>, SimError> {
    let scale = p.number("scale")?;
    let orbit_radius = EARTH_ORBIT_RADIUS * scale;

    Ok(vec![
        sphere(
            "sun",
            0.5,
            SUN_MASS * scale,
            [0.0, 0.0, 0.0],
            json!({
                "name": "Sun",
                "description": "G-type main-sequence star",
                "annotations": ["star", "center of mass"],
                "color": "#FDB813",
            }),
        ),
        GenerationStep::Body(
            BodySpec::sphere(0.1, EARTH_MASS * scale, [orbit_radius, 0.0, 0.0])
                .with_id("earth")
                .with_velocity([0.0, 0.0, EARTH_ORBIT_SPEED * scale])
                .with_metadata(json!({
                    "name": "Earth",
                    "description": "Third planet from the sun",
                    "annotations": ["planet", "habitable"],
                    "color": "#6B93D6",
                    "measurements": { "orbital_radius": orbit_radius },
                })),
        ),
        rod(
            "earth_orbit",
            "sun",
            "earth",
            orbit_radius,
            json!({ "name": "Orbit", "description": "Idealized circular orbit" }),
        ),
    ])
}

// Position of a bob hanging `length` below `pivot`, swung by `angle` radians.
fn hanging_from(pivot: [f64; 3], length: f64, angle: f64) -> [f64; 3] {
    [
        pivot[0] + length * angle.sin(),
        pivot[1] - length * angle.cos(),
        pivot[2],
    ]
}
