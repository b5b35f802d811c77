use super::params::{ParamSpec, ResolvedParams};
use super::{GenerationStep, body, rod};
use crate::domain::entities::Shape;
use crate::domain::errors::SimError;
use serde_json::json;

pub(super) const GEAR_SYSTEM: &[ParamSpec] = &[
    ParamSpec::count("num_gears", 3, 1, 32, "Gears in the train"),
    ParamSpec::positive("base_radius", 1.0, "Pitch radius of every gear"),
    ParamSpec::count("teeth", 20, 3, 400, "Teeth per gear"),
];

const GEAR_THICKNESS: f64 = 0.2;
const GEAR_MASS: f64 = 5.0;
/// Centre distance as a multiple of the radius, leaving tooth clearance.
const MESH_SPACING: f64 = 2.2;

pub(super) fn gear_system(p: &ResolvedParams) -> Result<Vec<GenerationStep>, SimError> {
    let num_gears = p.count("num_gears")?;
    let radius = p.number("base_radius")?;
    let teeth = p.count("teeth")?;
    let centre_distance = MESH_SPACING * radius;

    let mut steps = Vec::with_capacity(num_gears * 2);
    for i in 0..num_gears {
        // Meshed neighbours turn in opposite directions.
        let direction = if i % 2 == 0 { 1.0 } else { -1.0 };
        let mut metadata = json!({
            "name": format!("Gear {}", i + 1),
            "teeth": teeth,
            "gear_ratio": direction,
            "annotations": ["mechanical", "rotating"],
            "color": "#808080",
        });
        if i == 0 {
            metadata["drive"] = json!(true);
            metadata["angular_velocity"] = json!(1.0);
            metadata["color"] = json!("#B87333");
        }
        steps.push(body(
            format!("gear_{i}"),
            Shape::Cylinder {
                radius,
                height: GEAR_THICKNESS,
            },
            GEAR_MASS,
            [i as f64 * centre_distance, 0.0, 0.0],
            metadata,
        ));
        if i > 0 {
            steps.push(rod(
                format!("gear_mesh_{i}"),
                format!("gear_{}", i - 1),
                format!("gear_{i}"),
                centre_distance,
                json!({ "name": "Gear mesh", "ratio": 1.0 }),
            ));
        }
    }
    Ok(steps)
}
