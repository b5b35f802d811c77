// Procedural structure templates: named generators that expand parameters into
// an ordered plan of body and constraint creations.

mod biology;
mod chemistry;
mod engineering;
mod mathematics;
pub mod params;
mod physics;

use crate::domain::entities::{BodySpec, ConstraintKind, ConstraintSpec, Shape, Vec3};
use crate::domain::errors::SimError;
use crate::domain::ports::PhysicsEngine;
use crate::domain::registry::EntityRegistry;
use params::{ParamSpec, ResolvedParams};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    Pendulum,
    DoublePendulum,
    SolarSystem,
    WaterMolecule,
    BenzeneRing,
    ProteinChain,
    DnaHelix,
    CellMembrane,
    ParametricSurface,
    GearSystem,
}

impl Template {
    pub const ALL: [Template; 10] = [
        Template::Pendulum,
        Template::DoublePendulum,
        Template::SolarSystem,
        Template::WaterMolecule,
        Template::BenzeneRing,
        Template::ProteinChain,
        Template::DnaHelix,
        Template::CellMembrane,
        Template::ParametricSurface,
        Template::GearSystem,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Template::Pendulum => "pendulum",
            Template::DoublePendulum => "double_pendulum",
            Template::SolarSystem => "solar_system",
            Template::WaterMolecule => "water_molecule",
            Template::BenzeneRing => "benzene_ring",
            Template::ProteinChain => "protein_chain",
            Template::DnaHelix => "dna_helix",
            Template::CellMembrane => "cell_membrane",
            Template::ParametricSurface => "parametric_surface",
            Template::GearSystem => "gear_system",
        }
    }

    /// Case-sensitive lookup.
    pub fn from_name(name: &str) -> Result<Self, SimError> {
        Self::ALL
            .into_iter()
            .find(|template| template.name() == name)
            .ok_or_else(|| SimError::UnknownTemplate {
                name: name.to_string(),
            })
    }

    pub fn category(self) -> &'static str {
        match self {
            Template::Pendulum | Template::DoublePendulum | Template::SolarSystem => "physics",
            Template::WaterMolecule | Template::BenzeneRing | Template::ProteinChain => {
                "chemistry"
            }
            Template::DnaHelix | Template::CellMembrane => "biology",
            Template::ParametricSurface => "mathematics",
            Template::GearSystem => "engineering",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Template::Pendulum => "Simple pendulum demonstrating harmonic motion",
            Template::DoublePendulum => "Chaotic double pendulum system",
            Template::SolarSystem => "Sun and earth on a scaled orbit",
            Template::WaterMolecule => "H2O molecule with bond angle",
            Template::BenzeneRing => "Aromatic C6H6 ring",
            Template::ProteinChain => "Backbone of a short peptide chain",
            Template::DnaHelix => "DNA double helix with base pairs",
            Template::CellMembrane => "Lipid bilayer patch",
            Template::ParametricSurface => "Sampled parametric surface as a spring mesh",
            Template::GearSystem => "Meshed gear train",
        }
    }

    pub fn schema(self) -> &'static [ParamSpec] {
        match self {
            Template::Pendulum => physics::PENDULUM,
            Template::DoublePendulum => physics::DOUBLE_PENDULUM,
            Template::SolarSystem => physics::SOLAR_SYSTEM,
            Template::WaterMolecule => chemistry::WATER_MOLECULE,
            Template::BenzeneRing => chemistry::BENZENE_RING,
            Template::ProteinChain => chemistry::PROTEIN_CHAIN,
            Template::DnaHelix => biology::DNA_HELIX,
            Template::CellMembrane => biology::CELL_MEMBRANE,
            Template::ParametricSurface => mathematics::PARAMETRIC_SURFACE,
            Template::GearSystem => engineering::GEAR_SYSTEM,
        }
    }

    /// Validates `raw` against the schema and expands it into an ordered plan.
    ///
    /// Pure: the same parameters always yield the same plan.
    pub fn plan(self, raw: &Map<String, Value>) -> Result<Vec<GenerationStep>, SimError> {
        let params = ResolvedParams::resolve(self.schema(), raw)?;
        match self {
            Template::Pendulum => physics::pendulum(&params),
            Template::DoublePendulum => physics::double_pendulum(&params),
            Template::SolarSystem => physics::solar_system(&params),
            Template::WaterMolecule => chemistry::water_molecule(&params),
            Template::BenzeneRing => chemistry::benzene_ring(&params),
            Template::ProteinChain => chemistry::protein_chain(&params),
            Template::DnaHelix => biology::dna_helix(&params),
            Template::CellMembrane => biology::cell_membrane(&params),
            Template::ParametricSurface => mathematics::parametric_surface(&params),
            Template::GearSystem => engineering::gear_system(&params),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationStep {
    Body(BodySpec),
    Constraint(ConstraintSpec),
    /// Environment change requested by the template (e.g. pendulums need gravity).
    Gravity(Vec3),
}

/// What a successful template load created, in creation order.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateReport {
    pub template: Template,
    pub bodies: Vec<String>,
    pub constraints: Vec<String>,
}

/// Expands `name` with `raw` parameters and applies the plan to the registry.
///
/// All or nothing: on any failure every entity created by this call is removed
/// again and the previous gravity is restored.
pub fn load_template<E: PhysicsEngine>(
    registry: &mut EntityRegistry<E>,
    name: &str,
    raw: &Map<String, Value>,
) -> Result<TemplateReport, SimError> {
    let template = Template::from_name(name)?;
    let steps = template.plan(raw)?;
    ensure_ids_free(registry, &steps)?;

    let mut applied = Applied::default();
    for step in steps {
        if let Err(err) = applied.apply(registry, step) {
            warn!(template = template.name(), error = %err, "template load failed; rolling back");
            applied.rollback(registry);
            return Err(err);
        }
    }

    info!(
        template = template.name(),
        bodies = applied.bodies.len(),
        constraints = applied.constraints.len(),
        "template loaded"
    );
    Ok(TemplateReport {
        template,
        bodies: applied.bodies,
        constraints: applied.constraints,
    })
}

fn ensure_ids_free<E: PhysicsEngine>(
    registry: &EntityRegistry<E>,
    steps: &[GenerationStep],
) -> Result<(), SimError> {
    let mut planned = HashSet::new();
    for step in steps {
        let (id, taken) = match step {
            GenerationStep::Body(spec) => match &spec.id {
                Some(id) => (id, registry.contains_body(id)),
                None => continue,
            },
            GenerationStep::Constraint(spec) => match &spec.id {
                Some(id) => (id, registry.contains_constraint(id)),
                None => continue,
            },
            GenerationStep::Gravity(_) => continue,
        };
        if taken || !planned.insert(id.as_str()) {
            return Err(SimError::DuplicateEntity { id: id.clone() });
        }
    }
    Ok(())
}

#[derive(Default)]
struct Applied {
    bodies: Vec<String>,
    constraints: Vec<String>,
    previous_gravity: Option<Vec3>,
}

impl Applied {
    fn apply<E: PhysicsEngine>(
        &mut self,
        registry: &mut EntityRegistry<E>,
        step: GenerationStep,
    ) -> Result<(), SimError> {
        match step {
            GenerationStep::Body(spec) => {
                self.bodies.push(registry.create_body(spec)?);
            }
            GenerationStep::Constraint(spec) => {
                self.constraints.push(registry.create_constraint(spec)?);
            }
            GenerationStep::Gravity(gravity) => {
                let previous = registry.gravity();
                registry.set_gravity(gravity)?;
                self.previous_gravity.get_or_insert(previous);
            }
        }
        Ok(())
    }

    fn rollback<E: PhysicsEngine>(self, registry: &mut EntityRegistry<E>) {
        for id in self.constraints.iter().rev() {
            if let Err(err) = registry.remove_constraint(id) {
                warn!(constraint_id = %id, error = %err, "rollback could not remove constraint");
            }
        }
        for id in self.bodies.iter().rev() {
            if let Err(err) = registry.remove_body(id) {
                warn!(body_id = %id, error = %err, "rollback could not remove body");
            }
        }
        if let Some(gravity) = self.previous_gravity {
            if let Err(err) = registry.set_gravity(gravity) {
                warn!(error = %err, "rollback could not restore gravity");
            }
        }
    }
}

// Plan builders shared by the generators.

fn body(
    id: impl Into<String>,
    shape: Shape,
    mass: f64,
    position: Vec3,
    metadata: Value,
) -> GenerationStep {
    GenerationStep::Body(
        BodySpec::new(shape, mass, position)
            .with_id(id)
            .with_metadata(metadata),
    )
}

fn sphere(
    id: impl Into<String>,
    radius: f64,
    mass: f64,
    position: Vec3,
    metadata: Value,
) -> GenerationStep {
    body(id, Shape::Sphere { radius }, mass, position, metadata)
}

fn spring(
    id: impl Into<String>,
    body_a: impl Into<String>,
    body_b: impl Into<String>,
    stiffness: f64,
    rest_length: f64,
    metadata: Value,
) -> GenerationStep {
    GenerationStep::Constraint(
        ConstraintSpec::new(ConstraintKind::spring(stiffness, rest_length), body_a, body_b)
            .with_id(id)
            .with_metadata(metadata),
    )
}

fn rod(
    id: impl Into<String>,
    body_a: impl Into<String>,
    body_b: impl Into<String>,
    distance: f64,
    metadata: Value,
) -> GenerationStep {
    GenerationStep::Constraint(
        ConstraintSpec::new(ConstraintKind::Distance { distance }, body_a, body_b)
            .with_id(id)
            .with_metadata(metadata),
    )
}

fn distance(a: Vec3, b: Vec3) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
}
