// Bodies, constraints and the kinematic state read back from the engine.

use crate::domain::errors::SimError;
use crate::domain::ports::{BodyHandle, LinkHandle};
use serde_json::{Map, Value};
use std::sync::Arc;

pub type Vec3 = [f64; 3];
/// Orientation as `[x, y, z, w]`.
pub type Quat = [f64; 4];
/// Free-form annotations attached to bodies and constraints.
pub type Metadata = Map<String, Value>;

pub const IDENTITY_ROTATION: Quat = [0.0, 0.0, 0.0, 1.0];

/// Geometric kind of a body. Fixed once the body exists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere { radius: f64 },
    Box { size: Vec3 },
    Cylinder { radius: f64, height: f64 },
}

impl Shape {
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Sphere { .. } => "sphere",
            Shape::Box { .. } => "box",
            Shape::Cylinder { .. } => "cylinder",
        }
    }

    /// Distance from the body origin to its lowest point along Y.
    pub fn half_height(&self) -> f64 {
        match self {
            Shape::Sphere { radius } => *radius,
            Shape::Box { size } => size[1] / 2.0,
            Shape::Cylinder { height, .. } => height / 2.0,
        }
    }

    fn validate(&self) -> Result<(), SimError> {
        match self {
            Shape::Sphere { radius } => positive("radius", *radius),
            Shape::Box { size } => size.iter().try_for_each(|&s| positive("size", s)),
            Shape::Cylinder { radius, height } => {
                positive("radius", *radius)?;
                positive("height", *height)
            }
        }
    }
}

/// Request to create a body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodySpec {
    pub id: Option<String>,
    pub shape: Shape,
    /// 0 marks a static body.
    pub mass: f64,
    pub position: Vec3,
    pub velocity: Option<Vec3>,
    pub metadata: Metadata,
}

impl BodySpec {
    pub fn new(shape: Shape, mass: f64, position: Vec3) -> Self {
        Self {
            id: None,
            shape,
            mass,
            position,
            velocity: None,
            metadata: Metadata::new(),
        }
    }

    pub fn sphere(radius: f64, mass: f64, position: Vec3) -> Self {
        Self::new(Shape::Sphere { radius }, mass, position)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        if let Value::Object(map) = metadata {
            self.metadata = map;
        }
        self
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if let Some(id) = &self.id {
            validate_id(id)?;
        }
        self.shape.validate()?;
        if !self.mass.is_finite() || self.mass < 0.0 {
            return Err(SimError::invalid("mass", "must be a finite value >= 0"));
        }
        finite_vec("position", self.position)?;
        if let Some(velocity) = self.velocity {
            finite_vec("velocity", velocity)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstraintKind {
    /// Rigid link holding two bodies at a fixed distance.
    Distance { distance: f64 },
    /// Damped Hookean spring.
    Spring {
        stiffness: f64,
        damping: f64,
        rest_length: f64,
    },
}

impl ConstraintKind {
    pub fn kind(&self) -> &'static str {
        match self {
            ConstraintKind::Distance { .. } => "distance",
            ConstraintKind::Spring { .. } => "spring",
        }
    }

    pub fn spring(stiffness: f64, rest_length: f64) -> Self {
        ConstraintKind::Spring {
            stiffness,
            damping: 1.0,
            rest_length,
        }
    }

    fn validate(&self) -> Result<(), SimError> {
        match *self {
            ConstraintKind::Distance { distance } => positive("distance", distance),
            ConstraintKind::Spring {
                stiffness,
                damping,
                rest_length,
            } => {
                non_negative("stiffness", stiffness)?;
                non_negative("damping", damping)?;
                positive("rest_length", rest_length)
            }
        }
    }
}

/// Request to link two existing bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSpec {
    pub id: Option<String>,
    pub kind: ConstraintKind,
    pub body_a: String,
    pub body_b: String,
    pub metadata: Metadata,
}

impl ConstraintSpec {
    pub fn new(kind: ConstraintKind, body_a: impl Into<String>, body_b: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            body_a: body_a.into(),
            body_b: body_b.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        if let Value::Object(map) = metadata {
            self.metadata = map;
        }
        self
    }

    pub fn validate(&self) -> Result<(), SimError> {
        if let Some(id) = &self.id {
            validate_id(id)?;
        }
        if self.body_a == self.body_b {
            return Err(SimError::invalid(
                "body_b",
                "a constraint must link two different bodies",
            ));
        }
        self.kind.validate()
    }
}

/// A live body as tracked by the registry.
#[derive(Debug, Clone)]
pub struct BodyRecord {
    pub id: String,
    pub shape: Shape,
    pub mass: f64,
    pub handle: BodyHandle,
    pub metadata: Arc<Metadata>,
}

/// A live constraint as tracked by the registry.
#[derive(Debug, Clone)]
pub struct ConstraintRecord {
    pub id: String,
    pub kind: ConstraintKind,
    pub body_a: String,
    pub body_b: String,
    pub handle: LinkHandle,
    pub metadata: Arc<Metadata>,
}

impl ConstraintRecord {
    pub fn references(&self, body_id: &str) -> bool {
        self.body_a == body_id || self.body_b == body_id
    }
}

/// Kinematic state read back from the engine for one body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kinematics {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
}

const MAX_ID_LEN: usize = 128;

fn validate_id(id: &str) -> Result<(), SimError> {
    if id.trim().is_empty() || id.len() > MAX_ID_LEN {
        return Err(SimError::invalid(
            "id",
            format!("must be 1..={MAX_ID_LEN} non-blank characters"),
        ));
    }
    Ok(())
}

fn positive(name: &str, value: f64) -> Result<(), SimError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid(name, "must be a finite value > 0"))
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), SimError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid(name, "must be a finite value >= 0"))
    }
}

pub(crate) fn finite_vec(name: &str, value: Vec3) -> Result<(), SimError> {
    if value.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SimError::invalid(name, "components must be finite"))
    }
}
