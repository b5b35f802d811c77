use crate::domain::entities::{ConstraintKind, Kinematics, Shape, Vec3};
use crate::domain::errors::EngineError;

/// Engine-internal handle of a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u64);

/// Engine-internal handle of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkHandle(pub u64);

// Port for the physics engine that owns simulated kinematic state.
//
// Every call runs to completion without suspending, so a snapshot never sees a
// half-applied mutation.
pub trait PhysicsEngine: Send + 'static {
    fn create_body(
        &mut self,
        shape: &Shape,
        mass: f64,
        position: Vec3,
        velocity: Option<Vec3>,
    ) -> Result<BodyHandle, EngineError>;

    fn remove_body(&mut self, handle: BodyHandle) -> Result<(), EngineError>;

    fn create_constraint(
        &mut self,
        kind: &ConstraintKind,
        body_a: BodyHandle,
        body_b: BodyHandle,
    ) -> Result<LinkHandle, EngineError>;

    fn remove_constraint(&mut self, handle: LinkHandle) -> Result<(), EngineError>;

    /// Advance the simulation by one tick.
    fn step(&mut self) -> Result<(), EngineError>;

    fn read_kinematics(&self, handle: BodyHandle) -> Result<Kinematics, EngineError>;

    /// Force applied during the next step only.
    fn apply_force(&mut self, handle: BodyHandle, force: Vec3) -> Result<(), EngineError>;

    fn set_position(&mut self, handle: BodyHandle, position: Vec3) -> Result<(), EngineError>;

    fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec3) -> Result<(), EngineError>;

    fn gravity(&self) -> Vec3;

    fn set_gravity(&mut self, gravity: Vec3);

    /// Simulated seconds since the last reset.
    fn simulation_time(&self) -> f64;

    /// Discard everything and return to the default scene.
    fn reset(&mut self);
}
