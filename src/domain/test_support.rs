use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::entities::{ConstraintKind, IDENTITY_ROTATION, Kinematics, Shape, Vec3};
use crate::domain::errors::EngineError;
use crate::domain::ports::{BodyHandle, LinkHandle, PhysicsEngine};

const TEST_DT: f64 = 1.0 / 60.0;

#[derive(Clone, Copy, Default)]
pub(crate) struct FailureFlags {
    /// Fail `create_body` once this many bodies have been created.
    pub create_body_after: Option<usize>,
    pub step: bool,
    /// Handle whose kinematics cannot be read.
    pub unreadable: Option<u64>,
}

// Counters shared with the test after the engine moves into a session.
#[derive(Clone, Default)]
pub(crate) struct EngineProbe {
    pub steps: Arc<AtomicUsize>,
    pub resets: Arc<AtomicUsize>,
}

impl EngineProbe {
    pub(crate) fn steps(&self) -> usize {
        self.steps.load(Ordering::SeqCst)
    }

    pub(crate) fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }
}

// Minimal engine that moves bodies by their velocity and records calls.
pub(crate) struct RecordingEngine {
    bodies: BTreeMap<u64, Kinematics>,
    links: BTreeMap<u64, (u64, u64)>,
    next_handle: u64,
    created_bodies: usize,
    gravity: Vec3,
    time: f64,
    failures: FailureFlags,
    probe: EngineProbe,
}

impl RecordingEngine {
    pub(crate) fn new() -> Self {
        Self {
            bodies: BTreeMap::new(),
            links: BTreeMap::new(),
            next_handle: 1,
            created_bodies: 0,
            gravity: [0.0; 3],
            time: 0.0,
            failures: FailureFlags::default(),
            probe: EngineProbe::default(),
        }
    }

    pub(crate) fn with_failures(mut self, failures: FailureFlags) -> Self {
        self.failures = failures;
        self
    }

    pub(crate) fn probe(&self) -> EngineProbe {
        self.probe.clone()
    }

    pub(crate) fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub(crate) fn link_count(&self) -> usize {
        self.links.len()
    }

    fn next(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut Kinematics, EngineError> {
        self.bodies
            .get_mut(&handle.0)
            .ok_or(EngineError::UnknownHandle(handle.0))
    }
}

impl PhysicsEngine for RecordingEngine {
    fn create_body(
        &mut self,
        _shape: &Shape,
        _mass: f64,
        position: Vec3,
        velocity: Option<Vec3>,
    ) -> Result<BodyHandle, EngineError> {
        if let Some(limit) = self.failures.create_body_after {
            if self.created_bodies >= limit {
                return Err(EngineError::NonFinite { what: "injected" });
            }
        }
        self.created_bodies += 1;
        let handle = self.next();
        self.bodies.insert(
            handle,
            Kinematics {
                position,
                rotation: IDENTITY_ROTATION,
                velocity: velocity.unwrap_or([0.0; 3]),
            },
        );
        Ok(BodyHandle(handle))
    }

    fn remove_body(&mut self, handle: BodyHandle) -> Result<(), EngineError> {
        self.bodies
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(EngineError::UnknownHandle(handle.0))
    }

    fn create_constraint(
        &mut self,
        _kind: &ConstraintKind,
        body_a: BodyHandle,
        body_b: BodyHandle,
    ) -> Result<LinkHandle, EngineError> {
        for handle in [body_a, body_b] {
            if !self.bodies.contains_key(&handle.0) {
                return Err(EngineError::UnknownHandle(handle.0));
            }
        }
        let handle = self.next();
        self.links.insert(handle, (body_a.0, body_b.0));
        Ok(LinkHandle(handle))
    }

    fn remove_constraint(&mut self, handle: LinkHandle) -> Result<(), EngineError> {
        self.links
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(EngineError::UnknownHandle(handle.0))
    }

    fn step(&mut self) -> Result<(), EngineError> {
        self.probe.steps.fetch_add(1, Ordering::SeqCst);
        if self.failures.step {
            return Err(EngineError::Diverged { handle: 0 });
        }
        for body in self.bodies.values_mut() {
            for axis in 0..3 {
                body.position[axis] += body.velocity[axis] * TEST_DT;
            }
        }
        self.time += TEST_DT;
        Ok(())
    }

    fn read_kinematics(&self, handle: BodyHandle) -> Result<Kinematics, EngineError> {
        if self.failures.unreadable == Some(handle.0) {
            return Err(EngineError::UnknownHandle(handle.0));
        }
        self.bodies
            .get(&handle.0)
            .copied()
            .ok_or(EngineError::UnknownHandle(handle.0))
    }

    fn apply_force(&mut self, handle: BodyHandle, force: Vec3) -> Result<(), EngineError> {
        let body = self.body_mut(handle)?;
        for axis in 0..3 {
            body.velocity[axis] += force[axis];
        }
        Ok(())
    }

    fn set_position(&mut self, handle: BodyHandle, position: Vec3) -> Result<(), EngineError> {
        self.body_mut(handle)?.position = position;
        Ok(())
    }

    fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec3) -> Result<(), EngineError> {
        self.body_mut(handle)?.velocity = velocity;
        Ok(())
    }

    fn gravity(&self) -> Vec3 {
        self.gravity
    }

    fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    fn simulation_time(&self) -> f64 {
        self.time
    }

    fn reset(&mut self) {
        self.probe.resets.fetch_add(1, Ordering::SeqCst);
        self.bodies.clear();
        self.links.clear();
        self.gravity = [0.0; 3];
        self.time = 0.0;
    }
}
