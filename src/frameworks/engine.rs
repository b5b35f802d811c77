// Built-in point-mass engine behind the physics engine port.

use crate::domain::entities::{ConstraintKind, IDENTITY_ROTATION, Kinematics, Shape, Vec3};
use crate::domain::errors::EngineError;
use crate::domain::ports::{BodyHandle, LinkHandle, PhysicsEngine};
use crate::domain::tuning::EngineTuning;
use std::collections::BTreeMap;
use tracing::debug;

// Links shorter than this have no usable direction.
const MIN_LINK_LENGTH: f64 = 1e-9;

#[derive(Debug, Clone)]
struct PointBody {
    position: Vec3,
    velocity: Vec3,
    // External force for the next step only.
    force: Vec3,
    // 0 for static bodies.
    inv_mass: f64,
    half_height: f64,
}

#[derive(Debug, Clone, Copy)]
struct Link {
    kind: ConstraintKind,
    a: u64,
    b: u64,
}

/// Semi-implicit Euler integration of point masses with damped springs and
/// position-projected rigid links.
pub struct PointMassEngine {
    tuning: EngineTuning,
    bodies: BTreeMap<u64, PointBody>,
    links: BTreeMap<u64, Link>,
    next_handle: u64,
    gravity: Vec3,
    time: f64,
}

impl PointMassEngine {
    pub fn new(tuning: EngineTuning) -> Self {
        Self {
            gravity: tuning.gravity,
            tuning,
            bodies: BTreeMap::new(),
            links: BTreeMap::new(),
            next_handle: 1,
            time: 0.0,
        }
    }

    fn next(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut PointBody, EngineError> {
        self.bodies
            .get_mut(&handle.0)
            .ok_or(EngineError::UnknownHandle(handle.0))
    }

    fn substep(&mut self, dt: f64) {
        let mut forces: BTreeMap<u64, Vec3> = self
            .bodies
            .iter()
            .map(|(&handle, body)| (handle, body.force))
            .collect();

        for link in self.links.values() {
            let ConstraintKind::Spring {
                stiffness,
                damping,
                rest_length,
            } = link.kind
            else {
                continue;
            };
            let (Some(a), Some(b)) = (self.bodies.get(&link.a), self.bodies.get(&link.b)) else {
                continue;
            };
            let delta = sub(b.position, a.position);
            let length = norm(delta);
            if length < MIN_LINK_LENGTH {
                continue;
            }
            let dir = scale(delta, 1.0 / length);
            let closing = dot(sub(b.velocity, a.velocity), dir);
            let magnitude = stiffness * (length - rest_length) + damping * closing;
            let pull = scale(dir, magnitude);
            if let Some(f) = forces.get_mut(&link.a) {
                *f = add(*f, pull);
            }
            if let Some(f) = forces.get_mut(&link.b) {
                *f = sub(*f, pull);
            }
        }

        let drag = 1.0 / (1.0 + self.tuning.linear_damping * dt);
        let mut previous: BTreeMap<u64, Vec3> = BTreeMap::new();
        for (handle, body) in self.bodies.iter_mut() {
            if body.inv_mass == 0.0 {
                continue;
            }
            previous.insert(*handle, body.position);
            let force = forces.get(handle).copied().unwrap_or([0.0; 3]);
            let accel = add(self.gravity, scale(force, body.inv_mass));
            body.velocity = scale(add(body.velocity, scale(accel, dt)), drag);
            body.position = add(body.position, scale(body.velocity, dt));
        }

        self.project_links();

        if self.tuning.ground_enabled {
            for body in self.bodies.values_mut() {
                let floor = self.tuning.ground_height + body.half_height;
                if body.inv_mass > 0.0 && body.position[1] < floor {
                    body.position[1] = floor;
                }
            }
        }

        // Corrections from links and the ground feed back into velocity.
        for (handle, start) in previous {
            if let Some(body) = self.bodies.get_mut(&handle) {
                body.velocity = scale(sub(body.position, start), 1.0 / dt);
            }
        }
    }

    fn project_links(&mut self) {
        for _ in 0..self.tuning.constraint_iterations {
            for link in self.links.values() {
                let ConstraintKind::Distance { distance } = link.kind else {
                    continue;
                };
                let (Some(a), Some(b)) = (self.bodies.get(&link.a), self.bodies.get(&link.b))
                else {
                    continue;
                };
                let weight = a.inv_mass + b.inv_mass;
                if weight == 0.0 {
                    continue;
                }
                let delta = sub(b.position, a.position);
                let length = norm(delta);
                if length < MIN_LINK_LENGTH {
                    continue;
                }
                let correction = scale(delta, (length - distance) / (length * weight));
                let (inv_a, inv_b) = (a.inv_mass, b.inv_mass);
                if let Some(a) = self.bodies.get_mut(&link.a) {
                    a.position = add(a.position, scale(correction, inv_a));
                }
                if let Some(b) = self.bodies.get_mut(&link.b) {
                    b.position = sub(b.position, scale(correction, inv_b));
                }
            }
        }
    }
}

impl PhysicsEngine for PointMassEngine {
    fn create_body(
        &mut self,
        shape: &Shape,
        mass: f64,
        position: Vec3,
        velocity: Option<Vec3>,
    ) -> Result<BodyHandle, EngineError> {
        let velocity = velocity.unwrap_or([0.0; 3]);
        if !finite(position) || !finite(velocity) {
            return Err(EngineError::NonFinite {
                what: "initial state",
            });
        }
        if !(mass.is_finite() && mass >= 0.0) {
            return Err(EngineError::NonFinite { what: "mass" });
        }
        let handle = self.next();
        self.bodies.insert(
            handle,
            PointBody {
                position,
                velocity,
                force: [0.0; 3],
                inv_mass: if mass > 0.0 { 1.0 / mass } else { 0.0 },
                half_height: shape.half_height(),
            },
        );
        Ok(BodyHandle(handle))
    }

    // Links touching the body stay until removed and are skipped meanwhile.
    fn remove_body(&mut self, handle: BodyHandle) -> Result<(), EngineError> {
        self.bodies
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(EngineError::UnknownHandle(handle.0))
    }

    fn create_constraint(
        &mut self,
        kind: &ConstraintKind,
        body_a: BodyHandle,
        body_b: BodyHandle,
    ) -> Result<LinkHandle, EngineError> {
        for handle in [body_a, body_b] {
            if !self.bodies.contains_key(&handle.0) {
                return Err(EngineError::UnknownHandle(handle.0));
            }
        }
        let handle = self.next();
        self.links.insert(
            handle,
            Link {
                kind: *kind,
                a: body_a.0,
                b: body_b.0,
            },
        );
        Ok(LinkHandle(handle))
    }

    fn remove_constraint(&mut self, handle: LinkHandle) -> Result<(), EngineError> {
        self.links
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(EngineError::UnknownHandle(handle.0))
    }

    fn step(&mut self) -> Result<(), EngineError> {
        let dt = self.tuning.timestep;
        for _ in 0..self.tuning.substeps {
            self.substep(dt);
        }
        for body in self.bodies.values_mut() {
            body.force = [0.0; 3];
        }
        self.time += self.tuning.step_duration();

        match self
            .bodies
            .iter()
            .find(|(_, body)| !finite(body.position) || !finite(body.velocity))
        {
            Some((&handle, _)) => Err(EngineError::Diverged { handle }),
            None => Ok(()),
        }
    }

    fn read_kinematics(&self, handle: BodyHandle) -> Result<Kinematics, EngineError> {
        let body = self
            .bodies
            .get(&handle.0)
            .ok_or(EngineError::UnknownHandle(handle.0))?;
        Ok(Kinematics {
            position: body.position,
            rotation: IDENTITY_ROTATION,
            velocity: body.velocity,
        })
    }

    fn apply_force(&mut self, handle: BodyHandle, force: Vec3) -> Result<(), EngineError> {
        if !finite(force) {
            return Err(EngineError::NonFinite { what: "force" });
        }
        let body = self.body_mut(handle)?;
        body.force = add(body.force, force);
        Ok(())
    }

    fn set_position(&mut self, handle: BodyHandle, position: Vec3) -> Result<(), EngineError> {
        if !finite(position) {
            return Err(EngineError::NonFinite { what: "position" });
        }
        self.body_mut(handle)?.position = position;
        Ok(())
    }

    fn set_velocity(&mut self, handle: BodyHandle, velocity: Vec3) -> Result<(), EngineError> {
        if !finite(velocity) {
            return Err(EngineError::NonFinite { what: "velocity" });
        }
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
        debug!(
            bodies = self.bodies.len(),
            links = self.links.len(),
            "engine reset"
        );
        self.bodies.clear();
        self.links.clear();
        self.next_handle = 1;
        self.gravity = self.tuning.gravity;
        self.time = 0.0;
    }
}

fn finite(v: Vec3) -> bool {
    v.iter().all(|c| c.is_finite())
}

fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn scale(v: Vec3, s: f64) -> Vec3 {
    [v[0] * s, v[1] * s, v[2] * s]
}

fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn norm(v: Vec3) -> f64 {
    dot(v, v).sqrt()
}
