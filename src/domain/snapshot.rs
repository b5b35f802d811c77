// Immutable per-tick projection of the session state.

use crate::domain::entities::{Metadata, Quat, Vec3};
use crate::domain::errors::EngineError;
use crate::domain::ports::PhysicsEngine;
use crate::domain::registry::EntityRegistry;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct BodyState {
    pub id: String,
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub metadata: Arc<Metadata>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    /// Measured ticks per second.
    pub fps: f64,
    pub body_count: usize,
    pub constraint_count: usize,
    /// Simulated seconds since the last reset.
    pub simulation_time: f64,
}

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub tick: u64,
    /// Wall-clock seconds since the Unix epoch.
    pub timestamp: f64,
    pub bodies: Vec<BodyState>,
    pub metrics: Metrics,
}

impl Snapshot {
    /// Reads every registry-known body at this instant.
    ///
    /// Bodies whose kinematics cannot be read are left out and returned alongside.
    pub fn capture<E: PhysicsEngine>(
        registry: &EntityRegistry<E>,
        tick: u64,
        fps: f64,
    ) -> (Self, Vec<(String, EngineError)>) {
        let mut bodies = Vec::with_capacity(registry.body_count());
        let mut unreadable = Vec::new();
        for record in registry.bodies() {
            match registry.kinematics(record) {
                Ok(k) => bodies.push(BodyState {
                    id: record.id.clone(),
                    position: k.position,
                    rotation: k.rotation,
                    velocity: k.velocity,
                    metadata: record.metadata.clone(),
                }),
                Err(err) => unreadable.push((record.id.clone(), err)),
            }
        }

        let snapshot = Self {
            tick,
            timestamp: epoch_seconds(),
            bodies,
            metrics: Metrics {
                fps,
                body_count: registry.body_count(),
                constraint_count: registry.constraint_count(),
                simulation_time: registry.simulation_time(),
            },
        };
        (snapshot, unreadable)
    }
}

fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
