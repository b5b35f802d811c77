// Entity registry: the single source of truth for which bodies and constraints exist.

use crate::domain::entities::{
    BodyRecord, BodySpec, ConstraintRecord, ConstraintSpec, Kinematics, Vec3, finite_vec,
};
use crate::domain::errors::{EngineError, SimError};
use crate::domain::ports::{BodyHandle, PhysicsEngine};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Maps stable string identifiers to engine objects, in insertion order.
pub struct EntityRegistry<E> {
    engine: E,
    bodies: HashMap<String, BodyRecord>,
    body_order: Vec<String>,
    constraints: HashMap<String, ConstraintRecord>,
    constraint_order: Vec<String>,
    next_body_seq: u64,
    next_constraint_seq: u64,
}

impl<E: PhysicsEngine> EntityRegistry<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            bodies: HashMap::new(),
            body_order: Vec::new(),
            constraints: HashMap::new(),
            constraint_order: Vec::new(),
            next_body_seq: 0,
            next_constraint_seq: 0,
        }
    }

    /// Creates a body and returns its identifier.
    ///
    /// Bodies without an explicit id get the next free `body_<n>`.
    pub fn create_body(&mut self, spec: BodySpec) -> Result<String, SimError> {
        spec.validate()?;
        let id = match spec.id {
            Some(id) if self.bodies.contains_key(&id) => {
                return Err(SimError::DuplicateEntity { id });
            }
            Some(id) => id,
            None => self.next_body_id(),
        };

        let handle = self
            .engine
            .create_body(&spec.shape, spec.mass, spec.position, spec.velocity)?;

        self.bodies.insert(
            id.clone(),
            BodyRecord {
                id: id.clone(),
                shape: spec.shape,
                mass: spec.mass,
                handle,
                metadata: Arc::new(spec.metadata),
            },
        );
        self.body_order.push(id.clone());
        debug!(body_id = %id, shape = spec.shape.kind(), "body created");
        Ok(id)
    }

    /// Removes a body and every constraint that references it.
    ///
    /// Returns the ids of the cascaded constraints.
    pub fn remove_body(&mut self, id: &str) -> Result<Vec<String>, SimError> {
        let handle = match self.bodies.get(id) {
            Some(record) => record.handle,
            None => return Err(SimError::NotFound { id: id.to_string() }),
        };
        self.engine.remove_body(handle)?;

        let cascaded: Vec<String> = self
            .constraint_order
            .iter()
            .filter(|cid| {
                self.constraints
                    .get(cid.as_str())
                    .is_some_and(|c| c.references(id))
            })
            .cloned()
            .collect();
        for cid in &cascaded {
            if let Some(record) = self.constraints.remove(cid) {
                // The body is already gone from the engine; the link is invalid either way.
                if let Err(err) = self.engine.remove_constraint(record.handle) {
                    warn!(constraint_id = %cid, error = %err, "engine kept cascaded constraint");
                }
            }
        }
        self.constraint_order.retain(|cid| !cascaded.contains(cid));

        self.bodies.remove(id);
        self.body_order.retain(|bid| bid != id);
        debug!(body_id = %id, cascaded = cascaded.len(), "body removed");
        Ok(cascaded)
    }

    pub fn create_constraint(&mut self, spec: ConstraintSpec) -> Result<String, SimError> {
        spec.validate()?;
        if let Some(id) = &spec.id {
            if self.constraints.contains_key(id) {
                return Err(SimError::DuplicateEntity { id: id.clone() });
            }
        }
        let handle_a = self.endpoint(&spec.body_a)?;
        let handle_b = self.endpoint(&spec.body_b)?;

        let handle = self
            .engine
            .create_constraint(&spec.kind, handle_a, handle_b)?;
        let id = match spec.id {
            Some(id) => id,
            None => self.next_constraint_id(),
        };

        self.constraints.insert(
            id.clone(),
            ConstraintRecord {
                id: id.clone(),
                kind: spec.kind,
                body_a: spec.body_a,
                body_b: spec.body_b,
                handle,
                metadata: Arc::new(spec.metadata),
            },
        );
        self.constraint_order.push(id.clone());
        debug!(constraint_id = %id, kind = spec.kind.kind(), "constraint created");
        Ok(id)
    }

    pub fn remove_constraint(&mut self, id: &str) -> Result<(), SimError> {
        let handle = match self.constraints.get(id) {
            Some(record) => record.handle,
            None => return Err(SimError::NotFound { id: id.to_string() }),
        };
        self.engine.remove_constraint(handle)?;
        self.constraints.remove(id);
        self.constraint_order.retain(|cid| cid != id);
        Ok(())
    }

    /// Body ids in insertion order.
    pub fn list_bodies(&self) -> Vec<String> {
        self.body_order.clone()
    }

    /// Constraint ids in insertion order.
    pub fn list_constraints(&self) -> Vec<String> {
        self.constraint_order.clone()
    }

    pub fn bodies(&self) -> impl Iterator<Item = &BodyRecord> {
        self.body_order.iter().filter_map(|id| self.bodies.get(id))
    }

    pub fn constraints(&self) -> impl Iterator<Item = &ConstraintRecord> {
        self.constraint_order
            .iter()
            .filter_map(|id| self.constraints.get(id))
    }

    #[cfg(test)]
    pub(crate) fn body(&self, id: &str) -> Option<&BodyRecord> {
        self.bodies.get(id)
    }

    pub fn contains_body(&self, id: &str) -> bool {
        self.bodies.contains_key(id)
    }

    pub fn contains_constraint(&self, id: &str) -> bool {
        self.constraints.contains_key(id)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    // Kinematic commands return Ok(false) for unknown ids so stale clients do not error.

    pub fn apply_force(&mut self, id: &str, force: Vec3) -> Result<bool, SimError> {
        finite_vec("force", force)?;
        let Some(handle) = self.handle_of(id) else {
            return Ok(false);
        };
        self.engine.apply_force(handle, force)?;
        Ok(true)
    }

    pub fn set_position(&mut self, id: &str, position: Vec3) -> Result<bool, SimError> {
        finite_vec("position", position)?;
        let Some(handle) = self.handle_of(id) else {
            return Ok(false);
        };
        self.engine.set_position(handle, position)?;
        Ok(true)
    }

    pub fn set_velocity(&mut self, id: &str, velocity: Vec3) -> Result<bool, SimError> {
        finite_vec("velocity", velocity)?;
        let Some(handle) = self.handle_of(id) else {
            return Ok(false);
        };
        self.engine.set_velocity(handle, velocity)?;
        Ok(true)
    }

    pub fn kinematics(&self, record: &BodyRecord) -> Result<Kinematics, EngineError> {
        self.engine.read_kinematics(record.handle)
    }

    pub fn step(&mut self) -> Result<(), EngineError> {
        self.engine.step()
    }

    pub fn gravity(&self) -> Vec3 {
        self.engine.gravity()
    }

    pub fn set_gravity(&mut self, gravity: Vec3) -> Result<(), SimError> {
        finite_vec("gravity", gravity)?;
        self.engine.set_gravity(gravity);
        Ok(())
    }

    pub fn simulation_time(&self) -> f64 {
        self.engine.simulation_time()
    }

    /// Drops every entity and returns the engine to its default scene.
    pub fn reset(&mut self) {
        self.bodies.clear();
        self.body_order.clear();
        self.constraints.clear();
        self.constraint_order.clear();
        self.next_body_seq = 0;
        self.next_constraint_seq = 0;
        self.engine.reset();
    }

    #[cfg(test)]
    pub(crate) fn engine(&self) -> &E {
        &self.engine
    }

    fn handle_of(&self, id: &str) -> Option<BodyHandle> {
        self.bodies.get(id).map(|record| record.handle)
    }

    fn endpoint(&self, id: &str) -> Result<BodyHandle, SimError> {
        self.handle_of(id)
            .ok_or_else(|| SimError::UnknownBody { id: id.to_string() })
    }

    fn next_body_id(&mut self) -> String {
        loop {
            let id = format!("body_{}", self.next_body_seq);
            self.next_body_seq += 1;
            if !self.bodies.contains_key(&id) {
                return id;
            }
        }
    }

    fn next_constraint_id(&mut self) -> String {
        loop {
            let id = format!("constraint_{}", self.next_constraint_seq);
            self.next_constraint_seq += 1;
            if !self.constraints.contains_key(&id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::ConstraintKind;
    use crate::domain::test_support::{FailureFlags, RecordingEngine};

    fn registry() -> EntityRegistry<RecordingEngine> {
        EntityRegistry::new(RecordingEngine::new())
    }

    fn spring(a: &str, b: &str) -> ConstraintSpec {
        ConstraintSpec::new(ConstraintKind::spring(100.0, 1.0), a, b)
    }

    #[test]
    fn when_bodies_have_no_id_then_sequential_ids_are_assigned() {
        let mut registry = registry();
        let first = registry
            .create_body(BodySpec::sphere(1.0, 1.0, [0.0; 3]))
            .unwrap();
        let second = registry
            .create_body(BodySpec::sphere(1.0, 1.0, [1.0, 0.0, 0.0]))
            .unwrap();
        assert_eq!(first, "body_0");
        assert_eq!(second, "body_1");
    }

    #[test]
    fn when_fallback_id_is_taken_then_next_free_id_is_used() {
        let mut registry = registry();
        registry
            .create_body(BodySpec::sphere(1.0, 1.0, [0.0; 3]).with_id("body_0"))
            .unwrap();
        let id = registry
            .create_body(BodySpec::sphere(1.0, 1.0, [0.0; 3]))
            .unwrap();
        assert_eq!(id, "body_1");
        assert_eq!(registry.body_count(), 2);
    }

    #[test]
    fn when_explicit_id_is_duplicated_then_state_is_unchanged() {
        let mut registry = registry();
        registry
            .create_body(BodySpec::sphere(1.0, 1.0, [0.0; 3]).with_id("atom"))
            .unwrap();

        let err = registry
            .create_body(BodySpec::sphere(2.0, 3.0, [5.0; 3]).with_id("atom"))
            .unwrap_err();

        assert_eq!(err, SimError::DuplicateEntity { id: "atom".into() });
        assert_eq!(registry.body_count(), 1);
        assert_eq!(registry.engine().body_count(), 1);
        assert_eq!(registry.body("atom").unwrap().mass, 1.0);
    }

    #[test]
    fn when_body_without_constraints_is_removed_then_only_it_goes() {
        let mut registry = registry();
        registry
            .create_body(BodySpec::sphere(1.0, 1.0, [0.0; 3]).with_id("lonely"))
            .unwrap();
        registry
            .create_body(BodySpec::sphere(1.0, 1.0, [0.0; 3]).with_id("other"))
            .unwrap();

        let cascaded = registry.remove_body("lonely").unwrap();

        assert!(cascaded.is_empty());
        assert_eq!(registry.list_bodies(), vec!["other".to_string()]);
    }

    #[test]
    fn when_body_is_removed_then_referencing_constraints_cascade() {
        let mut registry = registry();
        for id in ["hub", "a", "b", "c"] {
            registry
                .create_body(BodySpec::sphere(1.0, 1.0, [0.0; 3]).with_id(id))
                .unwrap();
        }
        registry.create_constraint(spring("hub", "a")).unwrap();
        registry.create_constraint(spring("b", "hub")).unwrap();
        registry.create_constraint(spring("hub", "c")).unwrap();
        let kept = registry.create_constraint(spring("a", "b")).unwrap();

        let cascaded = registry.remove_body("hub").unwrap();

        assert_eq!(cascaded.len(), 3);
        assert!(!registry.contains_body("hub"));
        assert_eq!(registry.list_constraints(), vec![kept]);
        assert!(registry.constraints().all(|c| !c.references("hub")));
        assert_eq!(registry.engine().link_count(), 1);
    }

    #[test]
    fn when_removed_body_is_missing_then_not_found() {
        let mut registry = registry();
        assert_eq!(
            registry.remove_body("ghost"),
            Err(SimError::NotFound { id: "ghost".into() })
        );
    }

    #[test]
    fn when_constraint_endpoint_is_missing_then_unknown_body() {
        let mut registry = registry();
        registry
            .create_body(BodySpec::sphere(1.0, 1.0, [0.0; 3]).with_id("a"))
            .unwrap();

        let err = registry.create_constraint(spring("a", "ghost")).unwrap_err();

        assert_eq!(err, SimError::UnknownBody { id: "ghost".into() });
        assert_eq!(registry.constraint_count(), 0);
        assert_eq!(registry.engine().link_count(), 0);
    }

    #[test]
    fn when_constraint_is_removed_twice_then_second_call_is_not_found() {
        let mut registry = registry();
        for id in ["a", "b"] {
            registry
                .create_body(BodySpec::sphere(1.0, 1.0, [0.0; 3]).with_id(id))
                .unwrap();
        }
        let id = registry.create_constraint(spring("a", "b")).unwrap();
        assert_eq!(id, "constraint_0");

        registry.remove_constraint(&id).unwrap();
        assert!(matches!(
            registry.remove_constraint(&id),
            Err(SimError::NotFound { .. })
        ));
    }

    #[test]
    fn when_listing_then_insertion_order_is_preserved() {
        let mut registry = registry();
        for id in ["zeta", "alpha", "mid"] {
            registry
                .create_body(BodySpec::sphere(1.0, 1.0, [0.0; 3]).with_id(id))
                .unwrap();
        }
        registry.remove_body("alpha").unwrap();
        registry
            .create_body(BodySpec::sphere(1.0, 1.0, [0.0; 3]).with_id("alpha"))
            .unwrap();
        assert_eq!(registry.list_bodies(), vec!["zeta", "mid", "alpha"]);
    }

    #[test]
    fn when_kinematic_command_targets_unknown_body_then_it_is_a_no_op() {
        let mut registry = registry();
        assert_eq!(registry.apply_force("ghost", [1.0, 0.0, 0.0]), Ok(false));
        assert_eq!(registry.set_position("ghost", [1.0, 0.0, 0.0]), Ok(false));
        assert_eq!(registry.set_velocity("ghost", [1.0, 0.0, 0.0]), Ok(false));
    }

    #[test]
    fn when_kinematic_command_is_not_finite_then_invalid_parameter() {
        let mut registry = registry();
        registry
            .create_body(BodySpec::sphere(1.0, 1.0, [0.0; 3]).with_id("a"))
            .unwrap();
        let err = registry.set_velocity("a", [f64::NAN, 0.0, 0.0]).unwrap_err();
        assert_eq!(err.kind(), "InvalidParameter");
    }

    #[test]
    fn when_engine_rejects_body_then_nothing_is_stored() {
        let engine = RecordingEngine::new().with_failures(FailureFlags {
            create_body_after: Some(0),
            ..FailureFlags::default()
        });
        let mut registry = EntityRegistry::new(engine);

        let err = registry
            .create_body(BodySpec::sphere(1.0, 1.0, [0.0; 3]).with_id("a"))
            .unwrap_err();

        assert_eq!(err.kind(), "EngineFailure");
        assert_eq!(registry.body_count(), 0);
        assert!(registry.list_bodies().is_empty());
    }

    #[test]
    fn when_reset_then_everything_is_cleared_and_ids_restart() {
        let mut registry = registry();
        for _ in 0..3 {
            registry
                .create_body(BodySpec::sphere(1.0, 1.0, [0.0; 3]))
                .unwrap();
        }
        registry.create_constraint(spring("body_0", "body_1")).unwrap();

        registry.reset();

        assert_eq!(registry.body_count(), 0);
        assert_eq!(registry.constraint_count(), 0);
        assert_eq!(registry.engine().body_count(), 0);
        let id = registry
            .create_body(BodySpec::sphere(1.0, 1.0, [0.0; 3]))
            .unwrap();
        assert_eq!(id, "body_0");
    }
}
