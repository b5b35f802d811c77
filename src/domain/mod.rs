// Domain layer: entities, the registry and procedural templates.

pub mod entities;
pub mod errors;
pub mod ports;
pub mod registry;
pub mod snapshot;
pub mod templates;
pub mod tuning;

#[cfg(test)]
pub(crate) mod test_support;

pub use entities::{BodySpec, ConstraintKind, ConstraintSpec, Metadata, Shape, Vec3};
pub use errors::{EngineError, SimError};
pub use ports::PhysicsEngine;
pub use registry::EntityRegistry;
pub use snapshot::{BodyState, Metrics, Snapshot};
pub use templates::{Template, TemplateReport};
pub use tuning::EngineTuning;
