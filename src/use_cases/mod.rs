// Use cases layer: the simulation session and its control surface.

pub mod broadcast;
pub mod handle;
pub mod session;
pub mod types;

pub use handle::SessionHandle;
pub use types::{ClientId, LoopState, SessionSettings, SessionStatus, SnapshotEncoder};
