// Use-case level inputs/outputs for the simulation session.

use crate::domain::{BodySpec, ConstraintSpec, SimError, Snapshot, TemplateReport, Vec3};
use axum::extract::ws::Utf8Bytes;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// One-shot reply channel for a command that can fail.
pub type Reply<T> = oneshot::Sender<Result<T, SimError>>;

/// Serializes a snapshot once for every attached client.
pub type SnapshotEncoder = fn(&Snapshot) -> Result<Utf8Bytes, serde_json::Error>;

/// Identifies one attached client channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u64);

impl ClientId {
    /// Returns a process-unique, monotonically increasing id.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        ClientId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
    Paused,
}

impl LoopState {
    pub fn as_str(self) -> &'static str {
        match self {
            LoopState::Stopped => "stopped",
            LoopState::Running => "running",
            LoopState::Paused => "paused",
        }
    }
}

/// Commands processed by the session task, one at a time.
#[derive(Debug)]
pub enum SessionCommand {
    Attach {
        client: ClientId,
        frames: mpsc::Sender<Utf8Bytes>,
    },
    Detach {
        client: ClientId,
    },
    ApplyForce {
        body_id: String,
        force: Vec3,
    },
    SetPosition {
        body_id: String,
        position: Vec3,
    },
    SetVelocity {
        body_id: String,
        velocity: Vec3,
    },
    Pause {
        reply: Reply<LoopState>,
    },
    Resume {
        reply: Reply<LoopState>,
    },
    Reset {
        reply: Reply<LoopState>,
    },
    SetGravity {
        gravity: Vec3,
        reply: Reply<Vec3>,
    },
    AddBody {
        spec: BodySpec,
        reply: Reply<String>,
    },
    RemoveBody {
        body_id: String,
        reply: Reply<Vec<String>>,
    },
    AddConstraint {
        spec: ConstraintSpec,
        reply: Reply<String>,
    },
    LoadTemplate {
        name: String,
        params: Map<String, Value>,
        reply: Reply<TemplateReport>,
    },
    Status {
        reply: Reply<SessionStatus>,
    },
    Shutdown,
}

/// Shared configuration for spawning the session task.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Capacity for inbound session commands.
    pub command_capacity: usize,
    /// Target period between tick starts.
    pub tick_interval: Duration,
    /// Idle poll interval while paused or stopped.
    pub paused_poll: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub state: LoopState,
    pub tick: u64,
    pub body_count: usize,
    pub constraint_count: usize,
    pub clients: usize,
    pub simulation_time: f64,
}
