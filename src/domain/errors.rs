// Domain-level errors for registry, template and engine workflows.

use std::fmt;

/// Failures surfaced by the physics engine behind the adapter port.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The handle does not refer to a live engine object.
    UnknownHandle(u64),
    /// An input vector or scalar was NaN or infinite.
    NonFinite { what: &'static str },
    /// Integration produced non-finite state for a body.
    Diverged { handle: u64 },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::UnknownHandle(handle) => write!(f, "unknown engine handle {handle}"),
            EngineError::NonFinite { what } => write!(f, "{what} must be finite"),
            EngineError::Diverged { handle } => {
                write!(f, "simulation diverged for engine body {handle}")
            }
        }
    }
}

impl std::error::Error for EngineError {}

/// Errors reported back to the client that issued a command.
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    DuplicateEntity { id: String },
    NotFound { id: String },
    UnknownBody { id: String },
    InvalidParameter { name: String, reason: String },
    UnknownTemplate { name: String },
    UnknownCommand { command: String },
    EngineFailure(EngineError),
    /// The session task has stopped and no longer accepts commands.
    SessionClosed,
}

impl SimError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        SimError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable kind used in error replies.
    pub fn kind(&self) -> &'static str {
        match self {
            SimError::DuplicateEntity { .. } => "DuplicateEntity",
            SimError::NotFound { .. } => "NotFound",
            SimError::UnknownBody { .. } => "UnknownBody",
            SimError::InvalidParameter { .. } => "InvalidParameter",
            SimError::UnknownTemplate { .. } => "UnknownTemplate",
            SimError::UnknownCommand { .. } => "UnknownCommand",
            SimError::EngineFailure(_) => "EngineFailure",
            SimError::SessionClosed => "SessionClosed",
        }
    }
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::DuplicateEntity { id } => write!(f, "entity '{id}' already exists"),
            SimError::NotFound { id } => write!(f, "entity '{id}' not found"),
            SimError::UnknownBody { id } => write!(f, "body '{id}' does not exist"),
            SimError::InvalidParameter { name, reason } => {
                write!(f, "invalid parameter '{name}': {reason}")
            }
            SimError::UnknownTemplate { name } => write!(f, "unknown template '{name}'"),
            SimError::UnknownCommand { command } => write!(f, "unknown command '{command}'"),
            SimError::EngineFailure(err) => write!(f, "engine failure: {err}"),
            SimError::SessionClosed => write!(f, "simulation session is not running"),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::EngineFailure(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EngineError> for SimError {
    fn from(err: EngineError) -> Self {
        SimError::EngineFailure(err)
    }
}
