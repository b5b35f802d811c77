//! Numerical tuning for the built-in physics engine.
//!
//! Keep this separate from runtime/server configuration (ports, tick rates, buffer sizes).
//! Every field may be omitted from a TOML tuning file.

use crate::domain::entities::Vec3;
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineTuning {
    /// Integration timestep in simulated seconds.
    pub timestep: f64,

    /// Integration substeps per engine step (one step per session tick).
    pub substeps: u32,

    /// Gravity after a reset. Molecular scenes run without gravity.
    pub gravity: Vec3,

    /// Linear velocity damping per simulated second (medium viscosity).
    pub linear_damping: f64,

    /// Projection passes for rigid distance links per substep.
    pub constraint_iterations: u32,

    /// Static ground plane of the default scene.
    pub ground_enabled: bool,
    pub ground_height: f64,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            timestep: 0.001,
            substeps: 16,
            gravity: [0.0, 0.0, 0.0],
            linear_damping: 0.0001,
            constraint_iterations: 8,
            ground_enabled: true,
            ground_height: -5.0,
        }
    }
}

#[derive(Debug)]
pub enum TuningError {
    Parse(toml::de::Error),
    Invalid(&'static str),
}

impl fmt::Display for TuningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TuningError::Parse(err) => write!(f, "failed to parse tuning file: {err}"),
            TuningError::Invalid(reason) => write!(f, "invalid tuning: {reason}"),
        }
    }
}

impl std::error::Error for TuningError {}

impl EngineTuning {
    pub fn from_toml_str(raw: &str) -> Result<Self, TuningError> {
        let tuning: Self = toml::from_str(raw).map_err(TuningError::Parse)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        if !(self.timestep.is_finite() && self.timestep > 0.0) {
            return Err(TuningError::Invalid("timestep must be > 0"));
        }
        if self.substeps == 0 {
            return Err(TuningError::Invalid("substeps must be >= 1"));
        }
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err(TuningError::Invalid("gravity must be finite"));
        }
        if !(self.linear_damping.is_finite() && self.linear_damping >= 0.0) {
            return Err(TuningError::Invalid("linear_damping must be >= 0"));
        }
        if !self.ground_height.is_finite() {
            return Err(TuningError::Invalid("ground_height must be finite"));
        }
        Ok(())
    }

    /// Simulated seconds covered by one engine step.
    pub fn step_duration(&self) -> f64 {
        self.timestep * f64::from(self.substeps)
    }
}
