use crate::domain::tuning::{EngineTuning, TuningError};
use std::{
    env, fmt,
    net::{IpAddr, Ipv4Addr},
    path::PathBuf,
    time::Duration,
};

// Runtime/server constants (not physics tuning).

pub fn http_host() -> IpAddr {
    env::var("SIM_SERVER_HOST")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

pub fn http_port() -> u16 {
    env::var("SIM_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8001)
}

pub fn tick_rate_hz() -> u32 {
    env::var("SIM_TICK_RATE_HZ")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(DEFAULT_TICK_RATE_HZ)
        .clamp(1, MAX_TICK_RATE_HZ)
}

pub fn tick_interval() -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(tick_rate_hz()))
}

pub fn tuning_path() -> Option<PathBuf> {
    env::var_os("SIM_TUNING_PATH").map(PathBuf::from)
}

pub const DEFAULT_TICK_RATE_HZ: u32 = 60;
pub const MAX_TICK_RATE_HZ: u32 = 240;
pub const COMMAND_CHANNEL_CAPACITY: usize = 1024;
// Frames queued per client before it counts as lagging and gets pruned.
pub const CLIENT_FRAME_CAPACITY: usize = 64;
pub const PAUSED_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Tuning {
        path: PathBuf,
        source: TuningError,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            ConfigError::Tuning { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Engine tuning from `SIM_TUNING_PATH`, or the defaults when unset.
pub fn engine_tuning() -> Result<EngineTuning, ConfigError> {
    match tuning_path() {
        Some(path) => load_tuning(path),
        None => Ok(EngineTuning::default()),
    }
}

pub fn load_tuning(path: PathBuf) -> Result<EngineTuning, ConfigError> {
    let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    EngineTuning::from_toml_str(&raw).map_err(|source| ConfigError::Tuning { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_tuning_file_is_missing_then_read_error_names_the_path() {
        let err = load_tuning(PathBuf::from("/nonexistent/sim_tuning.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/sim_tuning.toml"));
    }

    #[test]
    fn when_tuning_file_is_valid_then_it_is_loaded() {
        let path = env::temp_dir().join(format!("sim_tuning_{}.toml", std::process::id()));
        std::fs::write(&path, "substeps = 2\nground_enabled = false\n").unwrap();

        let tuning = load_tuning(path.clone()).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(tuning.substeps, 2);
        assert!(!tuning.ground_enabled);
        assert_eq!(tuning.timestep, EngineTuning::default().timestep);
    }
}
