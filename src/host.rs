//! Process environment captured once at startup

use std::env;
use std::path::PathBuf;

/// Values read from the process environment when the launcher starts.
///
/// Everything downstream takes this snapshot as a plain value, so parameter
/// resolution never reads the environment behind the caller's back and tests
/// can construct arbitrary host states.
#[derive(Debug, Clone, Default)]
pub struct HostEnv {
    /// Login name from USER
    pub user: Option<String>,

    /// Home directory from HOME
    pub home: Option<PathBuf>,

    /// Active Conda environment from CONDA_DEFAULT_ENV
    pub conda_env: Option<String>,
}

impl HostEnv {
    /// Capture the current process environment.
    pub fn capture() -> Self {
        Self {
            user: env::var("USER").ok(),
            home: env::var("HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(dirs::home_dir),
            conda_env: env::var("CONDA_DEFAULT_ENV").ok(),
        }
    }
}
