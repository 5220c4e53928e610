//! Error types for the launch pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving launch parameters, staging a workspace, or
/// submitting a job.
///
/// Every variant is fatal: the pipeline stops at the first error and leaves
/// anything already staged or written on disk for inspection.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The configured GPU type is not one of the recognized categories
    #[error("unknown GPU type '{0}': expected a100, a6000, or either")]
    UnknownGpuType(String),

    /// An explicitly requested cluster is not in the registry
    #[error("unknown cluster '{0}'")]
    UnknownCluster(String),

    /// Detection ran but no registered cluster matched this host
    #[error("no known cluster matches this host")]
    NoClusterMatched,

    /// The process is not running inside the required Conda environment
    #[error("expected Conda environment '{expected}' to be active, found '{actual}'")]
    WrongEnvironment { expected: String, actual: String },

    /// A required environment variable was not set when the launcher started
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),

    /// Deep-copying the code directory into the staging area failed
    #[error("failed to stage '{}' as '{}': {source}", .from.display(), .to.display())]
    Stage {
        from: PathBuf,
        to: PathBuf,
        source: fs_extra::error::Error,
    },

    /// The import-rewrite utility exited with a non-zero status
    #[error("import rewrite exited with code {code}: {stderr}")]
    Rewrite { code: i32, stderr: String },

    /// sbatch exited with a non-zero status
    #[error("sbatch exited with code {code}: {stderr}")]
    Submit { code: i32, stderr: String },

    /// sbatch succeeded but its output did not contain a job ID
    #[error("could not find a job ID in sbatch output: {0}")]
    ParseJobId(String),

    /// An external program could not be started at all
    #[error("failed to run '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Regex(#[from] regex::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LaunchError {
    /// Process exit code for this error.
    ///
    /// Submission failures carry sbatch's own exit code; everything else
    /// exits 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            LaunchError::Submit { code, .. } if *code > 0 => *code,
            _ => 1,
        }
    }
}
