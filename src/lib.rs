//! Environment-aware Slurm launcher for ML training experiments
//!
//! kickoff detects which cluster it is running on, resolves node and
//! resource parameters for the requested GPU type, stages a private copy of
//! the code directory, rewrites imports in the copy, and submits a rendered
//! batch script with sbatch.

pub mod config;
pub mod error;
pub mod host;
pub mod hpc;
pub mod launch;
pub mod workspace;

// Re-exports for convenience
pub use config::{ConfigPaths, JobConfig, KickoffConfig, ProjectConfig, ToolsConfig};
pub use error::LaunchError;
pub use host::HostEnv;
pub use hpc::{
    Cluster, ClusterDetection, ClusterProfile, ClusterRegistry, GpuType, JobParameters,
    RootLayout, SCAVENGER_QOS, SlurmSubmitter, render_script,
};
pub use launch::{LaunchPlan, TIMESTAMP_FORMAT, default_timestamp};
pub use workspace::StagedWorkspace;
