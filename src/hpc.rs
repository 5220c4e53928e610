//! Cluster detection and Slurm submission
//!
//! This module defines the clusters the launcher knows about, resolves
//! per-cluster launch parameters, and renders and submits Slurm batch
//! scripts. Cluster definitions live in one module per machine; detection
//! picks exactly one of them per invocation.

pub mod annex;
pub mod lab;
pub mod profiles;
pub mod slurm;

pub use profiles::{
    Cluster, ClusterDetection, ClusterProfile, ClusterRegistry, GpuType, RootLayout, SCAVENGER_QOS,
};
pub use slurm::{JobParameters, SlurmSubmitter, render_script};
