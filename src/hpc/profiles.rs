//! Cluster definitions for the machines this launcher knows about
//!
//! This module provides data structures for defining clusters, including
//! GPU node allow-lists, directive policy, project-root layout, and
//! auto-detection.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::LaunchError;
use crate::host::HostEnv;

/// QoS value that routes a job onto the preemptible scavenger partition
pub const SCAVENGER_QOS: &str = "scavenger";

/// How to detect if we're running on a particular cluster
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClusterDetection {
    /// Detect by existence of a path, typically a cluster-specific mount
    FileExists {
        /// Path to check
        path: String,
    },
    /// Unconditional answer, used by the fallback cluster
    Always {
        /// Whether this cluster always matches
        value: bool,
    },
}

impl ClusterDetection {
    /// Check if this detection method matches the current host
    pub fn matches(&self) -> bool {
        match self {
            ClusterDetection::FileExists { path } => Path::new(path).exists(),
            ClusterDetection::Always { value } => *value,
        }
    }
}

/// GPU categories a job can request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GpuType {
    A100,
    A6000,
    /// Any node from either concrete category
    Either,
}

impl FromStr for GpuType {
    type Err = LaunchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a100" => Ok(GpuType::A100),
            "a6000" => Ok(GpuType::A6000),
            "either" => Ok(GpuType::Either),
            _ => Err(LaunchError::UnknownGpuType(s.to_string())),
        }
    }
}

impl fmt::Display for GpuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuType::A100 => write!(f, "a100"),
            GpuType::A6000 => write!(f, "a6000"),
            GpuType::Either => write!(f, "either"),
        }
    }
}

/// Where a cluster keeps per-user project directories
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RootLayout {
    /// `<mount>/<user>/<project dir>` on a shared mount
    SharedMount {
        /// Mount point holding one directory per user
        mount: String,
    },
    /// `<home>/<project dir>` in the user's home directory
    HomeDir,
}

/// A cluster known to the launcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    /// Cluster identifier (as used with --cluster)
    pub name: String,

    /// Human-readable display name
    pub display_name: String,

    /// Optional description
    #[serde(default)]
    pub description: String,

    /// Detection methods (any match triggers detection)
    pub detection: Vec<ClusterDetection>,

    /// Hostnames of nodes with A100 GPUs
    #[serde(default)]
    pub a100_nodes: Vec<String>,

    /// Hostnames of nodes with A6000 GPUs
    #[serde(default)]
    pub a6000_nodes: Vec<String>,

    /// Whether jobs on this cluster carry --mem and --qos directives.
    /// Clusters that manage memory and QoS themselves leave those lines
    /// blank in the batch script.
    pub uses_resource_directives: bool,

    /// Partition every job is routed through, for clusters that schedule
    /// by partition instead of nodelist
    #[serde(default)]
    pub fixed_partition: Option<String>,

    /// Partition appended to the QoS directive when a job requests
    /// scavenger QoS
    #[serde(default)]
    pub scavenger_partition: Option<String>,

    /// How to build the per-user project root on this cluster
    pub root: RootLayout,
}

impl Cluster {
    /// Check if this cluster matches the current host
    pub fn detect(&self) -> bool {
        self.detection.iter().any(|d| d.matches())
    }

    /// Nodes that satisfy the requested GPU type.
    ///
    /// `Either` is always computed as the union of the concrete lists, so a
    /// node added to one list widens `Either` automatically.
    pub fn nodes_for(&self, gpu_type: GpuType) -> Vec<String> {
        match gpu_type {
            GpuType::A100 => self.a100_nodes.clone(),
            GpuType::A6000 => self.a6000_nodes.clone(),
            GpuType::Either => {
                let mut nodes: Vec<String> = self
                    .a100_nodes
                    .iter()
                    .chain(self.a6000_nodes.iter())
                    .cloned()
                    .collect();
                nodes.sort();
                nodes.dedup();
                nodes
            }
        }
    }

    /// Absolute project root for this user on this cluster.
    pub fn project_root(&self, project_dir: &str, host: &HostEnv) -> Result<PathBuf, LaunchError> {
        match &self.root {
            RootLayout::SharedMount { mount } => {
                let user = host.user.as_deref().ok_or(LaunchError::MissingEnv("USER"))?;
                Ok(Path::new(mount).join(user).join(project_dir))
            }
            RootLayout::HomeDir => {
                let home = host.home.as_ref().ok_or(LaunchError::MissingEnv("HOME"))?;
                Ok(home.join(project_dir))
            }
        }
    }

    /// Resolve the launch profile for this cluster.
    ///
    /// This is a pure computation over the cluster definition and the host
    /// snapshot; it touches no files and returns either a fully populated
    /// profile or an error, never a partial one.
    pub fn resolve(
        &self,
        project_dir: &str,
        gpu_type: GpuType,
        qos: &str,
        memory: &str,
        host: &HostEnv,
    ) -> Result<ClusterProfile, LaunchError> {
        let project_root = self.project_root(project_dir, host)?;

        let nodes = match self.nodes_for(gpu_type) {
            nodes if nodes.is_empty() => None,
            nodes => Some(nodes),
        };

        let (memory, qos) = if self.uses_resource_directives {
            (Some(memory.to_string()), Some(qos.to_string()))
        } else {
            (None, None)
        };

        let qos_partition = match (&qos, &self.scavenger_partition) {
            (Some(qos), Some(partition)) if qos == SCAVENGER_QOS => Some(partition.clone()),
            _ => None,
        };

        Ok(ClusterProfile {
            cluster: self.name.clone(),
            project_root,
            nodes,
            memory,
            qos,
            qos_partition,
            partition: self.fixed_partition.clone(),
        })
    }
}

/// Fully resolved launch parameters for one cluster
///
/// A profile is produced exactly once per invocation and is immutable from
/// then on; script rendering depends only on this value and the job
/// parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterProfile {
    /// Name of the cluster this profile was resolved for
    pub cluster: String,

    /// Absolute project root for this user on this cluster
    pub project_root: PathBuf,

    /// Node allow-list for --nodelist (None renders a blank line)
    pub nodes: Option<Vec<String>>,

    /// Value for --mem (None renders a blank line)
    pub memory: Option<String>,

    /// Value for --qos (None renders a blank line)
    pub qos: Option<String>,

    /// Partition override appended to the QoS directive line
    pub qos_partition: Option<String>,

    /// Value for --partition (None renders a blank line)
    pub partition: Option<String>,
}

/// Registry of known clusters
#[derive(Debug, Clone, Default)]
pub struct ClusterRegistry {
    clusters: Vec<Cluster>,
}

impl ClusterRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            clusters: Vec::new(),
        }
    }

    /// Create a registry with all built-in clusters.
    ///
    /// Registration order matters: the annex matches unconditionally, so it
    /// must stay last.
    pub fn with_builtin_clusters() -> Self {
        let mut registry = Self::new();
        registry.register(super::lab::lab_cluster());
        registry.register(super::annex::annex_cluster());
        registry
    }

    /// Register a cluster, replacing any existing one with the same name
    pub fn register(&mut self, cluster: Cluster) {
        self.clusters.retain(|c| c.name != cluster.name);
        self.clusters.push(cluster);
    }

    /// Get all registered clusters
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Get a cluster by name
    pub fn get(&self, name: &str) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.name == name)
    }

    /// Detect the current cluster.
    ///
    /// Clusters are probed in registration order and the first match wins,
    /// so detection is deterministic for a given host state.
    pub fn detect(&self) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.detect())
    }

    /// Get cluster names
    pub fn names(&self) -> Vec<&str> {
        self.clusters.iter().map(|c| c.name.as_str()).collect()
    }
}
