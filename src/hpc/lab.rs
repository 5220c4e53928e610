//! The lab's GPU cluster
//!
//! Eight GPU nodes behind a shared NAS mount:
//! - Four A100 nodes: gauss, hopper, lovelace, turing
//! - Four A6000 nodes: curie, darwin, franklin, noether
//!
//! Jobs carry explicit --mem and --qos directives. Requesting scavenger QoS
//! additionally routes the job onto the preemptible scavenger partition.
//!
//! Detection: the NAS mount is present at /nas/lab

use super::profiles::{Cluster, ClusterDetection, RootLayout};

/// NAS mount that identifies the lab cluster and holds per-user directories
pub const LAB_MOUNT: &str = "/nas/lab";

/// Create the lab cluster definition
pub fn lab_cluster() -> Cluster {
    Cluster {
        name: "lab".to_string(),
        display_name: "Lab GPU cluster".to_string(),
        description: "Shared GPU nodes behind the lab NAS".to_string(),
        detection: vec![ClusterDetection::FileExists {
            path: LAB_MOUNT.to_string(),
        }],
        a100_nodes: vec![
            "gauss".to_string(),
            "hopper".to_string(),
            "lovelace".to_string(),
            "turing".to_string(),
        ],
        a6000_nodes: vec![
            "curie".to_string(),
            "darwin".to_string(),
            "franklin".to_string(),
            "noether".to_string(),
        ],
        uses_resource_directives: true,
        fixed_partition: None,
        scavenger_partition: Some("scavenger".to_string()),
        root: RootLayout::SharedMount {
            mount: LAB_MOUNT.to_string(),
        },
    }
}
