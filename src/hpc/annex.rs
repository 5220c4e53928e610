//! The university annex cluster
//!
//! Fallback environment used whenever the lab NAS is not mounted. The annex
//! schedules by partition: every job goes through the `single` partition,
//! there is no node allow-list, and memory/QoS are managed by the scheduler
//! and must not be requested explicitly.
//!
//! Detection: unconditional fallback, so it must be registered last

use super::profiles::{Cluster, ClusterDetection, RootLayout};

/// Create the annex cluster definition
pub fn annex_cluster() -> Cluster {
    Cluster {
        name: "annex".to_string(),
        display_name: "University annex".to_string(),
        description: "Campus cluster used when the lab NAS is unavailable".to_string(),
        detection: vec![ClusterDetection::Always { value: true }],
        a100_nodes: vec![],
        a6000_nodes: vec![],
        uses_resource_directives: false,
        fixed_partition: Some("single".to_string()),
        scavenger_partition: None,
        root: RootLayout::HomeDir,
    }
}
