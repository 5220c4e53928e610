//! The launch pipeline
//!
//! A launch walks a fixed sequence: validate the Conda environment, resolve
//! the cluster profile, stage the workspace, rewrite imports, render the
//! batch script, submit it. The first failure aborts the remaining steps,
//! and nothing already staged or written is cleaned up.

use chrono::Local;
use log::{debug, info};

use crate::config::KickoffConfig;
use crate::error::LaunchError;
use crate::host::HostEnv;
use crate::hpc::profiles::{ClusterProfile, ClusterRegistry, GpuType};
use crate::hpc::slurm::{JobParameters, SlurmSubmitter, render_script};
use crate::workspace;

/// Timestamp format shared by job names, staged workspaces, and log files
pub const TIMESTAMP_FORMAT: &str = "%m_%d_%H%M%S";

/// Format the current local time the way launch artifacts are named.
pub fn default_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// One prepared launch: everything resolved and rendered, nothing written
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    /// The resolved cluster profile
    pub profile: ClusterProfile,

    /// The derived job parameters
    pub params: JobParameters,

    /// The rendered batch script
    pub script: String,
}

/// Check that the configured Conda environment is active.
///
/// Runs before anything touches the filesystem.
pub fn validate_environment(config: &KickoffConfig, host: &HostEnv) -> Result<(), LaunchError> {
    let actual = host.conda_env.as_deref().unwrap_or("");
    if actual != config.project.conda_env {
        return Err(LaunchError::WrongEnvironment {
            expected: config.project.conda_env.clone(),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// Resolve parameters and render the batch script.
///
/// Pure with respect to the filesystem: selecting the cluster, computing the
/// node list, and rendering the script create no files and spawn no
/// processes. An unknown GPU type fails here, before any job parameters
/// exist.
pub fn plan(
    config: &KickoffConfig,
    host: &HostEnv,
    registry: &ClusterRegistry,
    cluster_override: Option<&str>,
    timestamp: &str,
) -> Result<LaunchPlan, LaunchError> {
    let gpu_type: GpuType = config.job.gpu_type.parse()?;

    let cluster = match cluster_override {
        Some(name) => registry
            .get(name)
            .ok_or_else(|| LaunchError::UnknownCluster(name.to_string()))?,
        None => registry.detect().ok_or(LaunchError::NoClusterMatched)?,
    };
    debug!("Resolved cluster: {}", cluster.name);

    let profile = cluster.resolve(
        &config.project.project_dir,
        gpu_type,
        &config.job.qos,
        &config.job.mem,
        host,
    )?;

    let params = JobParameters {
        job_name: JobParameters::job_name(&config.job.config_name, timestamp),
        config_name: config.job.config_name.clone(),
        timestamp: timestamp.to_string(),
        cpus_per_task: config.job.cpus,
        gpus: config.job.gpus,
        time: config.job.time.clone(),
        nodes: config.job.nodes,
        ntasks_per_node: config.job.ntasks_per_node,
        conda_env: config.project.conda_env.clone(),
        entry_point: config.project.entry_point.clone(),
        output_path: JobParameters::output_path(
            &profile.project_root,
            &config.job.config_name,
            timestamp,
        ),
    };

    let script = render_script(&profile, &params);
    Ok(LaunchPlan {
        profile,
        params,
        script,
    })
}

/// Execute a prepared launch: stage the workspace, rewrite imports, write
/// the script, submit it. Returns the Slurm job ID.
pub fn execute(plan: &LaunchPlan, config: &KickoffConfig) -> Result<String, LaunchError> {
    let staged = workspace::stage(
        &plan.profile.project_root,
        &config.project.code_dir,
        &plan.params.timestamp,
    )?;

    let rewrite_script = plan.profile.project_root.join(&config.tools.rewrite_script);
    workspace::rewrite_imports(
        &config.tools.python,
        &rewrite_script,
        &staged,
        &plan.params.entry_point,
    )?;

    let script_path = config
        .tools
        .script_dir
        .join(format!("{}.sh", plan.params.job_name));
    let submitter = SlurmSubmitter::new(&config.tools.sbatch)?;
    submitter.write_script(&script_path, &plan.script)?;

    let workspace_arg = staged.code_dir.display().to_string();
    println!(
        "{} {} {} {}",
        config.tools.sbatch,
        script_path.display(),
        plan.params.entry_point,
        workspace_arg
    );

    let job_id = submitter.submit(&script_path, &[&plan.params.entry_point, &workspace_arg])?;
    info!(
        "Submitted Slurm job {} with ID {}",
        plan.params.job_name, job_id
    );
    Ok(job_id)
}

/// Run the full launch sequence and return the Slurm job ID.
pub fn run(
    config: &KickoffConfig,
    host: &HostEnv,
    registry: &ClusterRegistry,
    cluster_override: Option<&str>,
    timestamp: &str,
) -> Result<String, LaunchError> {
    validate_environment(config, host)?;
    let plan = plan(config, host, registry, cluster_override, timestamp)?;
    execute(&plan, config)
}
