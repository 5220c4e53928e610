//! Batch-script rendering and sbatch submission

use log::{debug, info};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use super::profiles::ClusterProfile;
use crate::error::LaunchError;

/// Resolved resource and naming parameters for one batch job
#[derive(Debug, Clone, PartialEq)]
pub struct JobParameters {
    /// Job name, `<config name>_<timestamp>`
    pub job_name: String,

    /// Experiment config the entry point loads, without the .yaml extension
    pub config_name: String,

    /// Launch timestamp shared by the job name, workspace, and log file
    pub timestamp: String,

    /// CPUs per task
    pub cpus_per_task: u32,

    /// GPUs per node
    pub gpus: u32,

    /// Wall time limit
    pub time: String,

    /// Number of nodes
    pub nodes: u32,

    /// Tasks per node
    pub ntasks_per_node: u32,

    /// Conda environment the job activates before running
    pub conda_env: String,

    /// Entry-point filename passed to the job as its first argument
    pub entry_point: String,

    /// Slurm log path; `%j` is left literal for Slurm to substitute
    pub output_path: PathBuf,
}

impl JobParameters {
    /// Job name shared by the script file and the Slurm job.
    pub fn job_name(config_name: &str, timestamp: &str) -> String {
        format!("{}_{}", config_name, timestamp)
    }

    /// Slurm log path under the project root.
    pub fn output_path(project_root: &Path, config_name: &str, timestamp: &str) -> PathBuf {
        project_root
            .join("slurm_logging")
            .join(format!("{}_{}-%j.out", config_name, timestamp))
    }
}

/// Render the batch script for a resolved profile and job parameters.
///
/// The script has a fixed line structure: a directive whose value is absent
/// on the current cluster renders as an empty line rather than disappearing,
/// so the output has the same number of lines on every cluster. Rendering
/// is deterministic; the same inputs produce byte-identical output.
pub fn render_script(profile: &ClusterProfile, params: &JobParameters) -> String {
    let nodelist = profile.nodes.as_ref().map(|nodes| nodes.join(","));
    let qos = profile.qos.as_ref().map(|qos| match &profile.qos_partition {
        Some(partition) => format!("{} --partition={}", qos, partition),
        None => qos.clone(),
    });

    let mut script = String::from("#!/bin/bash\n");
    script.push_str(&directive(
        "--output",
        Some(params.output_path.display().to_string()),
    ));
    script.push_str(&directive("--job-name", Some(params.job_name.clone())));
    script.push_str(&directive("--nodelist", nodelist));
    script.push_str(&directive("--partition", profile.partition.clone()));
    script.push_str(&directive(
        "--cpus-per-task",
        Some(params.cpus_per_task.to_string()),
    ));
    script.push_str(&directive("--mem", profile.memory.clone()));
    script.push_str(&directive("--gres", Some(format!("gpu:{}", params.gpus))));
    script.push_str(&directive("--time", Some(params.time.clone())));
    script.push_str(&directive("--qos", qos));
    script.push_str(&directive("--nodes", Some(params.nodes.to_string())));
    script.push_str(&directive(
        "--ntasks-per-node",
        Some(params.ntasks_per_node.to_string()),
    ));

    script.push('\n');
    script.push_str("ENTRY_POINT=$1\n");
    script.push_str("WORKSPACE=$2\n");
    script.push('\n');
    script.push_str("echo \"Job $SLURM_JOB_ID running $ENTRY_POINT from $WORKSPACE\"\n");
    script.push_str("eval \"$(conda shell.bash hook)\"\n");
    script.push_str(&format!("conda activate {}\n", params.conda_env));
    script.push('\n');
    script.push_str("cd \"$WORKSPACE\"\n");
    script.push_str(&format!(
        "python \"$ENTRY_POINT\" --config {}.yaml --timestamp {}\n",
        params.config_name, params.timestamp
    ));

    script
}

/// One `#SBATCH` line, or an empty line when the value is absent.
fn directive(flag: &str, value: Option<String>) -> String {
    match value {
        Some(value) => format!("#SBATCH {}={}\n", flag, value),
        None => "\n".to_string(),
    }
}

/// Submits batch scripts via sbatch
pub struct SlurmSubmitter {
    sbatch: String,
    sbatch_regex: Regex,
}

impl SlurmSubmitter {
    /// Create a submitter that invokes the given sbatch executable.
    ///
    /// Tests point this at a fake binary; production config leaves it as
    /// `sbatch`.
    pub fn new(sbatch: &str) -> Result<Self, LaunchError> {
        let sbatch_regex = Regex::new(r"Submitted batch job (\d+)")?;
        Ok(Self {
            sbatch: sbatch.to_string(),
            sbatch_regex,
        })
    }

    /// Write `script` to `path` and mark it executable.
    pub fn write_script(&self, path: &Path, script: &str) -> Result<(), LaunchError> {
        fs::write(path, script)?;

        #[cfg(unix)]
        {
            let mut perms = fs::metadata(path)?.permissions();
            perms.set_mode(0o755);
            fs::set_permissions(path, perms)?;
        }

        debug!("Created batch script: {}", path.display());
        Ok(())
    }

    /// Submit a script with its positional arguments and return the job ID.
    ///
    /// A non-zero sbatch exit surfaces as an error carrying sbatch's own
    /// exit code; the script stays on disk either way.
    pub fn submit(&self, script: &Path, args: &[&str]) -> Result<String, LaunchError> {
        info!(
            "Submitting: {} {} {}",
            self.sbatch,
            script.display(),
            args.join(" ")
        );

        let output = Command::new(&self.sbatch)
            .arg(script)
            .args(args)
            .output()
            .map_err(|e| LaunchError::Spawn {
                program: self.sbatch.clone(),
                source: e,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let return_code = output.status.code().unwrap_or(-1);

        if return_code != 0 {
            return Err(LaunchError::Submit {
                code: return_code,
                stderr,
            });
        }

        match self.sbatch_regex.captures(&stdout) {
            Some(captures) => {
                let job_id = captures.get(1).unwrap().as_str().to_string();
                debug!("sbatch assigned job ID {}", job_id);
                Ok(job_id)
            }
            None => Err(LaunchError::ParseJobId(stdout)),
        }
    }
}
