//! Launcher configuration
//!
//! Configuration is layered: system file, then user file, then a `kickoff.toml`
//! in the working directory, with later files overriding earlier ones at the
//! value level. Command-line flags are applied on top by the binary.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Standard locations for configuration files, in load order
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// System-wide config
    pub system: PathBuf,

    /// Per-user config (None if the platform config directory is unknown)
    pub user: Option<PathBuf>,

    /// Config in the current working directory
    pub local: PathBuf,
}

impl ConfigPaths {
    /// Create the standard path set.
    pub fn new() -> Self {
        Self {
            system: PathBuf::from("/etc/kickoff/config.toml"),
            user: dirs::config_dir().map(|d| d.join("kickoff").join("config.toml")),
            local: PathBuf::from("kickoff.toml"),
        }
    }

    /// Paths that exist on disk, in load order.
    pub fn existing_paths(&self) -> Vec<&PathBuf> {
        let mut paths = Vec::new();
        if self.system.exists() {
            paths.push(&self.system);
        }
        if let Some(user) = &self.user
            && user.exists()
        {
            paths.push(user);
        }
        if self.local.exists() {
            paths.push(&self.local);
        }
        paths
    }

    /// Directory holding the per-user config file.
    pub fn user_config_dir(&self) -> Option<&Path> {
        self.user.as_ref().and_then(|p| p.parent())
    }
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::new()
    }
}

/// Project layout and environment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Directory under the cluster's per-user root that holds the project
    pub project_dir: String,

    /// Code directory inside the project; each launch stages a copy of it
    pub code_dir: String,

    /// Conda environment that must be active when launching
    pub conda_env: String,

    /// Entry-point filename the job executes from the staged workspace
    pub entry_point: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project_dir: "ml-experiments".to_string(),
            code_dir: "code".to_string(),
            conda_env: "ml-experiments".to_string(),
            entry_point: "train.py".to_string(),
        }
    }
}

/// Default resource and naming parameters for submitted jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// Experiment config name, without the .yaml extension
    pub config_name: String,

    /// GPU type to request: a100, a6000, or either
    pub gpu_type: String,

    /// Quality of service
    pub qos: String,

    /// Memory request, e.g. '64G'
    pub mem: String,

    /// CPUs per task
    pub cpus: u32,

    /// GPUs per node
    pub gpus: u32,

    /// Wall time limit, HH:MM:SS or D-HH:MM:SS
    pub time: String,

    /// Number of nodes
    pub nodes: u32,

    /// Tasks per node
    pub ntasks_per_node: u32,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            config_name: "baseline".to_string(),
            gpu_type: "a100".to_string(),
            qos: "default".to_string(),
            mem: "64G".to_string(),
            cpus: 8,
            gpus: 1,
            time: "24:00:00".to_string(),
            nodes: 1,
            ntasks_per_node: 1,
        }
    }
}

/// External programs and paths the launcher shells out to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Python interpreter used to run the import-rewrite utility
    pub python: String,

    /// sbatch executable (tests substitute a fake binary here)
    pub sbatch: String,

    /// Import-rewrite utility, relative to the project root
    pub rewrite_script: String,

    /// Directory the rendered batch script is written to
    pub script_dir: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            python: "python".to_string(),
            sbatch: "sbatch".to_string(),
            rewrite_script: "utils/rewrite_imports.py".to_string(),
            script_dir: PathBuf::from("."),
        }
    }
}

/// Complete launcher configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KickoffConfig {
    /// Project layout and environment settings
    pub project: ProjectConfig,

    /// Default job parameters
    pub job: JobConfig,

    /// External program settings
    pub tools: ToolsConfig,
}

impl KickoffConfig {
    /// Load configuration from the standard paths.
    pub fn load() -> Result<Self> {
        Self::load_with_paths(&ConfigPaths::new())
    }

    /// Load configuration from the given path set.
    pub fn load_with_paths(paths: &ConfigPaths) -> Result<Self> {
        let files: Vec<PathBuf> = paths.existing_paths().into_iter().cloned().collect();
        Self::load_from_files(&files)
    }

    /// Load configuration from an explicit list of files.
    ///
    /// Files are merged at the value level, later files overriding earlier
    /// ones; missing files are skipped. With no readable files the defaults
    /// are returned.
    pub fn load_from_files(paths: &[PathBuf]) -> Result<Self> {
        let mut merged = toml::Value::Table(toml::map::Map::new());

        for path in paths {
            if !path.exists() {
                continue;
            }
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let value: toml::Value = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            merge_values(&mut merged, value);
        }

        merged
            .try_into()
            .context("Failed to interpret merged configuration")
    }

    /// Check the configuration for problems, collecting every error found.
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.project.project_dir.is_empty() {
            errors.push("project.project_dir must not be empty".to_string());
        }
        if self.project.code_dir.is_empty() {
            errors.push("project.code_dir must not be empty".to_string());
        }
        if self.project.conda_env.is_empty() {
            errors.push("project.conda_env must not be empty".to_string());
        }
        if self.project.entry_point.is_empty() {
            errors.push("project.entry_point must not be empty".to_string());
        }

        if self.job.config_name.is_empty() || self.job.config_name.contains('/') {
            errors.push(format!(
                "job.config_name must be a plain name, got '{}'",
                self.job.config_name
            ));
        }
        if self
            .job
            .gpu_type
            .parse::<crate::hpc::profiles::GpuType>()
            .is_err()
        {
            errors.push(format!(
                "job.gpu_type must be one of a100, a6000, either; got '{}'",
                self.job.gpu_type
            ));
        }
        if self.job.qos.is_empty() {
            errors.push("job.qos must not be empty".to_string());
        }
        if !is_valid_memory(&self.job.mem) {
            errors.push(format!(
                "job.mem must be digits followed by G, M, or T (e.g. '64G'), got '{}'",
                self.job.mem
            ));
        }
        if self.job.cpus == 0 {
            errors.push("job.cpus must be greater than 0".to_string());
        }
        if self.job.gpus == 0 {
            errors.push("job.gpus must be greater than 0".to_string());
        }
        if !is_valid_walltime(&self.job.time) {
            errors.push(format!(
                "job.time must be HH:MM:SS or D-HH:MM:SS, got '{}'",
                self.job.time
            ));
        }
        if self.job.nodes == 0 {
            errors.push("job.nodes must be greater than 0".to_string());
        }
        if self.job.ntasks_per_node == 0 {
            errors.push("job.ntasks_per_node must be greater than 0".to_string());
        }

        if self.tools.python.is_empty() {
            errors.push("tools.python must not be empty".to_string());
        }
        if self.tools.sbatch.is_empty() {
            errors.push("tools.sbatch must not be empty".to_string());
        }
        if self.tools.rewrite_script.is_empty() {
            errors.push("tools.rewrite_script must not be empty".to_string());
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Default configuration rendered as a commented TOML document.
    pub fn generate_default_config() -> String {
        let toml = toml::to_string_pretty(&Self::default()).unwrap_or_default();
        format!(
            "# kickoff configuration\n# Values here override the built-in defaults; command-line flags override both.\n\n{}",
            toml
        )
    }

    /// Serialize this configuration to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// Deep-merge `overlay` into `base`, table by table.
fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                match base_table.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_table.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn is_valid_memory(mem: &str) -> bool {
    match mem.char_indices().last() {
        Some((idx, unit)) if matches!(unit, 'G' | 'M' | 'T') => {
            let digits = &mem[..idx];
            !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

fn is_valid_walltime(time: &str) -> bool {
    let rest = match time.split_once('-') {
        Some((days, rest)) => {
            if days.is_empty() || !days.chars().all(|c| c.is_ascii_digit()) {
                return false;
            }
            rest
        }
        None => time,
    };
    let parts: Vec<&str> = rest.split(':').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}
