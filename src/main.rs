//! Command-line entry point for the kickoff launcher

use clap::{Parser, Subcommand, ValueEnum, builder::styling};
use env_logger::Builder;
use log::LevelFilter;
use std::fs;
use std::path::PathBuf;
use std::process;
use tabled::{Table, Tabled, settings::Style};

use kickoff::config::{ConfigPaths, KickoffConfig};
use kickoff::host::HostEnv;
use kickoff::hpc::profiles::ClusterRegistry;
use kickoff::launch;

const STYLES: styling::Styles = styling::Styles::styled()
    .header(styling::AnsiColor::Green.on_default().bold())
    .usage(styling::AnsiColor::Green.on_default().bold())
    .literal(styling::AnsiColor::Cyan.on_default().bold())
    .placeholder(styling::AnsiColor::Cyan.on_default());

#[derive(Parser)]
#[command(name = "kickoff")]
#[command(about = "Submit ML training experiments to Slurm", long_about = None)]
#[command(version)]
#[command(styles = STYLES)]
#[command(after_long_help = "\
EXAMPLES:
    # Submit the default experiment config
    kickoff

    # Submit a specific config on scavenger QoS across all GPU nodes
    kickoff --config-name sweep_lr --qos scavenger --gpu-type either

    # Inspect the script that would be submitted
    kickoff --dry-run

    # Show the clusters this launcher knows about
    kickoff profiles
")]
struct Cli {
    /// Experiment config name, without the .yaml extension
    #[arg(short, long)]
    config_name: Option<String>,

    /// Launch timestamp; defaults to the current local time
    #[arg(short, long)]
    timestamp: Option<String>,

    /// GPU type to request: a100, a6000, or either
    #[arg(long)]
    gpu_type: Option<String>,

    /// Quality of service for the job
    #[arg(long)]
    qos: Option<String>,

    /// CPUs per task
    #[arg(long)]
    cpus: Option<u32>,

    /// Memory request, e.g. 64G
    #[arg(long)]
    mem: Option<String>,

    /// GPUs per node
    #[arg(long)]
    gpus: Option<u32>,

    /// Wall time limit, e.g. 24:00:00
    #[arg(long)]
    time: Option<String>,

    /// Number of nodes
    #[arg(long)]
    nodes: Option<u32>,

    /// Tasks per node
    #[arg(long)]
    ntasks_per_node: Option<u32>,

    /// Submit to a specific cluster instead of auto-detecting
    #[arg(long)]
    cluster: Option<String>,

    /// Resolve parameters and print the batch script without submitting
    #[arg(long)]
    dry_run: bool,

    /// Additional config file applied after the standard paths
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "RUST_LOG", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the clusters this launcher knows about
    Profiles {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Manage launcher configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective merged configuration
    Show {
        /// Output format
        #[arg(long, value_enum, default_value_t = ConfigFormat::Toml)]
        format: ConfigFormat,
    },
    /// Write the default configuration to the user config path
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ConfigFormat {
    Toml,
    Json,
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigFormat::Toml => write!(f, "toml"),
            ConfigFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Tabled)]
struct ClusterTableRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Detected")]
    detected: String,
    #[tabled(rename = "A100 nodes")]
    a100_nodes: String,
    #[tabled(rename = "A6000 nodes")]
    a6000_nodes: String,
    #[tabled(rename = "Partition")]
    partition: String,
    #[tabled(rename = "Description")]
    description: String,
}

fn main() {
    let cli = Cli::parse();

    let level = cli
        .log_level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::Info);
    Builder::from_default_env().filter_level(level).init();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    };

    match &cli.command {
        Some(Commands::Profiles { format }) => cmd_profiles(*format),
        Some(Commands::Config { command }) => cmd_config(command, &config),
        None => cmd_launch(&cli, &config),
    }
}

/// Load the layered configuration, apply CLI overrides, and validate.
fn load_config(cli: &Cli) -> anyhow::Result<KickoffConfig> {
    let paths = ConfigPaths::new();
    let mut files: Vec<PathBuf> = paths.existing_paths().into_iter().cloned().collect();
    if let Some(extra) = &cli.config_file {
        anyhow::ensure!(
            extra.exists(),
            "Config file {} does not exist",
            extra.display()
        );
        files.push(extra.clone());
    }

    let mut config = KickoffConfig::load_from_files(&files)?;
    apply_overrides(&mut config, cli);

    if let Err(errors) = config.validate() {
        anyhow::bail!("Invalid configuration:\n  {}", errors.join("\n  "));
    }
    Ok(config)
}

fn apply_overrides(config: &mut KickoffConfig, cli: &Cli) {
    if let Some(config_name) = &cli.config_name {
        config.job.config_name = config_name.clone();
    }
    if let Some(gpu_type) = &cli.gpu_type {
        config.job.gpu_type = gpu_type.clone();
    }
    if let Some(qos) = &cli.qos {
        config.job.qos = qos.clone();
    }
    if let Some(cpus) = cli.cpus {
        config.job.cpus = cpus;
    }
    if let Some(mem) = &cli.mem {
        config.job.mem = mem.clone();
    }
    if let Some(gpus) = cli.gpus {
        config.job.gpus = gpus;
    }
    if let Some(time) = &cli.time {
        config.job.time = time.clone();
    }
    if let Some(nodes) = cli.nodes {
        config.job.nodes = nodes;
    }
    if let Some(ntasks) = cli.ntasks_per_node {
        config.job.ntasks_per_node = ntasks;
    }
}

fn cmd_launch(cli: &Cli, config: &KickoffConfig) {
    let host = HostEnv::capture();
    let registry = ClusterRegistry::with_builtin_clusters();
    let timestamp = cli
        .timestamp
        .clone()
        .unwrap_or_else(launch::default_timestamp);

    if cli.dry_run {
        match launch::plan(config, &host, &registry, cli.cluster.as_deref(), &timestamp) {
            Ok(plan) => {
                eprintln!("# cluster: {}", plan.profile.cluster);
                print!("{}", plan.script);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(e.exit_code());
            }
        }
        return;
    }

    match launch::run(config, &host, &registry, cli.cluster.as_deref(), &timestamp) {
        Ok(job_id) => {
            println!("Submitted Slurm job {}", job_id);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn cmd_profiles(format: OutputFormat) {
    let registry = ClusterRegistry::with_builtin_clusters();
    let detected = registry.detect().map(|c| c.name.clone());

    match format {
        OutputFormat::Json => {
            let payload = serde_json::json!({
                "clusters": registry.clusters(),
                "detected": detected,
            });
            match serde_json::to_string_pretty(&payload) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    process::exit(1);
                }
            }
        }
        OutputFormat::Table => {
            let rows: Vec<ClusterTableRow> = registry
                .clusters()
                .iter()
                .map(|cluster| ClusterTableRow {
                    name: cluster.name.clone(),
                    detected: if detected.as_deref() == Some(cluster.name.as_str()) {
                        "yes".to_string()
                    } else {
                        String::new()
                    },
                    a100_nodes: cluster.a100_nodes.join(","),
                    a6000_nodes: cluster.a6000_nodes.join(","),
                    partition: cluster.fixed_partition.clone().unwrap_or_default(),
                    description: cluster.description.clone(),
                })
                .collect();
            println!("{}", Table::new(rows).with(Style::sharp()));
        }
    }
}

fn cmd_config(command: &ConfigCommands, config: &KickoffConfig) {
    match command {
        ConfigCommands::Show { format } => {
            let rendered = match format {
                ConfigFormat::Toml => config.to_toml().map_err(|e| format!("{:#}", e)),
                ConfigFormat::Json => {
                    serde_json::to_string_pretty(config).map_err(|e| e.to_string())
                }
            };
            match rendered {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    process::exit(1);
                }
            }
        }
        ConfigCommands::Init { force } => {
            let paths = ConfigPaths::new();
            let Some(user_path) = paths.user else {
                eprintln!("Error: could not determine the user config directory");
                process::exit(1);
            };
            if user_path.exists() && !force {
                eprintln!(
                    "Error: {} already exists (use --force to overwrite)",
                    user_path.display()
                );
                process::exit(1);
            }
            if let Some(parent) = user_path.parent()
                && let Err(e) = fs::create_dir_all(parent)
            {
                eprintln!("Error creating {}: {}", parent.display(), e);
                process::exit(1);
            }
            match fs::write(&user_path, KickoffConfig::generate_default_config()) {
                Ok(()) => println!("Wrote {}", user_path.display()),
                Err(e) => {
                    eprintln!("Error writing {}: {}", user_path.display(), e);
                    process::exit(1);
                }
            }
        }
    }
}
