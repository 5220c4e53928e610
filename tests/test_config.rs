//! Tests for the configuration management module

use kickoff::config::{ConfigPaths, JobConfig, KickoffConfig, ProjectConfig, ToolsConfig};
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

// ============== Default Value Tests ==============

#[rstest]
fn test_project_config_defaults() {
    let config = ProjectConfig::default();
    assert_eq!(config.project_dir, "ml-experiments");
    assert_eq!(config.code_dir, "code");
    assert_eq!(config.conda_env, "ml-experiments");
    assert_eq!(config.entry_point, "train.py");
}

#[rstest]
fn test_job_config_defaults() {
    let config = JobConfig::default();
    assert_eq!(config.config_name, "baseline");
    assert_eq!(config.gpu_type, "a100");
    assert_eq!(config.qos, "default");
    assert_eq!(config.mem, "64G");
    assert_eq!(config.cpus, 8);
    assert_eq!(config.gpus, 1);
    assert_eq!(config.time, "24:00:00");
    assert_eq!(config.nodes, 1);
    assert_eq!(config.ntasks_per_node, 1);
}

#[rstest]
fn test_tools_config_defaults() {
    let config = ToolsConfig::default();
    assert_eq!(config.python, "python");
    assert_eq!(config.sbatch, "sbatch");
    assert_eq!(config.rewrite_script, "utils/rewrite_imports.py");
    assert_eq!(config.script_dir, PathBuf::from("."));
}

#[rstest]
fn test_kickoff_config_defaults() {
    let config = KickoffConfig::default();
    assert_eq!(config.project.project_dir, "ml-experiments");
    assert_eq!(config.job.config_name, "baseline");
    assert_eq!(config.tools.sbatch, "sbatch");
}

// ============== Config Paths Tests ==============

#[rstest]
fn test_config_paths_new() {
    let paths = ConfigPaths::new();
    assert_eq!(paths.system, PathBuf::from("/etc/kickoff/config.toml"));
    assert!(paths.user.is_some());
    assert_eq!(paths.local, PathBuf::from("kickoff.toml"));
}

#[rstest]
fn test_config_paths_existing_paths_empty() {
    let paths = ConfigPaths {
        system: PathBuf::from("/nonexistent/system/config.toml"),
        user: Some(PathBuf::from("/nonexistent/user/config.toml")),
        local: PathBuf::from("/nonexistent/local/kickoff.toml"),
    };
    let existing = paths.existing_paths();
    assert!(existing.is_empty());
}

#[rstest]
fn test_config_paths_user_config_dir() {
    let paths = ConfigPaths::new();
    if let Some(user_path) = &paths.user {
        let user_dir = paths.user_config_dir();
        assert!(user_dir.is_some());
        assert_eq!(user_dir.unwrap(), user_path.parent().unwrap());
    }
}

#[rstest]
fn test_existing_paths_with_actual_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "[job]\nqos = \"high\"").unwrap();

    let paths = ConfigPaths {
        system: PathBuf::from("/nonexistent"),
        user: Some(config_path.clone()),
        local: PathBuf::from("/nonexistent"),
    };

    let existing = paths.existing_paths();
    assert_eq!(existing.len(), 1);
    assert_eq!(existing[0], &config_path);
}

// ============== Config Loading Tests ==============

#[rstest]
fn test_load_returns_defaults_when_no_files() {
    // Use non-existent paths to avoid reading the user's actual config
    let paths = ConfigPaths {
        system: PathBuf::from("/nonexistent/system/config.toml"),
        user: Some(PathBuf::from("/nonexistent/user/config.toml")),
        local: PathBuf::from("/nonexistent/local/kickoff.toml"),
    };
    let config = KickoffConfig::load_with_paths(&paths).unwrap_or_default();
    assert_eq!(config.job.config_name, "baseline");
    assert_eq!(config.project.code_dir, "code");
}

#[rstest]
fn test_load_from_toml_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let toml_content = r#"
[project]
project_dir = "experiments"
conda_env = "torch-env"

[job]
config_name = "sweep_lr"
gpu_type = "either"
qos = "scavenger"
cpus = 16

[tools]
sbatch = "/opt/slurm/bin/sbatch"
"#;

    fs::write(&config_path, toml_content).unwrap();

    let config = KickoffConfig::load_from_files(&[config_path]).unwrap();
    assert_eq!(config.project.project_dir, "experiments");
    assert_eq!(config.project.conda_env, "torch-env");
    assert_eq!(config.job.config_name, "sweep_lr");
    assert_eq!(config.job.gpu_type, "either");
    assert_eq!(config.job.qos, "scavenger");
    assert_eq!(config.job.cpus, 16);
    assert_eq!(config.tools.sbatch, "/opt/slurm/bin/sbatch");
}

#[rstest]
fn test_load_partial_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    // Only specify some values, others should be defaults
    let toml_content = r#"
[job]
gpu_type = "a6000"
"#;

    fs::write(&config_path, toml_content).unwrap();

    let config = KickoffConfig::load_from_files(&[config_path]).unwrap();
    assert_eq!(config.job.gpu_type, "a6000");
    assert_eq!(config.job.config_name, "baseline");
    assert_eq!(config.project.entry_point, "train.py");
}

#[rstest]
fn test_load_with_priority_order() {
    let temp_dir = TempDir::new().unwrap();

    let config1_path = temp_dir.path().join("config1.toml");
    let config2_path = temp_dir.path().join("config2.toml");

    let toml1 = r#"
[job]
config_name = "first"
mem = "128G"
"#;

    let toml2 = r#"
[job]
config_name = "second"
"#;

    fs::write(&config1_path, toml1).unwrap();
    fs::write(&config2_path, toml2).unwrap();

    // Second file should override first
    let config = KickoffConfig::load_from_files(&[config1_path, config2_path]).unwrap();
    assert_eq!(config.job.config_name, "second");
    // mem not in second file, should use first file's value
    assert_eq!(config.job.mem, "128G");
}

#[rstest]
fn test_empty_toml_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("empty.toml");
    fs::write(&config_path, "").unwrap();

    let config = KickoffConfig::load_from_files(&[config_path]).unwrap();
    assert_eq!(config.job.config_name, "baseline");
}

#[rstest]
fn test_nonexistent_file() {
    let config =
        KickoffConfig::load_from_files(&[PathBuf::from("/nonexistent/config.toml")]).unwrap();
    assert_eq!(config.job.config_name, "baseline");
}

#[rstest]
fn test_malformed_toml_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("broken.toml");
    fs::write(&config_path, "[job\nqos = ").unwrap();

    assert!(KickoffConfig::load_from_files(&[config_path]).is_err());
}

// ============== Validation Tests ==============

#[rstest]
fn test_validate_valid_config() {
    let config = KickoffConfig::default();
    assert!(config.validate().is_ok());
}

#[rstest]
fn test_validate_invalid_gpu_type() {
    let mut config = KickoffConfig::default();
    config.job.gpu_type = "h100".to_string();
    let result = config.validate();
    assert!(result.is_err());
    let errors = result.unwrap_err();
    assert!(errors.iter().any(|e| e.contains("gpu_type")));
}

#[rstest]
fn test_validate_invalid_mem() {
    let mut config = KickoffConfig::default();
    config.job.mem = "lots".to_string();
    let result = config.validate();
    assert!(result.is_err());
    let errors = result.unwrap_err();
    assert!(errors.iter().any(|e| e.contains("job.mem")));
}

#[rstest]
fn test_validate_invalid_time() {
    let mut config = KickoffConfig::default();
    config.job.time = "24h".to_string();
    let result = config.validate();
    assert!(result.is_err());
    let errors = result.unwrap_err();
    assert!(errors.iter().any(|e| e.contains("job.time")));
}

#[rstest]
fn test_validate_zero_cpus() {
    let mut config = KickoffConfig::default();
    config.job.cpus = 0;
    let result = config.validate();
    assert!(result.is_err());
    let errors = result.unwrap_err();
    assert!(errors.iter().any(|e| e.contains("job.cpus")));
}

#[rstest]
fn test_validate_config_name_with_separator() {
    let mut config = KickoffConfig::default();
    config.job.config_name = "../escape".to_string();
    let result = config.validate();
    assert!(result.is_err());
    let errors = result.unwrap_err();
    assert!(errors.iter().any(|e| e.contains("config_name")));
}

#[rstest]
fn test_validate_multiple_errors() {
    let mut config = KickoffConfig::default();
    config.job.gpu_type = "v100".to_string();
    config.job.cpus = 0;
    config.project.conda_env = String::new();

    let result = config.validate();
    assert!(result.is_err());
    let errors = result.unwrap_err();
    assert!(errors.len() >= 3);
}

#[rstest]
#[case("a100", true)]
#[case("a6000", true)]
#[case("either", true)]
#[case("A100", true)]
#[case("h100", false)]
#[case("", false)]
fn test_gpu_type_validation(#[case] gpu_type: &str, #[case] expected_valid: bool) {
    let mut config = KickoffConfig::default();
    config.job.gpu_type = gpu_type.to_string();
    let result = config.validate();

    if expected_valid {
        assert!(result.is_ok(), "GPU type '{}' should be valid", gpu_type);
    } else {
        assert!(result.is_err(), "GPU type '{}' should be invalid", gpu_type);
    }
}

#[rstest]
#[case("64G", true)]
#[case("400M", true)]
#[case("2T", true)]
#[case("64", false)]
#[case("64g", false)]
#[case("", false)]
fn test_mem_validation(#[case] mem: &str, #[case] expected_valid: bool) {
    let mut config = KickoffConfig::default();
    config.job.mem = mem.to_string();
    let result = config.validate();

    if expected_valid {
        assert!(result.is_ok(), "Memory '{}' should be valid", mem);
    } else {
        assert!(result.is_err(), "Memory '{}' should be invalid", mem);
    }
}

#[rstest]
#[case("24:00:00", true)]
#[case("2-12:00:00", true)]
#[case("00:30:00", true)]
#[case("24:00", false)]
#[case("tomorrow", false)]
fn test_time_validation(#[case] time: &str, #[case] expected_valid: bool) {
    let mut config = KickoffConfig::default();
    config.job.time = time.to_string();
    let result = config.validate();

    if expected_valid {
        assert!(result.is_ok(), "Walltime '{}' should be valid", time);
    } else {
        assert!(result.is_err(), "Walltime '{}' should be invalid", time);
    }
}

// ============== Serialization Tests ==============

#[rstest]
fn test_generate_default_config() {
    let config_content = KickoffConfig::generate_default_config();
    assert!(config_content.contains("[project]"));
    assert!(config_content.contains("[job]"));
    assert!(config_content.contains("[tools]"));
    assert!(config_content.contains("config_name"));
    assert!(config_content.contains("sbatch"));
}

#[rstest]
fn test_to_toml_serialization() {
    let config = KickoffConfig::default();
    let toml_str = config.to_toml().unwrap();

    assert!(toml_str.contains("[project]"));
    assert!(toml_str.contains("conda_env"));
    assert!(toml_str.contains("[job]"));
    assert!(toml_str.contains("gpu_type = \"a100\""));
    assert!(toml_str.contains("[tools]"));
}

#[rstest]
fn test_roundtrip_serialization() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.toml");

    let mut original = KickoffConfig::default();
    original.project.conda_env = "torch-21".to_string();
    original.job.config_name = "ablation_04".to_string();
    original.job.gpus = 4;
    original.tools.sbatch = "/usr/local/bin/sbatch".to_string();

    let toml_str = original.to_toml().unwrap();
    fs::write(&config_path, toml_str).unwrap();

    let loaded = KickoffConfig::load_from_files(&[config_path]).unwrap();

    assert_eq!(loaded.project.conda_env, original.project.conda_env);
    assert_eq!(loaded.job.config_name, original.job.config_name);
    assert_eq!(loaded.job.gpus, original.job.gpus);
    assert_eq!(loaded.tools.sbatch, original.tools.sbatch);
}

// ============== JSON Serialization Tests ==============

#[rstest]
fn test_json_serialization() {
    let config = KickoffConfig::default();
    let json_str = serde_json::to_string_pretty(&config).unwrap();

    assert!(json_str.contains("\"project\""));
    assert!(json_str.contains("\"job\""));
    assert!(json_str.contains("\"tools\""));
    assert!(json_str.contains("\"gpu_type\""));
}

#[rstest]
fn test_json_deserialization() {
    let json_str = r#"{
        "project": {
            "project_dir": "experiments",
            "code_dir": "src",
            "conda_env": "torch-env",
            "entry_point": "main.py"
        },
        "job": {
            "config_name": "sweep",
            "gpu_type": "either",
            "qos": "scavenger",
            "mem": "128G",
            "cpus": 16,
            "gpus": 2,
            "time": "1-00:00:00",
            "nodes": 1,
            "ntasks_per_node": 1
        },
        "tools": {
            "python": "python3",
            "sbatch": "sbatch",
            "rewrite_script": "tools/flatten.py",
            "script_dir": "."
        }
    }"#;

    let config: KickoffConfig = serde_json::from_str(json_str).unwrap();
    assert_eq!(config.project.code_dir, "src");
    assert_eq!(config.job.gpu_type, "either");
    assert_eq!(config.job.gpus, 2);
    assert_eq!(config.tools.rewrite_script, "tools/flatten.py");
}
