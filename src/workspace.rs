//! Staged launch workspaces
//!
//! A launch never runs from the live source tree. The launcher deep-copies
//! the code directory into a timestamped staging directory under the project
//! root, rewrites imports in the copy, and hands the copy to the submitted
//! job. Staged trees are never removed automatically: a failed launch leaves
//! its directory behind so the operator can inspect it or resubmit.

use fs_extra::dir::CopyOptions;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::LaunchError;

/// A deep copy of the code directory, private to one launch
#[derive(Debug, Clone)]
pub struct StagedWorkspace {
    /// Staging directory, `<project root>/tmp/tmp_<timestamp>`
    pub root: PathBuf,

    /// The copied code directory inside the staging directory
    pub code_dir: PathBuf,
}

/// Deep-copy `<project root>/<code dir>` into a fresh staging directory.
///
/// The original tree is read, never modified. Uniqueness of the timestamp is
/// the caller's obligation; the launcher does not lock or retry.
pub fn stage(
    project_root: &Path,
    code_dir: &str,
    timestamp: &str,
) -> Result<StagedWorkspace, LaunchError> {
    let source = project_root.join(code_dir);
    let staging_root = project_root.join("tmp").join(format!("tmp_{}", timestamp));
    fs::create_dir_all(&staging_root)?;

    let dest = staging_root.join(code_dir);
    let options = CopyOptions::new().copy_inside(true);
    fs_extra::dir::copy(&source, &dest, &options).map_err(|e| LaunchError::Stage {
        from: source.clone(),
        to: dest.clone(),
        source: e,
    })?;

    info!("Staged {} at {}", source.display(), dest.display());
    Ok(StagedWorkspace {
        root: staging_root,
        code_dir: dest,
    })
}

/// Run the import-rewrite utility against a staged copy.
///
/// The utility mutates the staged tree in place so the entry point can run
/// from the workspace top level; the live tree is never passed here. A
/// non-zero exit aborts the launch with the utility's stderr.
pub fn rewrite_imports(
    python: &str,
    rewrite_script: &Path,
    staged: &StagedWorkspace,
    entry_point: &str,
) -> Result<(), LaunchError> {
    debug!(
        "Rewriting imports: {} {} {} {}",
        python,
        rewrite_script.display(),
        staged.code_dir.display(),
        entry_point
    );

    let output = Command::new(python)
        .arg(rewrite_script)
        .arg(&staged.code_dir)
        .arg(entry_point)
        .output()
        .map_err(|e| LaunchError::Spawn {
            program: python.to_string(),
            source: e,
        })?;

    let return_code = output.status.code().unwrap_or(-1);
    if return_code != 0 {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        return Err(LaunchError::Rewrite {
            code: return_code,
            stderr,
        });
    }

    Ok(())
}
