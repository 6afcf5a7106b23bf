//! Locations of the repository artifacts the harness inspects.

use std::path::{Path, PathBuf};

/// Fixed layout of the deployment repository, rooted at the directory the
/// harness is invoked from.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub repo_root: PathBuf,
    /// Root Terraform configuration; also the working directory for
    /// `terraform output`.
    pub terraform_dir: PathBuf,
    /// Bootstrap configuration for the remote state backend.
    pub state_dir: PathBuf,
    pub modules_dir: PathBuf,
    pub workflow_file: PathBuf,
    pub readme_file: PathBuf,
}

impl ProjectPaths {
    pub fn new(repo_root: &Path) -> Self {
        Self {
            repo_root: repo_root.to_path_buf(),
            terraform_dir: repo_root.join("terraform"),
            state_dir: repo_root.join("terraform-state"),
            modules_dir: repo_root.join("modules"),
            workflow_file: repo_root.join(".github").join("workflows").join("deploy.yaml"),
            readme_file: repo_root.join("README.md"),
        }
    }
}
