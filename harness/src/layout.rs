//! Static checks over the Terraform repository layout.
//!
//! All checks read the tree fresh per invocation and are independent of
//! network state. A missing file or unreadable artifact is a failed result
//! with the causing message, never a crash.

use std::fs;
use std::path::Path;

use anyhow::Result;
use tracing::instrument;

use crate::paths::ProjectPaths;
use crate::resolve::TerraformSource;
use crate::scenario::{FatalError, ScenarioResult, SuiteCtx};

/// Files the state-bootstrap directory must contain.
pub const STATE_FILES: [&str; 3] = ["main.tf", "outputs.tf", "github_oidc.tf"];
/// Outputs the materialized state infrastructure must expose.
pub const STATE_OUTPUTS: [&str; 2] = ["github_actions_role_arn", "terraform_state_bucket"];
/// Parameters the remote-state backend declaration must name.
pub const BACKEND_PARAMS: [&str; 4] = ["bucket", "key", "region", "dynamodb_table"];
/// Modules the infrastructure must be composed from.
pub const REQUIRED_MODULES: [&str; 3] = ["api-gateway", "lambda-function", "user-storage"];
/// Files every module must carry.
pub const MODULE_FILES: [&str; 4] = ["main.tf", "variables.tf", "outputs.tf", "README.md"];
/// Root configuration files that may instantiate modules.
pub const ROOT_CONFIG_FILES: [&str; 4] =
    ["main.tf", "lambda.tf", "api_gateway.tf", "user_storage.tf"];
/// Topics the root documentation must cover (matched case-insensitively).
pub const README_TOPICS: [&str; 7] = [
    "milestone 3",
    "github actions",
    "ci/cd",
    "deployment",
    "terraform",
    "aws",
    "infrastructure",
];

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

/// The backend file must declare an S3 backend with the required parameters.
/// Matched as substrings over the raw text, like the review checklist does.
pub fn check_backend_declaration(name: &str, terraform_dir: &Path) -> ScenarioResult {
    let path = terraform_dir.join("backend.tf");
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) => {
            return ScenarioResult::failed(name, format!("read {}: {err}", path.display()));
        }
    };
    if !contents.contains("backend \"s3\"") {
        return ScenarioResult::failed(name, "S3 backend not configured");
    }
    for param in BACKEND_PARAMS {
        if !contents.contains(param) {
            return ScenarioResult::failed(name, format!("missing `{param}` parameter"));
        }
    }
    ScenarioResult::passed(name)
}

/// The state-bootstrap directory must exist with its fixed file set.
pub fn check_state_layout(name: &str, state_dir: &Path) -> ScenarioResult {
    if !state_dir.is_dir() {
        return ScenarioResult::failed(name, "terraform-state directory not found");
    }
    for file in STATE_FILES {
        if !state_dir.join(file).is_file() {
            return ScenarioResult::failed(name, format!("{file} not found"));
        }
    }
    ScenarioResult::passed(name)
}

/// Query the materialized state for its required outputs.
///
/// Skipped (not failed) when the state cannot be queried or exposes no
/// outputs yet: an uninitialized backend is "not applicable", not "broken".
pub fn check_state_outputs(name: &str, state_dir: &Path) -> ScenarioResult {
    let outputs = match TerraformSource::new(state_dir).outputs_json() {
        Ok(outputs) => outputs,
        Err(err) => {
            return ScenarioResult::skipped(
                name,
                format!("terraform state not initialized ({err:#})"),
            );
        }
    };
    if outputs.as_object().is_none_or(|map| map.is_empty()) {
        return ScenarioResult::skipped(name, "terraform state holds no outputs yet");
    }
    for output in STATE_OUTPUTS {
        if outputs.get(output).is_none() {
            return ScenarioResult::failed(name, format!("missing `{output}` output"));
        }
    }
    ScenarioResult::passed(name)
}

/// Every required module exists with its four required files, and the root
/// configuration instantiates at least one module. Composition, not
/// copy-paste duplication.
pub fn check_modular_layout(name: &str, paths: &ProjectPaths) -> ScenarioResult {
    if !paths.modules_dir.is_dir() {
        return ScenarioResult::failed(name, "modules directory not found");
    }
    for module in REQUIRED_MODULES {
        let dir = paths.modules_dir.join(module);
        if !dir.is_dir() {
            return ScenarioResult::failed(name, format!("`{module}` module not found"));
        }
        for file in MODULE_FILES {
            if !dir.join(file).is_file() {
                return ScenarioResult::failed(name, format!("{module}/{file} not found"));
            }
        }
    }
    let mut composed = false;
    for file in ROOT_CONFIG_FILES {
        if let Ok(contents) = fs::read_to_string(paths.terraform_dir.join(file))
            && contents.contains("module \"")
        {
            composed = true;
            break;
        }
    }
    if !composed {
        return ScenarioResult::failed(
            name,
            "no module declaration found in terraform configuration",
        );
    }
    ScenarioResult::passed(name)
}

/// Root documentation covers the required topics; every module carries its
/// own documentation file.
pub fn check_documentation(name: &str, paths: &ProjectPaths) -> ScenarioResult {
    let readme = match fs::read_to_string(&paths.readme_file) {
        Ok(contents) => contents.to_lowercase(),
        Err(err) => {
            return ScenarioResult::failed(
                name,
                format!("read {}: {err}", paths.readme_file.display()),
            );
        }
    };
    let missing: Vec<&str> = README_TOPICS
        .iter()
        .copied()
        .filter(|topic| !readme.contains(topic))
        .collect();
    if !missing.is_empty() {
        return ScenarioResult::failed(
            name,
            format!("README missing sections: {}", missing.join(", ")),
        );
    }
    match module_dirs_missing_readme(&paths.modules_dir) {
        Ok(missing) if missing.is_empty() => ScenarioResult::passed(name),
        Ok(missing) => {
            ScenarioResult::failed(name, format!("{}/README.md not found", missing[0]))
        }
        Err(err) => ScenarioResult::from_error(name, &err),
    }
}

fn module_dirs_missing_readme(modules_dir: &Path) -> Result<Vec<String>> {
    let mut missing = Vec::new();
    if !modules_dir.is_dir() {
        return Ok(missing);
    }
    for entry in fs::read_dir(modules_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() && !path.join("README.md").is_file() {
            missing.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    missing.sort();
    Ok(missing)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[instrument(skip_all)]
pub fn backend_declaration(ctx: &SuiteCtx) -> Result<ScenarioResult, FatalError> {
    Ok(check_backend_declaration(
        "backend_declaration",
        &ctx.paths.terraform_dir,
    ))
}

#[instrument(skip_all)]
pub fn state_layout(ctx: &SuiteCtx) -> Result<ScenarioResult, FatalError> {
    Ok(check_state_layout("state_layout", &ctx.paths.state_dir))
}

#[instrument(skip_all)]
pub fn state_outputs(ctx: &SuiteCtx) -> Result<ScenarioResult, FatalError> {
    Ok(check_state_outputs("state_outputs", &ctx.paths.state_dir))
}

#[instrument(skip_all)]
pub fn modular_layout(ctx: &SuiteCtx) -> Result<ScenarioResult, FatalError> {
    Ok(check_modular_layout("modular_layout", &ctx.paths))
}

#[instrument(skip_all)]
pub fn documentation(ctx: &SuiteCtx) -> Result<ScenarioResult, FatalError> {
    Ok(check_documentation("documentation", &ctx.paths))
}
