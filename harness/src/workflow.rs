//! Static checks over the GitHub Actions pipeline definition.
//!
//! The workflow file is re-read fresh on every check so a stale parse can
//! never hide an edit. Parsing normalizes the YAML quirk where a bare `on`
//! key may be resolved as the boolean `true`; after [`Workflow::parse`] the
//! trigger is always addressable as [`Workflow::has_trigger`].

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use serde_yaml::Value;
use tracing::instrument;

use crate::process::run_command_with_timeout;
use crate::scenario::{FatalError, ScenarioResult, SuiteCtx};

/// Jobs the pipeline must define.
pub const REQUIRED_JOBS: [&str; 5] = [
    "terraform-checks",
    "security-scan",
    "terraform-plan",
    "terraform-apply",
    "terraform-destroy",
];

/// Workflow environment key pinning the Terraform version used in CI.
pub const VERSION_PIN_KEY: &str = "TF_VERSION";

/// Normalized pipeline definition.
#[derive(Debug)]
pub struct Workflow {
    pub name: Option<String>,
    /// True when the document has a trigger section, whether the parser saw
    /// the literal key `on` or coerced it to the boolean `true`.
    pub has_trigger: bool,
    pub permissions: Option<BTreeMap<String, String>>,
    pub env: BTreeMap<String, String>,
    /// Job name to raw job definition; steps stay untyped for substring
    /// matching.
    pub jobs: Option<BTreeMap<String, Value>>,
}

impl Workflow {
    pub fn load(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parse {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let doc: Value = serde_yaml::from_str(text).context("parse workflow yaml")?;
        let mapping = doc
            .as_mapping()
            .ok_or_else(|| anyhow!("workflow root is not a mapping"))?;
        let has_trigger = mapping.keys().any(|key| {
            matches!(key, Value::String(k) if k == "on") || matches!(key, Value::Bool(true))
        });
        let name = doc
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string);
        let permissions = doc.get("permissions").map(scalar_map);
        let env = doc.get("env").map(scalar_map).unwrap_or_default();
        let jobs = doc.get("jobs").and_then(Value::as_mapping).map(|map| {
            map.iter()
                .filter_map(|(key, value)| {
                    key.as_str().map(|key| (key.to_string(), value.clone()))
                })
                .collect()
        });
        Ok(Self {
            name,
            has_trigger,
            permissions,
            env,
            jobs,
        })
    }
}

fn scalar_map(value: &Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    if let Some(map) = value.as_mapping() {
        for (key, value) in map {
            if let (Some(key), Some(value)) = (key.as_str(), scalar_string(value)) {
                out.insert(key.to_string(), value);
            }
        }
    }
    out
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Verdicts (pure)
// ---------------------------------------------------------------------------

/// Required sections, required jobs, and the OIDC trust grant.
pub fn structure_verdict(name: &str, workflow: &Workflow) -> ScenarioResult {
    if workflow.name.is_none() {
        return ScenarioResult::failed(name, "missing `name` section");
    }
    let Some(jobs) = &workflow.jobs else {
        return ScenarioResult::failed(name, "missing `jobs` section");
    };
    let Some(permissions) = &workflow.permissions else {
        return ScenarioResult::failed(name, "missing `permissions` section");
    };
    if !workflow.has_trigger {
        return ScenarioResult::failed(name, "missing `on` section");
    }
    for job in REQUIRED_JOBS {
        if !jobs.contains_key(job) {
            return ScenarioResult::failed(name, format!("missing `{job}` job"));
        }
    }
    if permissions.get("id-token").map(String::as_str) != Some("write") {
        return ScenarioResult::failed(name, "missing `id-token: write` permission");
    }
    ScenarioResult::passed(name)
}

/// Local tool version against the version pinned in the workflow env block.
pub fn version_verdict(name: &str, local: &str, pinned: &str) -> ScenarioResult {
    if local == pinned {
        ScenarioResult::passed(name)
    } else {
        ScenarioResult::failed(
            name,
            format!("version mismatch: local v{local} vs workflow v{pinned}"),
        )
    }
}

/// Steps of the security-scan job must wire up the scanner install, its run
/// against the Terraform tree, and a SARIF results upload. Presence is
/// substring-matched across the serialized step representation.
pub fn security_scan_verdict(name: &str, job: &Value) -> ScenarioResult {
    let steps: Vec<String> = job
        .get("steps")
        .and_then(Value::as_sequence)
        .map(|steps| steps.iter().map(serialized_step).collect())
        .unwrap_or_default();

    if !steps.iter().any(|step| step.contains("checkov")) {
        return ScenarioResult::failed(name, "checkov installation step not found");
    }
    if !steps.iter().any(|step| step.contains("checkov -d terraform/")) {
        return ScenarioResult::failed(name, "checkov execution step not found");
    }
    if !steps.iter().any(|step| step.contains("sarif")) {
        return ScenarioResult::failed(name, "sarif results upload step not found");
    }
    ScenarioResult::passed(name)
}

fn serialized_step(step: &Value) -> String {
    serde_yaml::to_string(step).unwrap_or_default()
}

/// First line of `terraform version` output, e.g. `Terraform v1.5.7`.
pub fn parse_version_line(stdout: &str) -> Option<String> {
    let first = stdout.lines().next()?;
    let idx = first.find('v')?;
    let version = first[idx + 1..].trim();
    if version.is_empty() {
        None
    } else {
        Some(version.to_string())
    }
}

fn local_terraform_version() -> Result<String> {
    let mut cmd = Command::new("terraform");
    cmd.arg("version");
    let output = run_command_with_timeout(cmd, Duration::from_secs(10))
        .context("run terraform version")?;
    if output.timed_out {
        bail!("terraform version timed out");
    }
    if !output.status.success() {
        bail!("terraform version failed: {}", output.stderr.trim());
    }
    parse_version_line(&output.stdout)
        .ok_or_else(|| anyhow!("unrecognized terraform version output: {}", output.stdout))
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[instrument(skip_all)]
pub fn workflow_structure(ctx: &SuiteCtx) -> Result<ScenarioResult, FatalError> {
    let name = "workflow_structure";
    Ok(match Workflow::load(&ctx.paths.workflow_file) {
        Ok(workflow) => structure_verdict(name, &workflow),
        Err(err) => ScenarioResult::from_error(name, &err),
    })
}

#[instrument(skip_all)]
pub fn terraform_version_consistency(ctx: &SuiteCtx) -> Result<ScenarioResult, FatalError> {
    let name = "terraform_version_consistency";
    let workflow = match Workflow::load(&ctx.paths.workflow_file) {
        Ok(workflow) => workflow,
        Err(err) => return Ok(ScenarioResult::from_error(name, &err)),
    };
    let Some(pinned) = workflow.env.get(VERSION_PIN_KEY) else {
        return Ok(ScenarioResult::failed(
            name,
            format!("workflow env missing {VERSION_PIN_KEY}"),
        ));
    };
    Ok(match local_terraform_version() {
        Ok(local) => version_verdict(name, &local, pinned),
        Err(err) => ScenarioResult::from_error(name, &err),
    })
}

#[instrument(skip_all)]
pub fn security_scan_wiring(ctx: &SuiteCtx) -> Result<ScenarioResult, FatalError> {
    let name = "security_scan_wiring";
    let workflow = match Workflow::load(&ctx.paths.workflow_file) {
        Ok(workflow) => workflow,
        Err(err) => return Ok(ScenarioResult::from_error(name, &err)),
    };
    let job = workflow
        .jobs
        .as_ref()
        .and_then(|jobs| jobs.get("security-scan"));
    Ok(match job {
        Some(job) => security_scan_verdict(name, job),
        None => ScenarioResult::failed(name, "`security-scan` job not found"),
    })
}
