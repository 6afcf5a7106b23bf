//! Resolution of named infrastructure outputs.
//!
//! An output (endpoint URL, resource name, ARN) resolves from the process
//! environment first, then from `terraform output` in a fixed working
//! directory. Lookups are fresh on every call and never retried: a transient
//! state-backend glitch should surface immediately rather than mask real
//! misconfiguration.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tracing::debug;

use crate::process::run_command_with_timeout;
use crate::scenario::FatalError;

/// Bound on any single state-query invocation.
pub const OUTPUT_TIMEOUT: Duration = Duration::from_secs(30);

/// A place output values can come from.
pub trait ConfigSource {
    /// `Ok(None)` means "not known here, try the next source"; `Err` aborts
    /// the chain.
    fn resolve(&self, name: &str) -> Result<Option<String>>;
}

/// Environment variable named after the uppercase-snake transform of the
/// output name (`api_gateway_url` -> `API_GATEWAY_URL`).
pub struct EnvSource;

/// Environment variable name for an output name.
pub fn env_name(name: &str) -> String {
    name.chars()
        .map(|ch| if ch == '-' { '_' } else { ch.to_ascii_uppercase() })
        .collect()
}

impl ConfigSource for EnvSource {
    fn resolve(&self, name: &str) -> Result<Option<String>> {
        match std::env::var(env_name(name)) {
            Ok(value) if !value.trim().is_empty() => Ok(Some(value.trim().to_string())),
            _ => Ok(None),
        }
    }
}

/// Queries persisted infrastructure state via the `terraform` CLI.
pub struct TerraformSource {
    working_dir: PathBuf,
}

impl TerraformSource {
    pub fn new(working_dir: &Path) -> Self {
        Self {
            working_dir: working_dir.to_path_buf(),
        }
    }

    /// `terraform output -raw <name>`: the raw value on stdout, exit 0.
    pub fn output_raw(&self, name: &str) -> Result<String> {
        let mut cmd = Command::new("terraform");
        cmd.args(["output", "-raw", name])
            .current_dir(&self.working_dir);
        let output = run_command_with_timeout(cmd, OUTPUT_TIMEOUT)
            .with_context(|| format!("terraform output -raw {name}"))?;
        if output.timed_out {
            bail!(
                "terraform output -raw {name} timed out after {}s",
                OUTPUT_TIMEOUT.as_secs()
            );
        }
        if !output.status.success() {
            bail!(
                "terraform output -raw {name} failed: {}",
                output.stderr.trim()
            );
        }
        Ok(output.stdout.trim().to_string())
    }

    /// `terraform output -json`: the full output map for bulk reads.
    pub fn outputs_json(&self) -> Result<serde_json::Value> {
        let mut cmd = Command::new("terraform");
        cmd.args(["output", "-json"]).current_dir(&self.working_dir);
        let output = run_command_with_timeout(cmd, OUTPUT_TIMEOUT)
            .context("terraform output -json")?;
        if output.timed_out {
            bail!(
                "terraform output -json timed out after {}s",
                OUTPUT_TIMEOUT.as_secs()
            );
        }
        if !output.status.success() {
            bail!("terraform output -json failed: {}", output.stderr.trim());
        }
        serde_json::from_str(output.stdout.trim()).context("parse terraform outputs json")
    }
}

impl ConfigSource for TerraformSource {
    fn resolve(&self, name: &str) -> Result<Option<String>> {
        Ok(Some(self.output_raw(name)?))
    }
}

/// Priority-ordered chain of [`ConfigSource`]s.
///
/// A name either resolves to a non-empty string or the whole run aborts with
/// a [`FatalError`]; there is no partially-resolved state.
pub struct OutputResolver {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl OutputResolver {
    /// Standard chain: environment override first, then the state query tool
    /// run in `terraform_dir`.
    pub fn for_terraform_dir(terraform_dir: &Path) -> Self {
        Self::from_sources(vec![
            Box::new(EnvSource),
            Box::new(TerraformSource::new(terraform_dir)),
        ])
    }

    pub fn from_sources(sources: Vec<Box<dyn ConfigSource>>) -> Self {
        Self { sources }
    }

    pub fn resolve(&self, name: &str) -> Result<String, FatalError> {
        for source in &self.sources {
            match source.resolve(name) {
                Ok(Some(value)) if !value.is_empty() => {
                    debug!(name, "output resolved");
                    return Ok(value);
                }
                Ok(_) => continue,
                Err(err) => {
                    return Err(FatalError(
                        err.context(format!("resolve output `{name}`")),
                    ));
                }
            }
        }
        Err(FatalError(anyhow!(
            "output `{name}` not resolvable from environment or terraform state"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Option<&'static str>);

    impl ConfigSource for Fixed {
        fn resolve(&self, _name: &str) -> Result<Option<String>> {
            Ok(self.0.map(str::to_string))
        }
    }

    struct Broken;

    impl ConfigSource for Broken {
        fn resolve(&self, name: &str) -> Result<Option<String>> {
            bail!("query for {name} blew up")
        }
    }

    #[test]
    fn env_name_uppercases_and_snakes() {
        assert_eq!(env_name("api_gateway_url"), "API_GATEWAY_URL");
        assert_eq!(env_name("api-gateway-url"), "API_GATEWAY_URL");
    }

    #[test]
    fn first_source_wins() {
        let resolver = OutputResolver::from_sources(vec![
            Box::new(Fixed(Some("https://first"))),
            Box::new(Fixed(Some("https://second"))),
        ]);
        assert_eq!(
            resolver.resolve("api_gateway_url").expect("resolves"),
            "https://first"
        );
    }

    #[test]
    fn falls_through_missing_and_empty_values() {
        let resolver = OutputResolver::from_sources(vec![
            Box::new(Fixed(None)),
            Box::new(Fixed(Some(""))),
            Box::new(Fixed(Some("value"))),
        ]);
        assert_eq!(resolver.resolve("name").expect("resolves"), "value");
    }

    #[test]
    fn exhausted_chain_is_fatal() {
        let resolver = OutputResolver::from_sources(vec![Box::new(Fixed(None))]);
        let err = resolver.resolve("api_gateway_url").expect_err("fatal");
        assert!(err.to_string().contains("api_gateway_url"));
    }

    #[test]
    fn source_error_is_fatal_not_skipped() {
        let resolver = OutputResolver::from_sources(vec![
            Box::new(Broken),
            Box::new(Fixed(Some("unreachable"))),
        ]);
        let err = resolver.resolve("name").expect_err("fatal");
        assert!(format!("{err:#}").contains("blew up"));
    }
}
