//! Provider CLI invocation shared by the shipped drivers.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::process::Stdio;
use tokio::process::Command;

use crate::provisioning::driver::{ProviderError, ProvisionStep};

/// A provider CLI binary plus the environment handed to every invocation.
///
/// The environment is where credentials travel; it is never logged.
pub struct CliCommand {
    program: String,
    envs: HashMap<String, String>,
}

impl CliCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            envs: HashMap::new(),
        }
    }

    /// Set an environment variable when a value is present.
    pub fn env_opt(mut self, key: &str, value: Option<&str>) -> Self {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            self.envs.insert(key.to_string(), value.to_string());
        }
        self
    }

    pub fn env(self, key: &str, value: &str) -> Self {
        self.env_opt(key, Some(value))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run with `args` and return trimmed stdout; failures are attributed to `step`.
    pub async fn run<I, S>(&self, step: ProvisionStep, args: I) -> Result<String, ProviderError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        cmd.envs(&self.envs);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        tracing::debug!(program = %self.program, step = %step, "Running provider command");

        let output = cmd.output().await.map_err(|e| {
            ProviderError::new(step, format!("failed to run '{}': {}", self.program, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            let message = if detail.is_empty() {
                format!("'{}' exited with {}", self.program, output.status)
            } else {
                detail.to_string()
            };
            return Err(ProviderError::new(step, message));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Parse CLI JSON output, attributing parse failures to `step`.
pub fn parse_json(step: ProvisionStep, raw: &str) -> Result<serde_json::Value, ProviderError> {
    serde_json::from_str(raw)
        .map_err(|e| ProviderError::new(step, format!("unexpected provider output: {}", e)))
}

/// Read a non-empty string at a JSON pointer, or fail with `what`.
pub fn string_at(value: &serde_json::Value, pointer: &str, what: &str) -> Result<String, ProviderError> {
    value
        .pointer(pointer)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "None")
        .map(str::to_string)
        .ok_or_else(|| ProviderError::new(ProvisionStep::ExtractAddress, format!("failed to get {}", what)))
}
