//! Probe configuration stored under `<state-root>/config.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Verifier configuration (TOML).
///
/// Missing fields default to the reference timeouts and commands.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClaimcheckConfig {
    pub tests: TestsConfig,
    pub git: GitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TestsConfig {
    /// Test command; scoped paths are appended after these arguments.
    pub command: Vec<String>,
    /// Alternate invocation tried once when the command's executable is missing.
    pub fallback_command: Vec<String>,
    pub timeout_secs: u64,
    /// Bytes of stdout/stderr kept per stream.
    pub output_limit_bytes: usize,
}

impl Default for TestsConfig {
    fn default() -> Self {
        Self {
            command: ["pytest", "--tb=no", "-q"].map(String::from).to_vec(),
            fallback_command: ["python", "-m", "pytest", "--tb=no", "-q"]
                .map(String::from)
                .to_vec(),
            timeout_secs: 120,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl TestsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GitConfig {
    /// Git executable.
    pub program: String,
    pub status_timeout_secs: u64,
    pub diff_timeout_secs: u64,
    pub output_limit_bytes: usize,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
            status_timeout_secs: 5,
            diff_timeout_secs: 10,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl GitConfig {
    pub fn status_timeout(&self) -> Duration {
        Duration::from_secs(self.status_timeout_secs)
    }

    pub fn diff_timeout(&self) -> Duration {
        Duration::from_secs(self.diff_timeout_secs)
    }
}

impl ClaimcheckConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tests.command.is_empty() || self.tests.command[0].trim().is_empty() {
            return Err(anyhow!("tests.command must be a non-empty array"));
        }
        if self
            .tests
            .fallback_command
            .first()
            .is_some_and(|program| program.trim().is_empty())
        {
            return Err(anyhow!("tests.fallback_command must start with a program"));
        }
        if self.tests.timeout_secs == 0 {
            return Err(anyhow!("tests.timeout_secs must be > 0"));
        }
        if self.tests.output_limit_bytes == 0 {
            return Err(anyhow!("tests.output_limit_bytes must be > 0"));
        }
        if self.git.program.trim().is_empty() {
            return Err(anyhow!("git.program must not be empty"));
        }
        if self.git.status_timeout_secs == 0 || self.git.diff_timeout_secs == 0 {
            return Err(anyhow!("git timeouts must be > 0"));
        }
        if self.git.output_limit_bytes == 0 {
            return Err(anyhow!("git.output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ClaimcheckConfig::default()`.
pub fn load_config(path: &Path) -> Result<ClaimcheckConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "config missing, using defaults");
        let cfg = ClaimcheckConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ClaimcheckConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ClaimcheckConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    crate::io::state_store::write_atomic(path, &buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, ClaimcheckConfig::default());
        assert_eq!(cfg.tests.timeout(), Duration::from_secs(120));
        assert_eq!(cfg.git.status_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.git.diff_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("config.toml");
        let mut cfg = ClaimcheckConfig::default();
        cfg.tests.command = vec!["cargo".to_string(), "test".to_string()];
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[tests]\ntimeout_secs = 30\n").expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.tests.timeout_secs, 30);
        assert_eq!(cfg.tests.command, TestsConfig::default().command);
        assert_eq!(cfg.git, GitConfig::default());
    }

    #[test]
    fn rejects_zero_timeout_and_empty_command() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "[git]\nstatus_timeout_secs = 0\n").expect("write");
        let err = load_config(&path).expect_err("invalid");
        assert!(format!("{err:#}").contains("git timeouts"));

        fs::write(&path, "[tests]\ncommand = []\n").expect("write");
        let err = load_config(&path).expect_err("invalid");
        assert!(format!("{err:#}").contains("tests.command"));
    }
}
