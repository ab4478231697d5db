//! Loading of the optional agent self-report.
//!
//! The report is checked once against `schemas/self_report.schema.json` and
//! then deserialized into [`SelfReport`]. Anything that prevents that (missing
//! file, unreadable file, malformed JSON, schema violation) means "no report".

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow};
use jsonschema::{Validator, validator_for};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::core::types::SelfReport;

const SELF_REPORT_SCHEMA: &str = include_str!("../../schemas/self_report.schema.json");

static SELF_REPORT_VALIDATOR: LazyLock<Validator> = LazyLock::new(|| {
    let schema: Value =
        serde_json::from_str(SELF_REPORT_SCHEMA).expect("self-report schema should be valid json");
    validator_for(&schema).expect("self-report schema should compile")
});

/// Load the self-report at `path`, treating every failure as absent.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_self_report(path: &Path) -> Option<SelfReport> {
    if !path.exists() {
        debug!("self-report not found");
        return None;
    }
    match read_self_report(path) {
        Ok(report) => {
            info!("loaded self-report");
            Some(report)
        }
        Err(err) => {
            warn!(err = %format!("{err:#}"), "ignoring unusable self-report");
            None
        }
    }
}

/// Strict variant of [`load_self_report`] that reports why a file was rejected.
pub fn read_self_report(path: &Path) -> Result<SelfReport> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read self-report {}", path.display()))?;
    parse_self_report(&contents).with_context(|| format!("parse self-report {}", path.display()))
}

pub fn parse_self_report(contents: &str) -> Result<SelfReport> {
    let value: Value = serde_json::from_str(contents).context("invalid json")?;
    validate_schema(&value)?;
    serde_json::from_value(value).context("deserialize self-report")
}

fn validate_schema(value: &Value) -> Result<()> {
    let validator = &*SELF_REPORT_VALIDATOR;
    if validator.is_valid(value) {
        return Ok(());
    }
    let messages = validator
        .iter_errors(value)
        .map(|err| err.to_string())
        .collect::<Vec<_>>();
    Err(anyhow!(
        "self-report schema validation failed: {}",
        messages.join("; ")
    ))
}
