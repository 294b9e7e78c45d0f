//! # Operation Scripts
//!
//! A script is a YAML list of timed steps, each naming the caller and a
//! registry command:
//!
//! ```yaml
//! owner: "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
//! steps:
//!   - at: 1697059200
//!     caller: "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
//!     command:
//!       op: add_authority
//!       authority: "0x70997970c51812dc3a010c7d01b50e0d17dc79c8"
//! ```
//!
//! `at` is a Unix timestamp and becomes the registry clock for that step.
//! Steps must not go back in time.

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use dlr_core::{Address, ManualClock, RegistryError, Timestamp};
use dlr_registry::{Command, CommandOutcome, LicenseRegistry};

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("failed to read script {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid script YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("step {index} at {at} is earlier than the previous step at {previous}")]
    OutOfOrder {
        index: usize,
        at: Timestamp,
        previous: Timestamp,
    },
}

/// One timed command.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    pub at: Timestamp,
    pub caller: Address,
    pub command: Command,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    /// Owner used when no config file or `DLR_OWNER` is given.
    #[serde(default)]
    pub owner: Option<Address>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ScriptError> {
        let script: Self = serde_yaml::from_str(yaml)?;
        for (index, pair) in script.steps.windows(2).enumerate() {
            if pair[1].at < pair[0].at {
                return Err(ScriptError::OutOfOrder {
                    index: index + 1,
                    at: pair[1].at,
                    previous: pair[0].at,
                });
            }
        }
        Ok(script)
    }

    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let content = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }
}

/// Result of one step.
#[derive(Debug)]
pub struct StepReport {
    pub index: usize,
    pub op: &'static str,
    pub result: Result<CommandOutcome, RegistryError>,
}

/// A registry after a replay, with the per-step results.
#[derive(Debug)]
pub struct Replay {
    pub registry: LicenseRegistry,
    pub reports: Vec<StepReport>,
}

impl Replay {
    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.reports.iter().filter(|r| r.result.is_err())
    }
}

/// Apply `script` to a fresh registry owned by `owner`.
///
/// A rejected step is recorded and the replay continues, unless `fail_fast`
/// is set, in which case it stops after the first rejection.
pub fn replay(script: &Script, owner: Address, fail_fast: bool) -> Result<Replay, RegistryError> {
    let start = script
        .steps
        .first()
        .map(|s| s.at)
        .unwrap_or_else(Timestamp::now);
    let clock = Arc::new(ManualClock::new(start));
    let registry = LicenseRegistry::with_clock(owner, clock.clone())?;

    let mut reports = Vec::with_capacity(script.steps.len());
    for (index, step) in script.steps.iter().enumerate() {
        clock.set(step.at);
        let op = step.command.name();
        let result = registry.execute(&step.caller, step.command.clone());
        let failed = result.is_err();
        reports.push(StepReport { index, op, result });
        if failed && fail_fast {
            tracing::warn!(index, op, "stopping replay at first rejected step");
            break;
        }
    }
    Ok(Replay { registry, reports })
}
