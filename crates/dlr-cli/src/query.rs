//! # Query Subcommand
//!
//! Replays a script, then prints one view of the final state as pretty
//! JSON. Rejected steps are logged, not fatal.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::{json, Value};

use dlr_core::{Address, LicenseId, Timestamp};
use dlr_registry::LicenseRegistry;

use crate::script::{replay, Script};

/// Arguments for the `dlr query` subcommand.
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Operation script (YAML).
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    #[command(subcommand)]
    pub target: QueryTarget,
}

#[derive(Subcommand, Debug, Clone)]
pub enum QueryTarget {
    /// One license, with its status as of the last step.
    License { id: String },
    /// Every license in issuance order.
    All,
    /// Licenses currently attributed to a holder.
    Holder { address: String },
    /// Every authority entry.
    Authorities,
    /// Number of licenses ever issued.
    Count,
}

/// Execute the query subcommand.
///
/// Returns exit code 1 if the query itself fails (unknown license,
/// malformed argument).
pub fn run_query(args: &QueryArgs, config: Option<&Path>) -> Result<u8> {
    let script = Script::load(&args.script)
        .with_context(|| format!("failed to load script {}", args.script.display()))?;
    let owner = crate::resolve_owner(config, &script)?;
    let replay = replay(&script, owner, false)?;

    for report in replay.failures() {
        if let Err(e) = &report.result {
            tracing::warn!(step = report.index, op = report.op, error = %e, "step rejected");
        }
    }

    let as_of = script.steps.last().map(|s| s.at);
    match query(&replay.registry, &args.target, as_of) {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(0)
        }
        Err(e) => {
            eprintln!("ERROR: {e:#}");
            Ok(1)
        }
    }
}

/// Evaluate `target` against `registry`.
///
/// For a single license, `effective_status` is computed at `as_of` (or now).
pub fn query(registry: &LicenseRegistry, target: &QueryTarget, as_of: Option<Timestamp>) -> Result<Value> {
    let value = match target {
        QueryTarget::License { id } => {
            let record = registry.get_license(&LicenseId::new(id.as_str())?)?;
            let at = as_of.unwrap_or_else(Timestamp::now);
            json!({
                "effective_status": record.effective_status(at),
                "license": record,
            })
        }
        QueryTarget::All => serde_json::to_value(registry.all_licenses())?,
        QueryTarget::Holder { address } => {
            let holder = Address::parse(address)?;
            serde_json::to_value(registry.licenses_by_holder(&holder))?
        }
        QueryTarget::Authorities => serde_json::to_value(registry.authorities())?,
        QueryTarget::Count => json!(registry.license_count()),
    };
    Ok(value)
}
