//! # dlr-cli: License Registry CLI
//!
//! Provides the `dlr` command-line interface over an in-process registry.
//!
//! ## Subcommands
//!
//! - `dlr replay`: apply a YAML operation script and emit the event feed
//!   as JSON lines.
//! - `dlr query`: apply a script, then print one view of the resulting
//!   state as JSON.
//!
//! ```bash
//! dlr replay ops.yaml --events-out feed.jsonl
//! dlr query ops.yaml license DL123
//! dlr query ops.yaml holder 0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc
//! ```

pub mod query;
pub mod replay;
pub mod script;

use std::path::Path;

use dlr_core::Address;
use dlr_registry::RegistryConfig;

use crate::script::Script;

/// Pick the registry owner for a run.
///
/// A `--config` file takes precedence over the script's own `owner`, and
/// `DLR_OWNER` overrides both.
pub fn resolve_owner(config: Option<&Path>, script: &Script) -> anyhow::Result<Address> {
    let file = match config {
        Some(path) => Some(RegistryConfig::load(path)?),
        None => script.owner.map(|owner| RegistryConfig { owner }),
    };
    Ok(RegistryConfig::with_env_override(file)?.owner)
}
