//! # Replay Subcommand
//!
//! Applies a script to a fresh registry and writes the resulting event feed
//! as one JSON object per line. Rejected steps are reported on stderr.
//!
//! Returns exit code 0 when every step succeeded, 1 otherwise.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use dlr_registry::EventRecord;

use crate::script::{replay, Script};

/// Arguments for the `dlr replay` subcommand.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Operation script (YAML).
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,

    /// Write the event feed to FILE instead of stdout.
    #[arg(long, value_name = "FILE")]
    pub events_out: Option<PathBuf>,

    /// Stop at the first rejected step.
    #[arg(long)]
    pub fail_fast: bool,
}

/// Execute the replay subcommand.
pub fn run_replay(args: &ReplayArgs, config: Option<&Path>) -> Result<u8> {
    let script = Script::load(&args.script)
        .with_context(|| format!("failed to load script {}", args.script.display()))?;
    let owner = crate::resolve_owner(config, &script)?;
    let replay = replay(&script, owner, args.fail_fast)?;

    replay
        .registry
        .verify_event_chain()
        .context("event chain failed verification")?;

    let events = replay.registry.events();
    match &args.events_out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            let mut out = BufWriter::new(file);
            write_events(&mut out, &events)?;
            out.flush()?;
        }
        None => write_events(&mut std::io::stdout().lock(), &events)?,
    }

    let mut rejected = 0usize;
    for report in replay.failures() {
        if let Err(e) = &report.result {
            rejected += 1;
            eprintln!(
                "  REJECTED: step {} ({}) [{}] {}",
                report.index,
                report.op,
                e.kind(),
                e
            );
        }
    }
    eprintln!(
        "Steps: {}/{} applied, {} event(s)",
        replay.reports.len() - rejected,
        script.steps.len(),
        events.len()
    );

    Ok(if rejected > 0 { 1 } else { 0 })
}

/// Write `events` as JSON lines.
pub fn write_events(out: &mut impl Write, events: &[EventRecord]) -> Result<()> {
    for record in events {
        serde_json::to_writer(&mut *out, record)?;
        writeln!(out)?;
    }
    Ok(())
}
