//! jtt-inspect entry point.
//!
//! Reads hex-encoded JT/T 808 frames from stdin, one per line, and prints a
//! report for each.  Malformed lines are logged and skipped.
//!
//! ```text
//! jtt-inspect [config.toml] < frames.txt
//! ```

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use jtt_inspect::{load_config, FrameInspector, InspectConfig};

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => load_config(Path::new(&path)).with_context(|| format!("loading {path}"))?,
        None => InspectConfig::default(),
    };

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    // Logs go to stderr so stdout carries only reports.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(io::stderr)
        .init();

    info!(output = ?config.output, capacity = config.segment.capacity, "jtt-inspect starting");

    let inspector = FrameInspector::new(config.segment.clone());
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut reported = 0usize;

    for (number, line) in stdin.lock().lines().enumerate() {
        let line = line.context("reading stdin")?;
        match inspector.inspect_line(&line) {
            Ok(Some(inspection)) => {
                writeln!(out, "{}", inspection.render(config.output)?)?;
                reported += 1;
            }
            Ok(None) => {}
            Err(e) => warn!(line = number + 1, error = %e, "frame dropped"),
        }
    }
    out.flush()?;

    let expired = inspector.purge_expired();
    info!(
        reported,
        expired,
        incomplete = inspector.pending(),
        "jtt-inspect finished"
    );
    Ok(())
}
