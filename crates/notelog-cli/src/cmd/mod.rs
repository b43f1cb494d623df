pub mod completions;
pub mod cycles;
pub mod rebuild;
pub mod sort;

use std::path::Path;

use anyhow::Context;
use notelog_core::event::{EventSetFile, LoadedEventSet};
use tracing::debug;

use crate::output::{CliError, OutputMode, fail};

/// Read and resolve an event-set file. `-` reads stdin.
pub fn load_event_set(path: &Path, output: OutputMode) -> anyhow::Result<LoadedEventSet> {
    let text = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
    };

    let loaded = EventSetFile::from_json(&text)
        .and_then(EventSetFile::into_event_set)
        .map_err(|err| fail(output, &CliError::with_code(err.to_string(), err.error_code())))?;

    debug!(
        events = loaded.set.len(),
        working = loaded.working.len(),
        "loaded event set"
    );
    Ok(loaded)
}
