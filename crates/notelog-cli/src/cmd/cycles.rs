//! `nlog cycles`: list dependency cycles in a working set.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use notelog_core::cycles::find_dependency_cycles;
use serde::Serialize;

use crate::output::{OutputMode, render};

/// Arguments for `nlog cycles`.
#[derive(Args, Debug)]
pub struct CyclesArgs {
    /// Event-set JSON file (`-` for stdin).
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Debug, Serialize)]
struct CyclesOutput {
    cycles: Vec<Vec<String>>,
}

/// Execute `nlog cycles`.
pub fn run_cycles(args: &CyclesArgs, output: OutputMode) -> anyhow::Result<()> {
    let loaded = super::load_event_set(&args.file, output)?;

    let cycles = find_dependency_cycles(&loaded.set, &loaded.working)
        .into_iter()
        .map(|cycle| cycle.into_iter().map(|id| loaded.label(id)).collect())
        .collect();

    render(output, &CyclesOutput { cycles }, render_cycles_human)
}

fn render_cycles_human(payload: &CyclesOutput, w: &mut dyn Write) -> std::io::Result<()> {
    if payload.cycles.is_empty() {
        writeln!(w, "No dependency cycles found.")?;
        return Ok(());
    }

    writeln!(w, "Dependency cycles ({})", payload.cycles.len())?;
    for (idx, cycle) in payload.cycles.iter().enumerate() {
        writeln!(w, "\nCycle {}:", idx + 1)?;
        for label in cycle {
            writeln!(w, "  - {label}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report() {
        let mut buf = Vec::new();
        render_cycles_human(&CyclesOutput { cycles: vec![] }, &mut buf).expect("render");
        assert_eq!(String::from_utf8(buf).expect("utf8"), "No dependency cycles found.\n");
    }

    #[test]
    fn cycles_are_numbered() {
        let payload = CyclesOutput {
            cycles: vec![vec!["a".into(), "b".into()], vec!["c".into()]],
        };
        let mut buf = Vec::new();
        render_cycles_human(&payload, &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert!(text.starts_with("Dependency cycles (2)"));
        assert!(text.contains("Cycle 1:\n  - a\n  - b\n"));
        assert!(text.contains("Cycle 2:\n  - c\n"));
    }
}
