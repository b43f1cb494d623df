//! `nlog sort`: print a working set in dependency-aware order.

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use notelog_core::{EventSorter, SortStats};
use serde::Serialize;

use crate::output::{CliError, OutputMode, fail, pretty_kv, render_mode};

/// Arguments for `nlog sort`.
#[derive(Args, Debug)]
pub struct SortArgs {
    /// Event-set JSON file (`-` for stdin).
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Also report sorter statistics.
    #[arg(long)]
    pub stats: bool,
}

#[derive(Debug, Serialize)]
struct SortedEvent {
    label: String,
    when: String,
    kind: String,
}

#[derive(Debug, Serialize)]
struct SortOutput {
    order: Vec<SortedEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<SortStats>,
}

/// Execute `nlog sort`.
pub fn run_sort(args: &SortArgs, output: OutputMode) -> anyhow::Result<()> {
    let loaded = super::load_event_set(&args.file, output)?;

    let (order, stats) = EventSorter::new(&loaded.set)
        .order_with_stats(&loaded.working)
        .map_err(|err| fail(output, &CliError::with_code(err.to_string(), err.error_code())))?;

    let payload = SortOutput {
        order: order
            .iter()
            .map(|id| {
                let event = &loaded.set[*id];
                SortedEvent {
                    label: loaded.label(*id),
                    when: event.when.to_rfc3339(),
                    kind: event.kind.to_string(),
                }
            })
            .collect(),
        stats: args.stats.then_some(stats),
    };

    render_mode(output, &payload, render_sort_text, render_sort_pretty)
}

fn render_sort_text(payload: &SortOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for event in &payload.order {
        writeln!(w, "{}\t{}\t{}", event.label, event.when, event.kind)?;
    }
    if let Some(stats) = &payload.stats {
        writeln!(
            w,
            "# events={} edges={} deferred={} broken_edges={}",
            stats.events, stats.edges, stats.deferred, stats.broken_edges
        )?;
    }
    Ok(())
}

fn render_sort_pretty(payload: &SortOutput, w: &mut dyn Write) -> std::io::Result<()> {
    if payload.order.is_empty() {
        writeln!(w, "Working set is empty.")?;
    }
    for (idx, event) in payload.order.iter().enumerate() {
        writeln!(
            w,
            "{:>4}. {:<20} {}  {}",
            idx + 1,
            event.label,
            event.when,
            event.kind
        )?;
    }
    if let Some(stats) = &payload.stats {
        writeln!(w)?;
        pretty_kv(w, "events", stats.events.to_string())?;
        pretty_kv(w, "edges", stats.edges.to_string())?;
        pretty_kv(w, "deferred", stats.deferred.to_string())?;
        pretty_kv(w, "broken edges", stats.broken_edges.to_string())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: SortArgs,
    }

    #[test]
    fn sort_args_parse() {
        let parsed = Wrapper::parse_from(["test", "events.json", "--stats"]);
        assert_eq!(parsed.args.file, PathBuf::from("events.json"));
        assert!(parsed.args.stats);
    }

    #[test]
    fn text_rendering_is_tab_separated() {
        let payload = SortOutput {
            order: vec![SortedEvent {
                label: "ps1".into(),
                when: "2024-05-02T09:00:00+00:00".into(),
                kind: "patch_set".into(),
            }],
            stats: Some(SortStats {
                events: 1,
                ..SortStats::default()
            }),
        };
        let mut buf = Vec::new();
        render_sort_text(&payload, &mut buf).expect("render");
        let text = String::from_utf8(buf).expect("utf8");
        assert_eq!(
            text,
            "ps1\t2024-05-02T09:00:00+00:00\tpatch_set\n# events=1 edges=0 deferred=0 broken_edges=0\n"
        );
    }
}
