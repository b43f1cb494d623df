//! `nlog rebuild`: replay a working set into a fresh note log.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use notelog_core::config::{RebuildConfig, load_config, resolve_config};
use notelog_core::replay::NoteCommit;
use notelog_core::{ErrorCode, NoteLog, RebuildSummary, Rebuilder};
use serde::Serialize;

use crate::output::{CliError, OutputMode, fail, pretty_kv, render_mode};

/// Arguments for `nlog rebuild`.
#[derive(Args, Debug)]
pub struct RebuildArgs {
    /// Event-set JSON file (`-` for stdin).
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Account that owns the change.
    #[arg(long)]
    pub owner: String,

    /// Config file to use instead of the layered user/project config.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct RebuildOutput<'a> {
    summary: RebuildSummary,
    commits: &'a [NoteCommit],
}

/// Execute `nlog rebuild`.
pub fn run_rebuild(
    args: &RebuildArgs,
    output: OutputMode,
    project_root: &std::path::Path,
) -> anyhow::Result<()> {
    let config = resolve(args, project_root).map_err(|err| {
        fail(
            output,
            &CliError::with_code(format!("{err:#}"), ErrorCode::ConfigParseError),
        )
    })?;
    let mut loaded = super::load_event_set(&args.file, output)?;

    let mut log = NoteLog::new();
    let summary = Rebuilder::new(config)
        .rebuild(&mut loaded.set, &loaded.working, &args.owner, &mut log)
        .map_err(|err| fail(output, &CliError::with_code(err.to_string(), err.error_code())))?;

    let payload = RebuildOutput {
        summary,
        commits: log.commits(),
    };
    render_mode(output, &payload, render_rebuild_text, render_rebuild_pretty)
}

fn resolve(args: &RebuildArgs, project_root: &std::path::Path) -> anyhow::Result<RebuildConfig> {
    let config = match &args.config {
        Some(path) => load_config(path),
        None => resolve_config(project_root),
    };
    config.context("Failed to load rebuild config")
}

/// `id` is `blake3:<hex>`; keep the first 12 hex digits.
fn short_id(id: &str) -> &str {
    let hex = id.strip_prefix("blake3:").unwrap_or(id);
    hex.get(..12).unwrap_or(hex)
}

fn render_rebuild_text(payload: &RebuildOutput<'_>, w: &mut dyn Write) -> std::io::Result<()> {
    for commit in payload.commits {
        writeln!(
            w,
            "{}\t{}\t{}\t{}",
            short_id(&commit.id),
            commit.when.to_rfc3339(),
            commit.author.as_deref().unwrap_or("-"),
            commit.lines.join(" | ")
        )?;
    }
    Ok(())
}

fn render_rebuild_pretty(payload: &RebuildOutput<'_>, w: &mut dyn Write) -> std::io::Result<()> {
    for commit in payload.commits {
        writeln!(
            w,
            "commit {}  {}  {}",
            short_id(&commit.id),
            commit.when.to_rfc3339(),
            commit.author.as_deref().unwrap_or("(server)")
        )?;
        if let Some(ps) = commit.patch_set {
            writeln!(w, "    Patch-set: {ps}")?;
        }
        for line in &commit.lines {
            writeln!(w, "    {line}")?;
        }
        writeln!(w)?;
    }

    let summary = &payload.summary;
    pretty_kv(w, "events", summary.events.to_string())?;
    pretty_kv(w, "updates", summary.updates.to_string())?;
    pretty_kv(w, "post-submit links", summary.post_submit_links.to_string())?;
    pretty_kv(w, "clamped", summary.clamped.to_string())?;
    pretty_kv(w, "broken edges", summary.sort.broken_edges.to_string())
}
