#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use output::{OutputMode, resolve_output_mode};
use std::env;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "nlog: dependency-ordered rebuild of change history",
    long_about = None
)]
struct Cli {
    /// Enable debug logging for notelog crates.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Print a working set in dependency-aware order",
        after_help = "EXAMPLES:\n    nlog sort history.json\n    nlog sort --stats --format json history.json"
    )]
    Sort(cmd::sort::SortArgs),

    #[command(
        about = "List dependency cycles in a working set",
        after_help = "EXAMPLES:\n    nlog cycles history.json"
    )]
    Cycles(cmd::cycles::CyclesArgs),

    #[command(
        about = "Rebuild a change's note log from its events",
        after_help = "EXAMPLES:\n    nlog rebuild history.json --owner alice\n    nlog rebuild - --owner alice --config notelog.toml < history.json"
    )]
    Rebuild(cmd::rebuild::RebuildArgs),

    #[command(about = "Generate shell completions")]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("NOTELOG_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "notelog=debug,info"
        } else {
            "notelog=info,warn"
        })
    });

    let format = env::var("NOTELOG_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_root = env::current_dir()?;
    let output = cli.output_mode();

    match cli.command {
        Commands::Sort(ref args) => cmd::sort::run_sort(args, output),
        Commands::Cycles(ref args) => cmd::cycles::run_cycles(args, output),
        Commands::Rebuild(ref args) => cmd::rebuild::run_rebuild(args, output, &project_root),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}
