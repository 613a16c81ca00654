use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use roughpatch::cli::{AppContext, Cli, Commands};
use roughpatch::cli_ext::patch_cmd;
use roughpatch::load_config;
use tracing_subscriber::EnvFilter;

/// Diagnostics go to stderr; `RPATCH_LOG=debug` turns on engine tracing
fn init_tracing() {
    let filter = EnvFilter::try_from_env("RPATCH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
    };

    match cli.command {
        Commands::Apply(args) => patch_cmd::run_apply(args, &ctx, &load_config()?),
        Commands::Preview(args) => patch_cmd::run_preview(args, &ctx, &load_config()?),
        Commands::Normalize(args) => patch_cmd::run_normalize(args, &ctx, &load_config()?),
        Commands::Init(args) => roughpatch::infra::config::init(args, &ctx).map(|_| ExitCode::SUCCESS),
        Commands::Completions(args) => {
            roughpatch::completion::run(args, &ctx).map(|_| ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    init_tracing();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(5)
        }
    }
}
