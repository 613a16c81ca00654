//! CLI command handlers for applying, previewing and inspecting patches.
//!
//! Operations are read as JSON (inline, from a file, or from stdin) and run
//! through a `PatchEngine` built from the loaded config. Exit codes follow
//! the error category: 2 conflicts/validation, 3 invalid input, 5 other.

use std::{
    io::Read,
    path::PathBuf,
    process::ExitCode,
};

use anyhow::{Context, Result};
use owo_colors::{OwoColorize, Style};
use serde_json::json;
use tracing::instrument;

use crate::{
    cli::{AppContext, ApplyArgs, NormalizeArgs, PreviewArgs},
    core::{
        apply_engine::PatchEngine,
        normalize::{line_count, normalize},
        operation::{PatchOperation, PatchResult, Preview},
    },
    infra::{config::Config, io::read_text},
};

const EXIT_CONFLICT: u8 = 2;
const EXIT_INVALID_INPUT: u8 = 3;
const EXIT_INTERNAL: u8 = 5;

/// Expand `~` and `$VAR` in a user-supplied path
fn expand_path(raw: &str) -> PathBuf
{
    match shellexpand::full(raw)
    {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(
            shellexpand::tilde(raw).as_ref(),
        ),
    }
}

/// Parse an operation from inline JSON, a JSON file, or stdin (`-`)
fn read_operation(source: &str) -> Result<PatchOperation>
{
    let text = if source == "-"
    {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read operation from stdin")?;
        buf
    }
    else if source
        .trim_start()
        .starts_with('{')
    {
        source.to_string()
    }
    else
    {
        let path = expand_path(source);
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read operation file {}", path.display()))?
    };

    let mut op: PatchOperation =
        serde_json::from_str(&text).context("Failed to parse operation JSON")?;
    op.file_path = expand_path(
        &op.file_path
            .to_string_lossy(),
    );
    Ok(op)
}

fn paint(
    ctx: &AppContext,
    style: Style,
) -> Style
{
    if ctx.no_color { Style::new() } else { style }
}

fn exit_code(result: &PatchResult) -> u8
{
    if result.success
    {
        return 0;
    }

    match result
        .error_code
        .as_deref()
    {
        Some("rpatch::conflicts" | "rpatch::validation_failed") => EXIT_CONFLICT,
        Some("rpatch::invalid_input" | "rpatch::file_not_found" | "rpatch::diff_parse") =>
        {
            EXIT_INVALID_INPUT
        }
        _ => EXIT_INTERNAL,
    }
}

fn engine_for(config: &Config) -> PatchEngine
{
    PatchEngine::new(
        config
            .engine
            .clone(),
    )
}

/// Apply one operation; with `--dry-run` this is a preview
#[instrument(skip_all, fields(source = %args.operation))]
pub fn run_apply(
    args: ApplyArgs,
    ctx: &AppContext,
    config: &Config,
) -> Result<ExitCode>
{
    if ctx.dry_run
    {
        let preview = PreviewArgs { operation: args.operation, json: args.json };
        return run_preview(preview, ctx, config);
    }

    let mut op = match read_operation(&args.operation)
    {
        Ok(op) => op,
        Err(e) =>
        {
            eprintln!("{} {e:#}", "Error:".style(paint(ctx, Style::new().red().bold())));
            return Ok(ExitCode::from(EXIT_INVALID_INPUT));
        }
    };
    op.create_backup |= args.backup;

    let result = engine_for(config).apply_patch(&op);

    if args.json
        || config
            .output
            .json
    {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialize result")?
        );
    }
    else
    {
        print_result(&result, ctx);
    }

    Ok(ExitCode::from(exit_code(&result)))
}

#[instrument(skip_all, fields(source = %args.operation))]
pub fn run_preview(
    args: PreviewArgs,
    ctx: &AppContext,
    config: &Config,
) -> Result<ExitCode>
{
    let op = match read_operation(&args.operation)
    {
        Ok(op) => op,
        Err(e) =>
        {
            eprintln!("{} {e:#}", "Error:".style(paint(ctx, Style::new().red().bold())));
            return Ok(ExitCode::from(EXIT_INVALID_INPUT));
        }
    };

    let preview = engine_for(config).preview(&op);

    if args.json
        || config
            .output
            .json
    {
        println!(
            "{}",
            serde_json::to_string_pretty(&preview).context("Failed to serialize preview")?
        );
    }
    else
    {
        print_preview(&preview, ctx, config);
    }

    Ok(ExitCode::from(exit_code(&preview.result)))
}

/// Print normalization metadata for a file as JSON
#[instrument(skip_all, fields(file = %args.file))]
pub fn run_normalize(
    args: NormalizeArgs,
    _ctx: &AppContext,
    config: &Config,
) -> Result<ExitCode>
{
    let path = expand_path(&args.file);
    let raw = read_text(&path).with_context(|| format!("Failed to read {}", path.display()))?;
    let normalized = normalize(
        &raw,
        &config
            .engine
            .whitespace,
    );

    let mut report = json!({
        "filePath": path,
        "lines": line_count(&normalized.normalized),
        "lineEnding": normalized.line_ending,
        "indentation": normalized.indentation,
        "hash": normalized.hash,
        "stats": normalized.stats,
    });
    if args.content
    {
        report["normalized"] = json!(normalized.normalized);
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize report")?
    );
    Ok(ExitCode::SUCCESS)
}

fn print_result(
    result: &PatchResult,
    ctx: &AppContext,
)
{
    let path = result
        .file_path
        .display();

    if result.success
    {
        if !ctx.quiet
        {
            println!(
                "{} {path}: {} change(s) ({})",
                "✓".style(paint(ctx, Style::new().green())),
                result.changes_applied,
                result.kind
            );
            if let Some(backup) = &result.backup_path
            {
                println!("  backup: {}", backup.display());
            }
        }
    }
    else
    {
        eprintln!(
            "{} {path}: {}",
            "✗".style(paint(ctx, Style::new().red().bold())),
            result
                .error
                .as_deref()
                .unwrap_or("patch failed")
        );
    }

    for conflict in result.conflict_list()
    {
        eprintln!("  {} {conflict}", "conflict:".style(paint(ctx, Style::new().yellow())));
    }
}

fn print_preview(
    preview: &Preview,
    ctx: &AppContext,
    config: &Config,
)
{
    if !ctx.quiet
        && config
            .output
            .show_diff
    {
        for line in preview
            .diff
            .lines()
        {
            let style = if line.starts_with("+++") || line.starts_with("---")
            {
                Style::new().bold()
            }
            else if line.starts_with('+')
            {
                Style::new().green()
            }
            else if line.starts_with('-')
            {
                Style::new().red()
            }
            else if line.starts_with("@@")
            {
                Style::new().cyan()
            }
            else
            {
                Style::new()
            };
            println!("{}", line.style(paint(ctx, style)));
        }
    }

    if !ctx.quiet
    {
        println!("{}", "DRY RUN: nothing written".style(paint(ctx, Style::new().yellow())));
    }
    print_result(&preview.result, ctx);
}
