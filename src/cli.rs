use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

#[derive(Parser)]
#[command(name = "rpatch")]
#[command(
    about = "Apply line, block, unified-diff and whole-file patches with validation, conflict policy and rollback"
)]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would change without writing (apply behaves like preview)
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply a patch operation to its file
    Apply(ApplyArgs),

    /// Show the diff an operation would produce without writing
    Preview(PreviewArgs),

    /// Print line ending, indentation, hash and whitespace stats of a file
    Normalize(NormalizeArgs),

    /// Initialize a rpatch.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Operation as inline JSON, a path to a JSON file, or `-` for stdin
    #[arg(value_name = "OP_JSON|-")]
    pub operation: String,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// Keep a `<file>.bak` copy until the change is committed
    #[arg(long)]
    pub backup: bool,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Operation as inline JSON, a path to a JSON file, or `-` for stdin
    #[arg(value_name = "OP_JSON|-")]
    pub operation: String,

    /// Print the preview as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// File to inspect
    pub file: String,

    /// Also print the normalized content
    #[arg(long)]
    pub content: bool,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
