//! **roughpatch** - Targeted single-file patching with validation and rollback
//!
//! Four strategies (line, block, unified diff, whole file) over normalized
//! content, token-level fuzzy matching, optional three-way merge, a final
//! validation gate and a backup/commit/rollback transaction per call.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// CLI command handlers
pub mod cli_ext {
    /// apply / preview / normalize handlers
    pub mod patch_cmd;
}

/// Patch pipeline: model, strategies, merge, validation, transactions
pub mod core {
    /// `PatchEngine`: the single entry point with per-path locking
    pub mod apply_engine;
    pub use apply_engine::{EngineConfig, PatchEngine};

    /// Sibling `.bak` backups with blake3 verification
    pub mod backup;

    /// Protected-content policy and conflict resolution
    pub mod conflict;

    /// Error taxonomy with stable diagnostic codes
    pub mod error;
    pub use error::{PatchError, PatchResultOf};

    /// Token LCS base and positional three-way merge
    pub mod merge;

    /// Line ending / indentation canonicalization and stats
    pub mod normalize;

    /// Request/response model
    pub mod operation;
    pub use operation::{PatchKind, PatchOperation, PatchResult, Preview, WhitespaceConfig};

    /// Unified diff parsing and rendering
    pub mod patch;

    /// Search text to regex synthesis with a moka cache
    pub mod pattern;

    /// Token edit-distance similarity
    pub mod similarity;

    /// Strategy dispatcher and the four strategies
    pub mod strategy;

    /// Whitespace / word / symbol tokenizer
    pub mod tokenize;

    /// Final gate on proposed content
    pub mod validate;
}

/// Infrastructure - Configuration, I/O, and line indexing
pub mod infra {
    /// Layered configuration (rpatch.toml + RPATCH__* env)
    pub mod config;
    pub use config::{Config, init as config_init, load_config};

    /// UTF-8 reads and atomic writes
    pub mod io;

    /// CRLF/LF/CR-robust byte offset to line mapping
    pub mod line_index;
    pub use line_index::LineIndex;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use infra::{Config, load_config};

// Core types for external consumers
pub use core::{
    EngineConfig, PatchEngine, PatchError, PatchKind, PatchOperation, PatchResult, Preview,
    WhitespaceConfig,
};
