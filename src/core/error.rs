//! Error taxonomy for patch operations.
//!
//! Every variant carries a stable diagnostic code so callers (and the CLI
//! exit-code mapping) can tell input problems, validation failures,
//! reverted conflicts, transaction failures and diff parse failures apart.

use std::path::PathBuf;

use miette::Diagnostic;

/// Result alias used across the engine
pub type PatchResultOf<T> = Result<T, PatchError>;

#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum PatchError
{
    /// Missing or contradictory fields for the requested operation type
    #[error("invalid input: {0}")]
    #[diagnostic(code(rpatch::invalid_input))]
    InvalidInput(String),

    #[error("file not found: {}", path.display())]
    #[diagnostic(code(rpatch::file_not_found))]
    FileNotFound { path: PathBuf },

    /// Post-strategy checks rejected the proposed content
    #[error("Validation failed: {}", .0.join("; "))]
    #[diagnostic(code(rpatch::validation_failed))]
    Validation(Vec<String>),

    /// Conflicts were found and the resolution policy reverted the change
    #[error("Conflicts detected: {}", .0.join("; "))]
    #[diagnostic(code(rpatch::conflicts))]
    Conflicts(Vec<String>),

    #[error("backup failed for {}: {message}", path.display())]
    #[diagnostic(code(rpatch::backup_failed))]
    Backup { path: PathBuf, message: String },

    #[error("restore failed for {}: {message}", path.display())]
    #[diagnostic(code(rpatch::restore_failed))]
    Restore { path: PathBuf, message: String },

    /// The diff text contained no recognizable hunk at all
    #[error("failed to parse diff: {0}")]
    #[diagnostic(code(rpatch::diff_parse))]
    Parse(String),

    #[error("I/O error on {}: {source}", path.display())]
    #[diagnostic(code(rpatch::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An error raised while rolling back after another error.
    /// The original error stays first.
    #[error("{original}; rollback also failed: {rollback}")]
    #[diagnostic(code(rpatch::rollback_failed))]
    RollbackFailed {
        original: Box<PatchError>,
        rollback: Box<PatchError>,
    },
}

impl PatchError
{
    pub fn invalid(message: impl Into<String>) -> Self
    {
        Self::InvalidInput(message.into())
    }

    pub fn io(
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self
    {
        Self::Io { path: path.into(), source }
    }

    /// Stable machine-readable code, mirrors the diagnostic code
    pub fn code_str(&self) -> String
    {
        self.code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "rpatch::unknown".to_string())
    }

    /// Conflict-like messages that belong in `PatchResult.conflicts`
    pub fn conflict_messages(&self) -> Option<&[String]>
    {
        match self
        {
            Self::Validation(msgs) | Self::Conflicts(msgs) => Some(msgs),
            Self::RollbackFailed { original, .. } => original.conflict_messages(),
            _ => None,
        }
    }

    /// CLI exit code: 2=conflict, 3=invalid input, 5=internal/transaction
    pub fn exit_code(&self) -> i32
    {
        match self
        {
            Self::Conflicts(_) | Self::Validation(_) => 2,
            Self::InvalidInput(_) | Self::FileNotFound { .. } | Self::Parse(_) => 3,
            Self::RollbackFailed { original, .. } => original.exit_code(),
            Self::Backup { .. } | Self::Restore { .. } | Self::Io { .. } => 5,
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn codes_are_distinguishable()
    {
        let backup = PatchError::Backup { path: "a.rs".into(), message: "denied".into() };
        let restore = PatchError::Restore { path: "a.rs".into(), message: "denied".into() };

        assert_eq!(backup.code_str(), "rpatch::backup_failed");
        assert_eq!(restore.code_str(), "rpatch::restore_failed");
        assert_ne!(backup.code_str(), restore.code_str());
    }

    #[test]
    fn rollback_failure_keeps_original_first()
    {
        let err = PatchError::RollbackFailed {
            original: Box::new(PatchError::Validation(vec!["Content is empty".into()])),
            rollback: Box::new(PatchError::Restore {
                path: "x.txt".into(),
                message: "gone".into(),
            }),
        };

        let text = err.to_string();
        assert!(text.starts_with("Validation failed: Content is empty"));
        assert!(text.contains("rollback also failed"));
        assert_eq!(
            err.conflict_messages()
                .unwrap(),
            ["Content is empty".to_string()]
        );
        assert_eq!(err.exit_code(), 2);
    }
}
