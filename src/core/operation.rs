//! Patch operation request/response model
//!
//! Operations arrive as camelCase JSON discriminated by `type`
//! (`line`, `block`, `diff`, `complete`). Type-specific fields stay
//! optional at the serde level so a missing field surfaces as an
//! input error with a readable message rather than a deserialize failure.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::{PatchError, PatchResultOf};

/// Whitespace handling shared by the normalizer and pattern synthesis
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WhitespaceConfig
{
    pub preserve_indentation: bool,
    pub preserve_line_endings: bool,
    pub normalize_whitespace: bool,
    pub trim_trailing_whitespace: bool,
    pub default_indentation: String,
    pub default_line_ending: String,
}

impl Default for WhitespaceConfig
{
    fn default() -> Self
    {
        Self {
            preserve_indentation: true,
            preserve_line_endings: true,
            normalize_whitespace: true,
            trim_trailing_whitespace: false,
            default_indentation: "    ".to_string(),
            default_line_ending: "\n".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy
{
    Overwrite,
    Merge,
    Smart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictResolution
{
    Force,
    Revert,
    Manual,
}

/// Operation discriminant, echoed back in results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchKind
{
    Line,
    Block,
    Diff,
    Complete,
}

impl std::fmt::Display for PatchKind
{
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result
    {
        let s = match self
        {
            PatchKind::Line => "line",
            PatchKind::Block => "block",
            PatchKind::Diff => "diff",
            PatchKind::Complete => "complete",
        };
        f.write_str(s)
    }
}

/// Type-specific payload of an operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PatchEdit
{
    #[serde(rename_all = "camelCase")]
    Line
    {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        search: Option<String>,
        /// Precompiled regular expression; bypasses pattern synthesis
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
        /// Absent means delete the matched lines
        #[serde(default, skip_serializing_if = "Option::is_none")]
        replace: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        line_numbers: Option<Vec<usize>>,
    },
    Block
    {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        search: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        replace: Option<String>,
    },
    Diff
    {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        diff: Option<String>,
    },
    Complete
    {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
    },
}

impl PatchEdit
{
    pub fn kind(&self) -> PatchKind
    {
        match self
        {
            PatchEdit::Line { .. } => PatchKind::Line,
            PatchEdit::Block { .. } => PatchKind::Block,
            PatchEdit::Diff { .. } => PatchKind::Diff,
            PatchEdit::Complete { .. } => PatchKind::Complete,
        }
    }
}

/// A single-file patch request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchOperation
{
    pub file_path: PathBuf,

    #[serde(flatten)]
    pub edit: PatchEdit,

    #[serde(default)]
    pub create_backup: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whitespace_config: Option<WhitespaceConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merge_strategy: Option<MergeStrategy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_resolution: Option<ConflictResolution>,
}

impl PatchOperation
{
    pub fn new(
        file_path: impl Into<PathBuf>,
        edit: PatchEdit,
    ) -> Self
    {
        Self {
            file_path: file_path.into(),
            edit,
            create_backup: false,
            whitespace_config: None,
            merge_strategy: None,
            conflict_resolution: None,
        }
    }

    /// Replace every line matching `search` with `replace`
    pub fn line(
        file_path: impl Into<PathBuf>,
        search: impl Into<String>,
        replace: impl Into<String>,
    ) -> Self
    {
        Self::new(
            file_path,
            PatchEdit::Line {
                search: Some(search.into()),
                pattern: None,
                replace: Some(replace.into()),
                line_numbers: None,
            },
        )
    }

    /// Delete the given 1-based lines
    pub fn delete_lines(
        file_path: impl Into<PathBuf>,
        line_numbers: Vec<usize>,
    ) -> Self
    {
        Self::new(
            file_path,
            PatchEdit::Line { search: None, pattern: None, replace: None, line_numbers: Some(line_numbers) },
        )
    }

    pub fn block(
        file_path: impl Into<PathBuf>,
        search: impl Into<String>,
        replace: impl Into<String>,
    ) -> Self
    {
        Self::new(
            file_path,
            PatchEdit::Block { search: Some(search.into()), replace: Some(replace.into()) },
        )
    }

    pub fn diff(
        file_path: impl Into<PathBuf>,
        diff: impl Into<String>,
    ) -> Self
    {
        Self::new(file_path, PatchEdit::Diff { diff: Some(diff.into()) })
    }

    pub fn complete(
        file_path: impl Into<PathBuf>,
        content: impl Into<String>,
    ) -> Self
    {
        Self::new(file_path, PatchEdit::Complete { content: Some(content.into()) })
    }

    pub fn with_backup(
        mut self,
        enabled: bool,
    ) -> Self
    {
        self.create_backup = enabled;
        self
    }

    pub fn with_whitespace(
        mut self,
        config: WhitespaceConfig,
    ) -> Self
    {
        self.whitespace_config = Some(config);
        self
    }

    pub fn with_merge(
        mut self,
        strategy: MergeStrategy,
    ) -> Self
    {
        self.merge_strategy = Some(strategy);
        self
    }

    pub fn with_resolution(
        mut self,
        resolution: ConflictResolution,
    ) -> Self
    {
        self.conflict_resolution = Some(resolution);
        self
    }

    pub fn kind(&self) -> PatchKind
    {
        self.edit
            .kind()
    }

    pub fn path(&self) -> &Path
    {
        &self.file_path
    }

    /// Effective whitespace configuration (explicit or default)
    pub fn whitespace(&self) -> WhitespaceConfig
    {
        self.whitespace_config
            .clone()
            .unwrap_or_default()
    }

    /// Check required fields for the operation type
    pub fn validate(&self) -> PatchResultOf<()>
    {
        if self
            .file_path
            .as_os_str()
            .is_empty()
        {
            return Err(PatchError::invalid("filePath is required"));
        }

        match &self.edit
        {
            PatchEdit::Line { search, pattern, line_numbers, .. } =>
            {
                let has_matcher = search
                    .as_deref()
                    .is_some_and(|s| !s.is_empty())
                    || pattern
                        .as_deref()
                        .is_some_and(|p| !p.is_empty());
                let has_lines = line_numbers
                    .as_ref()
                    .is_some_and(|l| !l.is_empty());

                if !has_matcher && !has_lines
                {
                    return Err(PatchError::invalid(
                        "line operation requires search, pattern, or lineNumbers",
                    ));
                }
                if search.is_some() && pattern.is_some()
                {
                    return Err(PatchError::invalid(
                        "line operation accepts either search or pattern, not both",
                    ));
                }
                if has_lines
                    && line_numbers
                        .iter()
                        .flatten()
                        .any(|&n| n == 0)
                {
                    return Err(PatchError::invalid("lineNumbers are 1-based"));
                }
            }
            PatchEdit::Block { search, replace } =>
            {
                if search
                    .as_deref()
                    .is_none_or(str::is_empty)
                {
                    return Err(PatchError::invalid("block operation requires search"));
                }
                if replace.is_none()
                {
                    return Err(PatchError::invalid("block operation requires replace"));
                }
            }
            PatchEdit::Diff { diff } =>
            {
                if diff
                    .as_deref()
                    .is_none_or(|d| d.trim().is_empty())
                {
                    return Err(PatchError::invalid("diff operation requires diff"));
                }
            }
            PatchEdit::Complete { content } =>
            {
                if content.is_none()
                {
                    return Err(PatchError::invalid("complete operation requires content"));
                }
            }
        }

        Ok(())
    }
}

/// Outcome of a patch call; `success=false` means the file is untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchResult
{
    pub success: bool,
    pub file_path: PathBuf,
    #[serde(rename = "type")]
    pub kind: PatchKind,
    pub changes_applied: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_lines: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_lines: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflicts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl PatchResult
{
    /// Failed result for an operation; conflict-like errors keep their messages
    pub fn failure(
        op: &PatchOperation,
        err: &PatchError,
    ) -> Self
    {
        Self {
            success: false,
            file_path: op
                .file_path
                .clone(),
            kind: op.kind(),
            changes_applied: 0,
            backup_path: None,
            original_lines: None,
            new_lines: None,
            conflicts: err
                .conflict_messages()
                .map(<[String]>::to_vec),
            error: Some(err.to_string()),
            error_code: Some(err.code_str()),
        }
    }

    /// Conflicts as a slice (empty when none were recorded)
    pub fn conflict_list(&self) -> &[String]
    {
        self.conflicts
            .as_deref()
            .unwrap_or(&[])
    }
}

/// Dry-run outcome with the proposed change rendered as a unified diff
#[derive(Debug, Clone, Serialize)]
pub struct Preview
{
    pub result: PatchResult,
    pub diff: String,
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn deserializes_camel_case_line_operation()
    {
        let json = r#"{
            "type": "line",
            "filePath": "src/lib.rs",
            "search": "bar",
            "replace": "baz",
            "lineNumbers": [2],
            "createBackup": true,
            "conflictResolution": "force"
        }"#;

        let op: PatchOperation = serde_json::from_str(json).unwrap();
        assert_eq!(op.kind(), PatchKind::Line);
        assert!(op.create_backup);
        assert_eq!(op.conflict_resolution, Some(ConflictResolution::Force));
        match &op.edit
        {
            PatchEdit::Line { search, replace, line_numbers, .. } =>
            {
                assert_eq!(search.as_deref(), Some("bar"));
                assert_eq!(replace.as_deref(), Some("baz"));
                assert_eq!(line_numbers.as_deref(), Some(&[2][..]));
            }
            other => panic!("expected line edit, got {other:?}"),
        }
    }

    #[test]
    fn missing_content_is_input_error()
    {
        let json = r#"{"type": "complete", "filePath": "a.txt"}"#;
        let op: PatchOperation = serde_json::from_str(json).unwrap();

        let err = op
            .validate()
            .unwrap_err();
        assert!(matches!(err, PatchError::InvalidInput(_)));
        assert!(
            err.to_string()
                .contains("requires content")
        );
    }

    #[test]
    fn partial_whitespace_config_uses_defaults()
    {
        let json = r#"{
            "type": "block",
            "filePath": "a.txt",
            "search": "x",
            "replace": "y",
            "whitespaceConfig": {"preserveIndentation": false}
        }"#;
        let op: PatchOperation = serde_json::from_str(json).unwrap();
        let ws = op.whitespace();

        assert!(!ws.preserve_indentation);
        assert!(ws.preserve_line_endings);
        assert_eq!(ws.default_indentation, "    ");
    }

    #[test]
    fn result_serializes_type_field()
    {
        let op = PatchOperation::diff("a.txt", "@@ -1 +1 @@\n-a\n+b\n");
        let result = PatchResult::failure(&op, &PatchError::Parse("no hunks".into()));
        let v = serde_json::to_value(&result).unwrap();

        assert_eq!(v["type"], "diff");
        assert_eq!(v["success"], false);
        assert_eq!(v["errorCode"], "rpatch::diff_parse");
        assert!(
            v.get("conflicts")
                .is_none()
        );
    }
}
