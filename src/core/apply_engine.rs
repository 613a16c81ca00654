//! Patch engine: runs one operation through normalization, strategy
//! dispatch, validation, conflict policy and the backup/commit/rollback
//! transaction.
//!
//! `apply_patch` never returns an error; every failure becomes a
//! `PatchResult` with `success = false` and the target left untouched.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use serde::{Deserialize, Serialize};

use crate::{
    core::{
        backup::AtomicContext,
        conflict::{ConflictResolver, MarkerPolicy, ProtectionConfig, ProtectionPolicy, Resolution},
        error::{PatchError, PatchResultOf},
        normalize::{line_count, normalize, output_line_ending},
        operation::{PatchKind, PatchOperation, PatchResult, Preview, WhitespaceConfig},
        patch::render_unified_diff,
        pattern::{PatternConfig, PatternSynthesizer},
        strategy::{StrategyConfig, StrategyInput, StrategyOutcome, dispatch},
        validate::{Validator, ValidatorConfig},
    },
    infra::io::{read_optional, write_atomic},
};

/// Engine-wide tunables, loaded from `rpatch.toml` by the CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig
{
    pub strategy: StrategyConfig,
    pub validation: ValidatorConfig,
    pub patterns: PatternConfig,
    pub protection: ProtectionConfig,
    /// Used when an operation carries no `whitespaceConfig`
    pub whitespace: WhitespaceConfig,
}

/// Proposed change for one operation, computed without touching the file
#[derive(Debug)]
struct Plan
{
    /// Normalized content before the change ("" for a missing file)
    current: String,
    outcome: StrategyOutcome,
}

type PathLock = Arc<Mutex<()>>;

pub struct PatchEngine
{
    config: EngineConfig,
    patterns: PatternSynthesizer,
    protection: Arc<dyn ProtectionPolicy>,
    validator: Validator,
    locks: Mutex<HashMap<PathBuf, PathLock>>,
}

impl std::fmt::Debug for PatchEngine
{
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result
    {
        f.debug_struct("PatchEngine")
            .field("config", &self.config)
            .field("protection", &self.protection)
            .finish_non_exhaustive()
    }
}

impl Default for PatchEngine
{
    fn default() -> Self
    {
        Self::new(EngineConfig::default())
    }
}

impl PatchEngine
{
    pub fn new(config: EngineConfig) -> Self
    {
        let protection: Arc<dyn ProtectionPolicy> = match config
            .protection
            .build_policy()
        {
            Ok(policy) => Arc::new(policy),
            Err(e) =>
            {
                tracing::warn!(error = %e, "invalid protection config, using default markers");
                Arc::new(MarkerPolicy::default())
            }
        };

        Self {
            patterns: PatternSynthesizer::from_config(&config.patterns),
            validator: Validator::new(
                config
                    .validation
                    .clone(),
            ),
            protection,
            locks: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Swap the protected-content policy
    pub fn with_protection(
        mut self,
        protection: Arc<dyn ProtectionPolicy>,
    ) -> Self
    {
        self.protection = protection;
        self
    }

    pub fn config(&self) -> &EngineConfig
    {
        &self.config
    }

    /// Apply `op` to its file; the result reports success or why nothing changed
    #[tracing::instrument(
        level = "info",
        skip(self, op),
        fields(path = %op.file_path.display(), kind = %op.kind())
    )]
    pub fn apply_patch(
        &self,
        op: &PatchOperation,
    ) -> PatchResult
    {
        match self.with_path_lock(op.path(), || self.apply_locked(op))
        {
            Ok(result) =>
            {
                tracing::info!(changes = result.changes_applied, "patch applied");
                result
            }
            Err(e) =>
            {
                tracing::info!(code = %e.code_str(), error = %e, "patch not applied");
                PatchResult::failure(op, &e)
            }
        }
    }

    /// Run the pipeline without backup or write and render the proposed diff
    #[tracing::instrument(
        level = "debug",
        skip(self, op),
        fields(path = %op.file_path.display(), kind = %op.kind())
    )]
    pub fn preview(
        &self,
        op: &PatchOperation,
    ) -> Preview
    {
        match self.with_path_lock(op.path(), || self.plan(op))
        {
            Ok(plan) =>
            {
                let diff = render_unified_diff(
                    &plan.current,
                    &plan
                        .outcome
                        .content,
                    &op.file_path
                        .to_string_lossy(),
                );
                Preview { result: success_result(op, &plan, None), diff }
            }
            Err(e) => Preview { result: PatchResult::failure(op, &e), diff: String::new() },
        }
    }

    fn apply_locked(
        &self,
        op: &PatchOperation,
    ) -> PatchResultOf<PatchResult>
    {
        op.validate()?;

        let mut ctx = AtomicContext::begin(op.path(), op.create_backup)?;
        let backup_path = ctx
            .backup_path()
            .map(Path::to_path_buf);

        let written = self
            .plan(op)
            .and_then(|plan| {
                if plan
                    .outcome
                    .changes_applied
                    > 0
                {
                    write_atomic(
                        op.path(),
                        plan.outcome
                            .content
                            .as_bytes(),
                    )?;
                }
                Ok(plan)
            });

        match written
        {
            Ok(plan) =>
            {
                ctx.commit()?;
                Ok(success_result(op, &plan, backup_path))
            }
            Err(original) => Err(match ctx.rollback()
            {
                Ok(()) => original,
                Err(rollback) =>
                {
                    tracing::error!(error = %rollback, "rollback failed");
                    PatchError::RollbackFailed {
                        original: Box::new(original),
                        rollback: Box::new(rollback),
                    }
                }
            }),
        }
    }

    /// Read, normalize, dispatch, validate and apply the conflict policy
    fn plan(
        &self,
        op: &PatchOperation,
    ) -> PatchResultOf<Plan>
    {
        op.validate()?;

        let raw = match read_optional(op.path())?
        {
            Some(text) => text,
            None if op.kind() == PatchKind::Complete =>
            {
                tracing::debug!("target missing, will be created");
                String::new()
            }
            None => return Err(PatchError::FileNotFound { path: op.file_path.clone() }),
        };

        let whitespace = op
            .whitespace_config
            .clone()
            .unwrap_or_else(|| {
                self.config
                    .whitespace
                    .clone()
            });
        let current = normalize(&raw, &whitespace);
        let line_ending = output_line_ending(current.line_ending, &whitespace);

        let input = StrategyInput {
            op,
            current: &current.normalized,
            line_ending,
            whitespace: &whitespace,
            patterns: &self.patterns,
            protection: self
                .protection
                .as_ref(),
            validator: &self.validator,
            config: &self
                .config
                .strategy,
        };
        let outcome = dispatch(&input)?;

        if outcome.changes_applied > 0
        {
            self.validator
                .validate(op.kind(), &current.normalized, &outcome.content)
                .map_err(PatchError::Validation)?;
        }

        match ConflictResolver::resolve(op.conflict_resolution, &outcome.conflicts)
        {
            Resolution::Commit => Ok(Plan { current: current.normalized, outcome }),
            Resolution::Revert(e) => Err(e),
        }
    }

    /// Run `f` holding the mutex shared by every call on the same
    /// canonical path. The registry entry is dropped once no other call
    /// holds or waits on it.
    fn with_path_lock<T>(
        &self,
        path: &Path,
        f: impl FnOnce() -> T,
    ) -> T
    {
        let key = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let lock: PathLock = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default()
            .clone();

        let out = {
            let _guard = lock
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            f()
        };

        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // one reference in the registry, one here
        if Arc::strong_count(&lock) == 2
        {
            locks.remove(&key);
        }
        out
    }
}

fn success_result(
    op: &PatchOperation,
    plan: &Plan,
    backup_path: Option<PathBuf>,
) -> PatchResult
{
    let conflicts = &plan
        .outcome
        .conflicts;

    PatchResult {
        success: true,
        file_path: op
            .file_path
            .clone(),
        kind: op.kind(),
        changes_applied: plan
            .outcome
            .changes_applied,
        backup_path,
        original_lines: Some(line_count(&plan.current)),
        new_lines: Some(line_count(
            &plan
                .outcome
                .content,
        )),
        conflicts: (!conflicts.is_empty()).then(|| conflicts.clone()),
        error: None,
        error_code: None,
    }
}
