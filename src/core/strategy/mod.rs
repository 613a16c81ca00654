//! Patch strategies and the dispatcher that routes operations to them
//!
//! Every strategy is a pure function of (normalized current content,
//! operation) to (new content, changes applied, conflicts). Conflicts are
//! recorded, never raised; only malformed input fails a strategy.

pub mod block;
pub mod complete;
pub mod diff;
pub mod line;

use serde::{Deserialize, Serialize};

use crate::core::{
    conflict::ProtectionPolicy,
    error::PatchResultOf,
    operation::{PatchKind, PatchOperation, WhitespaceConfig},
    pattern::PatternSynthesizer,
    validate::Validator,
};

/// Tunables shared by the strategies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig
{
    /// Minimum characters per block-matching chunk
    pub chunk_size: usize,
    /// Similarity a block match needs against the search text
    pub fuzzy_threshold: f64,
    /// Lines searched on each side of a hunk's expected position
    pub hunk_search_radius: usize,
    /// Similarity each applied hunk must keep with the pre-hunk content
    pub hunk_min_similarity: f64,
}

impl Default for StrategyConfig
{
    fn default() -> Self
    {
        Self {
            chunk_size: 100,
            fuzzy_threshold: 0.8,
            hunk_search_radius: 100,
            hunk_min_similarity: 0.3,
        }
    }
}

/// Everything a strategy may look at
pub struct StrategyInput<'a>
{
    pub op: &'a PatchOperation,
    /// Normalized current content ("" for a file that does not exist yet)
    pub current: &'a str,
    /// Line separator of the content being edited
    pub line_ending: &'a str,
    pub whitespace: &'a WhitespaceConfig,
    pub patterns: &'a PatternSynthesizer,
    pub protection: &'a dyn ProtectionPolicy,
    pub validator: &'a Validator,
    pub config: &'a StrategyConfig,
}

/// What a strategy proposes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyOutcome
{
    pub content: String,
    pub changes_applied: usize,
    pub conflicts: Vec<String>,
}

impl StrategyOutcome
{
    /// Outcome that leaves `content` untouched
    pub fn unchanged(
        content: &str,
        conflicts: Vec<String>,
    ) -> Self
    {
        Self { content: content.to_string(), changes_applied: 0, conflicts }
    }
}

/// A patch application strategy for one operation kind
pub trait PatchStrategy: Send + Sync
{
    fn kind(&self) -> PatchKind;

    fn apply(
        &self,
        input: &StrategyInput<'_>,
    ) -> PatchResultOf<StrategyOutcome>;
}

static LINE: line::LineStrategy = line::LineStrategy;
static BLOCK: block::BlockStrategy = block::BlockStrategy;
static DIFF: diff::DiffStrategy = diff::DiffStrategy;
static COMPLETE: complete::CompleteStrategy = complete::CompleteStrategy;

/// Strategy registered for `kind`
pub fn strategy_for(kind: PatchKind) -> &'static dyn PatchStrategy
{
    match kind
    {
        PatchKind::Line => &LINE,
        PatchKind::Block => &BLOCK,
        PatchKind::Diff => &DIFF,
        PatchKind::Complete => &COMPLETE,
    }
}

/// Route `input` to the strategy for its operation type
pub fn dispatch(input: &StrategyInput<'_>) -> PatchResultOf<StrategyOutcome>
{
    let strategy = strategy_for(
        input
            .op
            .kind(),
    );
    let outcome = strategy.apply(input)?;

    tracing::debug!(
        kind = %strategy.kind(),
        changes = outcome.changes_applied,
        conflicts = outcome
            .conflicts
            .len(),
        "strategy finished"
    );
    Ok(outcome)
}
