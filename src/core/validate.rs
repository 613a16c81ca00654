//! Final gate on proposed content
//!
//! Common checks apply to every operation type; each type may add its own
//! rule from the per-kind table.

use serde::{Deserialize, Serialize};

use crate::core::operation::PatchKind;
use crate::core::similarity::text_similarity;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig
{
    pub max_line_length: usize,
    pub block_min_similarity: f64,
    pub diff_min_similarity: f64,
}

impl Default for ValidatorConfig
{
    fn default() -> Self
    {
        Self { max_line_length: 10_000, block_min_similarity: 0.3, diff_min_similarity: 0.5 }
    }
}

/// Extra rule for one operation kind
#[derive(Debug, Clone, Copy, PartialEq)]
enum KindRule
{
    None,
    MinSimilarity(f64),
}

#[derive(Debug, Clone, Default)]
pub struct Validator
{
    config: ValidatorConfig,
}

impl Validator
{
    pub fn new(config: ValidatorConfig) -> Self
    {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig
    {
        &self.config
    }

    fn rule_for(
        &self,
        kind: PatchKind,
    ) -> KindRule
    {
        match kind
        {
            PatchKind::Line | PatchKind::Complete => KindRule::None,
            PatchKind::Block => KindRule::MinSimilarity(self.config.block_min_similarity),
            PatchKind::Diff => KindRule::MinSimilarity(self.config.diff_min_similarity),
        }
    }

    /// Run the common checks and the kind's rule; all failures are reported
    pub fn validate(
        &self,
        kind: PatchKind,
        original: &str,
        new: &str,
    ) -> Result<(), Vec<String>>
    {
        let mut issues = self.common_issues(new);

        if let KindRule::MinSimilarity(min) = self.rule_for(kind)
            && let Some(issue) = similarity_issue(original, new, min)
        {
            issues.push(issue);
        }

        if issues.is_empty()
        {
            Ok(())
        }
        else
        {
            tracing::debug!(%kind, ?issues, "validation rejected content");
            Err(issues)
        }
    }

    /// Non-empty, no NUL bytes, no over-long lines
    pub fn common_issues(
        &self,
        content: &str,
    ) -> Vec<String>
    {
        let mut issues = Vec::new();

        if content
            .trim()
            .is_empty()
        {
            issues.push("Content is empty".to_string());
        }

        if memchr::memchr(0, content.as_bytes()).is_some()
        {
            issues.push("Content contains NUL bytes".to_string());
        }

        let max = self
            .config
            .max_line_length;
        if let Some((idx, _)) = content
            .lines()
            .enumerate()
            .find(|(_, l)| {
                l.chars()
                    .count()
                    > max
            })
        {
            issues.push(format!("Line {} exceeds maximum length of {max}", idx + 1));
        }

        issues
    }
}

/// Message when `new` drifted too far from `original`
pub fn similarity_issue(
    original: &str,
    new: &str,
    min: f64,
) -> Option<String>
{
    let score = text_similarity(original, new);
    (score < min).then(|| format!("Similarity {score:.2} is below threshold {min:.2}"))
}
