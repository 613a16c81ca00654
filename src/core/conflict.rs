//! Protected-content policy and conflict resolution
//!
//! The line strategy asks a [`ProtectionPolicy`] before deleting or
//! rewriting a line; refusals become non-fatal conflicts. After a strategy
//! runs, [`ConflictResolver`] decides whether recorded conflicts block the
//! write.

use aho_corasick::AhoCorasick;
use serde::{Deserialize, Serialize};

use crate::core::error::{PatchError, PatchResultOf};
use crate::core::operation::ConflictResolution;

/// Markers that protect a line by default
pub const DEFAULT_PROTECTED_MARKERS: &[&str] = &["TODO", "IMPORTANT"];

/// Default cap on replacement length relative to the original line
pub const DEFAULT_MAX_GROWTH_RATIO: f64 = 2.0;

/// Configurable protection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionConfig {
    /// Literal markers that protect a line
    pub markers: Vec<String>,
    /// Replacement length limit relative to the original line; unset disables it
    pub max_growth_ratio: Option<f64>,
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            markers: DEFAULT_PROTECTED_MARKERS.iter().map(|m| m.to_string()).collect(),
            max_growth_ratio: Some(DEFAULT_MAX_GROWTH_RATIO),
        }
    }
}

impl ProtectionConfig {
    pub fn build_policy(&self) -> PatchResultOf<MarkerPolicy> {
        MarkerPolicy::new(self.markers.iter().cloned(), self.max_growth_ratio)
    }
}

/// Decides which lines may be deleted or rewritten
pub trait ProtectionPolicy: Send + Sync + std::fmt::Debug {
    /// Whether `line` carries protected content
    fn is_protected(&self, line: &str) -> bool;

    /// Replacement length limit as a multiple of the original line length
    fn max_growth_ratio(&self) -> Option<f64> {
        Some(DEFAULT_MAX_GROWTH_RATIO)
    }

    /// Conflict message if deleting line `line_no` (1-based) is refused
    fn check_delete(&self, line_no: usize, line: &str) -> Option<String> {
        self.is_protected(line)
            .then(|| format!("Line {line_no}: Cannot delete protected line"))
    }

    /// Conflict message if rewriting line `line_no` (1-based) is refused
    fn check_replace(&self, line_no: usize, original: &str, replacement: &str) -> Option<String> {
        if self.is_protected(original) {
            return Some(format!("Line {line_no}: Cannot modify protected line"));
        }
        let ratio = self.max_growth_ratio()?;
        let limit = original.chars().count() as f64 * ratio;
        (replacement.chars().count() as f64 > limit)
            .then(|| format!("Line {line_no}: Replacement exceeds length limit"))
    }
}

/// Protects lines containing any of a set of literal markers
#[derive(Debug, Clone)]
pub struct MarkerPolicy {
    markers: Vec<String>,
    automaton: Option<AhoCorasick>,
    max_growth_ratio: Option<f64>,
}

impl MarkerPolicy {
    pub fn new<I, S>(markers: I, max_growth_ratio: Option<f64>) -> PatchResultOf<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let markers: Vec<String> = markers
            .into_iter()
            .map(Into::into)
            .filter(|m: &String| !m.is_empty())
            .collect();
        let automaton = if markers.is_empty() {
            None
        } else {
            let ac = AhoCorasick::new(&markers)
                .map_err(|e| PatchError::invalid(format!("invalid protected markers: {e}")))?;
            Some(ac)
        };

        Ok(Self {
            markers,
            automaton,
            max_growth_ratio,
        })
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }
}

impl Default for MarkerPolicy {
    fn default() -> Self {
        let markers: Vec<String> = DEFAULT_PROTECTED_MARKERS
            .iter()
            .map(|m| m.to_string())
            .collect();
        let automaton = AhoCorasick::new(&markers).ok();
        Self {
            markers,
            automaton,
            max_growth_ratio: Some(DEFAULT_MAX_GROWTH_RATIO),
        }
    }
}

impl ProtectionPolicy for MarkerPolicy {
    fn is_protected(&self, line: &str) -> bool {
        self.automaton
            .as_ref()
            .is_some_and(|ac| ac.is_match(line))
    }

    fn max_growth_ratio(&self) -> Option<f64> {
        self.max_growth_ratio
    }
}

/// Allows every edit
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProtection;

impl ProtectionPolicy for NoProtection {
    fn is_protected(&self, _line: &str) -> bool {
        false
    }

    fn max_growth_ratio(&self) -> Option<f64> {
        None
    }
}

/// What to do with a strategy outcome
#[derive(Debug)]
pub enum Resolution {
    Commit,
    Revert(PatchError),
}

/// Applies the operation's conflict resolution policy
pub struct ConflictResolver;

impl ConflictResolver {
    /// No conflicts or `force` commits; `revert`, `manual` or no policy reverts
    pub fn resolve(policy: Option<ConflictResolution>, conflicts: &[String]) -> Resolution {
        if conflicts.is_empty() {
            return Resolution::Commit;
        }

        match policy {
            Some(ConflictResolution::Force) => {
                tracing::debug!(count = conflicts.len(), "forcing past conflicts");
                Resolution::Commit
            }
            Some(ConflictResolution::Manual) => {
                tracing::warn!(count = conflicts.len(), "manual resolution required, reverting");
                Resolution::Revert(PatchError::Conflicts(conflicts.to_vec()))
            }
            Some(ConflictResolution::Revert) | None => {
                Resolution::Revert(PatchError::Conflicts(conflicts.to_vec()))
            }
        }
    }
}
