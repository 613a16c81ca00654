//! Token-level three-way merge
//!
//! The merge base is approximated by the longest common subsequence of the
//! current and target token streams. The walk is positional: index `i` of
//! current, target and base are compared directly, with no re-alignment
//! after insertions or deletions.

use itertools::{EitherOrBoth, Itertools};

use crate::core::error::{PatchError, PatchResultOf};
use crate::core::tokenize::{Token, tokenize};

/// LCS table cells allowed after stripping the common prefix and suffix
pub const MAX_MERGE_CELLS: usize = 4_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub content: String,
    pub conflicts: Vec<String>,
}

/// Merge `target` into `current`.
///
/// Per position: equal sides are kept; a side equal to the base yields the
/// other side; otherwise a conflict is recorded and the current token is
/// kept. With `smart`, whitespace-vs-whitespace disagreements take the
/// target token silently.
pub fn three_way_merge(current: &str, target: &str, smart: bool) -> PatchResultOf<MergeOutcome> {
    let cur = tokenize(current);
    let tgt = tokenize(target);
    let base = lcs(&cur, &tgt)?;

    let mut content = String::with_capacity(current.len().max(target.len()));
    let mut conflicts = Vec::new();

    for (i, pair) in cur.iter().zip_longest(tgt.iter()).enumerate() {
        let (c, t) = match pair {
            EitherOrBoth::Both(c, t) => (Some(c.text), Some(t.text)),
            EitherOrBoth::Left(c) => (Some(c.text), None),
            EitherOrBoth::Right(t) => (None, Some(t.text)),
        };
        let b = base.get(i).map(|tok| tok.text);

        let chosen = if c == t || c == b {
            t
        } else if t == b {
            c
        } else if smart && is_blank(c) && is_blank(t) {
            t
        } else {
            conflicts.push(format!(
                "Merge conflict at token {i}: '{}' vs '{}'",
                c.unwrap_or_default(),
                t.unwrap_or_default()
            ));
            c
        };

        if let Some(text) = chosen {
            content.push_str(text);
        }
    }

    if !conflicts.is_empty() {
        tracing::debug!(conflicts = conflicts.len(), "merge produced conflicts");
    }

    Ok(MergeOutcome { content, conflicts })
}

fn is_blank(token: Option<&str>) -> bool {
    token.is_some_and(|t| !t.is_empty() && t.chars().all(char::is_whitespace))
}

/// Longest common subsequence of two token streams
fn lcs<'a>(a: &[Token<'a>], b: &[Token<'a>]) -> PatchResultOf<Vec<Token<'a>>> {
    let head = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let tail = a[head..]
        .iter()
        .rev()
        .zip(b[head..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let mid_a = &a[head..a.len() - tail];
    let mid_b = &b[head..b.len() - tail];

    let cells = (mid_a.len() + 1).saturating_mul(mid_b.len() + 1);
    if cells > MAX_MERGE_CELLS {
        return Err(PatchError::invalid(format!(
            "merge input too large: {} x {} differing tokens",
            mid_a.len(),
            mid_b.len()
        )));
    }

    let mut out = Vec::with_capacity(head + tail + mid_a.len().min(mid_b.len()));
    out.extend_from_slice(&a[..head]);
    out.extend(lcs_table(mid_a, mid_b));
    out.extend_from_slice(&a[a.len() - tail..]);
    Ok(out)
}

fn lcs_table<'a>(a: &[Token<'a>], b: &[Token<'a>]) -> Vec<Token<'a>> {
    let width = b.len() + 1;
    let mut table = vec![0u32; (a.len() + 1) * width];

    for i in (0..a.len()).rev() {
        for j in (0..b.len()).rev() {
            table[i * width + j] = if a[i] == b[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let (mut i, mut j) = (0, 0);
    let mut out = Vec::with_capacity(table[0] as usize);
    while i < a.len() && j < b.len() {
        if a[i] == b[j] {
            out.push(a[i]);
            i += 1;
            j += 1;
        } else if table[(i + 1) * width + j] >= table[i * width + j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}
