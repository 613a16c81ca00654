//! Diff strategy: apply unified-diff hunks with offset search

use super::{PatchStrategy, StrategyInput, StrategyOutcome};
use crate::core::{
    error::{PatchError, PatchResultOf},
    normalize::LineBuffer,
    operation::{PatchEdit, PatchKind},
    patch::{Hunk, HunkLine, ParsedHunk, parse_unified_diff},
    validate::similarity_issue,
};

pub struct DiffStrategy;

fn lines_match(
    actual: &[String],
    expected: &[&str],
) -> bool
{
    actual.len() == expected.len()
        && actual
            .iter()
            .zip(expected)
            .all(|(a, e)| a.trim_end() == e.trim_end())
}

/// Index where `expected` occurs: the expected position first, then the
/// nearest offset within `radius` lines (earlier side wins ties)
fn locate(
    lines: &[String],
    expected: &[&str],
    at: usize,
    radius: usize,
) -> Option<usize>
{
    let fits = |pos: usize| {
        pos + expected.len() <= lines.len() && lines_match(&lines[pos..pos + expected.len()], expected)
    };

    if fits(at)
    {
        return Some(at);
    }
    for offset in 1..=radius
    {
        if let Some(before) = at.checked_sub(offset)
            && fits(before)
        {
            return Some(before);
        }
        if fits(at + offset)
        {
            return Some(at + offset);
        }
    }
    None
}

/// Splice `hunk` into `lines` at `pos`; context keeps the file's own text
fn splice_hunk(
    lines: &[String],
    hunk: &Hunk,
    pos: usize,
) -> Vec<String>
{
    let mut out = Vec::with_capacity(lines.len() + hunk.lines.len());
    out.extend_from_slice(&lines[..pos]);

    let mut cursor = pos;
    for line in &hunk.lines
    {
        match line
        {
            HunkLine::Context(_) =>
            {
                out.push(lines[cursor].clone());
                cursor += 1;
            }
            HunkLine::Remove(_) => cursor += 1,
            HunkLine::Add(text) => out.push(text.clone()),
        }
    }

    out.extend_from_slice(&lines[cursor..]);
    out
}

impl PatchStrategy for DiffStrategy
{
    fn kind(&self) -> PatchKind
    {
        PatchKind::Diff
    }

    fn apply(
        &self,
        input: &StrategyInput<'_>,
    ) -> PatchResultOf<StrategyOutcome>
    {
        let PatchEdit::Diff { diff: Some(diff) } = &input.op.edit
        else
        {
            return Err(PatchError::invalid("diff operation requires diff"));
        };

        let parsed = parse_unified_diff(diff)?;
        let mut conflicts = parsed.conflicts;
        let mut buffer = LineBuffer::parse(input.current);
        let mut delta: isize = 0;
        let mut changes = 0usize;

        for ParsedHunk { number, hunk } in &parsed.hunks
        {
            let expected = hunk.old_lines();
            let at = hunk
                .expected_index()
                .saturating_add_signed(delta);

            let Some(pos) = locate(&buffer.lines, &expected, at, input.config.hunk_search_radius)
            else
            {
                tracing::debug!(hunk = number, expected_line = at + 1, "hunk context not found");
                conflicts.push(format!("Hunk {number}: context mismatch at line {}", at + 1));
                continue;
            };
            if pos != at
            {
                tracing::debug!(hunk = number, offset = pos as isize - at as isize, "hunk applied at offset");
            }

            // A hunk reaching the last line decides the final newline
            let trailing_newline = if pos + expected.len() == buffer.len()
            {
                !hunk.new_missing_newline
            }
            else
            {
                buffer.trailing_newline
            };
            let candidate = LineBuffer {
                lines: splice_hunk(&buffer.lines, hunk, pos),
                trailing_newline,
            };
            let before = buffer.join(input.line_ending);
            let after = candidate.join(input.line_ending);

            let mut issues = input
                .validator
                .common_issues(&after);
            if !before.is_empty()
                && let Some(issue) = similarity_issue(&before, &after, input.config.hunk_min_similarity)
            {
                issues.push(issue);
            }
            if !issues.is_empty()
            {
                conflicts.extend(
                    issues
                        .into_iter()
                        .map(|i| format!("Hunk {number}: {i}")),
                );
                continue;
            }

            delta += candidate.len() as isize - buffer.len() as isize;
            buffer = candidate;
            changes += 1;
        }

        Ok(StrategyOutcome {
            content: buffer.join(input.line_ending),
            changes_applied: changes,
            conflicts,
        })
    }
}
