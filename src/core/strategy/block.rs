//! Block strategy: fuzzy multi-line search and replace
//!
//! The block pattern runs over the whole content. Content is cut into
//! line-aligned chunks of at least `chunk_size` characters; each match is
//! widened to the chunk(s) it touches and overlapping regions are merged.
//! Inside a region every match that passes the fuzzy gate is replaced, and
//! the edited region must keep the original bracket balance and stay within
//! half to double the original length.

use std::ops::Range;

use regex::Regex;

use super::{PatchStrategy, StrategyInput, StrategyOutcome};
use crate::core::{
    error::{PatchError, PatchResultOf},
    normalize::split_lines,
    operation::{PatchEdit, PatchKind},
    similarity::text_similarity,
};
use crate::infra::line_index::LineIndex;

pub struct BlockStrategy;

/// A chunk-aligned span of content and the matches inside it
#[derive(Debug)]
struct Region
{
    span: Range<usize>,
    matches: Vec<Range<usize>>,
}

/// Line-aligned chunk boundaries covering `content`
fn chunk_bounds(
    index: &LineIndex,
    len: usize,
    chunk_size: usize,
) -> Vec<Range<usize>>
{
    let mut chunks = Vec::new();
    let mut start = 0usize;

    for &line_start in index
        .line_starts()
        .iter()
        .skip(1)
    {
        if line_start - start >= chunk_size.max(1)
        {
            chunks.push(start..line_start);
            start = line_start;
        }
    }
    if start < len
    {
        chunks.push(start..len);
    }
    chunks
}

/// Merge match spans into chunk-aligned, non-overlapping regions
fn regions_for(
    matches: Vec<Range<usize>>,
    chunks: &[Range<usize>],
) -> Vec<Region>
{
    let chunk_of = |byte: usize| {
        chunks.partition_point(|c| c.end <= byte)
            .min(chunks.len().saturating_sub(1))
    };

    let mut regions: Vec<Region> = Vec::new();
    for m in matches
    {
        let first = chunk_of(m.start);
        let last = chunk_of(m.end - 1);
        let span = chunks[first].start..chunks[last].end;

        match regions.last_mut()
        {
            Some(prev) if span.start < prev.span.end =>
            {
                prev.span.end = prev
                    .span
                    .end
                    .max(span.end);
                prev.matches
                    .push(m);
            }
            _ => regions.push(Region { span, matches: vec![m] }),
        }
    }
    regions
}

/// Net count of each bracket pair
fn bracket_balance(text: &str) -> [i64; 3]
{
    let mut balance = [0i64; 3];
    for c in text.chars()
    {
        match c
        {
            '{' => balance[0] += 1,
            '}' => balance[0] -= 1,
            '(' => balance[1] += 1,
            ')' => balance[1] -= 1,
            '[' => balance[2] += 1,
            ']' => balance[2] -= 1,
            _ => {}
        }
    }
    balance
}

/// Edited region keeps bracket balance and a plausible length
pub fn has_valid_block_structure(
    original: &str,
    edited: &str,
) -> bool
{
    let (orig_len, new_len) = (original.len() as f64, edited.len() as f64);
    bracket_balance(original) == bracket_balance(edited)
        && new_len >= orig_len * 0.5
        && new_len <= orig_len * 2.0
}

/// Re-terminate `text` with `ending`
fn with_line_ending(
    text: &str,
    ending: &str,
) -> String
{
    split_lines(text).join(ending)
}

struct RegionEdit<'a>
{
    content: &'a str,
    search: &'a str,
    replacement: &'a str,
    threshold: f64,
}

impl RegionEdit<'_>
{
    /// Edited region text and number of replaced matches
    fn rewrite(
        &self,
        region: &Region,
    ) -> (String, usize)
    {
        let mut out = String::with_capacity(region.span.len());
        let mut cursor = region
            .span
            .start;
        let mut replaced = 0usize;

        for m in &region.matches
        {
            let found = &self.content[m.clone()];
            let score = text_similarity(found, self.search);
            if score < self.threshold
            {
                tracing::debug!(at = m.start, score, "block match below fuzzy threshold");
                continue;
            }
            out.push_str(&self.content[cursor..m.start]);
            out.push_str(self.replacement);
            cursor = m.end;
            replaced += 1;
        }
        out.push_str(&self.content[cursor..region.span.end]);
        (out, replaced)
    }
}

fn find_matches(
    re: &Regex,
    content: &str,
) -> Vec<Range<usize>>
{
    re.find_iter(content)
        .filter(|m| !m.is_empty())
        .map(|m| m.range())
        .collect()
}

impl PatchStrategy for BlockStrategy
{
    fn kind(&self) -> PatchKind
    {
        PatchKind::Block
    }

    fn apply(
        &self,
        input: &StrategyInput<'_>,
    ) -> PatchResultOf<StrategyOutcome>
    {
        let PatchEdit::Block { search: Some(search), replace: Some(replace) } = &input.op.edit
        else
        {
            return Err(PatchError::invalid("block operation requires search and replace"));
        };

        let content = input.current;
        let re = input
            .patterns
            .block_pattern(search, input.whitespace)?;

        let matches = find_matches(&re, content);
        if matches.is_empty()
        {
            tracing::debug!("block search found no match");
            return Ok(StrategyOutcome::unchanged(content, Vec::new()));
        }

        let index = LineIndex::build(content.as_bytes());
        let chunks = chunk_bounds(&index, content.len(), input.config.chunk_size);
        let replacement = with_line_ending(replace, input.line_ending);
        let editor = RegionEdit {
            content,
            search,
            replacement: &replacement,
            threshold: input.config.fuzzy_threshold,
        };

        let mut out = String::with_capacity(content.len());
        let mut cursor = 0usize;
        let mut changes = 0usize;
        let mut conflicts = Vec::new();

        for region in regions_for(matches, &chunks)
        {
            out.push_str(&content[cursor..region.span.start]);
            let original = &content[region.span.clone()];
            let (edited, replaced) = editor.rewrite(&region);

            if replaced > 0 && has_valid_block_structure(original, &edited)
            {
                out.push_str(&edited);
                changes += replaced;
            }
            else
            {
                if replaced > 0
                {
                    let line = index.line_of_byte(region.matches[0].start);
                    conflicts.push(format!(
                        "Block at line {line}: replacement failed structural validation"
                    ));
                }
                out.push_str(original);
            }
            cursor = region
                .span
                .end;
        }
        out.push_str(&content[cursor..]);

        Ok(StrategyOutcome { content: out, changes_applied: changes, conflicts })
    }
}
