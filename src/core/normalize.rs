//! Whitespace and line-ending normalization
//!
//! Pure function of (text, config). Detects the dominant line ending and
//! indentation unit, rewrites lines per the whitespace config and records
//! per-line statistics. The content hash is the same xxh64 digest the
//! rest of the crate uses for content ids.

use serde::{Deserialize, Serialize};

use crate::core::operation::WhitespaceConfig;

/// Columns a tab contributes when measuring indentation width
const TAB_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding
{
    Lf,
    CrLf,
    Cr,
}

impl LineEnding
{
    /// `\r\n` wins over `\r`, which wins over `\n`
    pub fn detect(text: &str) -> Self
    {
        if text.contains("\r\n")
        {
            LineEnding::CrLf
        }
        else if memchr::memchr(b'\r', text.as_bytes()).is_some()
        {
            LineEnding::Cr
        }
        else
        {
            LineEnding::Lf
        }
    }

    pub fn as_str(self) -> &'static str
    {
        match self
        {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
            LineEnding::Cr => "\r",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhitespaceStats
{
    pub indentation_spaces: usize,
    pub indentation_tabs: usize,
    pub trailing_whitespace_lines: usize,
    pub empty_lines: usize,
    pub max_line_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedContent
{
    pub normalized: String,
    pub line_ending: LineEnding,
    pub indentation: String,
    pub hash: String,
    pub stats: WhitespaceStats,
}

/// Line separator used when writing content under `config`
pub fn output_line_ending<'a>(
    detected: LineEnding,
    config: &'a WhitespaceConfig,
) -> &'a str
{
    if config.preserve_line_endings
    {
        detected.as_str()
    }
    else
    {
        config
            .default_line_ending
            .as_str()
    }
}

/// Split on `\r\n`, `\r` or `\n`; `n` separators yield `n + 1` segments
pub fn split_lines(text: &str) -> Vec<&str>
{
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while let Some(pos) = memchr::memchr2(b'\n', b'\r', &bytes[i..])
    {
        let at = i + pos;
        out.push(&text[start..at]);
        i = if bytes[at] == b'\r' && bytes.get(at + 1) == Some(&b'\n')
        {
            at + 2
        }
        else
        {
            at + 1
        };
        start = i;
    }

    out.push(&text[start..]);
    out
}

/// Leading run of spaces and tabs
fn leading_indent(line: &str) -> &str
{
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}

fn indent_width(run: &str) -> usize
{
    run.chars()
        .map(|c| if c == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}

/// Re-express an indentation run in units of `unit`, rounding up
fn reindent(
    run: &str,
    unit: &str,
) -> String
{
    let unit_width = indent_width(unit);
    if unit_width == 0 || run.is_empty()
    {
        return String::new();
    }
    let levels = indent_width(run).div_ceil(unit_width);
    unit.repeat(levels)
}

/// Deterministic content digest (16 hex digits)
pub fn content_hash(text: &str) -> String
{
    format!("{:016x}", xxhash_rust::xxh64::xxh64(text.as_bytes(), 0))
}

/// Normalize `raw` under `config`; never fails
pub fn normalize(
    raw: &str,
    config: &WhitespaceConfig,
) -> NormalizedContent
{
    let line_ending = LineEnding::detect(raw);
    let segments = split_lines(raw);

    let indentation = segments
        .iter()
        .map(|l| (leading_indent(l), *l))
        .find(|(run, line)| {
            !run.is_empty()
                && line[run.len()..]
                    .chars()
                    .next()
                    .is_some_and(|c| !c.is_whitespace())
        })
        .map(|(run, _)| run.to_string())
        .unwrap_or_else(|| {
            config
                .default_indentation
                .clone()
        });

    let stats = compute_stats(&segments, raw);

    let processed: Vec<String> = segments
        .iter()
        .map(|line| process_line(line, config))
        .collect();

    let normalized = processed.join(output_line_ending(line_ending, config));
    let hash = content_hash(&normalized);

    NormalizedContent { normalized, line_ending, indentation, hash, stats }
}

fn process_line(
    line: &str,
    config: &WhitespaceConfig,
) -> String
{
    let line = if config.trim_trailing_whitespace
    {
        line.trim_end()
    }
    else
    {
        line
    };

    if config.preserve_indentation
    {
        return line.to_string();
    }

    let run = leading_indent(line);
    let mut out = reindent(run, &config.default_indentation);
    out.push_str(&line[run.len()..]);
    out
}

fn compute_stats(
    segments: &[&str],
    raw: &str,
) -> WhitespaceStats
{
    // The segment after a final terminator is not a line
    let ends_with_terminator = raw.ends_with('\n') || raw.ends_with('\r');
    let lines = if ends_with_terminator
    {
        &segments[..segments.len() - 1]
    }
    else if raw.is_empty()
    {
        &segments[..0]
    }
    else
    {
        segments
    };

    let mut stats = WhitespaceStats::default();
    for line in lines
    {
        let run = leading_indent(line);
        if run.starts_with(' ')
        {
            stats.indentation_spaces += 1;
        }
        else if run.starts_with('\t')
        {
            stats.indentation_tabs += 1;
        }

        if line.trim().is_empty()
        {
            stats.empty_lines += 1;
        }
        else if line.trim_end().len() != line.len()
        {
            stats.trailing_whitespace_lines += 1;
        }

        stats.max_line_length = stats
            .max_line_length
            .max(
                line.chars()
                    .count(),
            );
    }
    stats
}

/// Owned lines plus whether the text ended with a terminator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBuffer
{
    pub lines: Vec<String>,
    pub trailing_newline: bool,
}

impl LineBuffer
{
    pub fn parse(text: &str) -> Self
    {
        if text.is_empty()
        {
            return Self { lines: Vec::new(), trailing_newline: false };
        }

        let mut segments = split_lines(text);
        let trailing_newline = segments
            .last()
            .is_some_and(|s| s.is_empty())
            && segments.len() > 1;
        if trailing_newline
        {
            segments.pop();
        }

        Self {
            lines: segments
                .into_iter()
                .map(str::to_string)
                .collect(),
            trailing_newline,
        }
    }

    pub fn len(&self) -> usize
    {
        self.lines
            .len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.lines
            .is_empty()
    }

    pub fn join(
        &self,
        ending: &str,
    ) -> String
    {
        if self
            .lines
            .is_empty()
        {
            return String::new();
        }

        let mut out = self
            .lines
            .join(ending);
        if self.trailing_newline
        {
            out.push_str(ending);
        }
        out
    }
}

/// Number of lines in `text` (a final terminator does not start a new line)
pub fn line_count(text: &str) -> usize
{
    LineBuffer::parse(text).len()
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn detects_line_endings_by_priority()
    {
        assert_eq!(LineEnding::detect("a\r\nb\rc\n"), LineEnding::CrLf);
        assert_eq!(LineEnding::detect("a\rb\nc"), LineEnding::Cr);
        assert_eq!(LineEnding::detect("a\nb"), LineEnding::Lf);
        assert_eq!(LineEnding::detect(""), LineEnding::Lf);
    }

    #[test]
    fn split_handles_mixed_terminators()
    {
        assert_eq!(split_lines("a\r\nb\rc\nd"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\n"), vec!["a", ""]);
        assert_eq!(split_lines(""), vec![""]);
    }

    #[test]
    fn preserves_detected_crlf()
    {
        let n = normalize("one\r\ntwo\nthree\r\n", &WhitespaceConfig::default());
        assert_eq!(n.line_ending, LineEnding::CrLf);
        assert_eq!(n.normalized, "one\r\ntwo\r\nthree\r\n");
    }

    #[test]
    fn uses_default_ending_when_not_preserving()
    {
        let cfg = WhitespaceConfig { preserve_line_endings: false, ..Default::default() };
        let n = normalize("one\r\ntwo\r\n", &cfg);
        assert_eq!(n.normalized, "one\ntwo\n");
    }

    #[test]
    fn trims_trailing_whitespace_when_asked()
    {
        let cfg = WhitespaceConfig { trim_trailing_whitespace: true, ..Default::default() };
        let n = normalize("a  \nb\t\n", &cfg);
        assert_eq!(n.normalized, "a\nb\n");
        assert_eq!(n.stats.trailing_whitespace_lines, 2);
    }

    #[test]
    fn reindents_to_default_unit()
    {
        let cfg = WhitespaceConfig { preserve_indentation: false, ..Default::default() };
        let n = normalize("fn a() {\n\tx();\n      y();\n}\n", &cfg);
        assert_eq!(n.normalized, "fn a() {\n    x();\n        y();\n}\n");
        assert_eq!(n.indentation, "\t");
    }

    #[test]
    fn empty_input_degrades_gracefully()
    {
        let n = normalize("", &WhitespaceConfig::default());
        assert_eq!(n.normalized, "");
        assert_eq!(n.stats, WhitespaceStats::default());
        assert_eq!(n.indentation, "    ");
        assert_eq!(n.hash, content_hash(""));
    }

    #[test]
    fn stats_snapshot()
    {
        let n = normalize(
            "fn main() {\n    let x = 1;  \n\tfoo();\n\n}\n",
            &WhitespaceConfig::default(),
        );
        insta::assert_yaml_snapshot!(n.stats, @r"
        indentationSpaces: 1
        indentationTabs: 1
        trailingWhitespaceLines: 1
        emptyLines: 1
        maxLineLength: 16
        ");
    }

    #[test]
    fn normalization_is_a_fixed_point()
    {
        let cfg = WhitespaceConfig {
            preserve_indentation: false,
            trim_trailing_whitespace: true,
            ..Default::default()
        };
        let once = normalize("a\r\n\t\tb  \r\n   c\r\n", &cfg);
        let twice = normalize(&once.normalized, &cfg);
        assert_eq!(once.normalized, twice.normalized);
        assert_eq!(once.hash, twice.hash);
    }

    #[test]
    fn line_buffer_round_trips()
    {
        for text in ["", "a", "a\n", "a\nb", "a\nb\n", "\n", "\n\n"]
        {
            let buf = LineBuffer::parse(text);
            assert_eq!(buf.join("\n"), text, "round trip of {text:?}");
        }
        assert_eq!(LineBuffer::parse("a\nb\n").len(), 2);
    }
}
