//! Unified diff model: hunk parsing and diff rendering
//!
//! Parsing is lenient about everything outside hunks (`diff --git`,
//! `---`/`+++`, `index` lines are ignored). A hunk body is consumed until
//! the header's line counts are satisfied, so removed lines that happen to
//! look like `--- x` are never mistaken for file headers.

use similar::TextDiff;

use crate::core::error::{PatchError, PatchResultOf};

/// Context lines around each change when rendering
pub const DEFAULT_CONTEXT_RADIUS: usize = 3;

/// A single hunk in a unified diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize, // 1-based line number in old file (0 for empty)
    pub old_count: usize, // Number of lines in old version
    pub new_start: usize, // 1-based line number in new file
    pub new_count: usize, // Number of lines in new version
    pub section: Option<String>,
    pub lines: Vec<HunkLine>,
    pub old_missing_newline: bool, // `\ No newline` after the last old-side line
    pub new_missing_newline: bool, // `\ No newline` after the last new-side line
}

/// A line in a hunk with its change type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkLine {
    Context(String), // Unchanged line (starts with ' ')
    Remove(String),  // Removed line (starts with '-')
    Add(String),     // Added line (starts with '+')
}

impl Hunk {
    fn new(old_start: usize, old_count: usize, new_start: usize, new_count: usize) -> Self {
        Self {
            old_start,
            old_count,
            new_start,
            new_count,
            section: None,
            lines: Vec::new(),
            old_missing_newline: false,
            new_missing_newline: false,
        }
    }

    /// Lines the hunk expects to find (context + removals)
    pub fn old_lines(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|l| match l {
                HunkLine::Context(s) | HunkLine::Remove(s) => Some(s.as_str()),
                HunkLine::Add(_) => None,
            })
            .collect()
    }

    /// Lines the hunk leaves behind (context + additions)
    pub fn new_lines(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter_map(|l| match l {
                HunkLine::Context(s) | HunkLine::Add(s) => Some(s.as_str()),
                HunkLine::Remove(_) => None,
            })
            .collect()
    }

    /// 0-based line index the hunk expects to start at
    pub fn expected_index(&self) -> usize {
        // A pure insertion (`-N,0`) goes after line N; `-0,0` is the top
        if self.old_count == 0 {
            self.old_start
        } else {
            self.old_start.saturating_sub(1)
        }
    }

    /// Record a `\ No newline at end of file` marker against the line
    /// it follows
    fn mark_missing_newline(&mut self) {
        match self.lines.last() {
            Some(HunkLine::Context(_)) => {
                self.old_missing_newline = true;
                self.new_missing_newline = true;
            }
            Some(HunkLine::Remove(_)) => self.old_missing_newline = true,
            Some(HunkLine::Add(_)) => self.new_missing_newline = true,
            None => {}
        }
    }

    fn body_complete(&self) -> bool {
        let (mut old, mut new) = (0usize, 0usize);
        for line in &self.lines {
            match line {
                HunkLine::Context(_) => {
                    old += 1;
                    new += 1;
                }
                HunkLine::Remove(_) => old += 1,
                HunkLine::Add(_) => new += 1,
            }
        }
        old >= self.old_count && new >= self.new_count
    }
}

/// Hunks in file order plus non-fatal header problems
#[derive(Debug, Clone, Default)]
pub struct ParsedDiff {
    pub hunks: Vec<ParsedHunk>,
    pub conflicts: Vec<String>,
}

/// A hunk tagged with its 1-based position among all `@@` headers
#[derive(Debug, Clone)]
pub struct ParsedHunk {
    pub number: usize,
    pub hunk: Hunk,
}

/// Parse unified diff text.
///
/// Text without any `@@` header is a parse error. A header that cannot be
/// read records `Hunk K: malformed header` and its body is skipped.
pub fn parse_unified_diff(text: &str) -> PatchResultOf<ParsedDiff> {
    let mut parsed = ParsedDiff::default();
    let mut current: Option<Hunk> = None;
    let mut skipping = false;
    let mut headers = 0usize;

    for line in text.lines() {
        if line.starts_with("@@") {
            if let Some(hunk) = current.take() {
                parsed.hunks.push(ParsedHunk { number: headers, hunk });
            }
            headers += 1;

            match parse_hunk_header(line) {
                Some(hunk) => {
                    current = Some(hunk);
                    skipping = false;
                }
                None => {
                    tracing::warn!(hunk = headers, header = line, "malformed hunk header");
                    parsed
                        .conflicts
                        .push(format!("Hunk {headers}: malformed header"));
                    skipping = true;
                }
            }
            continue;
        }

        if skipping {
            continue;
        }

        let Some(hunk) = current.as_mut() else {
            continue;
        };
        if line.starts_with('\\') {
            hunk.mark_missing_newline();
            continue;
        }
        if hunk.body_complete() {
            // trailing file headers or git metadata before the next hunk
            continue;
        }

        if let Some(content) = line.strip_prefix('+') {
            hunk.lines.push(HunkLine::Add(content.to_string()));
        } else if let Some(content) = line.strip_prefix('-') {
            hunk.lines.push(HunkLine::Remove(content.to_string()));
        } else if let Some(content) = line.strip_prefix(' ') {
            hunk.lines.push(HunkLine::Context(content.to_string()));
        } else if line.is_empty() {
            hunk.lines.push(HunkLine::Context(String::new()));
        }
    }

    if let Some(hunk) = current.take() {
        parsed.hunks.push(ParsedHunk { number: headers, hunk });
    }

    if headers == 0 {
        return Err(PatchError::Parse("no hunk headers found".to_string()));
    }

    Ok(parsed)
}

/// Parse `@@ -a[,b] +c[,d] @@ [section]`
fn parse_hunk_header(line: &str) -> Option<Hunk> {
    let rest = line.trim_end().strip_prefix("@@")?;
    let end = rest.find("@@")?;
    let ranges = rest[..end].trim();
    let section = rest[end + 2..].trim();

    let mut parts = ranges.split_whitespace();
    let (old_start, old_count) = parse_range(parts.next()?.strip_prefix('-')?)?;
    let (new_start, new_count) = parse_range(parts.next()?.strip_prefix('+')?)?;
    if parts.next().is_some() {
        return None;
    }

    let mut hunk = Hunk::new(old_start, old_count, new_start, new_count);
    hunk.section = (!section.is_empty()).then(|| section.to_string());
    Some(hunk)
}

/// Parse a range like "1,5" or "1"
fn parse_range(s: &str) -> Option<(usize, usize)> {
    match s.split_once(',') {
        Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
        None => Some((s.parse().ok()?, 1)),
    }
}

/// Render `old → new` as a unified diff with `a/` and `b/` headers.
/// Identical inputs render as an empty string.
pub fn render_unified_diff(old: &str, new: &str, path: &str) -> String {
    if old == new {
        return String::new();
    }

    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(DEFAULT_CONTEXT_RADIUS)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_hunk() {
        let diff = "--- a/f.txt\n+++ b/f.txt\n@@ -1,3 +1,3 @@ fn main\n line 1\n-line 2\n+modified line 2\n line 3\n";
        let parsed = parse_unified_diff(diff).unwrap();

        assert!(parsed.conflicts.is_empty());
        assert_eq!(parsed.hunks.len(), 1);
        let hunk = &parsed.hunks[0].hunk;
        assert_eq!((hunk.old_start, hunk.old_count), (1, 3));
        assert_eq!(hunk.section.as_deref(), Some("fn main"));
        assert_eq!(hunk.old_lines(), vec!["line 1", "line 2", "line 3"]);
        assert_eq!(hunk.new_lines(), vec!["line 1", "modified line 2", "line 3"]);
    }

    #[test]
    fn test_counts_default_to_one() {
        let parsed = parse_unified_diff("@@ -2 +2 @@\n-a\n+b\n").unwrap();
        let hunk = &parsed.hunks[0].hunk;
        assert_eq!((hunk.old_count, hunk.new_count), (1, 1));
        assert_eq!(hunk.expected_index(), 1);
    }

    #[test]
    fn test_removed_line_resembling_header() {
        let diff = "@@ -1,2 +1,1 @@\n--- not a header\n keep\n";
        let parsed = parse_unified_diff(diff).unwrap();
        let hunk = &parsed.hunks[0].hunk;
        assert_eq!(hunk.lines[0], HunkLine::Remove("-- not a header".to_string()));
        assert_eq!(hunk.lines.len(), 2);
    }

    #[test]
    fn test_empty_body_line_is_context() {
        let parsed = parse_unified_diff("@@ -1,3 +1,3 @@\n a\n\n-b\n+c\n").unwrap();
        assert_eq!(
            parsed.hunks[0].hunk.old_lines(),
            vec!["a", "", "b"]
        );
    }

    #[test]
    fn test_malformed_header_recorded_and_skipped() {
        let diff = "@@ -x +1 @@\n-a\n+b\n@@ -3 +3 @@\n-c\n+d\n";
        let parsed = parse_unified_diff(diff).unwrap();

        assert_eq!(parsed.conflicts, vec!["Hunk 1: malformed header".to_string()]);
        assert_eq!(parsed.hunks.len(), 1);
        assert_eq!(parsed.hunks[0].number, 2);
    }

    #[test]
    fn test_no_headers_is_parse_error() {
        let err = parse_unified_diff("just some text\n").unwrap_err();
        assert!(matches!(err, PatchError::Parse(_)));
    }

    #[test]
    fn test_no_newline_markers_recorded_per_side() {
        let diff = "@@ -1 +1,2 @@\n-a\n\\ No newline at end of file\n+a\n+b\n";
        let hunk = &parse_unified_diff(diff).unwrap().hunks[0].hunk;
        assert_eq!(hunk.lines.len(), 3);
        assert!(hunk.old_missing_newline);
        assert!(!hunk.new_missing_newline);

        let diff = "@@ -1,2 +1,2 @@\n a\n-b\n+c\n\\ No newline at end of file\n";
        let hunk = &parse_unified_diff(diff).unwrap().hunks[0].hunk;
        assert!(!hunk.old_missing_newline);
        assert!(hunk.new_missing_newline);

        let diff = "@@ -1,2 +1,2 @@\n-a\n+A\n b\n\\ No newline at end of file\n";
        let hunk = &parse_unified_diff(diff).unwrap().hunks[0].hunk;
        assert!(hunk.old_missing_newline && hunk.new_missing_newline);
    }

    #[test]
    fn test_pure_insertion_goes_after_old_start() {
        let parsed = parse_unified_diff("@@ -3,0 +4 @@\n+d\n@@ -0,0 +1 @@\n+top\n").unwrap();
        assert_eq!(parsed.hunks[0].hunk.expected_index(), 3);
        assert_eq!(parsed.hunks[1].hunk.expected_index(), 0);
    }

    #[test]
    fn test_render_and_reparse() {
        let old = "line 1\nline 2\nline 3\n";
        let new = "line 1\nmodified line 2\nline 3\n";
        let diff = render_unified_diff(old, new, "f.txt");

        assert!(diff.contains("--- a/f.txt"));
        assert!(diff.contains("-line 2"));
        assert!(diff.contains("+modified line 2"));

        let parsed = parse_unified_diff(&diff).unwrap();
        assert_eq!(parsed.hunks.len(), 1);
        assert_eq!(render_unified_diff(old, old, "f.txt"), "");
    }
}
