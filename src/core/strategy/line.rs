//! Line strategy: replace or delete whole lines, by number or by match

use regex::{NoExpand, Regex};

use super::{PatchStrategy, StrategyInput, StrategyOutcome};
use crate::core::{
    conflict::ProtectionPolicy,
    error::{PatchError, PatchResultOf},
    normalize::LineBuffer,
    operation::{PatchEdit, PatchKind},
};

pub struct LineStrategy;

/// Result of touching one line
#[derive(Debug, PartialEq, Eq)]
enum LineEdit
{
    Deleted,
    Replaced,
    Unchanged,
    Refused,
}

struct LineEditor<'a>
{
    matcher: Option<&'a Regex>,
    replace: Option<&'a str>,
    protection: &'a dyn ProtectionPolicy,
    conflicts: Vec<String>,
    changes: usize,
}

impl LineEditor<'_>
{
    /// Edit `lines[idx]`; `line_no` is its 1-based number in the original content
    fn edit(
        &mut self,
        lines: &mut Vec<String>,
        idx: usize,
        line_no: usize,
    ) -> LineEdit
    {
        let line = &lines[idx];

        match self.replace
        {
            None =>
            {
                if let Some(conflict) = self
                    .protection
                    .check_delete(line_no, line)
                {
                    self.conflicts
                        .push(conflict);
                    return LineEdit::Refused;
                }
                lines.remove(idx);
                self.changes += 1;
                LineEdit::Deleted
            }
            Some(replacement) =>
            {
                let updated = match self.matcher
                {
                    Some(re) => re
                        .replace_all(line, NoExpand(replacement))
                        .into_owned(),
                    None => replacement.to_string(),
                };
                if &updated == line
                {
                    return LineEdit::Unchanged;
                }
                if let Some(conflict) = self
                    .protection
                    .check_replace(line_no, line, &updated)
                {
                    self.conflicts
                        .push(conflict);
                    return LineEdit::Refused;
                }
                lines[idx] = updated;
                self.changes += 1;
                LineEdit::Replaced
            }
        }
    }
}

impl PatchStrategy for LineStrategy
{
    fn kind(&self) -> PatchKind
    {
        PatchKind::Line
    }

    fn apply(
        &self,
        input: &StrategyInput<'_>,
    ) -> PatchResultOf<StrategyOutcome>
    {
        let PatchEdit::Line { search, pattern, replace, line_numbers } = &input.op.edit
        else
        {
            return Err(PatchError::invalid("line strategy received a non-line operation"));
        };

        let matcher = match (search.as_deref(), pattern.as_deref())
        {
            (Some(s), _) if !s.is_empty() => Some(
                input
                    .patterns
                    .line_pattern(s, input.whitespace)?,
            ),
            (_, Some(p)) if !p.is_empty() => Some(
                input
                    .patterns
                    .precompiled(p)?,
            ),
            _ => None,
        };

        let mut buffer = LineBuffer::parse(input.current);
        let mut editor = LineEditor {
            matcher: matcher.as_ref(),
            replace: replace.as_deref(),
            protection: input.protection,
            conflicts: Vec::new(),
            changes: 0,
        };

        match line_numbers
            .as_ref()
            .filter(|n| !n.is_empty())
        {
            Some(numbers) =>
            {
                // Descending order keeps earlier indices valid after deletions
                let mut numbers = numbers.clone();
                numbers.sort_unstable_by(|a, b| b.cmp(a));
                numbers.dedup();

                for n in numbers
                {
                    if n == 0 || n > buffer.len()
                    {
                        tracing::warn!(line = n, total = buffer.len(), "line number out of range, skipped");
                        continue;
                    }
                    let idx = n - 1;
                    if let Some(re) = editor.matcher
                        && !re.is_match(&buffer.lines[idx])
                    {
                        continue;
                    }
                    editor.edit(&mut buffer.lines, idx, n);
                }
                // at most one conflict per line, collected high to low
                editor
                    .conflicts
                    .reverse();
            }
            None =>
            {
                let Some(re) = editor.matcher
                else
                {
                    return Err(PatchError::invalid(
                        "line operation requires search, pattern, or lineNumbers",
                    ));
                };

                let mut idx = 0usize;
                let mut line_no = 1usize;
                while idx < buffer.len()
                {
                    let touched = if re.is_match(&buffer.lines[idx])
                    {
                        editor.edit(&mut buffer.lines, idx, line_no)
                    }
                    else
                    {
                        LineEdit::Unchanged
                    };
                    // A deleted line's successor now sits at `idx`
                    if touched != LineEdit::Deleted
                    {
                        idx += 1;
                    }
                    line_no += 1;
                }
            }
        }

        Ok(StrategyOutcome {
            content: buffer.join(input.line_ending),
            changes_applied: editor.changes,
            conflicts: editor.conflicts,
        })
    }
}

#[cfg(test)]
mod tests
{
    use crate::core::operation::{PatchEdit, PatchOperation};
    use crate::core::strategy::test_support::Harness;

    #[test]
    fn replaces_matching_line()
    {
        let h = Harness::new();
        let out = h
            .run(&PatchOperation::line("f.txt", "bar", "baz"), "foo\nbar\n")
            .unwrap();

        assert_eq!(out.content, "foo\nbaz\n");
        assert_eq!(out.changes_applied, 1);
        assert!(
            out.conflicts
                .is_empty()
        );
    }

    #[test]
    fn protected_line_is_not_deleted()
    {
        let h = Harness::new();
        let op = PatchOperation::delete_lines("f.txt", vec![1]);
        let out = h
            .run(&op, "x = 1;  // TODO fix\n")
            .unwrap();

        assert_eq!(out.content, "x = 1;  // TODO fix\n");
        assert_eq!(out.changes_applied, 0);
        assert_eq!(out.conflicts, vec!["Line 1: Cannot delete protected line".to_string()]);
    }

    #[test]
    fn deletes_by_number_against_original_numbering()
    {
        let h = Harness::new();
        let op = PatchOperation::delete_lines("f.txt", vec![2, 4, 2, 9]);
        let out = h
            .run(&op, "a\nb\nc\nd\ne\n")
            .unwrap();

        assert_eq!(out.content, "a\nc\ne\n");
        assert_eq!(out.changes_applied, 2);
    }

    #[test]
    fn numbered_conflicts_are_listed_in_line_order()
    {
        let h = Harness::new();
        let op = PatchOperation::delete_lines("f.txt", vec![2, 5, 3]);
        let out = h
            .run(&op, "a\n// TODO one\nkeep\nb\n// IMPORTANT two\n")
            .unwrap();

        assert_eq!(out.content, "a\n// TODO one\nb\n// IMPORTANT two\n");
        assert_eq!(out.changes_applied, 1);
        assert_eq!(
            out.conflicts,
            vec![
                "Line 2: Cannot delete protected line".to_string(),
                "Line 5: Cannot delete protected line".to_string(),
            ]
        );
    }

    #[test]
    fn deleting_matches_does_not_skip_neighbours()
    {
        let h = Harness::new();
        let op = PatchOperation::new(
            "f.txt",
            PatchEdit::Line {
                search: Some("drop".into()),
                pattern: None,
                replace: None,
                line_numbers: None,
            },
        );
        let out = h
            .run(&op, "keep\ndrop 1\ndrop 2\nkeep\n")
            .unwrap();

        assert_eq!(out.content, "keep\nkeep\n");
        assert_eq!(out.changes_applied, 2);
    }

    #[test]
    fn conflict_reports_original_line_number_after_deletions()
    {
        let h = Harness::new();
        let op = PatchOperation::new(
            "f.txt",
            PatchEdit::Line {
                search: Some("x".into()),
                pattern: None,
                replace: None,
                line_numbers: None,
            },
        );
        let out = h
            .run(&op, "x1\nx2 TODO\nok\n")
            .unwrap();

        assert_eq!(out.content, "x2 TODO\nok\n");
        assert_eq!(out.conflicts, vec!["Line 2: Cannot delete protected line".to_string()]);
    }

    #[test]
    fn unchanged_replacement_is_not_counted()
    {
        let h = Harness::new();
        let out = h
            .run(&PatchOperation::line("f.txt", "foo", "foo"), "foo\n")
            .unwrap();
        assert_eq!(out.changes_applied, 0);
    }

    #[test]
    fn growth_limit_records_conflict()
    {
        let h = Harness::new();
        let out = h
            .run(&PatchOperation::line("f.txt", "ab", "abcdefghij"), "ab\n")
            .unwrap();

        assert_eq!(out.content, "ab\n");
        assert_eq!(out.conflicts, vec!["Line 1: Replacement exceeds length limit".to_string()]);
    }

    #[test]
    fn precompiled_pattern_with_line_numbers()
    {
        let h = Harness::new();
        let op = PatchOperation::new(
            "f.txt",
            PatchEdit::Line {
                search: None,
                pattern: Some(r"\d+".into()),
                replace: Some("N".into()),
                line_numbers: Some(vec![2]),
            },
        );
        let out = h
            .run(&op, "a1\nb22\nc3\n")
            .unwrap();

        assert_eq!(out.content, "a1\nbN\nc3\n");
        assert_eq!(out.changes_applied, 1);
    }

    #[test]
    fn replacement_text_is_literal()
    {
        let h = Harness::new();
        let out = h
            .run(&PatchOperation::line("f.txt", "cost", "$1"), "cost\n")
            .unwrap();
        assert_eq!(out.content, "$1\n");
    }
}
