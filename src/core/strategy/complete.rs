//! Complete strategy: whole-file replacement, optionally merged

use super::{PatchStrategy, StrategyInput, StrategyOutcome};
use crate::core::{
    error::{PatchError, PatchResultOf},
    merge::three_way_merge,
    normalize::normalize,
    operation::{MergeStrategy, PatchEdit, PatchKind},
};

pub struct CompleteStrategy;

impl PatchStrategy for CompleteStrategy
{
    fn kind(&self) -> PatchKind
    {
        PatchKind::Complete
    }

    fn apply(
        &self,
        input: &StrategyInput<'_>,
    ) -> PatchResultOf<StrategyOutcome>
    {
        let PatchEdit::Complete { content: Some(content) } = &input.op.edit
        else
        {
            return Err(PatchError::invalid("complete operation requires content"));
        };

        let target = normalize(content, input.whitespace).normalized;

        let (proposed, conflicts) = match input.op.merge_strategy
        {
            None | Some(MergeStrategy::Overwrite) => (target, Vec::new()),
            Some(strategy @ (MergeStrategy::Merge | MergeStrategy::Smart)) =>
            {
                let merged =
                    three_way_merge(input.current, &target, strategy == MergeStrategy::Smart)?;
                (merged.content, merged.conflicts)
            }
        };

        let changes_applied = usize::from(proposed != input.current);
        Ok(StrategyOutcome { content: proposed, changes_applied, conflicts })
    }
}

#[cfg(test)]
mod tests
{
    use crate::core::operation::{MergeStrategy, PatchOperation};
    use crate::core::strategy::test_support::Harness;

    #[test]
    fn overwrite_replaces_content()
    {
        let h = Harness::new();
        let out = h
            .run(&PatchOperation::complete("a.txt", "new\n"), "old\n")
            .unwrap();
        assert_eq!(out.content, "new\n");
        assert_eq!(out.changes_applied, 1);
    }

    #[test]
    fn identical_content_counts_no_change()
    {
        let h = Harness::new();
        let out = h
            .run(&PatchOperation::complete("a.txt", "same\n"), "same\n")
            .unwrap();
        assert_eq!(out.changes_applied, 0);
    }

    #[test]
    fn merge_reports_token_conflicts()
    {
        let h = Harness::new();
        let op = PatchOperation::complete("a.txt", "a x c").with_merge(MergeStrategy::Merge);
        let out = h
            .run(&op, "a b c")
            .unwrap();

        assert_eq!(out.content, "a b c");
        assert_eq!(out.changes_applied, 0);
        assert_eq!(out.conflicts, vec!["Merge conflict at token 2: 'b' vs 'x'".to_string()]);
    }

    #[test]
    fn merge_takes_clean_extension()
    {
        let h = Harness::new();
        let op = PatchOperation::complete("a.txt", "a b c").with_merge(MergeStrategy::Smart);
        let out = h
            .run(&op, "a b")
            .unwrap();
        assert_eq!(out.content, "a b c");
        assert_eq!(out.changes_applied, 1);
    }

    #[test]
    fn missing_file_counts_as_empty()
    {
        let h = Harness::new();
        let out = h
            .run(&PatchOperation::complete("new.txt", "hello\n"), "")
            .unwrap();
        assert_eq!(out.content, "hello\n");
        assert_eq!(out.changes_applied, 1);
    }
}
