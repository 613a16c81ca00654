//! Token-level edit-distance similarity
//!
//! `similarity = 1 - levenshtein(a, b) / max(|a|, |b|)` with unit costs.
//! Common prefixes and suffixes are stripped before running the dynamic
//! program; that does not change the distance. When the remaining matrix
//! is still larger than `MAX_DP_CELLS`, scoring falls back to whole lines
//! as the comparison unit so validation of very large files stays bounded.

use crate::core::tokenize::{Token, tokenize};

/// Upper bound on DP matrix cells evaluated for one comparison
pub const MAX_DP_CELLS: usize = 16_000_000;

/// Levenshtein distance over arbitrary comparable items (two-row DP)
pub fn edit_distance<T: PartialEq>(
    a: &[T],
    b: &[T],
) -> usize
{
    let (a, b) = strip_common(a, b);

    if a.is_empty()
    {
        return b.len();
    }
    if b.is_empty()
    {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, x) in a
        .iter()
        .enumerate()
    {
        curr[0] = i + 1;
        for (j, y) in b
            .iter()
            .enumerate()
        {
            let cost = usize::from(x != y);
            curr[j + 1] = (prev[j] + cost)
                .min(prev[j + 1] + 1)
                .min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Remove the shared prefix and suffix of two slices
pub(crate) fn strip_common<'s, T: PartialEq>(
    a: &'s [T],
    b: &'s [T],
) -> (&'s [T], &'s [T])
{
    let prefix = a
        .iter()
        .zip(b)
        .take_while(|(x, y)| x == y)
        .count();
    let (a, b) = (&a[prefix..], &b[prefix..]);

    let suffix = a
        .iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    (&a[..a.len() - suffix], &b[..b.len() - suffix])
}

/// Normalized similarity in [0, 1]; two empty sequences are identical
pub fn normalized<T: PartialEq>(
    a: &[T],
    b: &[T],
) -> f64
{
    let max_len = a
        .len()
        .max(b.len());
    if max_len == 0
    {
        return 1.0;
    }
    1.0 - edit_distance(a, b) as f64 / max_len as f64
}

/// Similarity between two token sequences
pub fn similarity(
    a: &[Token<'_>],
    b: &[Token<'_>],
) -> f64
{
    normalized(a, b)
}

/// Tokenize both texts and score them, degrading to line granularity
/// when the token matrix would exceed the cell budget
pub fn text_similarity(
    a: &str,
    b: &str,
) -> f64
{
    if a == b
    {
        return 1.0;
    }

    let ta = tokenize(a);
    let tb = tokenize(b);
    let (ra, rb) = strip_common(&ta, &tb);

    if ra
        .len()
        .saturating_mul(rb.len())
        <= MAX_DP_CELLS
    {
        return similarity(&ta, &tb);
    }

    tracing::debug!(
        tokens_a = ta.len(),
        tokens_b = tb.len(),
        "token matrix over budget, scoring by lines"
    );
    let la: Vec<&str> = a
        .lines()
        .collect();
    let lb: Vec<&str> = b
        .lines()
        .collect();
    normalized(&la, &lb)
}
