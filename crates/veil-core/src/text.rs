/// Length of the longest common prefix of `a` and `b`, in characters.
pub(crate) fn common_prefix_chars(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).take_while(|(x, y)| x == y).count()
}

/// Length of the longest common suffix of `a` and `b`, in characters, capped at `limit`.
pub(crate) fn common_suffix_chars(a: &str, b: &str, limit: usize) -> usize {
    a.chars()
        .rev()
        .zip(b.chars().rev())
        .take(limit)
        .take_while(|(x, y)| x == y)
        .count()
}
