//! Strategies for property-based testing of discretised trees.
use ::proptest::collection::vec;
use ::proptest::prelude::*;
use std::ops::Range;

/// Consecutive, non-empty slices that together cover `0..n` for some `n`.
///
/// At most `max_parts` slices are produced, each with at most `max_len` entries.
pub fn contiguous_partition(max_parts: usize, max_len: usize) -> impl Strategy<Value = Vec<Range<usize>>> {
    vec(1..=max_len.max(1), 1..=max_parts.max(1)).prop_map(|lengths| {
        let mut start = 0;
        lengths
            .into_iter()
            .map(|len| {
                let slice = start..start + len;
                start += len;
                slice
            })
            .collect()
    })
}

/// Increasing, pairwise disjoint slices, possibly separated by gaps.
pub fn disjoint_slices(max_parts: usize, max_len: usize) -> impl Strategy<Value = Vec<Range<usize>>> {
    vec((0..=max_len, 0..=max_len), 1..=max_parts.max(1)).prop_map(|gaps_and_lengths| {
        let mut end = 0;
        gaps_and_lengths
            .into_iter()
            .map(|(gap, len)| {
                let start = end + gap;
                end = start + len;
                start..end
            })
            .collect()
    })
}
