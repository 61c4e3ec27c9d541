//! Start-offset lookup over registered requests
//!
//! Replay needs two queries: which request (if any) starts exactly at an
//! offset, and the smallest registered start after an offset. Both
//! strategies answer them identically; the indexed one trades a build step
//! for O(1)/O(log n) queries once many requests are registered.

use crate::config::compile_time::replacement::INDEX_THRESHOLD;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    Linear,
    Indexed,
}

impl LookupStrategy {
    /// Strategy for a given number of registered requests
    pub fn for_request_count(count: usize) -> Self {
        if count > INDEX_THRESHOLD {
            LookupStrategy::Indexed
        } else {
            LookupStrategy::Linear
        }
    }
}

pub(crate) trait StartLookup {
    /// First-registered request starting at `offset`
    fn request_at(&self, offset: usize) -> Option<usize>;

    /// Smallest registered start strictly greater than `offset`
    fn next_start_after(&self, offset: usize) -> Option<usize>;
}

pub(crate) struct LinearLookup<'a> {
    starts: &'a [usize],
}

impl<'a> LinearLookup<'a> {
    pub(crate) fn new(starts: &'a [usize]) -> Self {
        Self { starts }
    }
}

impl StartLookup for LinearLookup<'_> {
    fn request_at(&self, offset: usize) -> Option<usize> {
        self.starts.iter().position(|&s| s == offset)
    }

    fn next_start_after(&self, offset: usize) -> Option<usize> {
        self.starts.iter().copied().filter(|&s| s > offset).min()
    }
}

pub(crate) struct IndexedLookup {
    by_start: HashMap<usize, usize>,
    sorted_starts: Vec<usize>,
}

impl IndexedLookup {
    pub(crate) fn new(starts: &[usize]) -> Self {
        let mut by_start = HashMap::with_capacity(starts.len());
        for (request, &start) in starts.iter().enumerate() {
            by_start.entry(start).or_insert(request);
        }
        let mut sorted_starts: Vec<usize> = by_start.keys().copied().collect();
        sorted_starts.sort_unstable();
        Self {
            by_start,
            sorted_starts,
        }
    }
}

impl StartLookup for IndexedLookup {
    fn request_at(&self, offset: usize) -> Option<usize> {
        self.by_start.get(&offset).copied()
    }

    fn next_start_after(&self, offset: usize) -> Option<usize> {
        let idx = self.sorted_starts.partition_point(|&s| s <= offset);
        self.sorted_starts.get(idx).copied()
    }
}
