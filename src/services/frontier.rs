use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ahash::AHashSet;

/// A scheduled request. `kind` tells the crawler which callback handles it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request<K> {
    pub url: String,
    pub priority: i32,
    pub kind: K,
    pub dont_filter: bool,
}

impl<K> Request<K> {
    pub fn new(url: impl Into<String>, kind: K) -> Self {
        Self { url: url.into(), priority: 0, kind, dont_filter: false }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn dont_filter(mut self) -> Self {
        self.dont_filter = true;
        self
    }
}

struct Queued<K> {
    seq: u64,
    request: Request<K>,
}

impl<K> PartialEq for Queued<K> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K> Eq for Queued<K> {}

impl<K> PartialOrd for Queued<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for Queued<K> {
    // Max-heap: higher priority first, then lower sequence number.
    fn cmp(&self, other: &Self) -> Ordering {
        self.request
            .priority
            .cmp(&other.request.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Crawl frontier: priority order, FIFO among equal priorities, each URL
/// scheduled once unless the request opts out with `dont_filter`.
pub struct Frontier<K> {
    heap: BinaryHeap<Queued<K>>,
    seen: AHashSet<String>,
    seq: u64,
}

impl<K> Default for Frontier<K> {
    fn default() -> Self {
        Self { heap: BinaryHeap::new(), seen: AHashSet::new(), seq: 0 }
    }
}

impl<K> Frontier<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the request was dropped as a duplicate.
    pub fn push(&mut self, request: Request<K>) -> bool {
        if !self.seen.insert(request.url.clone()) && !request.dont_filter {
            return false;
        }
        self.seq += 1;
        self.heap.push(Queued { seq: self.seq, request });
        true
    }

    pub fn pop(&mut self) -> Option<Request<K>> {
        self.heap.pop().map(|q| q.request)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
