//! Bounded, recency-ordered working set.
//!
//! Pages are kept oldest first; the tail is always the most recently
//! touched page. Every page id appears at most once, and its access stamp
//! lives in a side map that is updated together with the sequence.

use crate::types::PageId;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

/// Global access stamp counter. Stamp 0 is reserved for "never accessed".
static NEXT_ACCESS_STAMP: AtomicU64 = AtomicU64::new(1);

/// Generate a new, strictly increasing access stamp.
fn next_access_stamp() -> u64 {
    NEXT_ACCESS_STAMP.fetch_add(1, Ordering::Relaxed)
}

/// Recently touched pages of one tab.
#[derive(Debug, Clone)]
pub struct WorkingSet {
    /// Page ids, least recently used at the front
    pages: VecDeque<PageId>,
    /// Last access stamp for each tracked page
    last_access: HashMap<PageId, u64>,
    /// Maximum number of tracked pages
    capacity: usize,
}

impl WorkingSet {
    /// Create an empty working set holding at most `capacity` pages.
    pub fn new(capacity: usize) -> Self {
        Self {
            pages: VecDeque::with_capacity(capacity),
            last_access: HashMap::with_capacity(capacity),
            capacity,
        }
    }

    /// Record an access to `page_id`, making it the most recent page.
    ///
    /// Returns the page evicted to stay within capacity, if any.
    pub fn touch(&mut self, page_id: PageId) -> Option<PageId> {
        if self.last_access.contains_key(&page_id) {
            self.pages.retain(|&p| p != page_id);
        }
        self.pages.push_back(page_id);
        self.last_access.insert(page_id, next_access_stamp());

        let mut evicted = None;
        while self.pages.len() > self.capacity {
            if let Some(oldest) = self.pages.pop_front() {
                self.last_access.remove(&oldest);
                evicted = Some(oldest);
            }
        }
        evicted
    }

    /// Number of tracked pages.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether no page is tracked.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Maximum number of tracked pages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether `page_id` is currently tracked.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.last_access.contains_key(&page_id)
    }

    /// The most recently touched page.
    pub fn most_recent(&self) -> Option<PageId> {
        self.pages.back().copied()
    }

    /// Access stamp of the most recent page, or 0 when empty.
    pub fn last_access_stamp(&self) -> u64 {
        self.most_recent()
            .and_then(|p| self.last_access.get(&p).copied())
            .unwrap_or(0)
    }

    /// Access stamp recorded for a specific page.
    pub fn stamp_of(&self, page_id: PageId) -> Option<u64> {
        self.last_access.get(&page_id).copied()
    }

    /// Tracked pages, oldest first.
    pub fn pages(&self) -> impl Iterator<Item = PageId> + '_ {
        self.pages.iter().copied()
    }
}
