//! # Visitor Table
//!
//! Per-identifier token buckets plus the index that orders them by last
//! activity. The two live in one type so they cannot drift apart:
//!
//! ```text
//!     positions (HashMap)              heap (Vec, min-ordered by last_update)
//!     ┌──────────────┬─────┐           ┌───┬─────────────────────────────┐
//!     │ "alice"      │  2 ─┼──────────►│ 0 │ carol   t=10  tokens=4      │ ◄─ oldest
//!     │ "bob"        │  1 ─┼──────┐    ├───┼─────────────────────────────┤
//!     │ "carol"      │  0 ─┼──┐   └───►│ 1 │ bob     t=25  tokens=0      │
//!     └──────────────┴─────┘  │        ├───┼─────────────────────────────┤
//!                             └───────►│ 2 │ alice   t=31  tokens=9      │
//!                                      └───┴─────────────────────────────┘
//! ```
//!
//! The map value is the visitor's current heap slot. Every swap inside the
//! heap rewrites both slots' map entries, so `positions[k]` always names the
//! slot holding `k`. That is what makes "this visitor's timestamp changed,
//! restore heap order" an O(log n) operation instead of a scan.
//!
//! Nothing outside this module sees the map or the heap. Callers get four
//! operations: [`insert_or_refill`](VisitorTable::insert_or_refill),
//! [`evict_oldest`](VisitorTable::evict_oldest),
//! [`sweep_expired`](VisitorTable::sweep_expired) and
//! [`remove`](VisitorTable::remove).

use super::config::{LimiterConfig, RefillPolicy};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

type Positions = HashMap<Arc<str>, usize, ahash::RandomState>;

// Upper bound on the table's initial allocation; it grows on demand past this.
const INITIAL_CAPACITY_CAP: usize = 1024;

/// State tracked for one identifier.
#[derive(Debug, Clone)]
pub(crate) struct Visitor {
    pub(crate) key: Arc<str>,
    /// Remaining permits, always in `0..=rate`.
    pub(crate) tokens: u32,
    /// Clock reading of the last refill (or creation).
    pub(crate) last_update: u64,
}

/// The refill parameters `insert_or_refill` needs from the config.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Quota {
    pub(crate) rate: u32,
    pub(crate) duration: Duration,
    pub(crate) refill: RefillPolicy,
}

impl From<&LimiterConfig> for Quota {
    fn from(config: &LimiterConfig) -> Self {
        Self {
            rate: config.rate,
            duration: config.duration,
            refill: config.refill,
        }
    }
}

/// Result of one admission decision.
#[derive(Debug)]
pub(crate) struct Admission {
    pub(crate) allowed: bool,
    /// Visitor displaced to make room for a new identifier.
    pub(crate) evicted: Option<Visitor>,
}

/// Identifier map and eviction heap, kept consistent as one unit.
pub(crate) struct VisitorTable {
    heap: Vec<Visitor>,
    positions: Positions,
    max_entries: usize,
}

impl VisitorTable {
    pub(crate) fn new(max_entries: usize) -> Self {
        let capacity = max_entries.min(INITIAL_CAPACITY_CAP);
        Self {
            heap: Vec::with_capacity(capacity),
            positions: HashMap::with_capacity_and_hasher(capacity, ahash::RandomState::new()),
            max_entries,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub(crate) fn contains(&self, key: &str) -> bool {
        self.positions.contains_key(key)
    }

    /// Tokens currently stored for `key`, without refilling.
    pub(crate) fn remaining(&self, key: &str) -> Option<u32> {
        self.positions.get(key).map(|&pos| self.heap[pos].tokens)
    }

    /// Least recently active visitor.
    #[cfg(test)]
    pub(crate) fn peek_oldest(&self) -> Option<&Visitor> {
        self.heap.first()
    }

    /// Refills and charges `key`, onboarding it if unseen.
    ///
    /// An unseen key always gets in. If the table is full, the visitor with
    /// the oldest `last_update` is dropped to make room.
    pub(crate) fn insert_or_refill(&mut self, key: &str, now: u64, quota: Quota) -> Admission {
        let pos = match self.positions.get(key) {
            Some(&pos) => pos,
            None => return self.admit_new(key, now, quota),
        };

        let visitor = &mut self.heap[pos];
        let elapsed = now.saturating_sub(visitor.last_update);
        let earned = quota.refill.tokens_earned(elapsed, quota.rate, quota.duration);

        if earned > 0 {
            visitor.tokens = visitor.tokens.saturating_add(earned).min(quota.rate);
            visitor.last_update = now;
        }

        let allowed = if visitor.tokens > 0 {
            visitor.tokens -= 1;
            true
        } else {
            false
        };

        if earned > 0 {
            self.fix(pos);
        }

        Admission {
            allowed,
            evicted: None,
        }
    }

    fn admit_new(&mut self, key: &str, now: u64, quota: Quota) -> Admission {
        let evicted = if self.heap.len() >= self.max_entries {
            self.evict_oldest()
        } else {
            None
        };
        self.push(Visitor {
            key: Arc::from(key),
            tokens: quota.rate - 1,
            last_update: now,
        });
        Admission {
            allowed: true,
            evicted,
        }
    }

    /// Drops the least recently active visitor.
    pub(crate) fn evict_oldest(&mut self) -> Option<Visitor> {
        if self.heap.is_empty() {
            None
        } else {
            Some(self.remove_at(0))
        }
    }

    /// Drops every visitor whose `last_update` is older than `now - idle`.
    ///
    /// Pops from the root and stops at the first visitor still inside the
    /// window: everything below it in the heap is newer.
    pub(crate) fn sweep_expired(&mut self, now: u64, idle: Duration) -> usize {
        let idle_ns = idle.as_nanos().min(u128::from(u64::MAX)) as u64;
        let cutoff = now.saturating_sub(idle_ns);

        let mut removed = 0;
        while self
            .heap
            .first()
            .is_some_and(|oldest| oldest.last_update < cutoff)
        {
            self.remove_at(0);
            removed += 1;
        }
        removed
    }

    /// Forgets `key`. Returns whether it was tracked.
    pub(crate) fn remove(&mut self, key: &str) -> bool {
        match self.positions.get(key) {
            Some(&pos) => {
                self.remove_at(pos);
                true
            }
            None => false,
        }
    }

    pub(crate) fn clear(&mut self) -> usize {
        let count = self.heap.len();
        self.heap.clear();
        self.positions.clear();
        count
    }

    // Heap primitives. Every one of them keeps `positions` in sync.

    fn push(&mut self, visitor: Visitor) {
        let pos = self.heap.len();
        self.positions.insert(Arc::clone(&visitor.key), pos);
        self.heap.push(visitor);
        self.sift_up(pos);
    }

    fn remove_at(&mut self, pos: usize) -> Visitor {
        let visitor = self.heap.swap_remove(pos);
        self.positions.remove(&*visitor.key);
        if pos < self.heap.len() {
            if let Some(slot) = self.positions.get_mut(&*self.heap[pos].key) {
                *slot = pos;
            }
            self.fix(pos);
        }
        visitor
    }

    /// Restores heap order after the visitor at `pos` changed its timestamp.
    fn fix(&mut self, pos: usize) {
        if !self.sift_up(pos) {
            self.sift_down(pos);
        }
    }

    #[inline]
    fn less(&self, i: usize, j: usize) -> bool {
        self.heap[i].last_update < self.heap[j].last_update
    }

    fn swap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        if let Some(slot) = self.positions.get_mut(&*self.heap[i].key) {
            *slot = i;
        }
        if let Some(slot) = self.positions.get_mut(&*self.heap[j].key) {
            *slot = j;
        }
    }

    /// Returns whether the element moved.
    fn sift_up(&mut self, mut pos: usize) -> bool {
        let start = pos;
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.less(pos, parent) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
        pos != start
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.less(right, left) {
                right
            } else {
                left
            };
            if !self.less(child, pos) {
                break;
            }
            self.swap(pos, child);
            pos = child;
        }
    }

    /// Panics if the map and the heap disagree or heap order is broken.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        assert_eq!(self.heap.len(), self.positions.len(), "map/heap size mismatch");
        assert!(self.heap.len() <= self.max_entries, "table over capacity");
        for (pos, visitor) in self.heap.iter().enumerate() {
            assert_eq!(
                self.positions.get(&*visitor.key),
                Some(&pos),
                "position of {:?} is stale",
                visitor.key
            );
            if pos > 0 {
                let parent = (pos - 1) / 2;
                assert!(
                    self.heap[parent].last_update <= visitor.last_update,
                    "heap order broken at slot {}",
                    pos
                );
            }
        }
    }
}

impl std::fmt::Debug for VisitorTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisitorTable")
            .field("len", &self.heap.len())
            .field("max_entries", &self.max_entries)
            .finish()
    }
}
