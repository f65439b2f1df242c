// src/router/dedup.rs

use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

/// Event ids seen within a sliding window, oldest first.
///
/// Arrival order equals time order, so eviction only ever pops the front.
#[derive(Debug)]
pub struct RecentEvents {
    window: Duration,
    capacity: usize,
    order: VecDeque<(Instant, String)>,
    seen: HashSet<String>,
}

impl RecentEvents {
    pub fn new(window: Duration, capacity: usize) -> Self {
        Self {
            window,
            capacity: capacity.max(1),
            order: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    /// Records `id` and returns true the first time it is seen inside the window.
    pub fn first_sighting(&mut self, id: &str, now: Instant) -> bool {
        self.evict(now);
        if self.seen.contains(id) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some((_, oldest)) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.order.push_back((now, id.to_string()));
        self.seen.insert(id.to_string());
        true
    }

    /// Drops entries older than the window.
    pub fn evict(&mut self, now: Instant) {
        while let Some((arrived, _)) = self.order.front() {
            if now.saturating_duration_since(*arrived) <= self.window {
                break;
            }
            if let Some((_, id)) = self.order.pop_front() {
                self.seen.remove(&id);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
