//! Bounded, time-decaying collections of fragments.
//!
//! A pool never holds more than its capacity and never holds a fragment older
//! than its time-to-live once a sweep has run. Every removal is reported to
//! the caller exactly once, so the caller can announce the fade.

use std::{collections::VecDeque, time::Duration};

use super::{entity::Fragment, value_object::Timestamp};

/// Limits of one fragment space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentPolicy {
    pub capacity: usize,
    pub ttl: Duration,
    pub sweep_interval: Duration,
}

impl FragmentPolicy {
    /// Drawing strokes: 100 live, fade after 30s, swept every 5s
    pub const STROKES: FragmentPolicy = FragmentPolicy {
        capacity: 100,
        ttl: Duration::from_secs(30),
        sweep_interval: Duration::from_secs(5),
    };

    /// Text fragments: 200 live, fade after 2 minutes, swept every 10s
    pub const TEXT: FragmentPolicy = FragmentPolicy {
        capacity: 200,
        ttl: Duration::from_secs(120),
        sweep_interval: Duration::from_secs(10),
    };

    fn ttl_millis(&self) -> i64 {
        i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Live fragments of one space, oldest first
#[derive(Debug)]
pub struct FragmentPool<P> {
    items: VecDeque<Fragment<P>>,
    policy: FragmentPolicy,
}

impl<P: Clone> FragmentPool<P> {
    pub fn new(policy: FragmentPolicy) -> Self {
        Self {
            items: VecDeque::new(),
            policy,
        }
    }

    pub fn policy(&self) -> FragmentPolicy {
        self.policy
    }

    /// Insert a fragment, evicting the oldest ones first so the pool is
    /// never over capacity. Returns the evicted fragments, oldest first.
    pub fn insert(&mut self, fragment: Fragment<P>) -> Vec<Fragment<P>> {
        let mut evicted = Vec::new();
        while !self.items.is_empty() && self.items.len() >= self.policy.capacity {
            if let Some(oldest) = self.items.pop_front() {
                evicted.push(oldest);
            }
        }
        if self.policy.capacity > 0 {
            self.items.push_back(fragment);
        }
        evicted
    }

    /// Remove every fragment older than the time-to-live at `now`.
    /// Returns the removed fragments, oldest first.
    pub fn expire(&mut self, now: Timestamp) -> Vec<Fragment<P>> {
        let ttl = self.policy.ttl_millis();
        let (faded, live): (Vec<_>, Vec<_>) = self
            .items
            .drain(..)
            .partition(|f| f.created_at.elapsed_until(now) > ttl);
        self.items = live.into();
        faded
    }

    /// Copy of the live fragments, oldest first
    pub fn snapshot(&self) -> Vec<Fragment<P>> {
        self.items.iter().cloned().collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
