//! # LRU clocks
//!
//! A buffer's recency is the time of its last release, read from an
//! [`LruClock`]. Eviction picks the unreferenced buffer with the oldest stamp.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicU64, Ordering};

pub trait LruClock {
    /// Current time. Must never go backwards.
    fn now(&self) -> u64;
}

/// Timer-interrupt tick counter.
///
/// The clock interrupt calls [`tick`](Self::tick). Releases within the same
/// tick get equal stamps; eviction then takes the first such buffer it scans.
#[derive(Debug, Default)]
pub struct Ticks(AtomicU64);

impl Ticks {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Advances the clock by one tick and returns the new value.
    pub fn tick(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl LruClock for Ticks {
    fn now(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Advances on every reading, so every release gets a distinct stamp and
/// eviction order is exact LRU.
#[derive(Debug, Default)]
pub struct LogicalClock(AtomicU64);

impl LogicalClock {
    #[must_use]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }
}

impl LruClock for LogicalClock {
    fn now(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl<C: LruClock + ?Sized> LruClock for &C {
    fn now(&self) -> u64 {
        (**self).now()
    }
}

impl<C: LruClock + ?Sized> LruClock for Arc<C> {
    fn now(&self) -> u64 {
        (**self).now()
    }
}
