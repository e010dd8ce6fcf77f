//! # Hosted `Park` implementation
//!
//! Backs [`Park`] with OS threads so sleep locks can be exercised outside
//! the kernel. Like the kernel's `wakeup`, which scans every process,
//! [`ThreadParker::unpark_all`] wakes every parked thread regardless of
//! channel; each one re-checks its own lock and parks again if needed.

extern crate std;

use crate::{HolderId, Park};
use core::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};

static GATE: Mutex<()> = Mutex::new(());
static WAKE: Condvar = Condvar::new();
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

std::thread_local! {
    static THREAD_ID: u64 = NEXT_ID.fetch_add(1, Ordering::Relaxed);
}

/// [`Park`] for hosted builds: parks OS threads on a shared condition variable.
#[derive(Debug, Default, Copy, Clone)]
pub struct ThreadParker;

impl Park for ThreadParker {
    fn current(&self) -> HolderId {
        HolderId(THREAD_ID.with(|id| *id))
    }

    fn park(&self, _channel: usize, release: impl FnOnce()) {
        let gate = GATE.lock().unwrap_or_else(PoisonError::into_inner);
        // A waker needs GATE to notify, so it cannot slip in between the
        // caller's unlock and our wait.
        release();
        drop(WAKE.wait(gate).unwrap_or_else(PoisonError::into_inner));
    }

    fn unpark_all(&self, _channel: usize) {
        let _gate = GATE.lock().unwrap_or_else(PoisonError::into_inner);
        WAKE.notify_all();
    }
}
