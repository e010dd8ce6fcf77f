//! # Scheduler hooks for blocking locks
//!
//! A [`SleepLock`](crate::SleepLock) gives up the processor while it waits.
//! How a thread is put to sleep and woken again belongs to the scheduler,
//! which this crate does not know about, so the lock goes through [`Park`].
//! In the kernel this is the process table's `sleep`/`wakeup`; in hosted
//! builds it is [`ThreadParker`](crate::ThreadParker).

use core::fmt;

/// Identity of a thread of execution (a process id in the kernel).
///
/// Used by sleep locks to remember their holder.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct HolderId(pub u64);

impl fmt::Debug for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Holder({})", self.0)
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sleep/wakeup primitive supplied by the scheduler.
///
/// `channel` is an opaque rendezvous key, conventionally the address of the
/// object being waited on.
pub trait Park {
    /// The thread calling this method.
    fn current(&self) -> HolderId;

    /// Puts the calling thread to sleep on `channel`.
    ///
    /// `release` drops the caller's condition lock. It must be invoked after
    /// the thread is registered as a sleeper, so an [`unpark_all`](Self::unpark_all)
    /// issued once the condition lock is free cannot be missed. Returning
    /// without a matching wakeup is allowed; callers re-check their condition.
    fn park(&self, channel: usize, release: impl FnOnce());

    /// Wakes every thread sleeping on `channel`.
    fn unpark_all(&self, channel: usize);
}

impl<P: Park> Park for &P {
    #[inline]
    fn current(&self) -> HolderId {
        (**self).current()
    }

    #[inline]
    fn park(&self, channel: usize, release: impl FnOnce()) {
        (**self).park(channel, release);
    }

    #[inline]
    fn unpark_all(&self, channel: usize) {
        (**self).unpark_all(channel);
    }
}
