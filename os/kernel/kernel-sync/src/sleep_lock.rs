//! # Sleep Lock
//!
//! Long-term mutual exclusion: a contended [`SleepLock`] parks the waiter
//! through the scheduler instead of spinning, so it may be held across disk
//! I/O. The lock records its holder, which lets callers assert ownership
//! before acting on protected state (`holdingsleep`).

use crate::{HolderId, Park, SpinLock};
use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};

struct SleepState {
    locked: bool,
    holder: Option<HolderId>,
}

pub struct SleepLock<T, P> {
    /// Guards `locked`/`holder`; never held while parked.
    state: SpinLock<SleepState>,
    park: P,
    data: UnsafeCell<T>,
}

// Safety: the data is only reachable through a guard, and at most one guard
// exists at a time.
unsafe impl<T: Send, P: Sync> Sync for SleepLock<T, P> {}

impl<T, P> SleepLock<T, P> {
    pub const fn new(name: &'static str, value: T, park: P) -> Self {
        Self {
            state: SpinLock::named(name, SleepState {
                locked: false,
                holder: None,
            }),
            park,
            data: UnsafeCell::new(value),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.state.name()
    }

    /// Rendezvous key for parked waiters: the lock's own address.
    fn channel(&self) -> usize {
        core::ptr::from_ref(self).addr()
    }
}

impl<T, P: Park> SleepLock<T, P> {
    /// Acquires the lock, sleeping until it is free.
    pub fn lock(&self) -> SleepLockGuard<'_, T, P> {
        let mut state = self.state.lock();
        while state.locked {
            self.park.park(self.channel(), move || drop(state));
            state = self.state.lock();
        }
        state.locked = true;
        state.holder = Some(self.park.current());
        drop(state);
        SleepLockGuard {
            lock: self,
            _marker: PhantomData,
        }
    }

    /// Acquires the lock only if it is free right now.
    pub fn try_lock(&self) -> Option<SleepLockGuard<'_, T, P>> {
        let mut state = self.state.lock();
        if state.locked {
            return None;
        }
        state.locked = true;
        state.holder = Some(self.park.current());
        drop(state);
        Some(SleepLockGuard {
            lock: self,
            _marker: PhantomData,
        })
    }

    /// Whether the calling thread is the current holder.
    pub fn holding(&self) -> bool {
        let me = self.park.current();
        let state = self.state.lock();
        state.locked && state.holder == Some(me)
    }

    /// The thread holding the lock, if any. Racy; diagnostics only.
    pub fn holder(&self) -> Option<HolderId> {
        self.state.lock().holder
    }

    fn unlock(&self) {
        let mut state = self.state.lock();
        state.locked = false;
        state.holder = None;
        drop(state);
        self.park.unpark_all(self.channel());
    }
}

/// Exclusive access to a [`SleepLock`]'s data; unlocks and wakes waiters on drop.
///
/// The guard may be moved to another thread. Ownership checks made through
/// [`held_by_current`](Self::held_by_current) then fail, which is how misuse
/// of a handed-off guard is detected.
///
/// Sharing a guard between threads shares `&T`, which needs `T: Sync`:
///
/// ```compile_fail
/// use core::cell::Cell;
/// use kernel_sync::{HolderId, Park, SleepLock};
///
/// struct Uniprocessor;
///
/// impl Park for Uniprocessor {
///     fn current(&self) -> HolderId {
///         HolderId(1)
///     }
///     fn park(&self, _channel: usize, release: impl FnOnce()) {
///         release();
///     }
///     fn unpark_all(&self, _channel: usize) {}
/// }
///
/// fn assert_sync<S: Sync>(_: &S) {}
///
/// let lock = SleepLock::new("cell", Cell::new(0u32), Uniprocessor);
/// assert_sync(&lock.lock());
/// ```
pub struct SleepLockGuard<'a, T, P: Park> {
    lock: &'a SleepLock<T, P>,
    _marker: PhantomData<&'a mut T>,
}

impl<T, P: Park> SleepLockGuard<'_, T, P> {
    /// Whether the calling thread is the one that acquired this guard.
    #[inline]
    pub fn held_by_current(&self) -> bool {
        self.lock.holding()
    }
}

impl<T, P: Park> Deref for SleepLockGuard<'_, T, P> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard proves exclusive access.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T, P: Park> DerefMut for SleepLockGuard<'_, T, P> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard proves exclusive access.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T, P: Park> Drop for SleepLockGuard<'_, T, P> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}
