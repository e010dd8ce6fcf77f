use core::cell::UnsafeCell;
use core::hint::spin_loop;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Short-term mutual exclusion for kernel metadata.
///
/// Holders must not block while the lock is held: waiters burn CPU until it
/// is released. Use [`SleepLock`](crate::SleepLock) for anything that spans
/// device I/O.
///
/// Every lock carries a name and counts its acquisitions, so contention on
/// hot locks (`kmem`, the `bcache` buckets) can be read back at runtime.
pub struct SpinLock<T> {
    held: AtomicBool,
    name: &'static str,
    acquires: AtomicU64,
    contended: AtomicU64,
    value: UnsafeCell<T>,
}

// Safety: `value` is only reached through a guard, and `held` admits one
// guard at a time.
unsafe impl<T: Send> Sync for SpinLock<T> {}

/// Counters of one [`SpinLock`], as returned by [`SpinLock::stats`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LockStats {
    pub name: &'static str,
    /// Successful acquisitions.
    pub acquires: u64,
    /// Acquisitions that found the lock held and had to spin.
    pub contended: u64,
}

impl<T> SpinLock<T> {
    pub const fn named(name: &'static str, value: T) -> Self {
        Self {
            held: AtomicBool::new(false),
            name,
            acquires: AtomicU64::new(0),
            contended: AtomicU64::new(0),
            value: UnsafeCell::new(value),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Acquires the lock if it is free, without spinning.
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        self.try_acquire().then(|| self.granted())
    }

    /// Spins until the lock is free. Waiters poll with plain loads and only
    /// retry the swap once the holder has let go.
    #[inline]
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        if !self.try_acquire() {
            self.contended.fetch_add(1, Ordering::Relaxed);
            loop {
                while self.held.load(Ordering::Relaxed) {
                    spin_loop();
                }
                if self.try_acquire() {
                    break;
                }
            }
        }
        self.granted()
    }

    /// Whether some thread holds the lock. Racy; diagnostics only.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.held.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn stats(&self) -> LockStats {
        LockStats {
            name: self.name,
            acquires: self.acquires.load(Ordering::Relaxed),
            contended: self.contended.load(Ordering::Relaxed),
        }
    }

    #[inline]
    fn try_acquire(&self) -> bool {
        self.held
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    fn granted(&self) -> SpinLockGuard<'_, T> {
        self.acquires.fetch_add(1, Ordering::Relaxed);
        SpinLockGuard {
            lock: self,
            _marker: PhantomData,
        }
    }
}

/// Access to a [`SpinLock`]'s value; releases the lock when dropped.
///
/// A guard hands out `&T`, so it may only be shared between threads when
/// `T` itself is `Sync`:
///
/// ```compile_fail
/// use core::cell::Cell;
/// use kernel_sync::SpinLock;
///
/// fn assert_sync<S: Sync>(_: &S) {}
///
/// let lock = SpinLock::named("cell", Cell::new(0u32));
/// assert_sync(&lock.lock());
/// ```
pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
    _marker: PhantomData<&'a mut T>,
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard proves exclusive access.
        unsafe { &*self.lock.value.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard proves exclusive access.
        unsafe { &mut *self.lock.value.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.held.store(false, Ordering::Release);
    }
}
