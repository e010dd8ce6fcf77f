use crate::{BlockData, BlockId, BufferCache, LruClock};
use core::mem::ManuallyDrop;
use core::ops::{Deref, DerefMut};
use kernel_sync::{Park, SleepLockGuard};

/// A locked, referenced buffer.
///
/// Returned by [`BufferCache::get`] and [`BufferCache::read`]. While the
/// handle lives, the caller has exclusive access to the block's bytes and the
/// buffer cannot be recycled. Dropping it (or passing it to
/// [`BufferCache::release`]) unlocks the content and returns the reference.
///
/// # Panics
/// Dropping a handle on a thread other than the one that obtained it panics
/// with `brelse`.
pub struct Buf<'a, D, P: Park, C: LruClock> {
    cache: &'a BufferCache<D, P, C>,
    slot: usize,
    id: BlockId,
    guard: ManuallyDrop<SleepLockGuard<'a, BlockData, P>>,
}

impl<'a, D, P: Park, C: LruClock> Buf<'a, D, P, C> {
    pub(crate) const fn new(
        cache: &'a BufferCache<D, P, C>,
        slot: usize,
        id: BlockId,
        guard: SleepLockGuard<'a, BlockData, P>,
    ) -> Self {
        Self {
            cache,
            slot,
            id,
            guard: ManuallyDrop::new(guard),
        }
    }

    #[inline]
    #[must_use]
    pub const fn id(&self) -> BlockId {
        self.id
    }

    #[inline]
    #[must_use]
    pub const fn dev(&self) -> u32 {
        self.id.dev
    }

    #[inline]
    #[must_use]
    pub const fn blockno(&self) -> u32 {
        self.id.blockno
    }

    /// Index of the buffer within the cache. Stable for the handle's lifetime.
    #[inline]
    #[must_use]
    pub const fn slot(&self) -> usize {
        self.slot
    }

    #[must_use]
    pub fn data(&self) -> &BlockData {
        &self.guard
    }

    pub fn data_mut(&mut self) -> &mut BlockData {
        &mut self.guard
    }

    /// Whether the calling thread owns this buffer's content lock.
    #[must_use]
    pub fn held_by_current(&self) -> bool {
        self.guard.held_by_current()
    }

    pub(crate) fn belongs_to(&self, cache: &BufferCache<D, P, C>) -> bool {
        core::ptr::eq(self.cache, cache)
    }
}

impl<D, P: Park, C: LruClock> Deref for Buf<'_, D, P, C> {
    type Target = BlockData;

    fn deref(&self) -> &BlockData {
        self.data()
    }
}

impl<D, P: Park, C: LruClock> DerefMut for Buf<'_, D, P, C> {
    fn deref_mut(&mut self) -> &mut BlockData {
        self.data_mut()
    }
}

impl<D, P: Park, C: LruClock> core::fmt::Debug for Buf<'_, D, P, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Buf")
            .field("id", &self.id)
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

impl<D, P: Park, C: LruClock> Drop for Buf<'_, D, P, C> {
    fn drop(&mut self) {
        if !self.guard.held_by_current() {
            log::error!("brelse: buffer {} released by a thread not holding it", self.id);
            panic!("brelse: buffer {} not locked by caller", self.id);
        }

        // Unlock before dropping the reference: a buffer with no references
        // is never locked.
        // SAFETY: `guard` is not touched again after this point.
        unsafe { ManuallyDrop::drop(&mut self.guard) };
        self.cache.unref(self.slot, self.id);
    }
}
