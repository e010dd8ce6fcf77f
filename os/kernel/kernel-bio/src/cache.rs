use crate::bucket::{Bucket, Entry};
use crate::{BcacheConfig, BlockData, BlockDevice, BlockId, Buf, ConfigError, LogicalClock, LruClock};
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use kernel_info::param::BSIZE;
use kernel_sync::{LockStats, Park, SleepLock, SpinLock, SpinLockGuard};

/// Content of one buffer. Which block it caches is recorded in the bucket
/// entry pointing at it.
struct Slot<P> {
    /// The bytes reflect the block on disk. Cleared when the buffer is
    /// reassigned, set after the first read.
    valid: AtomicBool,
    block: SleepLock<BlockData, P>,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    evictions: AtomicU64,
    disk_reads: AtomicU64,
    disk_writes: AtomicU64,
}

/// Snapshot of the cache's activity counters.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups that found the block already cached.
    pub hits: u64,
    /// Lookups that recycled a buffer for a block not cached.
    pub evictions: u64,
    pub disk_reads: u64,
    pub disk_writes: u64,
}

/// Sharded buffer cache in front of a [`BlockDevice`].
///
/// Lookups that hit lock only the block's hash bucket. Misses are serialized
/// by a single eviction lock, under which the cache is searched again before
/// the least recently released idle buffer, from any bucket, is recycled.
///
/// Lock order: eviction lock, then bucket locks in ascending index, then a
/// buffer's content lock. A content lock is never requested while a spin lock
/// is held.
pub struct BufferCache<D, P, C = LogicalClock> {
    device: D,
    clock: C,
    slots: Box<[Slot<P>]>,
    buckets: Box<[SpinLock<Bucket>]>,
    eviction: SpinLock<()>,
    counters: Counters,
}

/// The bucket holding the current eviction candidate, kept locked.
struct Victim<'a> {
    index: usize,
    bucket: SpinLockGuard<'a, Bucket>,
    pos: usize,
    stamp: u64,
}

impl<D: BlockDevice, P: Park + Clone> BufferCache<D, P, LogicalClock> {
    /// A cache whose recency is exact release order.
    ///
    /// # Errors
    /// [`ConfigError`] if `config` asks for no buffers or no buckets.
    pub fn new(config: BcacheConfig, device: D, park: P) -> Result<Self, ConfigError> {
        Self::with_clock(config, device, park, LogicalClock::new())
    }
}

impl<D: BlockDevice, P: Park + Clone, C: LruClock> BufferCache<D, P, C> {
    /// A cache stamping releases with `clock`.
    ///
    /// All buffers start out unassigned and invalid, held by bucket 0.
    ///
    /// # Errors
    /// [`ConfigError`] if `config` asks for no buffers or no buckets.
    pub fn with_clock(config: BcacheConfig, device: D, park: P, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        let BcacheConfig { buffers, buckets } = config;

        let slots = (0..buffers)
            .map(|_| Slot {
                valid: AtomicBool::new(false),
                block: SleepLock::new("buffer", [0; BSIZE], park.clone()),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        let buckets = (0..buckets)
            .map(|index| {
                let mut bucket = Bucket::with_capacity(buffers);
                if index == 0 {
                    (0..buffers).for_each(|slot| bucket.insert(Entry::unassigned(slot)));
                }
                SpinLock::named("bcache", bucket)
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        log::info!(
            "bcache: {buffers} buffers of {BSIZE} bytes in {} buckets",
            buckets.len()
        );

        Ok(Self {
            device,
            clock,
            slots,
            buckets,
            eviction: SpinLock::named("bcache.eviction", ()),
            counters: Counters::default(),
        })
    }
}

impl<D: BlockDevice, P: Park, C: LruClock> BufferCache<D, P, C> {
    /// Locked handle to the buffer for block `blockno` of `dev`, without
    /// reading the disk. Sleeps while another thread holds that buffer.
    ///
    /// # Panics
    /// `bget: no buffers` if the block is not cached and every buffer is
    /// referenced.
    #[must_use]
    pub fn get(&self, dev: u32, blockno: u32) -> Buf<'_, D, P, C> {
        let id = BlockId::new(dev, blockno);
        let home = id.bucket(self.buckets.len());

        let cached = self.buckets[home].lock().acquire(id);
        if let Some(slot) = cached {
            return self.hit(slot, id);
        }

        let evicting = self.eviction.lock();

        // Another miss on the same block may have installed it meanwhile.
        let cached = self.buckets[home].lock().acquire(id);
        if let Some(slot) = cached {
            drop(evicting);
            return self.hit(slot, id);
        }

        let slot = self.recycle(&evicting, id, home);
        drop(evicting);
        self.counters.evictions.fetch_add(1, Ordering::Relaxed);
        self.lock_slot(slot, id)
    }

    /// Locked handle to the buffer for block `blockno` of `dev`, holding the
    /// block's on-disk content. The disk is read only if the buffer is not
    /// yet valid.
    ///
    /// # Panics
    /// As [`get`](Self::get).
    #[must_use]
    pub fn read(&self, dev: u32, blockno: u32) -> Buf<'_, D, P, C> {
        let mut buf = self.get(dev, blockno);
        let valid = &self.slots[buf.slot()].valid;
        if !valid.load(Ordering::Acquire) {
            self.device.read_block(buf.id(), buf.data_mut());
            valid.store(true, Ordering::Release);
            self.counters.disk_reads.fetch_add(1, Ordering::Relaxed);
        }
        buf
    }

    /// Writes the buffer's bytes to disk, synchronously.
    ///
    /// # Panics
    /// `bwrite` if the calling thread does not hold the buffer.
    pub fn write(&self, buf: &Buf<'_, D, P, C>) {
        debug_assert!(buf.belongs_to(self));
        if !buf.held_by_current() {
            log::error!("bwrite: buffer {} written by a thread not holding it", buf.id());
            panic!("bwrite: buffer {} not locked by caller", buf.id());
        }
        self.device.write_block(buf.id(), buf.data());
        self.counters.disk_writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Unlocks the buffer and gives up the handle's reference. Same as
    /// dropping it.
    ///
    /// # Panics
    /// `brelse` if the calling thread does not hold the buffer.
    pub fn release(&self, buf: Buf<'_, D, P, C>) {
        debug_assert!(buf.belongs_to(self));
        drop(buf);
    }

    /// Adds a reference that keeps the buffer from being recycled after the
    /// handle is released, without keeping it locked.
    pub fn pin(&self, buf: &Buf<'_, D, P, C>) {
        self.with_entry(buf.slot(), buf.id(), "bpin", |entry| entry.refcnt += 1);
    }

    /// Drops a reference taken by [`pin`](Self::pin).
    ///
    /// # Panics
    /// `bunpin` if the buffer has no pin to drop, i.e. the handle is its only
    /// reference.
    pub fn unpin(&self, buf: &Buf<'_, D, P, C>) {
        self.with_entry(buf.slot(), buf.id(), "bunpin", |entry| {
            if entry.refcnt <= 1 {
                log::error!("bunpin: buffer {} has no pin (refcnt {})", buf.id(), entry.refcnt);
                panic!("bunpin: buffer {} not pinned", buf.id());
            }
            entry.refcnt -= 1;
        });
    }

    /// References held on the buffer caching block `blockno` of `dev`, or
    /// `None` if the block is not cached.
    #[must_use]
    pub fn refcount(&self, dev: u32, blockno: u32) -> Option<u32> {
        let id = BlockId::new(dev, blockno);
        self.buckets[id.bucket(self.buckets.len())]
            .lock()
            .find(id)
            .map(|entry| entry.refcnt)
    }

    #[must_use]
    pub fn is_cached(&self, dev: u32, blockno: u32) -> bool {
        self.refcount(dev, blockno).is_some()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            disk_reads: self.counters.disk_reads.load(Ordering::Relaxed),
            disk_writes: self.counters.disk_writes.load(Ordering::Relaxed),
        }
    }

    /// Acquire and contention counts of every bucket lock, in bucket order,
    /// followed by the eviction lock.
    pub fn lock_stats(&self) -> impl Iterator<Item = LockStats> + '_ {
        self.buckets
            .iter()
            .map(SpinLock::stats)
            .chain(core::iter::once(self.eviction.stats()))
    }

    #[must_use]
    pub const fn device(&self) -> &D {
        &self.device
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn hit(&self, slot: usize, id: BlockId) -> Buf<'_, D, P, C> {
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        log::trace!("bget: hit {id} in slot {slot}");
        self.lock_slot(slot, id)
    }

    fn lock_slot(&self, slot: usize, id: BlockId) -> Buf<'_, D, P, C> {
        let guard = self.slots[slot].block.lock();
        Buf::new(self, slot, id, guard)
    }

    /// Reassigns the least recently released idle buffer to `id` with one
    /// reference and moves its entry into bucket `home`. Returns its slot.
    ///
    /// Holds at most two bucket locks at once: the best candidate found so
    /// far and the bucket being scanned, acquired in ascending order.
    fn recycle(&self, _evicting: &SpinLockGuard<'_, ()>, id: BlockId, home: usize) -> usize {
        let mut victim: Option<Victim<'_>> = None;
        for (index, bucket) in self.buckets.iter().enumerate() {
            let bucket = bucket.lock();
            let candidate = bucket.least_recent_idle();
            match candidate {
                Some((pos, stamp)) if victim.as_ref().is_none_or(|v| stamp < v.stamp) => {
                    // Replacing the old best unlocks its bucket.
                    victim = Some(Victim {
                        index,
                        bucket,
                        pos,
                        stamp,
                    });
                }
                _ => drop(bucket),
            }
        }

        let Some(Victim {
            index, mut bucket, pos, ..
        }) = victim
        else {
            log::error!("bget: every buffer referenced, cannot cache {id}");
            panic!("bget: no buffers");
        };

        let mut entry = bucket.remove(pos);
        let slot = entry.slot;
        match entry.id {
            Some(old) => log::trace!("bget: evicting {old} from slot {slot} for {id}"),
            None => log::trace!("bget: first use of slot {slot} for {id}"),
        }
        entry.assign(id);
        // Refcount was zero, so nobody holds the content lock.
        self.slots[slot].valid.store(false, Ordering::Release);

        if index == home {
            bucket.insert(entry);
        } else {
            drop(bucket);
            log::debug!("bget: slot {slot} moves from bucket {index} to {home}");
            self.buckets[home].lock().insert(entry);
        }
        slot
    }
}

impl<D, P, C: LruClock> BufferCache<D, P, C> {
    /// Returns a handle's reference, stamping the release time when it was
    /// the last one.
    pub(crate) fn unref(&self, slot: usize, id: BlockId) {
        self.with_entry(slot, id, "brelse", |entry| {
            entry.refcnt -= 1;
            if entry.refcnt == 0 {
                entry.last_release = self.clock.now();
            }
        });
    }

    fn with_entry<R>(&self, slot: usize, id: BlockId, op: &str, f: impl FnOnce(&mut Entry) -> R) -> R {
        let mut bucket = self.buckets[id.bucket(self.buckets.len())].lock();
        let Some(entry) = bucket.by_slot_mut(slot) else {
            drop(bucket);
            log::error!("{op}: slot {slot} not in the bucket of {id}");
            panic!("{op}: buffer {id} not cached");
        };
        debug_assert_eq!(entry.id, Some(id));
        f(entry)
    }
}
