//! Reference-counted physical frame allocator.
//!
//! Hands out whole pages for page tables, kernel stacks, pipe buffers and
//! user memory. Every frame carries a reference count so one frame can be
//! mapped into several address spaces (copy-on-write); it only goes back on
//! the free list when the last owner frees it.
//!
//! ```text
//!            alloc                 add_ref
//!   FREE ─────────────► ALLOCATED(1) ──────► ALLOCATED(n+1)
//!    ▲                    │      ▲                │
//!    │  free (n == 1)     │      └────────────────┘
//!    └────────────────────┘        free (n > 1)
//! ```
//!
//! Two locks, never held together: `kmem` guards the free list and `ref`
//! guards updates of the reference counts.

use crate::{FrameError, PhysAddr, PhysMapper};
use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU32, Ordering};
use kernel_info::memory::{PAGE_SHIFT, PAGE_SIZE, PHYSTOP};
use kernel_sync::{LockStats, SpinLock};

const PAGE_BYTES: usize = PAGE_SIZE as usize;

/// Written over a frame when it is handed out, to expose reads of uninitialized memory.
pub const ALLOC_JUNK: u8 = 0x05;

/// Written over a frame when it is returned, to expose dangling references.
pub const FREE_JUNK: u8 = 0x01;

/// Bounds of the memory handed to the allocator at boot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FrameRange {
    /// First address after the kernel image (the linker's `end`); rounded up.
    pub kernel_end: PhysAddr,
    /// First address past usable RAM; rounded down.
    pub phys_top: PhysAddr,
}

impl FrameRange {
    /// Everything from the end of the kernel image up to [`PHYSTOP`].
    #[must_use]
    pub const fn up_to_phystop(kernel_end: PhysAddr) -> Self {
        Self {
            kernel_end,
            phys_top: PhysAddr::new(PHYSTOP),
        }
    }
}

/// Singly linked stack of free frame indices; `next[i]` links frame `i`.
struct FreeList {
    head: Option<usize>,
    next: Box<[Option<usize>]>,
    len: usize,
}

impl FreeList {
    fn with_capacity(frames: usize) -> Self {
        Self {
            head: None,
            next: vec![None; frames].into_boxed_slice(),
            len: 0,
        }
    }

    fn push(&mut self, idx: usize) {
        self.next[idx] = self.head;
        self.head = Some(idx);
        self.len += 1;
    }

    fn pop(&mut self) -> Option<usize> {
        let idx = self.head?;
        self.head = self.next[idx].take();
        self.len -= 1;
        Some(idx)
    }
}

pub struct FrameAllocator<M> {
    mapper: M,
    base: PhysAddr,
    end: PhysAddr,
    free: SpinLock<FreeList>,
    refs: SpinLock<()>,
    /// Indexed by frame number relative to `base`. Updated only under
    /// `refs`; [`FrameAllocator::ref_count`] reads it without the lock.
    counts: Box<[AtomicU32]>,
}

impl<M: PhysMapper> FrameAllocator<M> {
    /// Takes ownership of every whole page in `range`, scrubs it and puts it
    /// on the free list.
    ///
    /// # Safety
    /// The pages in `range` must be unused by anything else and reachable
    /// through `mapper` for the lifetime of the allocator.
    #[allow(clippy::cast_possible_truncation)]
    pub unsafe fn new(range: FrameRange, mapper: M) -> Result<Self, FrameError> {
        let base = range.kernel_end.page_round_up();
        let end = range.phys_top.page_round_down();
        if base >= end {
            return Err(FrameError::EmptyRange(base, end));
        }

        let frames = (end.frame_number() - base.frame_number()) as usize;
        // Pre-set to 1 so the initial free below drops each count to zero.
        let counts: Vec<AtomicU32> = (0..frames).map(|_| AtomicU32::new(1)).collect();

        let allocator = Self {
            mapper,
            base,
            end,
            free: SpinLock::named("kmem", FreeList::with_capacity(frames)),
            refs: SpinLock::named("ref", ()),
            counts: counts.into_boxed_slice(),
        };
        for idx in 0..frames {
            allocator.free(allocator.frame_addr(idx));
        }

        log::info!("kalloc: {frames} frames in [{base}, {end})");
        Ok(allocator)
    }

    /// Allocates one page-sized frame, or `None` when memory is exhausted.
    ///
    /// The frame starts with a reference count of 1 and is filled with [`ALLOC_JUNK`].
    pub fn alloc(&self) -> Option<PhysAddr> {
        let idx = self.free.lock().pop()?;
        {
            let _refs = self.refs.lock();
            self.counts[idx].store(1, Ordering::Relaxed);
        }

        let pa = self.frame_addr(idx);
        // SAFETY: the frame just left the free list; nobody else references it.
        unsafe { self.fill(pa, ALLOC_JUNK) };
        Some(pa)
    }

    /// Drops one reference to `pa`, returning the frame to the free list when
    /// it was the last one.
    ///
    /// # Panics
    /// On a misaligned or out-of-range address, or when the frame is already
    /// free. Either means the caller's bookkeeping is corrupt.
    pub fn free(&self, pa: PhysAddr) {
        let idx = match self.frame_index(pa) {
            Ok(idx) => idx,
            Err(err) => {
                log::error!("kfree: {err}");
                panic!("kfree: {err}");
            }
        };

        let refs = self.refs.lock();
        let count = self.counts[idx].load(Ordering::Relaxed);
        if count == 0 {
            drop(refs);
            log::error!("kfree: double free of {pa}");
            panic!("kfree: double free of {pa}");
        }
        self.counts[idx].store(count - 1, Ordering::Relaxed);
        drop(refs);

        if count > 1 {
            return;
        }

        // SAFETY: the last reference is gone and the frame is not yet on the
        // free list, so this is the only path touching it.
        unsafe { self.fill(pa, FREE_JUNK) };
        self.free.lock().push(idx);
    }

    /// Records an additional owner of an allocated frame.
    ///
    /// Unlike [`free`](Self::free), an invalid address is reported rather
    /// than fatal.
    pub fn add_ref(&self, pa: PhysAddr) -> Result<(), FrameError> {
        let idx = self.frame_index(pa)?;

        let _refs = self.refs.lock();
        let count = self.counts[idx].load(Ordering::Relaxed);
        if count == 0 {
            return Err(FrameError::NotAllocated(pa));
        }
        self.counts[idx].store(count + 1, Ordering::Relaxed);
        Ok(())
    }

    /// Reference count of the frame containing `pa`; 0 outside the pool.
    ///
    /// Not synchronized with concurrent `alloc`/`free`/`add_ref`; use for
    /// diagnostics only.
    #[allow(clippy::cast_possible_truncation)]
    pub fn ref_count(&self, pa: PhysAddr) -> u32 {
        if pa < self.base || pa >= self.end {
            return 0;
        }
        let idx = (pa.frame_number() - self.base.frame_number()) as usize;
        self.counts[idx].load(Ordering::Relaxed)
    }
}

impl<M> FrameAllocator<M> {
    /// Number of frames currently on the free list.
    pub fn free_frames(&self) -> usize {
        self.free.lock().len
    }

    /// Bytes of free physical memory.
    pub fn free_memory(&self) -> u64 {
        self.free_frames() as u64 * PAGE_SIZE
    }

    /// Number of frames managed by the allocator.
    pub fn total_frames(&self) -> usize {
        self.counts.len()
    }

    /// The managed range `[start, end)` after page rounding.
    pub const fn range(&self) -> (PhysAddr, PhysAddr) {
        (self.base, self.end)
    }

    pub fn lock_stats(&self) -> [LockStats; 2] {
        [self.free.stats(), self.refs.stats()]
    }

    #[allow(clippy::cast_possible_truncation)]
    fn frame_index(&self, pa: PhysAddr) -> Result<usize, FrameError> {
        if !pa.is_page_aligned() {
            return Err(FrameError::Misaligned(pa));
        }
        if pa < self.base || pa >= self.end {
            return Err(FrameError::OutOfRange(pa));
        }
        Ok((pa.frame_number() - self.base.frame_number()) as usize)
    }

    fn frame_addr(&self, idx: usize) -> PhysAddr {
        self.base + ((idx as u64) << PAGE_SHIFT)
    }
}

impl<M: PhysMapper> FrameAllocator<M> {
    /// # Safety
    /// The caller must be the frame's only user for the duration of the call.
    unsafe fn fill(&self, pa: PhysAddr, junk: u8) {
        // SAFETY: forwarded from the caller; the frame lies inside the mapped range.
        let page: &mut [u8; PAGE_BYTES] = unsafe { self.mapper.phys_to_mut(pa) };
        page.fill(junk);
    }
}
