use kernel_alloc::{
    ALLOC_JUNK, DirectMapper, FREE_JUNK, FrameAllocator, FrameError, FrameRange, PhysAddr,
};
use kernel_info::memory::{KERNBASE, PAGE_SIZE, PHYSTOP};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

const PAGE: usize = PAGE_SIZE as usize;

/// A frame allocator over a heap buffer standing in for physical RAM.
struct Pool {
    arena: *mut [u8],
    start: PhysAddr,
    frames: FrameAllocator<DirectMapper>,
}

// SAFETY: the arena is only touched through the allocator (which is Sync)
// and through `bytes`, which tests call on frames they own.
unsafe impl Send for Pool {}
unsafe impl Sync for Pool {}

impl Pool {
    /// `frames` pages placed after a kernel image ending mid-page.
    fn new(frames: usize) -> Self {
        let kernel_end = PhysAddr::new(KERNBASE + 0x1234);
        let start = kernel_end.page_round_up();
        let arena = Box::into_raw(vec![0u8; frames * PAGE].into_boxed_slice());
        let mapper = DirectMapper::for_region(start, arena.cast::<u8>());
        let range = FrameRange {
            kernel_end,
            phys_top: start + (frames * PAGE) as u64,
        };
        // SAFETY: the arena lives until Pool is dropped and nothing else uses it.
        let frames = unsafe { FrameAllocator::new(range, mapper) }.expect("valid range");
        Self {
            arena,
            start,
            frames,
        }
    }

    fn bytes(&self, pa: PhysAddr) -> &[u8] {
        let off = (pa.as_u64() - self.start.as_u64()) as usize;
        unsafe { std::slice::from_raw_parts(self.arena.cast::<u8>().add(off), PAGE) }
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        drop(unsafe { Box::from_raw(self.arena) });
    }
}

#[test]
fn boot_seeds_every_whole_page() {
    let pool = Pool::new(8);
    let (start, end) = pool.frames.range();
    assert_eq!(start, pool.start);
    assert!(start.is_page_aligned());
    assert_eq!(end.as_u64() - start.as_u64(), 8 * PAGE_SIZE);
    assert_eq!(end.frame_number() - start.frame_number(), 8);
    assert_eq!(pool.frames.total_frames(), 8);
    assert_eq!(pool.frames.free_frames(), 8);
    assert_eq!(pool.frames.free_memory(), 8 * PAGE_SIZE);
}

#[test]
fn boot_range_runs_up_to_phystop() {
    const FRAMES: usize = 4;
    // kernel image ending mid-page, FRAMES whole pages below the top of RAM
    let kernel_end = PhysAddr::new(PHYSTOP - (FRAMES as u64) * PAGE_SIZE - 0x80);
    let range = FrameRange::up_to_phystop(kernel_end);
    assert_eq!(range.phys_top, PhysAddr::new(PHYSTOP));

    let start = kernel_end.page_round_up();
    let mut ram = vec![0u8; FRAMES * PAGE];
    let mapper = DirectMapper::for_region(start, ram.as_mut_ptr());

    // SAFETY: `ram` outlives the allocator and is used by nothing else.
    let frames = unsafe { FrameAllocator::new(range, mapper) }.expect("frames below PHYSTOP");
    assert_eq!(frames.range(), (start, PhysAddr::new(PHYSTOP)));
    assert_eq!(frames.total_frames(), FRAMES);

    let pa = frames.alloc().unwrap();
    assert!(pa < PhysAddr::new(PHYSTOP));
    frames.free(pa);
    assert_eq!(frames.free_frames(), FRAMES);
}

#[test]
fn empty_range_is_rejected() {
    let kernel_end = PhysAddr::new(KERNBASE + 0x10);
    let range = FrameRange {
        kernel_end,
        phys_top: PhysAddr::new(KERNBASE + PAGE_SIZE + 0x10),
    };
    let err = unsafe { FrameAllocator::new(range, DirectMapper::IDENTITY) }.err();
    assert_eq!(
        err,
        Some(FrameError::EmptyRange(
            PhysAddr::new(KERNBASE + PAGE_SIZE),
            PhysAddr::new(KERNBASE + PAGE_SIZE)
        ))
    );
}

#[test]
fn alloc_sets_refcount_and_fills_junk() {
    let pool = Pool::new(4);
    let pa = pool.frames.alloc().unwrap();
    assert!(pa.is_page_aligned());
    assert_eq!(pool.frames.ref_count(pa), 1);
    assert!(pool.bytes(pa).iter().all(|&b| b == ALLOC_JUNK));
    assert_eq!(pool.frames.free_frames(), 3);
}

#[test]
fn alloc_free_round_trip_reuses_frame() {
    let pool = Pool::new(4);
    let pa = pool.frames.alloc().unwrap();
    pool.frames.free(pa);
    assert_eq!(pool.frames.ref_count(pa), 0);
    assert_eq!(pool.frames.free_frames(), 4);
    assert!(pool.bytes(pa).iter().all(|&b| b == FREE_JUNK));

    // LIFO free list: nothing else was allocated in between
    assert_eq!(pool.frames.alloc(), Some(pa));
}

#[test]
fn shared_frame_survives_until_last_free() {
    let pool = Pool::new(2);
    let pa = pool.frames.alloc().unwrap();
    assert_eq!(pool.frames.ref_count(pa), 1);

    pool.frames.add_ref(pa).unwrap();
    assert_eq!(pool.frames.ref_count(pa), 2);

    pool.frames.free(pa);
    assert_eq!(pool.frames.ref_count(pa), 1);
    assert_eq!(pool.frames.free_frames(), 1, "frame must stay allocated");
    // content untouched while still shared
    assert!(pool.bytes(pa).iter().all(|&b| b == ALLOC_JUNK));

    pool.frames.free(pa);
    assert_eq!(pool.frames.ref_count(pa), 0);
    assert_eq!(pool.frames.free_frames(), 2);
}

#[test]
fn exhaustion_returns_none() {
    let pool = Pool::new(3);
    let got: Vec<_> = (0..3).map(|_| pool.frames.alloc().unwrap()).collect();
    assert_eq!(pool.frames.alloc(), None);
    assert_eq!(pool.frames.free_memory(), 0);

    pool.frames.free(got[1]);
    assert_eq!(pool.frames.alloc(), Some(got[1]));
}

#[test]
fn add_ref_reports_invalid_addresses() {
    let pool = Pool::new(2);
    let pa = pool.frames.alloc().unwrap();

    let misaligned = PhysAddr::new(pa.as_u64() + 8);
    assert_eq!(
        pool.frames.add_ref(misaligned),
        Err(FrameError::Misaligned(misaligned))
    );

    let below = PhysAddr::new(KERNBASE);
    assert_eq!(pool.frames.add_ref(below), Err(FrameError::OutOfRange(below)));

    let (_, end) = pool.frames.range();
    assert_eq!(pool.frames.add_ref(end), Err(FrameError::OutOfRange(end)));

    // the other frame is still free
    let free = pool.frames.alloc().unwrap();
    pool.frames.free(free);
    assert_eq!(pool.frames.add_ref(free), Err(FrameError::NotAllocated(free)));

    // failed calls left the valid frame alone
    assert_eq!(pool.frames.ref_count(pa), 1);
}

#[test]
fn ref_count_outside_pool_is_zero() {
    let pool = Pool::new(1);
    assert_eq!(pool.frames.ref_count(PhysAddr::new(KERNBASE)), 0);
    assert_eq!(pool.frames.ref_count(PhysAddr::new(u64::MAX & !0xfff)), 0);
}

#[test]
#[should_panic(expected = "kfree")]
fn free_misaligned_is_fatal() {
    let pool = Pool::new(1);
    let pa = pool.frames.alloc().unwrap();
    pool.frames.free(PhysAddr::new(pa.as_u64() + 1));
}

#[test]
#[should_panic(expected = "kfree")]
fn free_out_of_range_is_fatal() {
    let pool = Pool::new(1);
    pool.frames.free(PhysAddr::new(KERNBASE));
}

#[test]
#[should_panic(expected = "double free")]
fn double_free_is_fatal() {
    let pool = Pool::new(1);
    let pa = pool.frames.alloc().unwrap();
    pool.frames.free(pa);
    pool.frames.free(pa);
}

#[test]
fn concurrent_allocs_never_hand_out_a_frame_twice() {
    const FRAMES: usize = 64;
    const THREADS: usize = 8;

    let pool = Arc::new(Pool::new(FRAMES));
    let start = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                let mut mine = Vec::new();
                while let Some(pa) = pool.frames.alloc() {
                    mine.push(pa);
                    thread::yield_now();
                }
                mine
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for h in handles {
        for pa in h.join().unwrap() {
            assert!(seen.insert(pa), "{pa} handed out twice");
        }
    }
    assert_eq!(seen.len(), FRAMES);
    assert_eq!(pool.frames.free_frames(), 0);

    for pa in seen {
        pool.frames.free(pa);
    }
    assert_eq!(pool.frames.free_frames(), FRAMES);
}

#[test]
fn concurrent_sharing_frees_exactly_once() {
    const THREADS: usize = 6;

    let pool = Arc::new(Pool::new(4));
    let pa = pool.frames.alloc().unwrap();
    // one reference per thread on top of ours
    for _ in 0..THREADS {
        pool.frames.add_ref(pa).unwrap();
    }

    let start = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                pool.frames.free(pa);
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(pool.frames.ref_count(pa), 1);
    assert_eq!(pool.frames.free_frames(), 3);
    pool.frames.free(pa);
    assert_eq!(pool.frames.free_frames(), 4);
}

#[test]
fn lock_stats_name_both_locks() {
    let pool = Pool::new(2);
    let pa = pool.frames.alloc().unwrap();
    pool.frames.free(pa);
    let [kmem, refs] = pool.frames.lock_stats();
    assert_eq!(kmem.name, "kmem");
    assert_eq!(refs.name, "ref");
    assert!(kmem.acquires >= 2);
    assert!(refs.acquires >= 2);
}
