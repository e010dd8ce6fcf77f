//! # Kernel Physical Page Allocation
//!
//! This crate owns the pool of physical page frames that backs page tables,
//! kernel stacks, pipe buffers and user memory. Frames are reference counted
//! so that a single frame can be shared between address spaces, which is
//! what copy-on-write `fork` relies on.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Frame Allocator                        │
//! │    • alloc / free / add_ref / ref_count             │
//! │    • free list of frame indices  (lock "kmem")      │
//! │    • per-frame reference counts  (lock "ref")       │
//! └─────────────────┬───────────────────────────────────┘
//!                   │ scrub on alloc and on last free
//! ┌─────────────────▼───────────────────────────────────┐
//! │              Physical Mapper                        │
//! │    • physical address → writable reference          │
//! │    • identity map, HHDM, or test arena              │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Components
//!
//! ### Frame Allocator ([`FrameAllocator`])
//!
//! * **Boot seeding**: every whole page between the end of the kernel image
//!   and the top of RAM is scrubbed and pushed onto the free list
//! * **Reference counting**: a frame returns to the free list exactly when its
//!   count drops to zero, never earlier and never twice
//! * **Junk filling**: frames are filled with [`ALLOC_JUNK`] when handed out and
//!   with [`FREE_JUNK`] when returned, so stale or uninitialized reads show up
//! * **Exhaustion**: reported as `None`, never fatal
//!
//! ### Physical Mapper ([`phys_mapper`])
//!
//! Converts physical addresses into references the kernel can write through.
//!
//! ## Error Policy
//!
//! Passing [`FrameAllocator::free`] an address that is misaligned or outside
//! the pool, or that is already free, panics: it means kernel bookkeeping is
//! corrupt. The same address passed to [`FrameAllocator::add_ref`] yields a
//! [`FrameError`], since callers sharing pages can check and back out.
//!
//! ## Usage
//!
//! ```rust
//! use kernel_alloc::{DirectMapper, FrameAllocator, FrameRange, PhysAddr};
//!
//! const FRAMES: usize = 4;
//! let mut arena = vec![0u8; FRAMES * 4096];
//! let start = PhysAddr::new(0x8000_0000);
//! let range = FrameRange { kernel_end: start, phys_top: start + (FRAMES as u64 * 4096) };
//! let mapper = DirectMapper::for_region(start, arena.as_mut_ptr());
//!
//! // SAFETY: the arena outlives the allocator and is used by nothing else.
//! let frames = unsafe { FrameAllocator::new(range, mapper) }.unwrap();
//! let pa = frames.alloc().unwrap();
//! frames.add_ref(pa).unwrap(); // shared by a second address space
//! frames.free(pa);
//! assert_eq!(frames.ref_count(pa), 1);
//! frames.free(pa);
//! assert_eq!(frames.free_frames(), FRAMES);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod error;
pub mod frame_alloc;
mod phys_addr;
pub mod phys_mapper;

pub use error::FrameError;
pub use frame_alloc::{ALLOC_JUNK, FREE_JUNK, FrameAllocator, FrameRange};
pub use phys_addr::PhysAddr;
pub use phys_mapper::{DirectMapper, PhysMapper};
