//! # Kernel Block Buffer Cache
//!
//! A fixed pool of in-memory copies of disk blocks, shared by every thread
//! doing file-system I/O. The cache guarantees that a block has at most one
//! buffer, hands that buffer to one thread at a time, and recycles the least
//! recently released idle buffer when a block that is not cached is needed.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              BufferCache                            │
//! │    • get / read / write / release / pin / unpin     │
//! │    • eviction lock: serializes misses               │
//! └───────┬──────────────────────────────────┬──────────┘
//!         │ (dev + blockno) % buckets        │ slot index
//! ┌───────▼───────────────────┐   ┌──────────▼──────────┐
//! │  Buckets (spin locks)     │   │  Slots              │
//! │  • identity, refcnt,      │──▶│  • valid flag       │
//! │    last release stamp     │   │  • block bytes      │
//! └───────────────────────────┘   │    (sleep lock)     │
//!                                 └──────────┬──────────┘
//!                                            │ read_block / write_block
//!                                 ┌──────────▼──────────┐
//!                                 │  BlockDevice        │
//!                                 └─────────────────────┘
//! ```
//!
//! ## Locking
//!
//! * **Bucket locks** guard which block each buffer caches, its reference
//!   count and its release stamp. A hit takes only the block's own bucket.
//! * **The eviction lock** is held across a whole miss, so two misses on the
//!   same block cannot both install it. Under it the home bucket is searched
//!   again before any buffer is recycled.
//! * **Content locks** are sleep locks: a thread waiting for a busy buffer
//!   yields the processor through its [`Park`](kernel_sync::Park)
//!   implementation instead of spinning.
//!
//! ## Misuse
//!
//! Writing or releasing a buffer from a thread that does not hold it, unpinning
//! a buffer with no pin, and needing a buffer when all are referenced are
//! kernel bugs and panic with the operation's name (`bwrite`, `brelse`,
//! `bunpin`, `bget`).
//!
//! ## Usage
//!
//! ```rust
//! use kernel_bio::{BcacheConfig, BufferCache, RamDisk};
//! use kernel_info::param::ROOTDEV;
//! use kernel_sync::ThreadParker;
//!
//! let cache = BufferCache::new(BcacheConfig::default(), RamDisk::new(64), ThreadParker).unwrap();
//!
//! let mut buf = cache.read(ROOTDEV, 7);
//! buf[0] = 0xAB;
//! cache.write(&buf);
//! cache.release(buf);
//!
//! assert_eq!(cache.device().block(7)[0], 0xAB);
//! assert_eq!(cache.read(ROOTDEV, 7)[0], 0xAB); // served from the cache
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod block;
mod buf;
mod bucket;
mod cache;
pub mod clock;
mod config;
mod device;
mod error;
pub mod ramdisk;

pub use block::{BlockData, BlockId};
pub use buf::Buf;
pub use cache::{BufferCache, CacheStats};
pub use clock::{LogicalClock, LruClock, Ticks};
pub use config::BcacheConfig;
pub use device::BlockDevice;
pub use error::ConfigError;
pub use ramdisk::RamDisk;
