//! # Kernel Configuration
//!
//! Compile-time parameters shared by the kernel's resource managers. Every
//! subsystem that sizes a fixed pool (the buffer cache, the page allocator)
//! reads its limits from here so the numbers cannot drift between crates.
//!
//! ## Modules
//!
//! ### Tunables ([`param`])
//! * **Buffer cache sizing**: number of buffer slots and hash buckets
//! * **Block geometry**: size of one disk block in bytes
//! * **Devices**: the root disk's device number
//!
//! ### Physical Memory Layout ([`memory`])
//! * **Page geometry**: page size and shift
//! * **RAM bounds**: where physical RAM starts and where allocatable RAM ends
//! * **Rounding helpers**: page round-up/round-down used to trim the allocatable range
//!
//! ## Physical Memory Layout
//!
//! ```text
//! KERNBASE      ┌─────────────────────────────────┐ 0x8000_0000
//!               │       Kernel Text & Data        │
//! end           ├─────────────────────────────────┤ (linker symbol)
//!               │     Allocatable page frames     │
//!               │   (managed by the frame pool)   │
//! PHYSTOP       └─────────────────────────────────┘ KERNBASE + 128 MiB
//! ```
//!
//! The end of the kernel image is only known to the linker, so it is handed
//! to the page allocator at boot instead of being a constant here.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod memory;
pub mod param;
