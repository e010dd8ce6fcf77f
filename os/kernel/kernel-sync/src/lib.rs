//! # Kernel synchronization primitives
//!
//! * [`SpinLock`]: short critical sections over metadata; never held while sleeping.
//! * [`SleepLock`]: long-term exclusive ownership that parks waiters through [`Park`].
//! * [`ThreadParker`] (feature `std`): a [`Park`] backed by OS threads for hosted use.

#![cfg_attr(not(any(test, doctest, feature = "std")), no_std)]
#![allow(unsafe_code)]

mod park;
mod sleep_lock;
mod spin_lock;
#[cfg(feature = "std")]
mod thread_park;

pub use park::{HolderId, Park};
pub use sleep_lock::{SleepLock, SleepLockGuard};
pub use spin_lock::{LockStats, SpinLock, SpinLockGuard};
#[cfg(feature = "std")]
pub use thread_park::ThreadParker;
