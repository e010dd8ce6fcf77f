use core::fmt;
use core::ops::Add;
use kernel_info::memory::{PAGE_SHIFT, PAGE_SIZE, page_round_down, page_round_up};

/// Physical memory address.
///
/// A thin wrapper around `u64` that denotes a **physical** address, keeping
/// page frames from being mixed up with kernel pointers or plain integers.
///
/// ### Examples
/// ```rust
/// # use kernel_alloc::PhysAddr;
/// let pa = PhysAddr::new(0x8000_1234);
/// assert_eq!(pa.page_round_down().as_u64(), 0x8000_1000);
/// assert_eq!(pa.page_round_up().as_u64(), 0x8000_2000);
/// assert!(!pa.is_page_aligned());
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysAddr(u64);

impl PhysAddr {
    #[inline]
    #[must_use]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_page_aligned(self) -> bool {
        self.0 & (PAGE_SIZE - 1) == 0
    }

    #[inline]
    #[must_use]
    pub const fn page_round_up(self) -> Self {
        Self(page_round_up(self.0))
    }

    #[inline]
    #[must_use]
    pub const fn page_round_down(self) -> Self {
        Self(page_round_down(self.0))
    }

    /// Global frame number (`pa / PAGE_SIZE`).
    #[inline]
    #[must_use]
    pub const fn frame_number(self) -> u64 {
        self.0 >> PAGE_SHIFT
    }
}

impl fmt::Debug for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PA(0x{:016X})", self.0)
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

impl From<u64> for PhysAddr {
    #[inline]
    fn from(v: u64) -> Self {
        Self::new(v)
    }
}

impl From<PhysAddr> for u64 {
    #[inline]
    fn from(pa: PhysAddr) -> Self {
        pa.0
    }
}

impl Add<u64> for PhysAddr {
    type Output = Self;
    #[inline]
    fn add(self, rhs: u64) -> Self::Output {
        Self(self.0 + rhs)
    }
}
