//! # Access to physical frames
//!
//! The allocator never owns a pointer to the frames it hands out; it only
//! knows their physical addresses. Scrubbing a frame therefore needs a way to
//! "see" a physical address from the current address space, and that
//! strategy differs between environments:
//!
//! - On RISC-V the kernel runs with RAM identity-mapped, so `va == pa`.
//! - With a higher-half direct map, every frame is visible at `HHDM_BASE + pa`.
//! - Hosted tests back the "physical" range with an ordinary heap buffer.
//!
//! All three are a constant displacement, which is what [`DirectMapper`] models.
//!
//! ## Example
//! ```rust
//! use kernel_alloc::{DirectMapper, PhysAddr, PhysMapper};
//!
//! let mut frame = [0u8; 4096];
//! let pa = PhysAddr::new(0x8000_0000);
//! let mapper = DirectMapper::for_region(pa, frame.as_mut_ptr());
//! unsafe {
//!     let bytes: &mut [u8; 4096] = mapper.phys_to_mut(pa);
//!     bytes.fill(5);
//! }
//! assert!(frame.iter().all(|&b| b == 5));
//! ```

use crate::PhysAddr;

/// Converts a physical address into a usable reference.
pub trait PhysMapper {
    /// # Safety
    /// - `pa` must be mapped and valid for reads and writes of `T`.
    /// - The caller must guarantee that no other reference to the same
    ///   memory is alive for `'a`.
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysAddr) -> &'a mut T;
}

/// [`PhysMapper`] for any mapping where every frame sits at a fixed offset
/// from its physical address.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DirectMapper {
    offset: u64,
}

impl DirectMapper {
    /// Physical memory is identity-mapped (`va == pa`).
    pub const IDENTITY: Self = Self::with_offset(0);

    /// Physical memory is visible at `pa + offset`, e.g. a higher-half direct map.
    #[must_use]
    pub const fn with_offset(offset: u64) -> Self {
        Self { offset }
    }

    /// Maps the physical range starting at `phys_base` onto memory starting at `virt_base`.
    #[must_use]
    pub fn for_region(phys_base: PhysAddr, virt_base: *mut u8) -> Self {
        let virt = virt_base.expose_provenance() as u64;
        Self::with_offset(virt.wrapping_sub(phys_base.as_u64()))
    }
}

impl PhysMapper for DirectMapper {
    #[allow(clippy::cast_possible_truncation)]
    unsafe fn phys_to_mut<'a, T>(&self, pa: PhysAddr) -> &'a mut T {
        let va = pa.as_u64().wrapping_add(self.offset) as usize;
        let ptr = core::ptr::with_exposed_provenance_mut::<T>(va);
        // SAFETY: Caller guarantees the address is mapped and exclusively theirs.
        unsafe { &mut *ptr }
    }
}
