use crate::PhysAddr;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("physical address {0} is not page-aligned")]
    Misaligned(PhysAddr),
    #[error("physical address {0} is outside the allocatable range")]
    OutOfRange(PhysAddr),
    #[error("frame {0} is not allocated")]
    NotAllocated(PhysAddr),
    #[error("no allocatable frames between {0} and {1}")]
    EmptyRange(PhysAddr, PhysAddr),
}
