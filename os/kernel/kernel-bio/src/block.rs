use core::fmt;
use kernel_info::param::BSIZE;

/// Payload of one cached disk block.
pub type BlockData = [u8; BSIZE];

/// Identity of a disk block: which device, and which block on it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockId {
    pub dev: u32,
    pub blockno: u32,
}

impl BlockId {
    #[must_use]
    pub const fn new(dev: u32, blockno: u32) -> Self {
        Self { dev, blockno }
    }

    /// Hash bucket holding this block among `buckets` shards.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn bucket(self, buckets: usize) -> usize {
        ((self.dev as u64 + self.blockno as u64) % buckets as u64) as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dev, self.blockno)
    }
}
