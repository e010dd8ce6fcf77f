//! # RAM disk
//!
//! A [`BlockDevice`] kept entirely in memory, for boots without a disk
//! controller and for exercising the cache. Device numbers are ignored: the
//! RAM disk is a single flat array of blocks.

use crate::{BlockData, BlockDevice, BlockId};
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};
use kernel_info::param::BSIZE;
use kernel_sync::SpinLock;

pub struct RamDisk {
    blocks: SpinLock<Vec<BlockData>>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl RamDisk {
    /// A zero-filled disk of `nblocks` blocks.
    #[must_use]
    pub fn new(nblocks: usize) -> Self {
        Self {
            blocks: SpinLock::named("ramdisk", vec![[0; BSIZE]; nblocks]),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of block `blockno` as currently stored.
    ///
    /// # Panics
    /// If `blockno` is past the end of the disk.
    #[must_use]
    pub fn block(&self, blockno: u32) -> BlockData {
        *Self::slot(&self.blocks.lock(), blockno)
    }

    /// Overwrites block `blockno` behind the cache's back, as another writer
    /// of the medium would.
    ///
    /// # Panics
    /// If `blockno` is past the end of the disk.
    pub fn set_block(&self, blockno: u32, data: &BlockData) {
        let mut blocks = self.blocks.lock();
        let idx = Self::index(&blocks, blockno);
        blocks[idx] = *data;
    }

    /// Completed block reads.
    #[must_use]
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Completed block writes.
    #[must_use]
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn slot(blocks: &[BlockData], blockno: u32) -> &BlockData {
        &blocks[Self::index(blocks, blockno)]
    }

    fn index(blocks: &[BlockData], blockno: u32) -> usize {
        let idx = blockno as usize;
        if idx >= blocks.len() {
            log::error!("ramdisk: block {blockno} past end ({} blocks)", blocks.len());
            panic!("ramdisk: block {blockno} out of range");
        }
        idx
    }
}

impl BlockDevice for RamDisk {
    fn read_block(&self, id: BlockId, buf: &mut BlockData) {
        let blocks = self.blocks.lock();
        buf.copy_from_slice(Self::slot(&blocks, id.blockno));
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    fn write_block(&self, id: BlockId, buf: &BlockData) {
        let mut blocks = self.blocks.lock();
        let idx = Self::index(&blocks, id.blockno);
        blocks[idx].copy_from_slice(buf);
        self.writes.fetch_add(1, Ordering::Relaxed);
    }
}
