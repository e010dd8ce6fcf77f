use crate::{BlockData, BlockId};
use alloc::sync::Arc;

/// Synchronous one-block I/O, as provided by the disk driver.
///
/// Both calls return only once the transfer has completed; the calling
/// thread may sleep inside the driver while waiting for the interrupt.
pub trait BlockDevice {
    /// Fills `buf` with the on-disk content of block `id`.
    fn read_block(&self, id: BlockId, buf: &mut BlockData);

    /// Writes `buf` to block `id`.
    fn write_block(&self, id: BlockId, buf: &BlockData);
}

impl<T: BlockDevice + ?Sized> BlockDevice for &T {
    fn read_block(&self, id: BlockId, buf: &mut BlockData) {
        (**self).read_block(id, buf);
    }

    fn write_block(&self, id: BlockId, buf: &BlockData) {
        (**self).write_block(id, buf);
    }
}

impl<T: BlockDevice + ?Sized> BlockDevice for Arc<T> {
    fn read_block(&self, id: BlockId, buf: &mut BlockData) {
        (**self).read_block(id, buf);
    }

    fn write_block(&self, id: BlockId, buf: &BlockData) {
        (**self).write_block(id, buf);
    }
}
