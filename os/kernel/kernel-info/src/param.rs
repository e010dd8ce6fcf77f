//! # Tunables

/// Maximum number of blocks any single file system operation writes.
pub const MAXOPBLOCKS: usize = 10;

/// Number of buffer slots in the disk block cache.
pub const NBUF: usize = MAXOPBLOCKS * 3;

/// Number of hash buckets the block cache is sharded into.
///
/// A prime keeps `(dev + blockno) % NBUCKET` spread over sequential block numbers.
pub const NBUCKET: usize = 13;

/// Size of one disk block in bytes.
pub const BSIZE: usize = 1024;

/// Device number of the file system root disk.
pub const ROOTDEV: u32 = 1;

const _: () = {
    assert!(NBUF > 0);
    assert!(NBUCKET > 0);
    assert!(BSIZE.is_power_of_two());
    // A log transaction must be able to pin all of its blocks at once.
    assert!(NBUF >= MAXOPBLOCKS);
};
