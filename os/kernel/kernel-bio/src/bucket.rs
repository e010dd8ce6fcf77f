//! Hash shards of the buffer cache.
//!
//! Each bucket owns the bookkeeping of the buffers whose block hashes to it.
//! An [`Entry`] moves between buckets when its buffer is recycled for a block
//! hashing elsewhere; its content slot never moves.

use crate::BlockId;
use alloc::vec::Vec;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Index of the content slot this entry describes.
    pub slot: usize,
    /// Cached block, or `None` for a buffer that never held one.
    pub id: Option<BlockId>,
    /// Outstanding handles plus pins.
    pub refcnt: u32,
    /// Clock reading at the last release to zero references.
    pub last_release: u64,
}

impl Entry {
    pub const fn unassigned(slot: usize) -> Self {
        Self {
            slot,
            id: None,
            refcnt: 0,
            last_release: 0,
        }
    }

    /// Repurposes the buffer for `id` on behalf of one new holder.
    pub fn assign(&mut self, id: BlockId) {
        debug_assert_eq!(self.refcnt, 0);
        self.id = Some(id);
        self.refcnt = 1;
    }
}

#[derive(Debug, Default)]
pub struct Bucket {
    entries: Vec<Entry>,
}

impl Bucket {
    /// An empty bucket able to hold `capacity` entries without reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn find(&self, id: BlockId) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == Some(id))
    }

    pub fn find_mut(&mut self, id: BlockId) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.id == Some(id))
    }

    pub fn by_slot_mut(&mut self, slot: usize) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.slot == slot)
    }

    /// Takes a reference on the buffer caching `id`, if any, and returns its slot.
    pub fn acquire(&mut self, id: BlockId) -> Option<usize> {
        let entry = self.find_mut(id)?;
        entry.refcnt += 1;
        Some(entry.slot)
    }

    /// Position and stamp of the least recently released unreferenced entry.
    /// Ties go to the entry scanned first.
    pub fn least_recent_idle(&self) -> Option<(usize, u64)> {
        let mut best: Option<(usize, u64)> = None;
        for (pos, entry) in self.entries.iter().enumerate() {
            if entry.refcnt != 0 {
                continue;
            }
            if best.is_none_or(|(_, stamp)| entry.last_release < stamp) {
                best = Some((pos, entry.last_release));
            }
        }
        best
    }

    pub fn remove(&mut self, pos: usize) -> Entry {
        self.entries.swap_remove(pos)
    }

    pub fn insert(&mut self, entry: Entry) {
        self.entries.push(entry);
    }
}
