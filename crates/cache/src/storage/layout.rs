//! Byte layout of a shared region file
//!
//! ```text
//! offset 0                 i32  flip counter; its parity is the active block
//! offset 4                 u64  block capacity (unaligned)
//! offset 12                i32  block 0 read index, i32 block 0 write index
//! offset 20                i32  block 1 read index, i32 block 1 write index
//! offset 28                block 0 bytes
//! offset 28 + capacity     block 1 bytes
//! ```
//!
//! Header words are stored in the host's native byte order so that the
//! cursor and active-index words can be used in place as atomics, and so that
//! files written by earlier producers on the same host stay readable. Frames
//! stored inside the blocks are big-endian regardless.
//!
//! Every rewrite adds one to the flip counter, so a reader can tell that the
//! active block changed even when two rewrites brought it back to the same
//! block. Files written by producers that toggle the word between 0 and 1
//! read the same way.

use crate::errors::{CacheError, Result};
use std::path::Path;
use std::sync::atomic::{AtomicI32, Ordering};

/// Size of the region header in bytes
pub const HEADER_SIZE: usize = 28;

/// Number of ring blocks in a region
pub const BLOCK_COUNT: usize = 2;

pub const ACTIVE_INDEX_OFFSET: usize = 0;
pub const CAPACITY_OFFSET: usize = 4;
pub const CURSORS_OFFSET: usize = 12;

/// Smallest usable block: one data byte plus the reserved byte
pub const MIN_BLOCK_CAPACITY: u64 = 2;

/// Cursors are `i32`, so a block cannot address more than this
pub const MAX_BLOCK_CAPACITY: u64 = i32::MAX as u64;

/// Read/write cursor pair of one block, as laid out in the header
#[repr(C)]
#[derive(Debug, Default)]
pub struct Cursors {
    read: AtomicI32,
    write: AtomicI32,
}

const _: () = assert!(std::mem::size_of::<Cursors>() == 8);
const _: () = assert!(CURSORS_OFFSET + BLOCK_COUNT * std::mem::size_of::<Cursors>() == HEADER_SIZE);

impl Cursors {
    pub const fn new() -> Self {
        Self {
            read: AtomicI32::new(0),
            write: AtomicI32::new(0),
        }
    }

    /// Read cursor, folded into `[0, capacity)`
    pub fn read_index(&self, capacity: usize) -> usize {
        fold(self.read.load(Ordering::Acquire), capacity)
    }

    /// Write cursor, folded into `[0, capacity)`
    pub fn write_index(&self, capacity: usize) -> usize {
        fold(self.write.load(Ordering::Acquire), capacity)
    }

    pub(crate) fn publish_read(&self, index: usize) {
        self.read.store(index as i32, Ordering::Release);
    }

    pub(crate) fn publish_write(&self, index: usize) {
        self.write.store(index as i32, Ordering::Release);
    }

    /// Move the read cursor from `from` to `to`, unless it moved meanwhile
    pub(crate) fn advance_read(&self, from: usize, to: usize) -> bool {
        self.read
            .compare_exchange(from as i32, to as i32, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Raw cursor values, for header validation
    pub fn raw(&self) -> (i32, i32) {
        (
            self.read.load(Ordering::Acquire),
            self.write.load(Ordering::Acquire),
        )
    }
}

/// A cursor written by a peer is only trusted up to the block bounds
fn fold(raw: i32, capacity: usize) -> usize {
    if capacity == 0 {
        return 0;
    }
    (raw as i64).rem_euclid(capacity as i64) as usize
}

/// Block selected by a flip counter value
pub const fn block_of(active_word: i32) -> usize {
    (active_word & 1) as usize
}

/// Total file length for a given block capacity
pub const fn file_len(block_capacity: u64) -> u64 {
    HEADER_SIZE as u64 + BLOCK_COUNT as u64 * block_capacity
}

/// Offset of a block's cursor pair
pub const fn cursors_offset(block: usize) -> usize {
    CURSORS_OFFSET + block * std::mem::size_of::<Cursors>()
}

/// Offset of a block's first data byte
pub const fn block_offset(block: usize, block_capacity: usize) -> usize {
    HEADER_SIZE + block * block_capacity
}

/// Reject capacities the header or the reserved byte cannot represent
pub fn validate_capacity(block_capacity: u64) -> Result<usize> {
    if !(MIN_BLOCK_CAPACITY..=MAX_BLOCK_CAPACITY).contains(&block_capacity) {
        return Err(CacheError::invalid_capacity(
            block_capacity,
            MIN_BLOCK_CAPACITY,
            MAX_BLOCK_CAPACITY,
        ));
    }
    usize::try_from(block_capacity).map_err(|_| {
        CacheError::invalid_capacity(block_capacity, MIN_BLOCK_CAPACITY, usize::MAX as u64)
    })
}

/// Plain copy of the header fields, decoded from raw bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSnapshot {
    /// Flip counter; see [`block_of`]
    pub active_word: i32,
    pub block_capacity: u64,
    pub cursors: [(i32, i32); BLOCK_COUNT],
}

impl HeaderSnapshot {
    /// Decode the first [`HEADER_SIZE`] bytes of a region
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let header = bytes.get(..HEADER_SIZE)?;
        let i32_at = |offset: usize| {
            let mut word = [0u8; 4];
            word.copy_from_slice(&header[offset..offset + 4]);
            i32::from_ne_bytes(word)
        };
        let mut capacity = [0u8; 8];
        capacity.copy_from_slice(&header[CAPACITY_OFFSET..CAPACITY_OFFSET + 8]);

        let cursor = |block: usize| {
            let offset = cursors_offset(block);
            (i32_at(offset), i32_at(offset + 4))
        };

        Some(Self {
            active_word: i32_at(ACTIVE_INDEX_OFFSET),
            block_capacity: u64::from_ne_bytes(capacity),
            cursors: [cursor(0), cursor(1)],
        })
    }

    /// A zeroed header belongs to a file nobody has initialised yet
    pub fn is_uninitialised(&self) -> bool {
        self.block_capacity == 0
    }

    pub fn active_block(&self) -> usize {
        block_of(self.active_word)
    }

    /// Whether the file was left at the length of another two-block layout
    /// that is larger than the stored one
    ///
    /// A resize sets the length while the smaller layout's header is the
    /// last one written, so the stored layout is still intact at the start
    /// of the file and the resize can be completed.
    pub fn resize_pending(&self, actual_file_len: u64) -> bool {
        let expected = file_len(self.block_capacity);
        actual_file_len > expected && (actual_file_len - HEADER_SIZE as u64) % 2 == 0
    }

    /// Check the header against the file it came from
    pub fn validate(&self, path: &Path, actual_file_len: u64) -> Result<()> {
        if !(MIN_BLOCK_CAPACITY..=MAX_BLOCK_CAPACITY).contains(&self.block_capacity) {
            return Err(CacheError::corruption(
                path,
                format!("stored block capacity {} is out of range", self.block_capacity),
            ));
        }

        let expected_len = file_len(self.block_capacity);
        if actual_file_len != expected_len && !self.resize_pending(actual_file_len) {
            return Err(CacheError::corruption(
                path,
                format!(
                    "file is {actual_file_len} bytes but a block capacity of {} needs {expected_len}",
                    self.block_capacity
                ),
            ));
        }

        let capacity = self.block_capacity as i64;
        for (block, (read, write)) in self.cursors.iter().enumerate() {
            let in_range = |cursor: i32| (0..capacity).contains(&(cursor as i64));
            if !in_range(*read) || !in_range(*write) {
                return Err(CacheError::corruption(
                    path,
                    format!("block {block} cursors ({read}, {write}) exceed capacity {capacity}"),
                ));
            }
        }

        Ok(())
    }

    /// Unread bytes of the active block, assuming a validated header
    pub fn active_len(&self) -> usize {
        let (read, write) = self.cursors[self.active_block()];
        let capacity = self.block_capacity as i64;
        (write as i64 - read as i64).rem_euclid(capacity) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(active: i32, capacity: u64, cursors: [(i32, i32); 2]) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_SIZE);
        bytes.extend_from_slice(&active.to_ne_bytes());
        bytes.extend_from_slice(&capacity.to_ne_bytes());
        for (read, write) in cursors {
            bytes.extend_from_slice(&read.to_ne_bytes());
            bytes.extend_from_slice(&write.to_ne_bytes());
        }
        bytes
    }

    #[test]
    fn test_offsets_match_file_format() {
        assert_eq!(file_len(64), 28 + 128);
        assert_eq!(cursors_offset(0), 12);
        assert_eq!(cursors_offset(1), 20);
        assert_eq!(block_offset(0, 64), 28);
        assert_eq!(block_offset(1, 64), 92);
    }

    #[test]
    fn test_parse_reads_native_order_fields() {
        let bytes = header_bytes(1, 64, [(3, 9), (10, 2)]);
        let header = HeaderSnapshot::parse(&bytes).unwrap();
        assert_eq!(header.active_block(), 1);
        assert_eq!(header.block_capacity, 64);
        assert_eq!(header.cursors, [(3, 9), (10, 2)]);
        assert_eq!(header.active_len(), 56);
        assert!(header.validate(Path::new("r"), file_len(64)).is_ok());
    }

    #[test]
    fn test_parse_needs_full_header() {
        assert!(HeaderSnapshot::parse(&[0u8; HEADER_SIZE - 1]).is_none());
        assert!(HeaderSnapshot::parse(&[0u8; HEADER_SIZE])
            .unwrap()
            .is_uninitialised());
    }

    #[test]
    fn test_validate_rejects_bad_headers() {
        let path = Path::new("region");
        let bad_len = HeaderSnapshot::parse(&header_bytes(0, 64, [(0, 0); 2])).unwrap();
        assert!(bad_len.validate(path, file_len(32)).unwrap_err().is_corruption());
        assert!(bad_len.validate(path, file_len(64) + 1).is_err());

        let bad_cursor = HeaderSnapshot::parse(&header_bytes(0, 64, [(0, 64), (0, 0)])).unwrap();
        assert!(bad_cursor.validate(path, file_len(64)).is_err());

        let negative = HeaderSnapshot::parse(&header_bytes(0, 64, [(0, 0), (-1, 0)])).unwrap();
        assert!(negative.validate(path, file_len(64)).is_err());
    }

    #[test]
    fn test_flip_counter_parity_selects_block() {
        assert_eq!(block_of(0), 0);
        assert_eq!(block_of(1), 1);
        assert_eq!(block_of(6), 0);
        assert_eq!(block_of(-1), 1);
        assert_eq!(block_of(i32::MIN), 0);
        assert_eq!(block_of(i32::MAX), 1);

        let header = HeaderSnapshot::parse(&header_bytes(7, 64, [(0, 0); 2])).unwrap();
        assert_eq!(header.active_block(), 1);
        assert!(header.validate(Path::new("r"), file_len(64)).is_ok());
    }

    #[test]
    fn test_longer_file_of_a_larger_layout_is_a_pending_resize() {
        let header = HeaderSnapshot::parse(&header_bytes(0, 32, [(0, 0); 2])).unwrap();
        assert!(!header.resize_pending(file_len(32)));
        assert!(header.resize_pending(file_len(128)));
        assert!(!header.resize_pending(file_len(32) + 3));
        assert!(header.validate(Path::new("r"), file_len(128)).is_ok());
    }

    #[test]
    fn test_read_cursor_only_advances_from_expected_position() {
        let cursors = Cursors::new();
        assert!(cursors.advance_read(0, 5));
        assert!(!cursors.advance_read(0, 9));
        assert_eq!(cursors.read_index(64), 5);
    }

    #[test]
    fn test_capacity_bounds() {
        assert!(validate_capacity(0).is_err());
        assert!(validate_capacity(1).is_err());
        assert_eq!(validate_capacity(2).unwrap(), 2);
        assert!(validate_capacity(MAX_BLOCK_CAPACITY + 1).is_err());
    }

    #[test]
    fn test_cursor_fold_keeps_indices_in_bounds() {
        let cursors = Cursors::new();
        cursors.publish_write(70);
        assert_eq!(cursors.write_index(64), 6);
        assert_eq!(cursors.read_index(0), 0);
    }
}
