//! Capacity changes for an existing region
//!
//! Only runs while the opener holds the file exclusively, so no peer can see
//! the region between draining the old layout and writing the new one.

use super::layout::{block_offset, HeaderSnapshot};
use crate::errors::{CacheError, Result};

/// Unread bytes carried from the old layout into the new one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    pub from_capacity: u64,
    pub to_capacity: u64,
    pub carried: Vec<u8>,
}

impl MigrationPlan {
    /// Drain the active block of a validated old layout and check the bytes
    /// fit the new one
    pub fn prepare(header: &HeaderSnapshot, region: &[u8], to_capacity: u64) -> Result<Self> {
        let carried = drain_active(header, region);

        // one byte of the new block stays reserved
        if carried.len() as u64 > to_capacity.saturating_sub(1) {
            return Err(CacheError::capacity_too_small(carried.len(), to_capacity));
        }

        Ok(Self {
            from_capacity: header.block_capacity,
            to_capacity,
            carried,
        })
    }

    pub fn is_shrinking(&self) -> bool {
        self.to_capacity < self.from_capacity
    }
}

/// Copy the unread bytes of the active block under the header's capacity
pub fn drain_active(header: &HeaderSnapshot, region: &[u8]) -> Vec<u8> {
    let capacity = header.block_capacity as usize;
    let block = header.active_block();
    let (read, write) = header.cursors[block];
    let (read, write) = (read as usize, write as usize);
    let base = block_offset(block, capacity);
    let data = &region[base..base + capacity];

    if read <= write {
        data[read..write].to_vec()
    } else {
        let mut bytes = Vec::with_capacity(header.active_len());
        bytes.extend_from_slice(&data[read..]);
        bytes.extend_from_slice(&data[..write]);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::layout::file_len;

    fn region_with(active: i32, capacity: u64, cursors: [(i32, i32); 2], fill: &[(usize, &[u8])]) -> (HeaderSnapshot, Vec<u8>) {
        let mut bytes = vec![0u8; file_len(capacity) as usize];
        for (offset, content) in fill {
            bytes[*offset..*offset + content.len()].copy_from_slice(content);
        }
        let header = HeaderSnapshot {
            active_word: active,
            block_capacity: capacity,
            cursors,
        };
        (header, bytes)
    }

    #[test]
    fn test_drain_contiguous_block_one() {
        let capacity = 16u64;
        let base = block_offset(1, capacity as usize);
        let (header, bytes) = region_with(1, capacity, [(0, 0), (2, 6)], &[(base, b"xxdata")]);
        assert_eq!(drain_active(&header, &bytes), b"data");
    }

    #[test]
    fn test_drain_follows_flip_counter_parity() {
        let capacity = 16u64;
        let base = block_offset(1, capacity as usize);
        let (header, bytes) = region_with(3, capacity, [(0, 4), (0, 3)], &[(base, b"one")]);
        assert_eq!(drain_active(&header, &bytes), b"one");
    }

    #[test]
    fn test_drain_wrapped_block_zero() {
        let capacity = 8u64;
        let base = block_offset(0, capacity as usize);
        let (header, bytes) = region_with(0, capacity, [(6, 2), (0, 0)], &[(base, b"CDxxxxAB")]);
        assert_eq!(drain_active(&header, &bytes), b"ABCD");
    }

    #[test]
    fn test_prepare_rejects_data_that_does_not_fit() {
        let capacity = 16u64;
        let base = block_offset(0, capacity as usize);
        let (header, bytes) = region_with(0, capacity, [(0, 10), (0, 0)], &[(base, b"0123456789")]);

        match MigrationPlan::prepare(&header, &bytes, 10) {
            Err(CacheError::CapacityTooSmallForExistingData {
                existing_bytes: 10,
                requested_capacity: 10,
                ..
            }) => {}
            other => panic!("expected CapacityTooSmallForExistingData, got {other:?}"),
        }

        let plan = MigrationPlan::prepare(&header, &bytes, 11).unwrap();
        assert!(plan.is_shrinking());
        assert_eq!(plan.carried, b"0123456789");
    }
}
