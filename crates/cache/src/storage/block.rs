//! Circular byte buffer over borrowed memory
//!
//! A block is a view: the cursors live in the region header and the bytes in
//! the mapped file, so the same type works for mapped memory and for plain
//! buffers in tests. Cursors equal means empty; one byte of capacity is kept
//! free so a full block never looks empty.

use super::layout::Cursors;
use crate::errors::{CacheError, Result};

/// Bytes read from a block together with the cursor to release them up to
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockSnapshot {
    pub bytes: Vec<u8>,
    /// Read cursor the bytes start at
    pub start: usize,
    /// Write cursor observed by the read; pass to `release` once consumed
    pub end: usize,
}

/// A ring buffer of `data.len()` bytes driven by a [`Cursors`] pair
pub struct RingBlock<'a, D> {
    cursors: &'a Cursors,
    data: D,
}

impl<'a, D: AsRef<[u8]>> RingBlock<'a, D> {
    pub fn new(cursors: &'a Cursors, data: D) -> Self {
        Self { cursors, data }
    }

    pub fn capacity(&self) -> usize {
        self.data.as_ref().len()
    }

    pub fn read_index(&self) -> usize {
        self.cursors.read_index(self.capacity())
    }

    pub fn write_index(&self) -> usize {
        self.cursors.write_index(self.capacity())
    }

    /// Occupied bytes
    pub fn len(&self) -> usize {
        used(self.read_index(), self.write_index(), self.capacity())
    }

    pub fn is_empty(&self) -> bool {
        self.read_index() == self.write_index()
    }

    /// Largest write `save` will currently accept
    pub fn free_capacity(&self) -> usize {
        self.capacity().saturating_sub(1).saturating_sub(self.len())
    }

    /// Copy out every unread byte without moving the cursors
    pub fn get(&self) -> Vec<u8> {
        self.snapshot().bytes
    }

    pub fn snapshot(&self) -> BlockSnapshot {
        // write cursor first: bytes before it are published
        let end = self.write_index();
        let start = self.read_index();
        let data = self.data.as_ref();

        let bytes = match start.cmp(&end) {
            std::cmp::Ordering::Equal => Vec::new(),
            std::cmp::Ordering::Less => data[start..end].to_vec(),
            std::cmp::Ordering::Greater => {
                let mut bytes = Vec::with_capacity(data.len() - start + end);
                bytes.extend_from_slice(&data[start..]);
                bytes.extend_from_slice(&data[..end]);
                bytes
            }
        };

        BlockSnapshot { bytes, start, end }
    }

    /// Move the read cursor to a position the consumer has finished with
    pub fn release(&self, new_read_index: usize) -> Result<()> {
        if new_read_index >= self.capacity() {
            return Err(CacheError::invalid_release_index(
                new_read_index,
                self.capacity(),
            ));
        }
        self.cursors.publish_read(new_read_index);
        Ok(())
    }

    /// Forget all content; the bytes themselves are left in place
    pub fn flush(&self) {
        self.cursors.publish_write(0);
        self.cursors.publish_read(0);
    }
}

impl<'a, D: AsRef<[u8]> + AsMut<[u8]>> RingBlock<'a, D> {
    /// Append `bytes` in full, or fail without touching the block
    pub fn save(&mut self, bytes: &[u8]) -> Result<()> {
        let capacity = self.capacity();
        let free = self.free_capacity();
        if bytes.len() > free {
            return Err(CacheError::out_of_capacity(bytes.len(), free));
        }
        if bytes.is_empty() {
            return Ok(());
        }

        let start = self.write_index();
        let data = self.data.as_mut();
        let head = bytes.len().min(capacity - start);
        data[start..start + head].copy_from_slice(&bytes[..head]);
        data[..bytes.len() - head].copy_from_slice(&bytes[head..]);

        self.cursors.publish_write((start + bytes.len()) % capacity);
        Ok(())
    }
}

fn used(read: usize, write: usize, capacity: usize) -> usize {
    if write >= read {
        write - read
    } else {
        capacity - read + write
    }
}
