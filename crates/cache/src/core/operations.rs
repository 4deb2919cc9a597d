//! Cache operations
//!
//! Every operation takes the region lock for its whole duration, so a `take`
//! cannot interleave with a `rewrite` issued through a clone of the same
//! cache.

use crate::codec::Codec;
use crate::errors::Result;
use crate::storage::{RegionStats, SharedRegion};
use parking_lot::MutexGuard;
use tracing::trace;

use super::types::Cache;

impl<C: Codec> Cache<C> {
    /// Serialize `value` and append it to the region
    pub fn set(&self, value: &C::Value) -> Result<()> {
        let bytes = self.inner.codec.serialize(value)?;
        self.inner.region.lock().save(&bytes)
    }

    /// Deserialize everything unread, leaving it in place
    pub fn get(&self) -> Result<C::Output> {
        let bytes = self.inner.region.lock().get();
        self.inner.codec.deserialize(&bytes)
    }

    /// Replace the whole content of the region with `value`
    pub fn rewrite(&self, value: &C::Value) -> Result<()> {
        let bytes = self.inner.codec.serialize(value)?;
        self.inner.region.lock().rewrite(&bytes)
    }

    /// Deserialize everything unread and acknowledge it
    ///
    /// Only complete frames are acknowledged; a trailing partial frame stays
    /// for the next call. Nothing is acknowledged when decoding fails.
    pub fn take(&self) -> Result<C::Output> {
        let region = self.inner.region.lock();
        let mut snapshot = region.snapshot();
        let output = self.inner.codec.deserialize(&snapshot.bytes)?;

        let consumed = self.inner.codec.complete_len(&snapshot.bytes);
        snapshot.end = snapshot.position_after(consumed, region.block_capacity());
        let released = region.release_snapshot(&snapshot)?;
        trace!(consumed, released, "took from region");
        Ok(output)
    }

    /// Drop all content, atomically
    pub fn clear(&self) -> Result<()> {
        self.inner.region.lock().rewrite(&[])
    }

    pub fn stats(&self) -> RegionStats {
        self.inner.region.lock().stats()
    }

    /// Write dirty mapped pages back to the file
    pub fn flush_to_disk(&self) -> Result<()> {
        self.inner.region.lock().flush_to_disk()
    }

    /// Direct access to the region, e.g. to save pre-encoded bytes
    pub fn region(&self) -> MutexGuard<'_, SharedRegion> {
        self.inner.region.lock()
    }

    pub fn codec(&self) -> &C {
        &self.inner.codec
    }
}
