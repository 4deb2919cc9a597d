//! Core cache types and structures

use crate::codec::{Codec, RecordCodec};
use crate::storage::SharedRegion;
use parking_lot::Mutex;
use std::sync::Arc;

/// A shared region bound to a serialization strategy
///
/// Clones share the same region handle, so one producer can hand a clone to
/// another thread without opening the file twice.
pub struct Cache<C: Codec = RecordCodec> {
    pub(super) inner: Arc<CacheInner<C>>,
}

pub(super) struct CacheInner<C> {
    /// Region handle; writes need it exclusively
    pub region: Mutex<SharedRegion>,
    pub codec: C,
}

impl<C: Codec> Clone for Cache<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Codec> std::fmt::Debug for Cache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let region = self.inner.region.lock();
        f.debug_struct("Cache")
            .field("path", &region.path())
            .field("block_capacity", &region.block_capacity())
            .field("active_block", &region.active_index())
            .finish()
    }
}
