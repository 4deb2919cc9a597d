//! Cache construction

use crate::codec::{Codec, RecordCodec};
use crate::config::RegionConfig;
use crate::errors::Result;
use crate::storage::SharedRegion;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

use super::types::{Cache, CacheInner};

impl Cache<RecordCodec> {
    /// Open a record cache on the region at `path`
    pub fn open(path: impl AsRef<Path>, block_capacity: u64) -> Result<Self> {
        Ok(Self::with_codec(
            SharedRegion::open(path, block_capacity)?,
            RecordCodec,
        ))
    }

    pub fn open_with_config(config: &RegionConfig) -> Result<Self> {
        Self::open_with_codec(config, RecordCodec)
    }
}

impl<C: Codec> Cache<C> {
    /// Bind `codec` to an already open region
    pub fn with_codec(region: SharedRegion, codec: C) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                region: Mutex::new(region),
                codec,
            }),
        }
    }

    pub fn open_with_codec(config: &RegionConfig, codec: C) -> Result<Self> {
        Ok(Self::with_codec(SharedRegion::open_with_config(config)?, codec))
    }
}
