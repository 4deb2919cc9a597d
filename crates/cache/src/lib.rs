//! Persistent, memory-mapped, double-buffered byte queue
//!
//! A producer appends framed records to a file-backed shared region and a
//! consumer reads them back, in the same process or another one, even after
//! a restart. The crate is layered leaves first:
//! - [`protocol`]: frame and record wire formats
//! - [`storage`]: the ring-buffer blocks and the shared region holding two
//!   of them
//! - [`codec`]: pluggable serialization strategies
//! - [`Cache`]: a region bound to a codec

pub mod codec;
pub mod config;
pub mod core;
pub mod errors;
pub mod protocol;
pub mod storage;

// Re-export main types
pub use codec::{BincodeCodec, Codec, FnCodec, JsonCodec, RawCodec, RecordCodec};
pub use config::{ConfigSource, RegionConfig, RegionConfigBuilder, RegionConfigLoader, SyncPolicy};
pub use crate::core::Cache;
pub use errors::{CacheError, Error, RecoveryHint, Result};
pub use protocol::{Frame, FrameReader, Record};
pub use storage::{RegionSnapshot, RegionStats, SharedRegion};
