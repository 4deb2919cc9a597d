//! Core error types for the cache system

use std::path::PathBuf;
use std::time::Duration;

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Re-export CacheError as Error for convenience
pub use CacheError as Error;

/// Error type for every layer of the cache: codecs, blocks, region and facade
#[derive(Debug)]
pub enum CacheError {
    /// I/O errors while opening, sizing, mapping or syncing the backing file
    Io {
        path: PathBuf,
        operation: &'static str,
        source: std::io::Error,
        recovery_hint: RecoveryHint,
    },

    /// Value (de)serialization failed inside a codec
    Serialization {
        codec: &'static str,
        operation: SerializationOp,
        source: Box<dyn std::error::Error + Send + Sync>,
        recovery_hint: RecoveryHint,
    },

    /// The region header does not describe a valid region
    Corruption {
        path: PathBuf,
        reason: String,
        recovery_hint: RecoveryHint,
    },

    /// A write does not fit in the free space of the target block
    OutOfCapacity {
        requested_bytes: usize,
        available_bytes: usize,
        recovery_hint: RecoveryHint,
    },

    /// Fewer bytes than a frame or record header needs
    TooShort {
        context: &'static str,
        expected_bytes: usize,
        actual_bytes: usize,
        recovery_hint: RecoveryHint,
    },

    /// A frame's declared body length differs from the bytes supplied
    LengthMismatch {
        declared_bytes: usize,
        actual_bytes: usize,
        recovery_hint: RecoveryHint,
    },

    /// A record's declared key length reaches the end of its body
    KeyLengthOverflow {
        key_bytes: usize,
        body_bytes: usize,
        recovery_hint: RecoveryHint,
    },

    /// A frame body or record key is longer than its `u32` length field
    FieldTooLarge {
        field: &'static str,
        actual_bytes: usize,
        max_bytes: usize,
        recovery_hint: RecoveryHint,
    },

    /// A record key is not valid UTF-8
    InvalidKey {
        key: String,
        reason: String,
        recovery_hint: RecoveryHint,
    },

    /// Unread bytes of an existing region do not fit the requested capacity
    CapacityTooSmallForExistingData {
        existing_bytes: usize,
        requested_capacity: u64,
        recovery_hint: RecoveryHint,
    },

    /// Requested block capacity is outside the supported range
    InvalidCapacity {
        requested: u64,
        min: u64,
        max: u64,
        recovery_hint: RecoveryHint,
    },

    /// A release position that cannot be a cursor of the block
    InvalidReleaseIndex {
        index: usize,
        capacity: usize,
        recovery_hint: RecoveryHint,
    },

    /// The active block index changed underneath a rewrite
    ConcurrencyConflict {
        operation: &'static str,
        expected: i32,
        found: i32,
        recovery_hint: RecoveryHint,
    },

    /// Reshaping the region needs every other handle to be closed
    ExclusiveAccessRequired {
        path: PathBuf,
        operation: &'static str,
        recovery_hint: RecoveryHint,
    },

    /// Another handle holds the region exclusively (initialising or migrating)
    RegionBusy {
        path: PathBuf,
        recovery_hint: RecoveryHint,
    },

    /// Configuration error
    Configuration {
        message: String,
        recovery_hint: RecoveryHint,
    },
}

/// Recovery hints for error handling
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryHint {
    /// Retry the operation
    Retry { after: Duration },

    /// Let the consumer drain the region, then retry
    DrainConsumer,

    /// Clear the region and retry
    ClearAndRetry,

    /// Open the region with a larger block capacity
    IncreaseCapacity { suggested_bytes: u64 },

    /// Check file permissions
    CheckPermissions { path: PathBuf },

    /// Stop the peer process holding the region, then retry
    StopPeers { path: PathBuf },

    /// Delete and recreate the backing file
    Recreate,

    /// Fix the configuration
    UpdateConfiguration,

    /// No automated recovery possible
    Manual { instructions: String },

    /// No recovery possible
    NoRecovery,
}

/// Serialization operation types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializationOp {
    Encode,
    Decode,
}
