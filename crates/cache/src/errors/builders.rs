//! Builder methods for creating errors with their default recovery hints

use super::types::{CacheError, RecoveryHint, SerializationOp};
use std::path::{Path, PathBuf};

impl CacheError {
    /// I/O failure on the backing file
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, operation: &'static str, source: std::io::Error) -> Self {
        let path = path.into();
        let recovery_hint = match source.kind() {
            std::io::ErrorKind::PermissionDenied => RecoveryHint::CheckPermissions {
                path: path.clone(),
            },
            _ => RecoveryHint::Manual {
                instructions: format!("Check that '{}' is a writable file", path.display()),
            },
        };
        Self::Io {
            path,
            operation,
            source,
            recovery_hint,
        }
    }

    /// Codec failure wrapping the underlying serializer error
    #[must_use]
    pub fn serialization(
        codec: &'static str,
        operation: SerializationOp,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Serialization {
            codec,
            operation,
            source: source.into(),
            recovery_hint: match operation {
                SerializationOp::Encode => RecoveryHint::NoRecovery,
                SerializationOp::Decode => RecoveryHint::ClearAndRetry,
            },
        }
    }

    /// Header validation failure
    #[must_use]
    pub fn corruption(path: &Path, reason: impl Into<String>) -> Self {
        Self::Corruption {
            path: path.to_path_buf(),
            reason: reason.into(),
            recovery_hint: RecoveryHint::Recreate,
        }
    }

    #[must_use]
    pub fn out_of_capacity(requested_bytes: usize, available_bytes: usize) -> Self {
        Self::OutOfCapacity {
            requested_bytes,
            available_bytes,
            recovery_hint: RecoveryHint::DrainConsumer,
        }
    }

    #[must_use]
    pub fn too_short(context: &'static str, expected_bytes: usize, actual_bytes: usize) -> Self {
        Self::TooShort {
            context,
            expected_bytes,
            actual_bytes,
            recovery_hint: RecoveryHint::NoRecovery,
        }
    }

    #[must_use]
    pub fn length_mismatch(declared_bytes: usize, actual_bytes: usize) -> Self {
        Self::LengthMismatch {
            declared_bytes,
            actual_bytes,
            recovery_hint: RecoveryHint::NoRecovery,
        }
    }

    #[must_use]
    pub fn key_length_overflow(key_bytes: usize, body_bytes: usize) -> Self {
        Self::KeyLengthOverflow {
            key_bytes,
            body_bytes,
            recovery_hint: RecoveryHint::NoRecovery,
        }
    }

    #[must_use]
    pub fn field_too_large(field: &'static str, actual_bytes: usize) -> Self {
        Self::FieldTooLarge {
            field,
            actual_bytes,
            max_bytes: u32::MAX as usize,
            recovery_hint: RecoveryHint::NoRecovery,
        }
    }

    #[must_use]
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
            recovery_hint: RecoveryHint::NoRecovery,
        }
    }

    #[must_use]
    pub fn capacity_too_small(existing_bytes: usize, requested_capacity: u64) -> Self {
        Self::CapacityTooSmallForExistingData {
            existing_bytes,
            requested_capacity,
            recovery_hint: RecoveryHint::IncreaseCapacity {
                // one byte of every block stays reserved
                suggested_bytes: existing_bytes as u64 + 1,
            },
        }
    }

    #[must_use]
    pub fn invalid_capacity(requested: u64, min: u64, max: u64) -> Self {
        Self::InvalidCapacity {
            requested,
            min,
            max,
            recovery_hint: RecoveryHint::UpdateConfiguration,
        }
    }

    #[must_use]
    pub fn invalid_release_index(index: usize, capacity: usize) -> Self {
        Self::InvalidReleaseIndex {
            index,
            capacity,
            recovery_hint: RecoveryHint::Manual {
                instructions: "Release only the end position returned by a snapshot".to_string(),
            },
        }
    }

    /// Another writer changed a mapped word between our load and our swap
    #[must_use]
    pub fn concurrency_conflict(operation: &'static str, expected: i32, found: i32) -> Self {
        Self::ConcurrencyConflict {
            operation,
            expected,
            found,
            recovery_hint: RecoveryHint::Manual {
                instructions: "Only one producer may write to a region".to_string(),
            },
        }
    }

    #[must_use]
    pub fn exclusive_access_required(path: &Path, operation: &'static str) -> Self {
        Self::ExclusiveAccessRequired {
            path: path.to_path_buf(),
            operation,
            recovery_hint: RecoveryHint::StopPeers {
                path: path.to_path_buf(),
            },
        }
    }

    #[must_use]
    pub fn region_busy(path: &Path) -> Self {
        Self::RegionBusy {
            path: path.to_path_buf(),
            recovery_hint: RecoveryHint::Retry {
                after: std::time::Duration::from_millis(50),
            },
        }
    }

    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            recovery_hint: RecoveryHint::UpdateConfiguration,
        }
    }
}
