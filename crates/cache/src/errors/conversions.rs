//! Error conversion utilities

use super::types::{CacheError, RecoveryHint, SerializationOp};
use std::path::PathBuf;

/// Bare I/O errors carry no path; prefer [`CacheError::io`] where one is known
impl From<std::io::Error> for CacheError {
    fn from(error: std::io::Error) -> Self {
        let recovery_hint = match error.kind() {
            std::io::ErrorKind::PermissionDenied => RecoveryHint::CheckPermissions {
                path: PathBuf::from("."),
            },
            std::io::ErrorKind::NotFound => RecoveryHint::Recreate,
            _ => RecoveryHint::NoRecovery,
        };

        Self::Io {
            path: PathBuf::from("."),
            operation: "unknown",
            source: error,
            recovery_hint,
        }
    }
}

/// Convert serde_json errors to cache errors
impl From<serde_json::Error> for CacheError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization("json", SerializationOp::Decode, error)
    }
}

/// Convert bincode errors to cache errors
impl From<bincode::Error> for CacheError {
    fn from(error: bincode::Error) -> Self {
        Self::serialization("bincode", SerializationOp::Decode, error)
    }
}
