//! Display implementations for cache errors

use super::types::CacheError;
use std::fmt;

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io {
                path,
                operation,
                source,
                ..
            } => write!(
                f,
                "I/O error during {} on '{}': {}",
                operation,
                path.display(),
                source
            ),
            Self::Serialization {
                codec,
                operation,
                source,
                ..
            } => write!(f, "{codec} codec failed to {operation:?} value: {source}"),
            Self::Corruption { path, reason, .. } => write!(
                f,
                "Region corruption detected in '{}': {reason}",
                path.display()
            ),
            Self::OutOfCapacity {
                requested_bytes,
                available_bytes,
                ..
            } => write!(
                f,
                "Out of capacity: requested {requested_bytes} bytes, only {available_bytes} bytes free"
            ),
            Self::TooShort {
                context,
                expected_bytes,
                actual_bytes,
                ..
            } => write!(
                f,
                "Too short {context}: need at least {expected_bytes} bytes, got {actual_bytes}"
            ),
            Self::LengthMismatch {
                declared_bytes,
                actual_bytes,
                ..
            } => write!(
                f,
                "Frame length mismatch: header declares {declared_bytes} body bytes, got {actual_bytes}"
            ),
            Self::KeyLengthOverflow {
                key_bytes,
                body_bytes,
                ..
            } => write!(
                f,
                "Record key length {key_bytes} overflows a {body_bytes}-byte record body"
            ),
            Self::FieldTooLarge {
                field,
                actual_bytes,
                max_bytes,
                ..
            } => write!(
                f,
                "Length of {field} ({actual_bytes} bytes) exceeds the length field maximum of {max_bytes}"
            ),
            Self::InvalidKey { key, reason, .. } => {
                write!(f, "Invalid record key '{key}': {reason}")
            }
            Self::CapacityTooSmallForExistingData {
                existing_bytes,
                requested_capacity,
                ..
            } => write!(
                f,
                "Block capacity {requested_capacity} cannot hold the {existing_bytes} unread bytes already in the region"
            ),
            Self::InvalidCapacity {
                requested, min, max, ..
            } => write!(
                f,
                "Invalid block capacity {requested}: must be between {min} and {max} bytes"
            ),
            Self::InvalidReleaseIndex {
                index, capacity, ..
            } => write!(
                f,
                "Release index {index} is outside a block of {capacity} bytes"
            ),
            Self::ConcurrencyConflict {
                operation,
                expected,
                found,
                ..
            } => write!(
                f,
                "Concurrency conflict during {operation}: expected active block {expected}, found {found}"
            ),
            Self::ExclusiveAccessRequired {
                path, operation, ..
            } => write!(
                f,
                "Cannot {operation} '{}' while another handle has it open",
                path.display()
            ),
            Self::RegionBusy { path, .. } => write!(
                f,
                "Region '{}' is being initialised or migrated by another handle",
                path.display()
            ),
            Self::Configuration { message, .. } => {
                write!(f, "Cache configuration error: {message}")
            }
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Serialization { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
