//! Recovery utilities for cache errors

use super::types::{CacheError, RecoveryHint};

impl CacheError {
    /// Get the recovery hint for this error
    #[must_use]
    pub const fn recovery_hint(&self) -> &RecoveryHint {
        match self {
            Self::Io { recovery_hint, .. }
            | Self::Serialization { recovery_hint, .. }
            | Self::Corruption { recovery_hint, .. }
            | Self::OutOfCapacity { recovery_hint, .. }
            | Self::TooShort { recovery_hint, .. }
            | Self::LengthMismatch { recovery_hint, .. }
            | Self::KeyLengthOverflow { recovery_hint, .. }
            | Self::FieldTooLarge { recovery_hint, .. }
            | Self::InvalidKey { recovery_hint, .. }
            | Self::CapacityTooSmallForExistingData { recovery_hint, .. }
            | Self::InvalidCapacity { recovery_hint, .. }
            | Self::InvalidReleaseIndex { recovery_hint, .. }
            | Self::ConcurrencyConflict { recovery_hint, .. }
            | Self::ExclusiveAccessRequired { recovery_hint, .. }
            | Self::RegionBusy { recovery_hint, .. }
            | Self::Configuration { recovery_hint, .. } => recovery_hint,
        }
    }

    /// Check if this error is transient and can be retried
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self.recovery_hint(),
            RecoveryHint::Retry { .. } | RecoveryHint::DrainConsumer
        )
    }

    /// Check if this error indicates malformed bytes in the region or a frame
    #[must_use]
    pub const fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::Corruption { .. }
                | Self::TooShort { .. }
                | Self::LengthMismatch { .. }
                | Self::KeyLengthOverflow { .. }
                | Self::InvalidKey { .. }
        )
    }

    /// Check if this error is about block capacity
    #[must_use]
    pub const fn is_capacity(&self) -> bool {
        matches!(
            self,
            Self::OutOfCapacity { .. }
                | Self::CapacityTooSmallForExistingData { .. }
                | Self::InvalidCapacity { .. }
                | Self::FieldTooLarge { .. }
        )
    }
}
