//! Error handling for the shared-memory cache
//!
//! Every error carries a [`RecoveryHint`] so callers can decide whether to
//! drain the consumer, grow the region, or give up.

mod builders;
mod conversions;
mod display;
mod recovery;
mod types;

pub use types::*;
