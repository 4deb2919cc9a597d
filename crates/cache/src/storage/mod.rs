//! Shared region storage
//!
//! This module owns everything that touches the mapped file:
//! - `layout`: header offsets, cursor atomics and header validation
//! - `block`: the circular buffer used for each half of the region
//! - `migration`: carrying unread bytes across a capacity change
//! - `region`: the handle tying the file, its lock and its mapping together

pub mod block;
pub mod layout;
mod migration;
mod region;

// Re-export public types
pub use block::{BlockSnapshot, RingBlock};
pub use layout::{
    file_len, HeaderSnapshot, BLOCK_COUNT, HEADER_SIZE, MAX_BLOCK_CAPACITY, MIN_BLOCK_CAPACITY,
};
pub use migration::MigrationPlan;
pub use region::{BlockStats, RegionSnapshot, RegionStats, SharedRegion};
