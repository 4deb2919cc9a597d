//! Cache facade over a shared region
//!
//! A [`Cache`] pairs a [`SharedRegion`](crate::storage::SharedRegion) with a
//! [`Codec`](crate::codec::Codec): values go through the codec on the way in
//! and out, bytes go to and from the region unchanged. The facade adds no
//! errors of its own.

mod builder;
mod operations;
mod types;

// Re-export the main Cache type
pub use types::Cache;

#[cfg(test)]
mod tests;
