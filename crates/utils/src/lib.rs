//! Shared utilities for shmring
//!
//! Tracing setup for binaries and the advisory file lock that keeps region
//! initialisation and migration exclusive.

pub mod file_lock;
pub mod tracing;

pub use file_lock::{FileLock, LockMode};
