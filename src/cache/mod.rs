//! Disk-backed memoization of remote calls, one JSON record per key.

pub mod memo;

pub use memo::{Cache, CacheStats, MemoCache, RECORD_FORMAT};
