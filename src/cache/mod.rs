//! Cache Module
//!
//! Provides a bounded, thread-safe key-value cache with LRU eviction.

mod lru;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::KeyedLru;
