//! Sprite Cache - concurrent resource caching with an observable favorites set
//!
//! Provides a single-flight image loader over a bounded LRU, plus a
//! thread-safe favorites store that notifies observers of every change.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod favorites;
pub mod fetch;
pub mod loader;
pub mod models;

pub use api::{create_router, AppState};
pub use cache::KeyedLru;
pub use config::Config;
pub use favorites::{FavoritesStore, ObservableSet, ObserverId};
pub use fetch::{ByteFetcher, FetchRegistry, HttpFetcher};
pub use loader::{Load, LoadToken, ResourceCache};
