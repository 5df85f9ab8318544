//! Response DTOs for the sprite cache API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::HashSet;

use serde::Serialize;

use crate::cache::CacheStats;
use crate::favorites::ItemId;
use crate::loader::LoaderStats;

/// Response body for GET /favorites
#[derive(Debug, Clone, Serialize)]
pub struct FavoritesResponse {
    /// Favorite ids in ascending order
    pub favorites: Vec<ItemId>,
    pub count: usize,
}

impl FavoritesResponse {
    pub fn from_snapshot(snapshot: HashSet<ItemId>) -> Self {
        let mut favorites: Vec<ItemId> = snapshot.into_iter().collect();
        favorites.sort_unstable();
        Self {
            count: favorites.len(),
            favorites,
        }
    }
}

/// Response body for GET /favorites/:id and POST /favorites/toggle
#[derive(Debug, Clone, Serialize)]
pub struct FavoriteStatusResponse {
    pub id: ItemId,
    pub favorite: bool,
}

impl FavoriteStatusResponse {
    pub fn new(id: ItemId, favorite: bool) -> Self {
        Self { id, favorite }
    }
}

/// Response body for DELETE /favorites/:id
#[derive(Debug, Clone, Serialize)]
pub struct RemoveFavoriteResponse {
    pub id: ItemId,
    /// False when the id was not a favorite
    pub removed: bool,
}

impl RemoveFavoriteResponse {
    pub fn new(id: ItemId, removed: bool) -> Self {
        Self { id, removed }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub cache: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    pub loader: LoaderStats,
    pub favorites: usize,
}

impl StatsResponse {
    pub fn new(cache: CacheStats, loader: LoaderStats, favorites: usize) -> Self {
        Self {
            hit_rate: cache.hit_rate(),
            cache,
            loader,
            favorites,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
