//! API Handlers
//!
//! HTTP request handlers for sprite and favorites endpoints.

use std::sync::Arc;

use axum::{
    extract::{FromRef, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use crate::config::Config;
use crate::error::{ApiError, FetchError, Result};
use crate::favorites::{FavoritesStore, ItemId};
use crate::fetch::{ByteFetcher, HttpFetcher};
use crate::loader::{decode_png, sprite_url, LoadToken, ResourceCache, Sprite};
use crate::models::{
    validate_item_id, FavoriteStatusResponse, FavoritesResponse, HealthResponse,
    RemoveFavoriteResponse, StatsResponse, ToggleRequest,
};

/// Sprite cache keyed by sprite URL.
pub type SpriteCache<F> = ResourceCache<String, Sprite, F>;

/// Application state shared across all handlers.
pub struct AppState<F> {
    pub sprites: SpriteCache<F>,
    pub favorites: Arc<FavoritesStore>,
    pub sprite_base_url: Arc<str>,
}

impl<F> Clone for AppState<F> {
    fn clone(&self) -> Self {
        Self {
            sprites: self.sprites.clone(),
            favorites: Arc::clone(&self.favorites),
            sprite_base_url: Arc::clone(&self.sprite_base_url),
        }
    }
}

impl<F> FromRef<AppState<F>> for Arc<FavoritesStore> {
    fn from_ref(state: &AppState<F>) -> Self {
        Arc::clone(&state.favorites)
    }
}

impl<F: ByteFetcher<String>> AppState<F> {
    /// Creates a new AppState around the given fetcher.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(fetcher: F, image_cache_capacity: usize, sprite_base_url: &str) -> Self {
        Self {
            sprites: ResourceCache::new(image_cache_capacity, fetcher),
            favorites: Arc::new(FavoritesStore::new()),
            sprite_base_url: Arc::from(sprite_base_url),
        }
    }
}

impl AppState<HttpFetcher> {
    /// Creates a new AppState from configuration, fetching over HTTP.
    pub fn from_config(config: &Config) -> std::result::Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(config.fetch_timeout())?;
        Ok(Self::new(
            fetcher,
            config.image_cache_capacity,
            &config.sprite_base_url,
        ))
    }
}

/// Withdraws a pending load if the request is dropped before it completes,
/// e.g. when the client disconnects.
struct CancelOnDrop<'a, F: ByteFetcher<String>> {
    sprites: &'a SpriteCache<F>,
    token: Option<LoadToken<String>>,
}

impl<F: ByteFetcher<String>> Drop for CancelOnDrop<'_, F> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            if self.sprites.cancel(&token) {
                debug!(url = %token.key(), "sprite request abandoned");
            }
        }
    }
}

/// Handler for GET /sprites/:id
///
/// Serves the item's sprite through the shared cache.
pub async fn sprite_handler<F: ByteFetcher<String>>(
    State(state): State<AppState<F>>,
    Path(id): Path<ItemId>,
) -> Result<Response> {
    if let Some(error_msg) = validate_item_id(id) {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let url = sprite_url(&state.sprite_base_url, id);
    let load = state.sprites.load(url, decode_png);
    let mut pending = CancelOnDrop {
        sprites: &state.sprites,
        token: Some(load.token()),
    };
    let outcome = load.await;
    pending.token = None;

    let sprite = outcome.map_err(|source| ApiError::Load { id, source })?;
    Ok((
        [(header::CONTENT_TYPE, Sprite::CONTENT_TYPE)],
        sprite.bytes.clone(),
    )
        .into_response())
}

/// Handler for GET /favorites
pub async fn list_favorites_handler(
    State(favorites): State<Arc<FavoritesStore>>,
) -> Json<FavoritesResponse> {
    Json(FavoritesResponse::from_snapshot(favorites.snapshot()))
}

/// Handler for GET /favorites/:id
pub async fn favorite_status_handler(
    State(favorites): State<Arc<FavoritesStore>>,
    Path(id): Path<ItemId>,
) -> Json<FavoriteStatusResponse> {
    Json(FavoriteStatusResponse::new(id, favorites.contains(&id)))
}

/// Handler for POST /favorites/toggle
pub async fn toggle_favorite_handler(
    State(favorites): State<Arc<FavoritesStore>>,
    Json(req): Json<ToggleRequest>,
) -> Result<Json<FavoriteStatusResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(ApiError::InvalidRequest(error_msg));
    }

    let favorite = favorites.toggle(req.id);
    Ok(Json(FavoriteStatusResponse::new(req.id, favorite)))
}

/// Handler for DELETE /favorites/:id
///
/// Removing an id that is not a favorite succeeds with `removed: false`.
pub async fn remove_favorite_handler(
    State(favorites): State<Arc<FavoritesStore>>,
    Path(id): Path<ItemId>,
) -> Json<RemoveFavoriteResponse> {
    let removed = favorites.remove(&id);
    Json(RemoveFavoriteResponse::new(id, removed))
}

/// Handler for GET /stats
pub async fn stats_handler<F: ByteFetcher<String>>(
    State(state): State<AppState<F>>,
) -> Json<StatsResponse> {
    Json(StatsResponse::new(
        state.sprites.cache_stats(),
        state.sprites.loader_stats(),
        state.favorites.count(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
