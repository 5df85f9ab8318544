//! Request and Response models for the sprite cache API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{validate_item_id, ToggleRequest};
pub use responses::{
    FavoriteStatusResponse, FavoritesResponse, HealthResponse, RemoveFavoriteResponse,
    StatsResponse,
};
