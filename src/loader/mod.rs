//! Loader Module
//!
//! Resource loading on top of the cache and fetch layers, plus the sprite
//! decode step used by the server.

mod resource_cache;
mod sprite;

pub use resource_cache::{Load, LoadOutcome, LoadToken, LoaderStats, ResourceCache};
pub use sprite::{decode_png, png_header, sprite_url, Sprite};
