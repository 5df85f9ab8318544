//! API Module
//!
//! HTTP handlers and routing for the sprite cache REST API.
//!
//! # Endpoints
//! - `GET /sprites/:id` - Sprite PNG for a catalog item
//! - `GET /favorites` - All favorite ids
//! - `GET /favorites/:id` - Whether an id is a favorite
//! - `POST /favorites/toggle` - Flip an id's favorite status
//! - `DELETE /favorites/:id` - Remove an id from favorites
//! - `GET /stats` - Cache, loader and favorites statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
