//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Default sprite repository, one PNG per catalog item id.
pub const DEFAULT_SPRITE_BASE_URL: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of decoded sprites kept in memory
    pub image_cache_capacity: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Base URL sprite locators are built from
    pub sprite_base_url: String,
    /// Transport timeout for a single sprite request, in seconds
    pub fetch_timeout_secs: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `IMAGE_CACHE_CAPACITY` - Sprites kept in memory (default: 20, must be > 0)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SPRITE_BASE_URL` - Sprite repository base URL (default: PokeAPI sprites)
    /// - `FETCH_TIMEOUT_SECS` - Per-request timeout (default: 10, must be > 0)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            image_cache_capacity: parse_var("IMAGE_CACHE_CAPACITY")
                .filter(|capacity| *capacity > 0)
                .unwrap_or(defaults.image_cache_capacity),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            sprite_base_url: env::var("SPRITE_BASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(defaults.sprite_base_url),
            fetch_timeout_secs: parse_var("FETCH_TIMEOUT_SECS")
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.fetch_timeout_secs),
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_cache_capacity: 20,
            server_port: 3000,
            sprite_base_url: DEFAULT_SPRITE_BASE_URL.to_string(),
            fetch_timeout_secs: 10,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
