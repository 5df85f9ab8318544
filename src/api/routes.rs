//! API Routes
//!
//! Configures the Axum router with all sprite and favorites endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    favorite_status_handler, health_handler, list_favorites_handler, remove_favorite_handler,
    sprite_handler, stats_handler, toggle_favorite_handler, AppState,
};
use crate::fetch::ByteFetcher;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /sprites/:id` - Sprite PNG for a catalog item
/// - `GET /favorites` - All favorite ids
/// - `GET /favorites/:id` - Whether an id is a favorite
/// - `POST /favorites/toggle` - Flip an id's favorite status
/// - `DELETE /favorites/:id` - Remove an id from favorites
/// - `GET /stats` - Cache, loader and favorites statistics
/// - `GET /health` - Health check endpoint
pub fn create_router<F: ByteFetcher<String>>(state: AppState<F>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/sprites/:id", get(sprite_handler::<F>))
        .route("/favorites", get(list_favorites_handler))
        .route("/favorites/toggle", post(toggle_favorite_handler))
        .route(
            "/favorites/:id",
            get(favorite_status_handler).delete(remove_favorite_handler),
        )
        .route("/stats", get(stats_handler::<F>))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::loader::png_header;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use bytes::Bytes;
    use tower::util::ServiceExt;

    struct OneSprite;

    impl ByteFetcher<String> for OneSprite {
        async fn fetch(&self, key: &String) -> Result<Bytes, FetchError> {
            if key.ends_with("/25.png") {
                Ok(png_header(40, 30))
            } else {
                Err(FetchError::Status(404))
            }
        }
    }

    fn create_test_app() -> Router {
        create_router(AppState::new(OneSprite, 8, "http://sprites.test"))
    }

    async fn send(app: Router, method: &str, uri: &str, body: Body) -> StatusCode {
        app.oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let status = send(create_test_app(), "GET", "/health", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let status = send(create_test_app(), "GET", "/stats", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_sprite_endpoint() {
        let app = create_test_app();
        assert_eq!(
            send(app.clone(), "GET", "/sprites/25", Body::empty()).await,
            StatusCode::OK
        );
        assert_eq!(
            send(app, "GET", "/sprites/26", Body::empty()).await,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_toggle_route_not_shadowed_by_id_route() {
        let status = send(
            create_test_app(),
            "POST",
            "/favorites/toggle",
            Body::from(r#"{"id":4}"#),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_non_numeric_id_rejected() {
        let status = send(create_test_app(), "GET", "/favorites/abc", Body::empty()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
