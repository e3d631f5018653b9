//! Try-on API router.
//!
//! Routes are nested under `/api/`. The body limit is sized for two
//! phone photos plus multipart overhead; CORS is permissive because the
//! browser frontend is served from a different origin.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::generation::TryOnModel;

/// Two 25 MB uploads plus multipart overhead.
const MAX_BODY_BYTES: usize = 60 * 1024 * 1024;

/// Build the try-on API router.
pub fn api_router<M: TryOnModel + 'static>(ctx: ApiContext<M>) -> Router {
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/tryon", post(endpoints::tryon::generate::<M>))
        .with_state(ctx);

    Router::new()
        .nest("/api", routes)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
