//! Shared types for the API layer.

use std::sync::Arc;

use serde::Serialize;

use crate::generation::TryOnModel;
use crate::service::TryOnService;

/// Shared context for all API routes.
///
/// Generic over the generation model so tests can drive the full router
/// with a mock endpoint. Cloning is cheap (one `Arc`).
pub struct ApiContext<M> {
    pub service: Arc<TryOnService<M>>,
}

impl<M: TryOnModel> ApiContext<M> {
    pub fn new(service: TryOnService<M>) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

impl<M> Clone for ApiContext<M> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}

/// Success body for `POST /api/tryon`.
#[derive(Debug, Serialize)]
pub struct TryOnResponse {
    pub success: bool,
    /// Data URI (or URL) of the composited image.
    #[serde(rename = "generatedImage")]
    pub generated_image: String,
    /// True when the image is the echoed original photo (fallback
    /// policy), not a generated result.
    pub fallback: bool,
}
