//! HTTP API for the try-on frontend.
//!
//! The router is composable: `api_router()` returns a `Router` that can
//! be mounted on any axum server instance; `server` owns the bind →
//! spawn → graceful-shutdown lifecycle.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::api_router;
pub use server::{ApiServer, ApiSession};
pub use types::ApiContext;
