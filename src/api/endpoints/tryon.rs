//! Try-on endpoint: from multipart upload to generated image.

use axum::extract::{Multipart, State};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::info;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, TryOnResponse};
use crate::generation::TryOnModel;

/// Multipart field names; the frontend upload contract.
const USER_PHOTO_FIELD: &str = "userPhoto";
const OUTFIT_PHOTO_FIELD: &str = "outfitPhoto";

const MISSING_FIELDS_ERROR: &str = "Both userPhoto and outfitPhoto are required.";

/// `POST /api/tryon`: multipart form with `userPhoto` and `outfitPhoto`
/// file fields. Returns `{"success": true, "generatedImage": ...}`.
pub async fn generate<M: TryOnModel + 'static>(
    State(ctx): State<ApiContext<M>>,
    mut multipart: Multipart,
) -> Result<Json<TryOnResponse>, ApiError> {
    let mut user_photo: Option<Vec<u8>> = None;
    let mut outfit_photo: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            USER_PHOTO_FIELD => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read {name}: {e}")))?;
                user_photo = Some(bytes.to_vec());
            }
            OUTFIT_PHOTO_FIELD => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("failed to read {name}: {e}")))?;
                outfit_photo = Some(bytes.to_vec());
            }
            // Unknown fields are drained and ignored.
            _ => {
                let _ = field.bytes().await;
            }
        }
    }

    let (Some(user_photo), Some(outfit_photo)) = (user_photo, outfit_photo) else {
        return Err(ApiError::BadRequest(MISSING_FIELDS_ERROR.to_string()));
    };

    let request_id = Uuid::new_v4();
    info!(
        %request_id,
        user_bytes = user_photo.len(),
        outfit_bytes = outfit_photo.len(),
        "try-on request received"
    );

    let outcome = ctx
        .service
        .try_on(STANDARD.encode(&user_photo), STANDARD.encode(&outfit_photo))
        .await?;

    info!(%request_id, fallback = outcome.fallback, "try-on request completed");

    Ok(Json(TryOnResponse {
        success: true,
        generated_image: outcome.image,
        fallback: outcome.fallback,
    }))
}
