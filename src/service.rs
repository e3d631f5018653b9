//! Try-on orchestration: preprocess both photos, call the generation
//! model, apply the configured failure policy.
//!
//! Preprocessing failures and generation failures stay distinct types all
//! the way up so the API layer can log and classify them separately.

use std::str::FromStr;

use thiserror::Error;
use tracing::warn;

use crate::generation::{GenerationError, ModelParams, TryOnModel, TryOnRequest};
use crate::pipeline::{preprocess_try_on_images, PreprocessError};

#[derive(Error, Debug)]
pub enum TryOnError {
    #[error("image preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),

    #[error("try-on generation failed: {0}")]
    Generation(#[from] GenerationError),
}

/// What to do when preprocessing or generation fails.
///
/// `EchoPersonPhoto` keeps the user-facing flow non-blocking by returning
/// the original photo as the "result". Useful for demos, dangerous in
/// production because it masks real failures. It is therefore opt-in and
/// loudly logged, and the outcome is flagged so callers can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    #[default]
    Strict,
    EchoPersonPhoto,
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "echo" | "echo_person_photo" => Ok(Self::EchoPersonPhoto),
            other => Err(format!("unknown fallback policy: {other}")),
        }
    }
}

/// Result of one try-on run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TryOnOutcome {
    /// Data URI (or URL) of the image to show the user.
    pub image: String,
    /// True when the image is the echoed original photo, not a
    /// generated result.
    pub fallback: bool,
}

/// Orchestrates one try-on request end to end.
pub struct TryOnService<M> {
    model: M,
    params: ModelParams,
    policy: FallbackPolicy,
}

impl<M: TryOnModel> TryOnService<M> {
    pub fn new(model: M, params: ModelParams, policy: FallbackPolicy) -> Self {
        Self {
            model,
            params,
            policy,
        }
    }

    /// Run preprocess -> generate for one pair of uploaded photos
    /// (bare base64 or data URIs).
    pub async fn try_on(
        &self,
        user_photo: String,
        outfit_photo: String,
    ) -> Result<TryOnOutcome, TryOnError> {
        let original = user_photo.clone();

        match self.run(user_photo, outfit_photo).await {
            Ok(image) => Ok(TryOnOutcome {
                image,
                fallback: false,
            }),
            Err(e) => match self.policy {
                FallbackPolicy::Strict => Err(e),
                FallbackPolicy::EchoPersonPhoto => {
                    let stage = match &e {
                        TryOnError::Preprocess(_) => "preprocessing",
                        TryOnError::Generation(_) => "generation",
                    };
                    warn!(error = %e, stage, "try-on failed, echoing original person photo");
                    Ok(TryOnOutcome {
                        image: ensure_data_uri(original),
                        fallback: true,
                    })
                }
            },
        }
    }

    async fn run(&self, user_photo: String, outfit_photo: String) -> Result<String, TryOnError> {
        let pair = preprocess_try_on_images(user_photo, outfit_photo).await?;

        let generated = self
            .model
            .generate(TryOnRequest {
                human_img: pair.human_img,
                garm_img: pair.garm_img,
                params: self.params.clone(),
            })
            .await?;

        Ok(generated.image)
    }
}

/// Wrap a bare base64 payload as a JPEG data URI; pass data URIs through.
fn ensure_data_uri(payload: String) -> String {
    if payload.starts_with("data:") {
        payload
    } else {
        format!("data:image/jpeg;base64,{payload}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::MockTryOnModel;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_base64(width: u32, height: u32) -> String {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([80, 80, 80])));
        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, image::ImageFormat::Png).unwrap();
        STANDARD.encode(cursor.into_inner())
    }

    const MOCK_RESULT: &str = "data:image/png;base64,R0VORVJBVEVE";

    #[tokio::test]
    async fn successful_run_returns_generated_image() {
        let service = TryOnService::new(
            MockTryOnModel::returning(MOCK_RESULT),
            ModelParams::default(),
            FallbackPolicy::Strict,
        );
        let outcome = service
            .try_on(png_base64(600, 800), png_base64(500, 500))
            .await
            .unwrap();
        assert_eq!(outcome.image, MOCK_RESULT);
        assert!(!outcome.fallback);
    }

    #[tokio::test]
    async fn model_receives_normalized_data_uris() {
        let mock = MockTryOnModel::returning(MOCK_RESULT);
        let service = TryOnService::new(mock, ModelParams::default(), FallbackPolicy::Strict);
        service
            .try_on(png_base64(600, 800), png_base64(500, 500))
            .await
            .unwrap();

        // The generation endpoint must only ever see the normalized pair.
        let seen = service.model.requests();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].human_img.starts_with("data:image/jpeg;base64,"));
        assert!(seen[0].garm_img.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn strict_policy_propagates_preprocess_error() {
        let service = TryOnService::new(
            MockTryOnModel::returning(MOCK_RESULT),
            ModelParams::default(),
            FallbackPolicy::Strict,
        );
        let result = service
            .try_on("not-base64!!".into(), png_base64(500, 500))
            .await;
        assert!(matches!(result, Err(TryOnError::Preprocess(_))));
    }

    #[tokio::test]
    async fn strict_policy_propagates_generation_error() {
        let service = TryOnService::new(
            MockTryOnModel::failing(),
            ModelParams::default(),
            FallbackPolicy::Strict,
        );
        let result = service
            .try_on(png_base64(600, 800), png_base64(500, 500))
            .await;
        assert!(matches!(result, Err(TryOnError::Generation(_))));
    }

    #[tokio::test]
    async fn echo_policy_returns_original_photo_on_generation_failure() {
        let service = TryOnService::new(
            MockTryOnModel::failing(),
            ModelParams::default(),
            FallbackPolicy::EchoPersonPhoto,
        );
        let photo = png_base64(600, 800);
        let outcome = service
            .try_on(photo.clone(), png_base64(500, 500))
            .await
            .unwrap();
        assert!(outcome.fallback);
        assert_eq!(outcome.image, format!("data:image/jpeg;base64,{photo}"));
    }

    #[tokio::test]
    async fn echo_policy_preserves_existing_data_uri_prefix() {
        let service = TryOnService::new(
            MockTryOnModel::failing(),
            ModelParams::default(),
            FallbackPolicy::EchoPersonPhoto,
        );
        let photo = format!("data:image/png;base64,{}", png_base64(600, 800));
        let outcome = service
            .try_on(photo.clone(), png_base64(500, 500))
            .await
            .unwrap();
        assert!(outcome.fallback);
        assert_eq!(outcome.image, photo);
    }

    #[tokio::test]
    async fn echo_policy_covers_preprocess_failure_too() {
        let service = TryOnService::new(
            MockTryOnModel::returning(MOCK_RESULT),
            ModelParams::default(),
            FallbackPolicy::EchoPersonPhoto,
        );
        // Garment is malformed; the echoed image is still the person photo.
        let photo = png_base64(600, 800);
        let outcome = service
            .try_on(photo.clone(), "not-base64!!".into())
            .await
            .unwrap();
        assert!(outcome.fallback);
        assert!(outcome.image.ends_with(&photo));
    }

    #[test]
    fn fallback_policy_parses_from_config_strings() {
        assert_eq!(
            "strict".parse::<FallbackPolicy>().unwrap(),
            FallbackPolicy::Strict
        );
        assert_eq!(
            "echo".parse::<FallbackPolicy>().unwrap(),
            FallbackPolicy::EchoPersonPhoto
        );
        assert_eq!(
            "Echo_Person_Photo".parse::<FallbackPolicy>().unwrap(),
            FallbackPolicy::EchoPersonPhoto
        );
        assert!("lenient".parse::<FallbackPolicy>().is_err());
    }
}
