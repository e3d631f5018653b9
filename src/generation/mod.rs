//! External try-on generation.
//!
//! The generation endpoint is a collaborator behind the `TryOnModel`
//! trait: it accepts the two normalized data URIs plus free-form model
//! parameters and returns a composited image. The only production
//! implementation is Replicate's IDM-VTON (`replicate`); tests use
//! `MockTryOnModel`.

pub mod replicate;

use std::future::Future;
use std::sync::Mutex;

use thiserror::Error;

pub use replicate::ReplicateClient;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("generation API token is not configured")]
    MissingToken,

    #[error("generation request failed: {0}")]
    Transport(String),

    #[error("generation timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("generation API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("generation failed upstream: {0}")]
    ModelFailed(String),

    #[error("generation response unreadable: {0}")]
    ResponseParsing(String),

    #[error("generation returned no output image")]
    NoOutput,
}

impl GenerationError {
    /// Transient failures are worth one retry; auth errors, client errors
    /// and malformed responses are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Settings for the generation endpoint.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// API base URL (trailing slash tolerated).
    pub base_url: String,
    /// Bearer token. Required; validated at client construction.
    pub api_token: String,
    /// Pinned model version hash.
    pub model_version: String,
    /// Overall deadline for one generation, polling included. The
    /// upstream model routinely takes 30-60s.
    pub deadline_secs: u64,
    /// Delay between prediction status polls.
    pub poll_interval_ms: u64,
    /// Bounded retries for transient failures.
    pub max_retries: u32,
}

impl GenerationConfig {
    pub fn new(api_token: String) -> Self {
        Self {
            base_url: replicate::DEFAULT_BASE_URL.to_string(),
            api_token,
            model_version: replicate::IDM_VTON_VERSION.to_string(),
            deadline_secs: 120,
            poll_interval_ms: 2_000,
            max_retries: 1,
        }
    }
}

/// Free-form parameters forwarded to the model alongside the two images.
///
/// Defaults reproduce the tuned IDM-VTON call: 40 steps for garment
/// detail, fixed seed for reproducible results, `crop` off so the
/// garment is never cut, slight scale boost for garment clarity.
#[derive(Debug, Clone)]
pub struct ModelParams {
    pub garment_des: String,
    pub steps: u32,
    pub seed: u32,
    pub crop: bool,
    pub scale: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            garment_des: DEFAULT_GARMENT_PROMPT.trim().to_string(),
            steps: 40,
            seed: 42,
            crop: false,
            scale: 1.2,
        }
    }
}

/// Instruction block steering the model toward identity-preserving,
/// garment-only replacement.
const DEFAULT_GARMENT_PROMPT: &str = r#"
Use Image 1 (human_img) as the original person.
Use Image 2 (garm_img) as the garment.

STRICT REQUIREMENTS:
- Do NOT change the person's identity, face, eyes, skin tone, hair, or expression.
- Do NOT change the person's body shape, pose, or hand positions.
- Do NOT modify the background or environment.
- Keep the person EXACTLY the same as in the original image.

GARMENT APPLICATION RULES:
- Replace ONLY the upper clothing with the garment from Image 2.
- The garment must fit naturally on the person's torso, shoulders, and arms.
- Align the collar, neckline, and sleeves accurately with the body.
- Preserve natural fabric behavior: wrinkles, material texture, realistic shadows, consistent lighting.
- No artifacts, ghost sleeves, stretched textures, or shape deformations.
- Fully replace the old clothing; do NOT blend them.

OUTPUT:
A high-quality, realistic image of the same person wearing the garment from Image 2, with accurate fit and photo-realistic details.
"#;

/// One generation request: both normalized images plus parameters.
#[derive(Debug, Clone)]
pub struct TryOnRequest {
    pub human_img: String,
    pub garm_img: String,
    pub params: ModelParams,
}

/// The composited result. `image` is a data URI when the endpoint hands
/// back bytes or base64, or an `http(s)` URL when only a link survives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub image: String,
}

/// Seam to the external generation endpoint.
pub trait TryOnModel: Send + Sync {
    fn generate(
        &self,
        request: TryOnRequest,
    ) -> impl Future<Output = Result<GeneratedImage, GenerationError>> + Send;
}

/// Mock generation endpoint for tests: returns a configured image or
/// error and records every request it was handed.
pub struct MockTryOnModel {
    image: Option<String>,
    requests: Mutex<Vec<TryOnRequest>>,
}

impl MockTryOnModel {
    pub fn returning(image: &str) -> Self {
        Self {
            image: Some(image.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            image: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests seen so far, in order.
    pub fn requests(&self) -> Vec<TryOnRequest> {
        self.requests.lock().expect("mock lock").clone()
    }
}

impl TryOnModel for MockTryOnModel {
    async fn generate(&self, request: TryOnRequest) -> Result<GeneratedImage, GenerationError> {
        self.requests.lock().expect("mock lock").push(request);
        match &self.image {
            Some(image) => Ok(GeneratedImage {
                image: image.clone(),
            }),
            None => Err(GenerationError::ModelFailed("mock failure".into())),
        }
    }
}
