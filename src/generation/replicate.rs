//! Replicate client for IDM-VTON.
//!
//! Drives the prediction lifecycle: create, poll until terminal, resolve
//! the output into something the frontend can render. Replicate's output
//! shape varies by model version (a bare URL/string, or a sequence whose
//! first element is the image), and URL outputs expire, so they are
//! downloaded and re-wrapped as data URIs while the prediction is fresh.

use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{GeneratedImage, GenerationConfig, GenerationError, TryOnModel, TryOnRequest};
use crate::pipeline::to_jpeg_data_uri;

pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com";

/// Pinned `cuuupid/idm-vton` version.
pub const IDM_VTON_VERSION: &str =
    "0513734a452173b8173e907e3a59d19a36266e55b48528559432bd21c7d7e985";

/// Per-request HTTP timeout (one create or poll call, not the whole job).
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Cap for downloaded result images.
const MAX_DOWNLOAD_BYTES: usize = 32 * 1024 * 1024;

/// First retry backoff; doubles per attempt.
const RETRY_BACKOFF: Duration = Duration::from_millis(1_500);

pub struct ReplicateClient {
    config: GenerationConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct PredictionRequest<'a> {
    version: &'a str,
    input: PredictionInput<'a>,
}

#[derive(Serialize)]
struct PredictionInput<'a> {
    human_img: &'a str,
    garm_img: &'a str,
    garment_des: &'a str,
    steps: u32,
    seed: u32,
    crop: bool,
    scale: f64,
}

#[derive(Deserialize)]
struct Prediction {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl Prediction {
    fn is_terminal(&self) -> bool {
        matches!(self.status.as_str(), "succeeded" | "failed" | "canceled")
    }
}

impl ReplicateClient {
    pub fn new(config: GenerationConfig) -> Result<Self, GenerationError> {
        if config.api_token.trim().is_empty() {
            return Err(GenerationError::MissingToken);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| GenerationError::Transport(format!("HTTP client build failed: {e}")))?;

        Ok(Self {
            config: GenerationConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            client,
        })
    }

    async fn run_once(&self, request: &TryOnRequest) -> Result<GeneratedImage, GenerationError> {
        let deadline = Instant::now() + Duration::from_secs(self.config.deadline_secs);

        let mut prediction = self.create_prediction(request).await?;
        debug!(id = %prediction.id, status = %prediction.status, "prediction created");

        while !prediction.is_terminal() {
            if Instant::now() >= deadline {
                return Err(GenerationError::Timeout {
                    secs: self.config.deadline_secs,
                });
            }
            tokio::time::sleep(Duration::from_millis(self.config.poll_interval_ms)).await;
            prediction = self.get_prediction(&prediction.id).await?;
        }

        match prediction.status.as_str() {
            "succeeded" => {
                let output = prediction.output.ok_or(GenerationError::NoOutput)?;
                let image = first_output(&output)?;
                self.resolve_image(image).await
            }
            _ => Err(GenerationError::ModelFailed(
                prediction
                    .error
                    .as_ref()
                    .map(Value::to_string)
                    .unwrap_or_else(|| format!("prediction {}", prediction.status)),
            )),
        }
    }

    async fn create_prediction(
        &self,
        request: &TryOnRequest,
    ) -> Result<Prediction, GenerationError> {
        let url = format!("{}/v1/predictions", self.config.base_url);
        let body = PredictionRequest {
            version: &self.config.model_version,
            input: PredictionInput {
                human_img: &request.human_img,
                garm_img: &request.garm_img,
                garment_des: &request.params.garment_des,
                steps: request.params.steps,
                seed: request.params.seed,
                crop: request.params.crop,
                scale: request.params.scale,
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_token)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        parse_prediction(response).await
    }

    async fn get_prediction(&self, id: &str) -> Result<Prediction, GenerationError> {
        let url = format!("{}/v1/predictions/{id}", self.config.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(map_transport_error)?;

        parse_prediction(response).await
    }

    /// Turn the model's output string into something renderable.
    ///
    /// Data URIs pass through. `http(s)` URLs are downloaded and wrapped
    /// as data URIs; if the download fails the URL itself is returned;
    /// it may still render before it expires.
    async fn resolve_image(&self, image: &str) -> Result<GeneratedImage, GenerationError> {
        if image.starts_with("http://") || image.starts_with("https://") {
            match self.download_image(image).await {
                Ok(data_uri) => return Ok(GeneratedImage { image: data_uri }),
                Err(e) => {
                    warn!(error = %e, url = image, "result download failed, returning URL");
                    return Ok(GeneratedImage {
                        image: image.to_string(),
                    });
                }
            }
        }
        Ok(GeneratedImage {
            image: image.to_string(),
        })
    }

    async fn download_image(&self, url: &str) -> Result<String, GenerationError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body: format!("result download from {url}"),
            });
        }

        let mut bytes: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_transport_error)?;
            if bytes.len() + chunk.len() > MAX_DOWNLOAD_BYTES {
                return Err(GenerationError::ResponseParsing(format!(
                    "result image exceeds {MAX_DOWNLOAD_BYTES} bytes"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(wrap_image_bytes(&bytes))
    }
}

impl TryOnModel for ReplicateClient {
    async fn generate(&self, request: TryOnRequest) -> Result<GeneratedImage, GenerationError> {
        let mut attempt = 0u32;
        loop {
            match self.run_once(&request).await {
                Ok(image) => {
                    info!(attempt, "generation succeeded");
                    return Ok(image);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let backoff = RETRY_BACKOFF * 2u32.pow(attempt);
                    warn!(error = %e, attempt, backoff_ms = backoff.as_millis() as u64,
                        "transient generation failure, retrying");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// ── Response handling ───────────────────────────────────────

fn map_transport_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Transport("request timed out".into())
    } else if e.is_connect() {
        GenerationError::Transport(format!("cannot reach generation endpoint: {e}"))
    } else {
        GenerationError::Transport(e.to_string())
    }
}

async fn parse_prediction(response: reqwest::Response) -> Result<Prediction, GenerationError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GenerationError::Api {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<Prediction>()
        .await
        .map_err(|e| GenerationError::ResponseParsing(e.to_string()))
}

/// Extract the image from a prediction output: either a bare string or a
/// sequence whose first element is the image.
fn first_output(output: &Value) -> Result<&str, GenerationError> {
    match output {
        Value::String(s) => Ok(s),
        Value::Array(items) => match items.first() {
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(GenerationError::ResponseParsing(format!(
                "unexpected output element: {other}"
            ))),
            None => Err(GenerationError::NoOutput),
        },
        Value::Null => Err(GenerationError::NoOutput),
        other => Err(GenerationError::ResponseParsing(format!(
            "unexpected output shape: {other}"
        ))),
    }
}

/// Wrap downloaded image bytes as a data URI, sniffing the media type
/// from magic bytes (PNG is the upstream default).
fn wrap_image_bytes(bytes: &[u8]) -> String {
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Jpeg) => to_jpeg_data_uri(bytes),
        Ok(image::ImageFormat::WebP) => {
            format!("data:image/webp;base64,{}", STANDARD.encode(bytes))
        }
        _ => format!("data:image/png;base64,{}", STANDARD.encode(bytes)),
    }
}
