//! Image preprocessing pipeline.
//!
//! Normalizes arbitrary user-submitted photos into the fixed-geometry
//! inputs the try-on model requires: the person photo becomes exactly
//! 768x1024 JPEG (3:4, cover fit), the garment photo exactly 768x768 JPEG
//! (1:1, contain fit over opaque white). Stages:
//!
//! - `decode`: base64 / data-URI payload decoding and re-encoding
//! - `geometry`: centered crop computation for a target aspect window
//! - `orientation`: EXIF rotation fix for phone captures
//! - `trim`: best-effort garment border removal before the 1:1 crop
//! - `normalize`: the two per-image pipelines and the two-image entry point

pub mod decode;
pub mod geometry;
pub mod normalize;
pub mod orientation;
pub mod trim;

pub use decode::{decode_image_payload, to_jpeg_data_uri};
pub use geometry::{AspectWindow, CropRegion, GARMENT_WINDOW, PERSON_WINDOW};
pub use normalize::{
    normalize_garment, normalize_person, preprocess_try_on_images, NormalizedImage,
    PreprocessedPair, GARMENT_SIZE, PERSON_HEIGHT, PERSON_WIDTH,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PreprocessError {
    #[error("invalid image payload: {0}")]
    Decode(String),

    #[error("image geometry unreadable: {0}")]
    Geometry(String),

    #[error("image encoding failed: {0}")]
    Encode(String),

    #[error("image payload too large: {actual} bytes (limit {limit})")]
    TooLarge { actual: usize, limit: usize },

    #[error("image payload too small to be a valid image")]
    TooSmall,

    #[error("preprocessing task failed: {0}")]
    Task(String),
}

impl PreprocessError {
    /// Whether the failure is the caller's fault (bad upload) rather
    /// than an internal processing fault. Drives the 4xx/5xx split.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Decode(_) | Self::Geometry(_) | Self::TooLarge { .. } | Self::TooSmall
        )
    }
}
