// ABOUTME: Error types for the carousel-slides application
// ABOUTME: Provides structured error handling for submission, generation and export

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CarouselError {
    #[error("Failed to read file: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("Failed to fetch remote resource: {0}")]
    FetchError(#[from] reqwest::Error),

    #[error("Invalid resource path: {0}")]
    InvalidResourcePath(String),

    /// Missing or rejected credentials. Blocks generation, never text export.
    #[error("{0}")]
    ConfigurationError(String),

    /// Empty or malformed submission. Blocks that submission only.
    #[error("{0}")]
    ValidationError(String),

    #[error(
        "Image generation failed due to safety policies for prompt: \"{prompt_prefix}...\". Please revise the prompt."
    )]
    SafetyRejection { prompt_prefix: String },

    #[error(
        "Image generation failed due to API rate limits or quota exhaustion (Error 429). Please check your Gemini API plan and billing details (see https://ai.google.dev/gemini-api/docs/rate-limits). You may need to wait or request a quota increase."
    )]
    RateLimited,

    #[error("Failed to generate image for prompt \"{prompt_prefix}...\": {message}")]
    GenerationError {
        prompt_prefix: String,
        message: String,
    },

    #[error("Headless browser error: {message}")]
    BrowserError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Could not capture slide image: {0}")]
    CaptureError(String),

    #[error("Image encoding error: {0}")]
    EncodeError(String),

    #[error("Failed to generate ZIP file: {0}")]
    ArchiveFinalizeError(String),

    #[error("Slide not found: {0}")]
    UnknownSlide(String),

    /// The slide has no finished background, so there is nothing to download yet
    #[error("Slide {0} is not ready for download")]
    SlideNotReady(String),

    #[error("Path not found: {0}")]
    PathNotFoundError(PathBuf),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Unknown error: {0}")]
    UnknownError(String),
}

impl CarouselError {
    /// True for the failures the image client reports for a single prompt.
    pub fn is_generation_failure(&self) -> bool {
        matches!(
            self,
            CarouselError::SafetyRejection { .. }
                | CarouselError::RateLimited
                | CarouselError::GenerationError { .. }
        )
    }
}

// Implement conversion from anyhow::Error to our CarouselError
impl From<anyhow::Error> for CarouselError {
    fn from(err: anyhow::Error) -> Self {
        CarouselError::UnknownError(err.to_string())
    }
}

// Zip errors only surface while building or closing an archive
impl From<zip::result::ZipError> for CarouselError {
    fn from(err: zip::result::ZipError) -> Self {
        CarouselError::ArchiveFinalizeError(format!("ZIP operation failed: {}", err))
    }
}

impl From<image::ImageError> for CarouselError {
    fn from(err: image::ImageError) -> Self {
        CarouselError::EncodeError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CarouselError>;
