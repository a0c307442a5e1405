// ABOUTME: Resource handling for the carousel-slides application
// ABOUTME: Loads local or remote branding assets such as logos and inlines them as data URLs

use crate::errors::{CarouselError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use log::info;
use reqwest::blocking::Client;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Image types accepted as a logo
const LOGO_MIME_TYPES: [(&str, &str); 5] = [
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("svg", "image/svg+xml"),
    ("webp", "image/webp"),
];

/// Represents a resource file that can be either local or remote.
#[derive(Debug, Clone)]
pub struct ResourceFile {
    pub path: String,
    pub is_remote: bool,
}

impl ResourceFile {
    /// Create a new ResourceFile from a path string.
    /// The path can be either a local file path or a URL.
    pub fn new(path: &str) -> Self {
        let is_remote = path.starts_with("http://") || path.starts_with("https://");
        Self {
            path: path.to_string(),
            is_remote,
        }
    }

    /// True when the path already is an inline `data:` URL
    pub fn is_data_url(&self) -> bool {
        self.path.starts_with("data:")
    }

    /// Get the raw bytes of the resource.
    /// Remote resources are fetched, local ones read from disk.
    pub fn bytes(&self) -> Result<Vec<u8>> {
        if self.is_remote {
            self.fetch_remote_bytes()
        } else {
            self.read_local_bytes()
        }
    }

    /// MIME type derived from the file extension
    pub fn mime_type(&self) -> Result<&'static str> {
        let trimmed = self.path.split(['?', '#']).next().unwrap_or_default();
        let extension = Path::new(trimmed)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        LOGO_MIME_TYPES
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, mime)| *mime)
            .ok_or_else(|| {
                CarouselError::InvalidResourcePath(format!(
                    "Unsupported logo type '{}': expected png, jpeg, svg or webp",
                    self.path
                ))
            })
    }

    /// Inline the resource as a `data:` URL so slides render without network access
    pub fn data_url(&self) -> Result<String> {
        if self.is_data_url() {
            return Ok(self.path.clone());
        }
        let mime = self.mime_type()?;
        let bytes = self.bytes()?;
        Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
    }

    /// Fetch content from a remote URL with retry capability
    fn fetch_remote_bytes(&self) -> Result<Vec<u8>> {
        info!("Fetching remote resource: {}", self.path);

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(CarouselError::FetchError)?;

        // Try up to 3 times with increasing backoff
        let mut retry_delay = 1000;
        let mut last_error = None;

        for attempt in 1..=3 {
            match client.get(&self.path).send() {
                Ok(response) => {
                    if response.status().is_success() {
                        return response
                            .bytes()
                            .map(|b| b.to_vec())
                            .map_err(CarouselError::FetchError);
                    }
                    let status = response.status();
                    last_error = Some(CarouselError::InvalidResourcePath(format!(
                        "HTTP error {} for {}",
                        status, self.path
                    )));
                }
                Err(e) => {
                    last_error = Some(CarouselError::FetchError(e));
                }
            }

            if attempt < 3 {
                info!(
                    "Fetch attempt {} failed, retrying in {} ms",
                    attempt, retry_delay
                );
                std::thread::sleep(Duration::from_millis(retry_delay));
                retry_delay *= 2;
            }
        }

        Err(last_error.unwrap_or_else(|| {
            CarouselError::InvalidResourcePath("Unknown error fetching resource".to_string())
        }))
    }

    /// Read content from a local file
    fn read_local_bytes(&self) -> Result<Vec<u8>> {
        info!("Reading local resource: {}", self.path);
        if !Path::new(&self.path).exists() {
            return Err(CarouselError::PathNotFoundError(
                Path::new(&self.path).to_path_buf(),
            ));
        }

        fs::read(&self.path).map_err(CarouselError::FileReadError)
    }
}
