// ABOUTME: Image generation client for the carousel-slides application
// ABOUTME: Sends one prompt to the Imagen predict endpoint and classifies its failures

use crate::config::{Config, DEFAULT_API_KEY_ERROR_MESSAGE};
use crate::errors::{CarouselError, Result};
use crate::utils::truncate_chars;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::{debug, error, info};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Characters of the prompt echoed back in generation errors
const PROMPT_ECHO_CHARS: usize = 50;

/// Produces one background image per prompt
pub trait ImageGenerator {
    /// Returns the generated PNG as a base64 string
    fn generate_image(&self, api_key: &str, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    instances: [PredictInstance<'a>; 1],
    parameters: PredictParameters,
}

#[derive(Debug, Serialize)]
struct PredictInstance<'a> {
    prompt: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    output_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    rai_filtered_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Client for the Gemini API image models
pub struct GeminiImageClient {
    http: Client,
    base_url: String,
    model: String,
}

impl GeminiImageClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(CarouselError::FetchError)?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            model: config.image_model.clone(),
        })
    }

    fn endpoint(&self, api_key: &str) -> Result<url::Url> {
        let raw = format!("{}/models/{}:predict", self.base_url, self.model);
        let mut endpoint = url::Url::parse(&raw).map_err(|e| {
            CarouselError::ConfigurationError(format!("Invalid API base URL {}: {}", raw, e))
        })?;
        endpoint.query_pairs_mut().append_pair("key", api_key);
        Ok(endpoint)
    }

    fn request(&self, api_key: &str, prompt: &str) -> std::result::Result<String, Upstream> {
        let endpoint = self.endpoint(api_key).map_err(Upstream::Local)?;
        let body = PredictRequest {
            instances: [PredictInstance { prompt }],
            parameters: PredictParameters {
                sample_count: 1,
                output_mime_type: "image/png",
            },
        };
        let body = serde_json::to_string(&body)
            .map_err(|e| Upstream::Local(CarouselError::SerializationError(e)))?;

        debug!("POST {}:predict", self.model);
        let response = self
            .http
            .post(endpoint)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .map_err(|e| Upstream::Message(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| Upstream::Message(e.to_string()))?;

        if !status.is_success() {
            return Err(Upstream::Http {
                status,
                message: upstream_error_message(&text),
            });
        }

        let parsed: PredictResponse = serde_json::from_str(&text)
            .map_err(|e| Upstream::Message(format!("Malformed response from image API: {}", e)))?;

        let Some(prediction) = parsed.predictions.into_iter().next() else {
            return Err(Upstream::Message(
                "No image data received from AI. The prompt might have been blocked or the model could not generate an image for it."
                    .to_string(),
            ));
        };

        if let Some(reason) = prediction.rai_filtered_reason {
            return Err(Upstream::Message(format!("Image blocked by safety filter: {}", reason)));
        }

        match prediction.bytes_base64_encoded {
            Some(data) if !data.is_empty() => {
                STANDARD.decode(data.as_bytes()).map_err(|e| {
                    Upstream::Message(format!("Image payload is not valid base64: {}", e))
                })?;
                Ok(data)
            }
            _ => Err(Upstream::Message(
                "No image data received from AI. The prompt might have been blocked or the model could not generate an image for it."
                    .to_string(),
            )),
        }
    }
}

impl ImageGenerator for GeminiImageClient {
    fn generate_image(&self, api_key: &str, prompt: &str) -> Result<String> {
        if api_key.trim().is_empty() {
            return Err(CarouselError::ConfigurationError(
                DEFAULT_API_KEY_ERROR_MESSAGE.to_string(),
            ));
        }

        info!("Requesting image from {}", self.model);
        self.request(api_key, prompt).map_err(|upstream| {
            let err = classify_failure(upstream, prompt);
            error!("Error generating slide image: {}", err);
            err
        })
    }
}

/// Raw upstream failure before classification
#[derive(Debug)]
pub enum Upstream {
    Http { status: StatusCode, message: String },
    Message(String),
    Local(CarouselError),
}

/// Map an upstream failure onto the generation error taxonomy
pub fn classify_failure(upstream: Upstream, prompt: &str) -> CarouselError {
    let (status, message) = match upstream {
        Upstream::Local(err) => return err,
        Upstream::Http { status, message } => (Some(status), message),
        Upstream::Message(message) => (None, message),
    };

    let prompt_prefix = truncate_chars(prompt, PROMPT_ECHO_CHARS).to_string();

    if message.contains("API key not valid") {
        return CarouselError::ConfigurationError(format!(
            "API Key is invalid. {}",
            DEFAULT_API_KEY_ERROR_MESSAGE
        ));
    }
    if message.contains("SAFETY") || message.contains("blocked") {
        return CarouselError::SafetyRejection { prompt_prefix };
    }
    if status == Some(StatusCode::TOO_MANY_REQUESTS)
        || message.contains("429")
        || message.to_uppercase().contains("RESOURCE_EXHAUSTED")
    {
        return CarouselError::RateLimited;
    }

    let message = if message.is_empty() {
        "Unknown AI error".to_string()
    } else {
        message
    };
    CarouselError::GenerationError {
        prompt_prefix,
        message,
    }
}

/// Pull `status: message` out of an API error body, or fall back to the raw text
fn upstream_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.status.is_empty() => {
            format!("{}: {}", envelope.error.status, envelope.error.message)
        }
        Ok(envelope) => envelope.error.message,
        Err(_) => body.trim().to_string(),
    }
}
