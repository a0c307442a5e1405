// ABOUTME: Configuration module for the carousel-slides application
// ABOUTME: Provides defaults, branding constants and environment variable handling

use crate::rasterize::RenderConfig;
use std::env;

pub const MAX_SLIDES: usize = 20;

pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_CONTENT_CHARS: usize = 500;
pub const MAX_BRAND_NAME_CHARS: usize = 50;
pub const MAX_FOOTER_CHARS: usize = 100;
pub const MAX_COLOR_CHARS: usize = 7;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_IMAGE_MODEL: &str = "imagen-3.0-generate-002";

pub const DEFAULT_API_KEY_ERROR_MESSAGE: &str =
    "API Key not configured or invalid. Please ensure the API_KEY environment variable is set correctly.";

/// Fallback name used when neither a title nor a brand name is available
pub const BRAND_NAME: &str = "BTGenZ";
pub const DEFAULT_DISPLAY_BRAND_NAME: &str = "BTGenZ";
pub const DEFAULT_FOOTER_TEXT: &str = "BTGenZ | Your Source for Biotech Careers";
pub const DEFAULT_TITLE_FONT_COLOR: &str = "#FFFFFF";

/// Stylesheets the slide surfaces depend on
pub const FONT_STYLESHEETS: [&str; 2] = [
    "https://fonts.googleapis.com/css2?family=Inter:wght@400;500;600;700;900&display=swap",
    "https://fonts.googleapis.com/css2?family=Oswald:wght@400;500;600;700&display=swap",
];

/// Global configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub image_model: String,
    pub browser_path: Option<String>,
    pub default_timeout_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: DEFAULT_API_BASE.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            browser_path: env::var("BROWSER_PATH").ok(),
            default_timeout_ms: 30000, // 30 seconds
            request_timeout_secs: 120,
        }
    }
}

impl Config {
    /// Create a new configuration instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let api_key = non_empty_var("API_KEY").or_else(|| non_empty_var("GEMINI_API_KEY"));
        let api_base_url =
            non_empty_var("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let image_model =
            non_empty_var("IMAGE_MODEL").unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string());
        let browser_path = non_empty_var("BROWSER_PATH");
        let default_timeout_ms = env::var("DEFAULT_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(30000);
        let request_timeout_secs = env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(120);

        Self {
            api_key,
            api_base_url,
            image_model,
            browser_path,
            default_timeout_ms,
            request_timeout_secs,
        }
    }

    /// Override the API key, e.g. from a command-line flag
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
        self
    }

    /// Get a render configuration with defaults from this config
    pub fn get_render_config(
        &self,
        window_width: Option<u32>,
        window_height: Option<u32>,
        timeout_ms: Option<u64>,
    ) -> RenderConfig {
        let defaults = RenderConfig::default();
        RenderConfig {
            window_width: window_width.unwrap_or(defaults.window_width),
            window_height: window_height.unwrap_or(defaults.window_height),
            timeout_ms: timeout_ms.unwrap_or(self.default_timeout_ms),
            browser_path: self.browser_path.clone(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
