// ABOUTME: Data model for carousels: slide specs, slide records and branding
// ABOUTME: Image state is a single enum so a record is never loading and finished at once

use crate::config::{DEFAULT_DISPLAY_BRAND_NAME, DEFAULT_FOOTER_TEXT, DEFAULT_TITLE_FONT_COLOR};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type SlideId = String;

/// One slide as entered by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideSpec {
    #[serde(default = "new_slide_id")]
    pub id: SlideId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

fn new_slide_id() -> SlideId {
    uuid::Uuid::new_v4().to_string()
}

impl SlideSpec {
    pub fn new(title: &str, content: &str) -> Self {
        Self {
            id: new_slide_id(),
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    pub fn with_id(id: &str, title: &str, content: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    /// A spec with neither title nor content is ignored by the form
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }
}

/// Supported carousel aspect ratios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:5")]
    Portrait,
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "1.19:1")]
    Custom,
}

impl AspectRatio {
    pub const ALL: [AspectRatio; 4] = [
        AspectRatio::Square,
        AspectRatio::Portrait,
        AspectRatio::Landscape,
        AspectRatio::Custom,
    ];

    pub fn value(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "4:5",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Custom => "1.19:1",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AspectRatio::Square => "Square (1:1)",
            AspectRatio::Portrait => "Portrait (4:5)",
            AspectRatio::Landscape => "Landscape (16:9)",
            AspectRatio::Custom => "Custom (1.19:1)",
        }
    }

    /// Surface size in CSS pixels; captures are oversampled from this
    pub fn surface_size(&self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (800, 800),
            AspectRatio::Portrait => (800, 1000),
            AspectRatio::Landscape => (800, 450),
            AspectRatio::Custom => (800, 672),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        AspectRatio::ALL
            .iter()
            .copied()
            .find(|ratio| ratio.value() == s.trim())
            .ok_or_else(|| {
                format!(
                    "Unsupported aspect ratio '{}'. Expected one of: 1:1, 4:5, 16:9, 1.19:1",
                    s
                )
            })
    }
}

/// Branding values frozen onto every record at submission time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branding {
    pub logo_url: Option<String>,
    pub display_brand_name: String,
    pub footer_text: String,
    pub title_font_color: String,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            logo_url: None,
            display_brand_name: DEFAULT_DISPLAY_BRAND_NAME.to_string(),
            footer_text: DEFAULT_FOOTER_TEXT.to_string(),
            title_font_color: DEFAULT_TITLE_FONT_COLOR.to_string(),
        }
    }
}

impl Branding {
    /// Build a snapshot, falling back to the defaults for blank values
    pub fn resolve(
        logo_url: Option<String>,
        display_brand_name: Option<&str>,
        footer_text: Option<&str>,
        title_font_color: Option<&str>,
    ) -> Self {
        let pick = |value: Option<&str>, default: &str| {
            value
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(default)
                .to_string()
        };

        Self {
            logo_url: logo_url.filter(|url| !url.trim().is_empty()),
            display_brand_name: pick(display_brand_name, DEFAULT_DISPLAY_BRAND_NAME),
            footer_text: pick(footer_text, DEFAULT_FOOTER_TEXT),
            title_font_color: pick(title_font_color, DEFAULT_TITLE_FONT_COLOR),
        }
    }
}

/// Background image status of one slide
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ImageState {
    #[default]
    Idle,
    Loading,
    Ready(String),
    Failed(String),
}

/// A submitted slide with its generation status and branding snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideRecord {
    pub id: SlideId,
    pub title: String,
    pub content: String,
    pub image_prompt: String,
    pub image: ImageState,
    pub branding: Branding,
}

impl SlideRecord {
    pub fn from_spec(spec: &SlideSpec, aspect_ratio: AspectRatio, branding: &Branding) -> Self {
        Self {
            id: spec.id.clone(),
            title: spec.title.clone(),
            content: spec.content.clone(),
            image_prompt: image_prompt(&spec.title, &spec.content, aspect_ratio),
            image: ImageState::Idle,
            branding: branding.clone(),
        }
    }

    pub fn is_image_loading(&self) -> bool {
        matches!(self.image, ImageState::Loading)
    }

    pub fn image_url(&self) -> Option<&str> {
        match &self.image {
            ImageState::Ready(url) => Some(url),
            _ => None,
        }
    }

    pub fn image_error(&self) -> Option<&str> {
        match &self.image {
            ImageState::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Ready for single-image download: an image is present and nothing is pending
    pub fn is_export_ready(&self) -> bool {
        self.image_url().is_some()
    }
}

/// Prompt sent to the image model for one slide
pub fn image_prompt(title: &str, content: &str, aspect_ratio: AspectRatio) -> String {
    format!(
        "High-impact, visually appealing background for a social media post about \"{} - {}\". \
         Focus on abstract patterns, subtle gradients, or thematic elements related to biotechnology \
         or professional content. The image should be suitable for being blurred. Aspect ratio: {}.",
        title, content, aspect_ratio
    )
}

/// The slides of the current submission
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CarouselRun {
    pub records: Vec<SlideRecord>,
    pub aspect_ratio: AspectRatio,
    pub current_index: usize,
}

impl CarouselRun {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, id: &str) -> Option<&SlideRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    pub fn current(&self) -> Option<&SlideRecord> {
        self.records.get(self.current_index)
    }

    /// Display title of the carousel, used for file names
    pub fn carousel_title(&self) -> &str {
        match self.records.first() {
            Some(first) if !first.title.is_empty() => &first.title,
            Some(first) if !first.branding.display_brand_name.is_empty() => {
                &first.branding.display_brand_name
            }
            _ => crate::config::BRAND_NAME,
        }
    }
}
