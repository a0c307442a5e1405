// ABOUTME: Carousel request form: slides, aspect ratio and branding inputs
// ABOUTME: Reads the JSON input file and prepares what the store needs for a submission

use crate::config::{MAX_BRAND_NAME_CHARS, MAX_COLOR_CHARS, MAX_FOOTER_CHARS};
use crate::errors::{CarouselError, Result};
use crate::model::{AspectRatio, Branding, SlideSpec};
use crate::resources::ResourceFile;
use crate::utils::validate_file_exists;
use log::{info, warn};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Branding fields as typed by the user
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrandingInput {
    /// Local path, URL or data URL of the logo
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub display_brand_name: Option<String>,
    #[serde(default)]
    pub footer_text: Option<String>,
    #[serde(default)]
    pub title_font_color: Option<String>,
}

/// Everything needed to submit a carousel
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarouselForm {
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub branding: BrandingInput,
    #[serde(default)]
    pub slides: Vec<SlideSpec>,
}

impl CarouselForm {
    /// Read a form from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        validate_file_exists(path)?;
        info!("Reading carousel from {:?}", path);
        let text = fs::read_to_string(path).map_err(CarouselError::FileReadError)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let form: CarouselForm = serde_json::from_str(text)?;
        Ok(form)
    }

    /// Slides that have a title or content; blank ones are dropped
    pub fn valid_slides(&self) -> Vec<SlideSpec> {
        let valid: Vec<SlideSpec> = self
            .slides
            .iter()
            .filter(|s| !s.is_blank())
            .cloned()
            .collect();
        if valid.len() < self.slides.len() {
            warn!(
                "Ignoring {} blank slide(s)",
                self.slides.len() - valid.len()
            );
        }
        valid
    }

    /// Resolve branding inputs into the snapshot frozen onto each slide
    pub fn branding(&self) -> Result<Branding> {
        let input = &self.branding;
        check_len("Display brand name", &input.display_brand_name, MAX_BRAND_NAME_CHARS)?;
        check_len("Footer text", &input.footer_text, MAX_FOOTER_CHARS)?;
        check_len("Title font color", &input.title_font_color, MAX_COLOR_CHARS)?;

        let logo_url = match input.logo.as_deref().map(str::trim) {
            Some(logo) if !logo.is_empty() => Some(ResourceFile::new(logo).data_url()?),
            _ => None,
        };

        Ok(Branding::resolve(
            logo_url,
            input.display_brand_name.as_deref(),
            input.footer_text.as_deref(),
            input.title_font_color.as_deref(),
        ))
    }
}

fn check_len(field: &str, value: &Option<String>, max_chars: usize) -> Result<()> {
    match value {
        Some(v) if v.chars().count() > max_chars => Err(CarouselError::ValidationError(format!(
            "{} is longer than {} characters.",
            field, max_chars
        ))),
        _ => Ok(()),
    }
}
