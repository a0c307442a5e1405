// ABOUTME: Slide surface module for the carousel-slides application
// ABOUTME: Composes a slide record into a standalone HTML page ready to be rasterized

use crate::config::FONT_STYLESHEETS;
use crate::errors::{CarouselError, Result};
use crate::model::{CarouselRun, ImageState, SlideId, SlideRecord};
use crate::utils::{ellipsize, ensure_parent_directory_exists};
use log::info;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Element id the rasterizer looks for
pub const SURFACE_ELEMENT_ID: &str = "slide-surface";

/// Longest image error shown on a slide
const OVERLAY_ERROR_CHARS: usize = 150;

const LIGHT_NAMED_COLORS: [&str; 9] = [
    "white",
    "yellow",
    "lime",
    "aqua",
    "pink",
    "lightyellow",
    "lightcyan",
    "beige",
    "ivory",
];

/// A laid-out slide that can be captured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideSurface {
    pub slide_id: SlideId,
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub html: String,
}

/// Surfaces of the current run keyed by slide id
#[derive(Debug, Clone, Default)]
pub struct SurfaceSet {
    surfaces: HashMap<SlideId, SlideSurface>,
}

impl SurfaceSet {
    /// Lay out every record of the run
    pub fn mount(run: &CarouselRun) -> Self {
        let surfaces = run
            .records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let surface = compose_surface(run, index, record);
                (record.id.clone(), surface)
            })
            .collect();
        Self { surfaces }
    }

    pub fn get(&self, id: &str) -> Option<&SlideSurface> {
        self.surfaces.get(id)
    }

    /// Drop a surface, as when a slide is no longer on screen
    pub fn unmount(&mut self, id: &str) -> Option<SlideSurface> {
        self.surfaces.remove(id)
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

fn compose_surface(run: &CarouselRun, index: usize, record: &SlideRecord) -> SlideSurface {
    let (width, height) = run.aspect_ratio.surface_size();
    SlideSurface {
        slide_id: record.id.clone(),
        index,
        width,
        height,
        html: render_slide_html(record, width, height),
    }
}

/// Render one slide as a complete HTML document
pub fn render_slide_html(record: &SlideRecord, width: u32, height: u32) -> String {
    let branding = &record.branding;
    let mut html_doc = String::from("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html_doc.push_str("<meta charset=\"UTF-8\">\n");
    html_doc.push_str(&format!(
        "<title>{}</title>\n",
        escape_html(if record.title.is_empty() {
            &branding.display_brand_name
        } else {
            &record.title
        })
    ));
    for stylesheet in FONT_STYLESHEETS {
        html_doc.push_str(&format!(r#"<link rel="stylesheet" href="{}">"#, stylesheet));
        html_doc.push('\n');
    }
    html_doc.push_str(&format!("<style>{}</style>\n", base_css(width, height)));
    html_doc.push_str("</head>\n<body>\n");

    html_doc.push_str(&format!(r#"<div id="{}" class="slide">"#, SURFACE_ELEMENT_ID));
    html_doc.push('\n');

    // Background and status overlays
    match &record.image {
        ImageState::Ready(url) => {
            html_doc.push_str(&format!(
                r#"<div class="background" style="background-image: url('{}');"></div>"#,
                escape_html(url)
            ));
        }
        ImageState::Loading => {
            html_doc.push_str(
                r#"<div class="overlay loading"><p>Generating background...</p></div>"#,
            );
        }
        ImageState::Failed(message) => {
            html_doc.push_str(&format!(
                r#"<div class="overlay error"><p class="overlay-title">Background Image Error</p><p>{}</p></div>"#,
                escape_html(&ellipsize(message, OVERLAY_ERROR_CHARS))
            ));
        }
        ImageState::Idle => {
            html_doc.push_str(
                r#"<div class="overlay placeholder"><p>Background will appear here</p></div>"#,
            );
        }
    }
    html_doc.push('\n');

    html_doc.push_str("<div class=\"layout\">\n");

    // Brand row
    html_doc.push_str("<div class=\"brand\">");
    if let Some(logo_url) = &branding.logo_url {
        html_doc.push_str(&format!(
            r#"<img class="logo" src="{}" alt="{} Logo">"#,
            escape_html(logo_url),
            escape_html(&branding.display_brand_name)
        ));
    }
    html_doc.push_str(&format!(
        r#"<span class="brand-name">{}</span>"#,
        escape_html(&branding.display_brand_name)
    ));
    html_doc.push_str("</div>\n<div class=\"spacer\"></div>\n<div class=\"text\">\n");

    if !record.title.is_empty() {
        html_doc.push_str(&format!(
            r#"<h3 class="title" style="color: {};">{}</h3>"#,
            escape_html(&branding.title_font_color),
            escape_html(&record.title)
        ));
        html_doc.push('\n');
    }
    if !record.content.is_empty() {
        html_doc.push_str(&format!(
            r#"<p class="content">{}</p>"#,
            render_highlighted_text(&record.content)
        ));
        html_doc.push('\n');
    }
    html_doc.push_str("</div>\n");

    html_doc.push_str(&format!(
        r#"<div class="footer"><p>{}</p></div>"#,
        escape_html(&branding.footer_text)
    ));
    html_doc.push_str("\n</div>\n</div>\n</body>\n</html>");

    html_doc
}

fn base_css(width: u32, height: u32) -> String {
    format!(
        r#"
html, body {{ margin: 0; padding: 0; background: transparent; }}
body {{ font-family: "Inter", sans-serif; }}
.slide {{ position: relative; width: {width}px; height: {height}px; overflow: hidden; border-radius: 8px; background: #0f172a; color: #fff; }}
.background {{ position: absolute; inset: 0; background-size: cover; background-position: center; filter: blur(4px); transform: scale(1.05); }}
.overlay {{ position: absolute; inset: 0; z-index: 20; display: flex; flex-direction: column; align-items: center; justify-content: center; text-align: center; padding: 16px; }}
.overlay.loading {{ background: rgba(30, 41, 59, 0.8); color: #e2e8f0; }}
.overlay.error {{ background: rgba(153, 27, 27, 0.7); color: #fecaca; font-size: 12px; }}
.overlay.placeholder {{ background: rgba(30, 41, 59, 0.7); color: #64748b; }}
.overlay-title {{ font-weight: 600; font-size: 14px; }}
.layout {{ position: absolute; inset: 0; z-index: 10; display: flex; flex-direction: column; padding: 20px; }}
.brand {{ display: flex; align-items: center; gap: 12px; }}
.logo {{ height: 48px; width: auto; max-width: 120px; object-fit: contain; }}
.brand-name {{ font-family: "Oswald", sans-serif; font-size: 24px; font-weight: 700; text-transform: uppercase; letter-spacing: 0.025em; text-shadow: 1px 1px 3px rgba(0,0,0,0.5); }}
.spacer {{ flex-grow: 1; }}
.text {{ margin-bottom: 16px; width: 100%; }}
.title {{ display: inline-block; max-width: 100%; margin: 0 0 8px 0; padding: 8px; font-family: "Oswald", sans-serif; font-size: 36px; font-weight: 700; line-height: 1.25; background: rgba(0,0,0,0.1); border-radius: 4px; overflow-wrap: break-word; text-shadow: 1px 1px 3px rgba(0,0,0,0.5); }}
.content {{ margin: 0; padding: 8px; font-size: 20px; line-height: 1.625; white-space: pre-wrap; background: rgba(0,0,0,0.1); border-radius: 4px; overflow-wrap: break-word; text-shadow: 1px 1px 2px rgba(0,0,0,0.4); }}
.highlight {{ padding: 0.1em 0.3em; border-radius: 3px; box-decoration-break: clone; -webkit-box-decoration-break: clone; }}
.footer {{ margin-top: auto; padding-top: 8px; text-align: center; border-top: 1px solid rgba(255,255,255,0.2); }}
.footer p {{ margin: 0; font-size: 14px; font-weight: 500; letter-spacing: 0.025em; color: rgba(226,232,240,0.9); text-shadow: 1px 1px 2px rgba(0,0,0,0.4); }}
"#,
        width = width,
        height = height
    )
}

/// A run of content text, plain or highlighted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSegment<'a> {
    Plain(&'a str),
    Highlight { color: &'a str, text: &'a str },
}

const HIGHLIGHT_OPEN: &str = "<highlight color=\"";
const HIGHLIGHT_CLOSE: &str = "</highlight>";

/// Split content on `<highlight color="...">...</highlight>` markup.
///
/// Malformed tags are left in the plain text.
pub fn parse_highlighted_text(text: &str) -> Vec<TextSegment<'_>> {
    let mut segments = Vec::new();
    let mut plain_start = 0;
    let mut search_from = 0;

    while let Some(rel) = text[search_from..].find(HIGHLIGHT_OPEN) {
        let tag_start = search_from + rel;
        let color_start = tag_start + HIGHLIGHT_OPEN.len();

        let parsed = text[color_start..].find('"').and_then(|color_len| {
            let color = &text[color_start..color_start + color_len];
            let after_color = color_start + color_len;
            if color.is_empty() || !text[after_color..].starts_with("\">") {
                return None;
            }
            let body_start = after_color + 2;
            text[body_start..].find(HIGHLIGHT_CLOSE).map(|body_len| {
                let body = &text[body_start..body_start + body_len];
                (color, body, body_start + body_len + HIGHLIGHT_CLOSE.len())
            })
        });

        match parsed {
            Some((color, body, tag_end)) => {
                if tag_start > plain_start {
                    segments.push(TextSegment::Plain(&text[plain_start..tag_start]));
                }
                segments.push(TextSegment::Highlight { color, text: body });
                plain_start = tag_end;
                search_from = tag_end;
            }
            None => search_from = color_start,
        }
    }

    if plain_start < text.len() {
        segments.push(TextSegment::Plain(&text[plain_start..]));
    }

    segments
}

fn render_highlighted_text(text: &str) -> String {
    parse_highlighted_text(text)
        .into_iter()
        .map(|segment| match segment {
            TextSegment::Plain(plain) => escape_html(plain),
            TextSegment::Highlight { color, text } => format!(
                r#"<span class="highlight" style="background-color: {}; color: {};">{}</span>"#,
                escape_html(color),
                text_color_for_background(color),
                escape_html(text)
            ),
        })
        .collect()
}

/// Black or white text, whichever reads better on `bg_color`
pub fn text_color_for_background(bg_color: &str) -> &'static str {
    const WHITE: &str = "#FFFFFF";
    const BLACK: &str = "#000000";

    if bg_color.is_empty() {
        return WHITE;
    }

    let Some(hex) = bg_color.strip_prefix('#') else {
        let lowered = bg_color.to_lowercase();
        return if LIGHT_NAMED_COLORS.contains(&lowered.as_str()) {
            BLACK
        } else {
            WHITE
        };
    };

    // Leading hex digits only, like a lenient integer parse
    let digits: String = hex
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .take(8)
        .collect();
    let Ok(rgb) = u32::from_str_radix(&digits, 16) else {
        return WHITE;
    };

    let r = ((rgb >> 16) & 0xff) as f64;
    let g = ((rgb >> 8) & 0xff) as f64;
    let b = (rgb & 0xff) as f64;

    // HSP perceived brightness
    let hsp = (0.299 * r * r + 0.587 * g * g + 0.114 * b * b).sqrt();
    if hsp > 127.5 {
        BLACK
    } else {
        WHITE
    }
}

/// Escape text for use in HTML content and quoted attributes
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Utility function to write a slide surface to an HTML file
pub fn write_surface_to_file(surface: &SlideSurface, output_path: &Path) -> Result<()> {
    info!("Writing slide {} to file: {:?}", surface.index + 1, output_path);
    ensure_parent_directory_exists(output_path)?;
    fs::write(output_path, &surface.html).map_err(CarouselError::FileReadError)?;
    Ok(())
}
