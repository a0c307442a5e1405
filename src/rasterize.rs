// ABOUTME: Browser rasterization module for the carousel-slides application
// ABOUTME: Captures slide surfaces to bitmaps using a headless browser

use crate::config::FONT_STYLESHEETS;
use crate::errors::{CarouselError, Result};
use crate::surface::{SlideSurface, SURFACE_ELEMENT_ID};
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::{Emulation, Page, DOM};
use headless_chrome::{Browser, LaunchOptionsBuilder};
use image::RgbaImage;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::env;
use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Style normalization applied to the captured copy of a surface
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOverrides {
    pub neutralize_transforms: bool,
    /// Pin the element to the surface's pixel size
    pub force_dimensions: bool,
    pub transparent_background: bool,
    pub font_stylesheets: Vec<String>,
    pub body_font_family: String,
    /// Device pixel ratio of the output
    pub scale: f64,
}

impl Default for CaptureOverrides {
    fn default() -> Self {
        Self {
            neutralize_transforms: true,
            force_dimensions: true,
            transparent_background: true,
            font_stylesheets: FONT_STYLESHEETS.iter().map(|s| s.to_string()).collect(),
            body_font_family: "\"Inter\", sans-serif".to_string(),
            scale: 2.0,
        }
    }
}

impl CaptureOverrides {
    /// Bitmap size a capture of `surface` should have
    pub fn output_size(&self, surface: &SlideSurface) -> (u32, u32) {
        (
            (surface.width as f64 * self.scale).round() as u32,
            (surface.height as f64 * self.scale).round() as u32,
        )
    }
}

/// Turns a laid-out surface into pixels
pub trait Rasterizer {
    /// Capture `surface`; an absent surface is a `CaptureError`
    fn capture(
        &self,
        surface: Option<&SlideSurface>,
        overrides: &CaptureOverrides,
    ) -> Result<RgbaImage>;
}

/// Configuration for browser rendering
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub window_width: u32,
    pub window_height: u32,
    pub timeout_ms: u64,
    pub browser_path: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 1280,
            timeout_ms: 30000, // 30 seconds
            browser_path: None,
        }
    }
}

struct BrowserSession {
    // Keeps the browser process alive for the tab
    _browser: Browser,
    tab: Arc<Tab>,
}

/// Rasterizer backed by headless Chrome; the browser starts on first use
pub struct ChromeRasterizer {
    config: RenderConfig,
    session: Mutex<Option<BrowserSession>>,
}

impl ChromeRasterizer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            session: Mutex::new(None),
        }
    }

    fn launch(&self) -> Result<BrowserSession> {
        let mut launch_options_builder = LaunchOptionsBuilder::default();

        launch_options_builder.window_size(Some((self.config.window_width, self.config.window_height)));
        launch_options_builder.headless(true);

        // Use custom browser path if specified
        if let Some(browser_path) = &self.config.browser_path {
            launch_options_builder.path(Some(browser_path.into()));
        } else if let Ok(path) = env::var("BROWSER_PATH") {
            if !path.is_empty() {
                launch_options_builder.path(Some(path.into()));
            }
        }

        let launch_options = launch_options_builder
            .build()
            .map_err(|e| CarouselError::BrowserError {
                message: format!("Failed to build browser options: {:?}", e),
                source: None,
            })?;

        info!("Launching headless browser");
        let browser = Browser::new(launch_options).map_err(|e| {
            let message = format!("Failed to launch browser: {}", e);
            warn!("{}", message);
            CarouselError::BrowserError {
                message,
                source: None,
            }
        })?;

        let tab = browser.new_tab().map_err(|e| CarouselError::BrowserError {
            message: format!("Failed to create new tab: {}", e),
            source: None,
        })?;

        Ok(BrowserSession {
            _browser: browser,
            tab,
        })
    }

    fn capture_with_tab(
        &self,
        tab: &Tab,
        surface: &SlideSurface,
        overrides: &CaptureOverrides,
    ) -> Result<RgbaImage> {
        let page_path = env::temp_dir().join(format!(
            "carousel_slide_{}_{}.html",
            surface.index + 1,
            uuid::Uuid::new_v4()
        ));
        fs::write(&page_path, &surface.html).map_err(CarouselError::FileReadError)?;

        let result = self.capture_page(tab, &page_path, surface, overrides);

        if let Err(e) = fs::remove_file(&page_path) {
            warn!("Failed to clean up page file {:?}: {}", page_path, e);
        }
        result
    }

    fn capture_page(
        &self,
        tab: &Tab,
        page_path: &std::path::Path,
        surface: &SlideSurface,
        overrides: &CaptureOverrides,
    ) -> Result<RgbaImage> {
        let url = url::Url::from_file_path(page_path).map_err(|_| {
            CarouselError::CaptureError(format!("Invalid page path: {:?}", page_path))
        })?;
        debug!("Opening page at URL: {}", url);

        tab.navigate_to(url.as_str())
            .map_err(|e| capture_error("Failed to navigate to slide", e))?;
        tab.wait_until_navigated()
            .map_err(|e| capture_error("Navigation failed", e))?;
        tab.wait_for_element_with_custom_timeout(
            &format!("#{}", SURFACE_ELEMENT_ID),
            Duration::from_millis(self.config.timeout_ms),
        )
        .map_err(|e| capture_error("Slide surface never appeared", e))?;

        if overrides.transparent_background {
            tab.call_method(Emulation::SetDefaultBackgroundColorOverride {
                color: Some(DOM::RGBA {
                    r: 0,
                    g: 0,
                    b: 0,
                    a: Some(0.0),
                }),
            })
            .map_err(|e| capture_error("Failed to clear page background", e))?;
        }

        let overrides_json = serde_json::to_string(overrides)?;
        let script = apply_overrides_script(&overrides_json, surface);
        tab.evaluate(&script, false)
            .map_err(|e| capture_error("Failed to apply capture overrides", e))?;

        // Fallback fonts would be baked into the bitmap
        tab.evaluate(WAIT_FOR_FONTS_SCRIPT, true)
            .map_err(|e| capture_error("Failed waiting for fonts", e))?;

        let clip = Page::Viewport {
            x: 0.0,
            y: 0.0,
            width: surface.width as f64,
            height: surface.height as f64,
            scale: overrides.scale,
        };
        let png = tab
            .capture_screenshot(
                Page::CaptureScreenshotFormatOption::Png,
                None,
                Some(clip),
                true,
            )
            .map_err(|e| capture_error("Failed to capture screenshot", e))?;

        let bitmap = image::load_from_memory_with_format(&png, image::ImageFormat::Png)
            .map_err(|e| CarouselError::CaptureError(format!("Unreadable screenshot: {}", e)))?
            .to_rgba8();
        Ok(bitmap)
    }
}

impl Rasterizer for ChromeRasterizer {
    fn capture(
        &self,
        surface: Option<&SlideSurface>,
        overrides: &CaptureOverrides,
    ) -> Result<RgbaImage> {
        let surface = surface.ok_or_else(|| {
            CarouselError::CaptureError("Slide surface is not mounted".to_string())
        })?;

        let start_time = Instant::now();
        let bitmap = with_session(
            &self.session,
            || self.launch(),
            |session| self.capture_with_tab(&session.tab, surface, overrides),
        )?;

        info!(
            "Captured slide {} ({}x{}) in {:.2} seconds",
            surface.index + 1,
            bitmap.width(),
            bitmap.height(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(bitmap)
    }
}

/// Run `op` against the cached session, launching one if needed.
///
/// A failed `op` drops the session, so a crashed browser is replaced on the
/// next call instead of failing every later capture.
fn with_session<S, T>(
    slot: &Mutex<Option<S>>,
    launch: impl FnOnce() -> Result<S>,
    op: impl FnOnce(&S) -> Result<T>,
) -> Result<T> {
    let mut slot = slot.lock();
    let session = match slot.take() {
        Some(session) => session,
        None => launch()?,
    };

    let result = op(&session);
    if result.is_ok() {
        *slot = Some(session);
    } else {
        warn!("Discarding browser session after a failed capture");
    }
    result
}

fn capture_error(context: &str, err: impl std::fmt::Display) -> CarouselError {
    CarouselError::CaptureError(format!("{}: {}", context, err))
}

const WAIT_FOR_FONTS_SCRIPT: &str = r#"
    (async () => {
        const links = Array.from(document.querySelectorAll('link[rel="stylesheet"]'));
        await Promise.all(links.map(link => link.sheet ? Promise.resolve() : new Promise(resolve => {
            link.addEventListener('load', resolve);
            link.addEventListener('error', resolve);
        })));
        await document.fonts.ready;
        return document.fonts.size;
    })()
"#;

/// Script normalizing the page before capture: the loaded page is a fresh
/// copy of the surface, so it gets the overrides a cloned subtree would.
fn apply_overrides_script(overrides_json: &str, surface: &SlideSurface) -> String {
    format!(
        r#"
        (function () {{
            var o = {overrides};
            var html = document.documentElement;
            var body = document.body;
            var el = document.getElementById('{element_id}');
            [html, body].forEach(function (node) {{
                node.style.setProperty('height', 'auto', 'important');
                node.style.setProperty('overflow', 'hidden', 'important');
            }});
            body.style.setProperty('margin', '0', 'important');
            body.style.setProperty('padding', '0', 'important');
            if (o.neutralizeTransforms) {{
                body.style.setProperty('transform', 'none', 'important');
            }}
            if (o.transparentBackground) {{
                html.style.setProperty('background', 'transparent', 'important');
                body.style.setProperty('background', 'transparent', 'important');
            }}
            if (el) {{
                if (o.forceDimensions) {{
                    el.style.setProperty('width', '{width}px', 'important');
                    el.style.setProperty('height', '{height}px', 'important');
                    el.style.setProperty('box-sizing', 'border-box', 'important');
                }}
                el.style.setProperty('margin', '0', 'important');
                if (o.neutralizeTransforms) {{
                    el.style.setProperty('transform', 'none', 'important');
                }}
            }}
            var present = Array.from(document.querySelectorAll('link[rel="stylesheet"]')).map(function (l) {{ return l.href; }});
            o.fontStylesheets.forEach(function (href) {{
                if (present.indexOf(href) === -1) {{
                    var link = document.createElement('link');
                    link.rel = 'stylesheet';
                    link.href = href;
                    document.head.appendChild(link);
                }}
            }});
            var style = document.createElement('style');
            style.textContent = 'body {{ font-family: ' + o.bodyFontFamily + ' !important; }}';
            document.head.appendChild(style);
            return true;
        }})()
        "#,
        overrides = overrides_json,
        element_id = SURFACE_ELEMENT_ID,
        width = surface.width,
        height = surface.height
    )
}
