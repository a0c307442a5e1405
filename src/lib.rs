// ABOUTME: Library module for the carousel-slides program.
// ABOUTME: Contains slide state, image generation, slide composition and export functionality.

// Reexport modules
pub mod app;
pub mod batch;
pub mod config;
pub mod download;
pub mod errors;
pub mod export;
pub mod form;
pub mod genai;
pub mod generation;
pub mod model;
pub mod progress;
pub mod rasterize;
pub mod resources;
pub mod store;
pub mod surface;
pub mod utils;

// Reexport common types and functions
pub use app::CarouselStudio;
pub use batch::{run_sequential, BatchReport, ItemFailure, ItemOutcome};
pub use config::Config;
pub use download::{DirectoryDownloader, Downloader};
pub use errors::{CarouselError, Result};
pub use export::{
    export_all_as_archive, export_all_text, export_single_image, text_export_json, ArchiveFormat,
    ExportReport,
};
pub use form::CarouselForm;
pub use genai::{GeminiImageClient, ImageGenerator};
pub use generation::generate_backgrounds;
pub use model::{AspectRatio, Branding, CarouselRun, ImageState, SlideRecord, SlideSpec};
pub use progress::{Phase, ProgressSink, ProgressUpdate, RecordingProgress, StatusReporter};
pub use rasterize::{CaptureOverrides, ChromeRasterizer, Rasterizer, RenderConfig};
pub use resources::ResourceFile;
pub use store::{Direction, SlideEvent, SlideStore};
pub use surface::{render_slide_html, write_surface_to_file, SlideSurface, SurfaceSet};

#[cfg(test)]
mod tests;
