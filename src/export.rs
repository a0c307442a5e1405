// ABOUTME: Export pipeline for the carousel-slides application
// ABOUTME: Produces single slide images, ZIP archives of all slides and JSON text dumps

use crate::batch::{run_sequential, ItemFailure, ItemOutcome};
use crate::errors::{CarouselError, Result};
use crate::model::CarouselRun;
use crate::progress::{Phase, ProgressSink};
use crate::rasterize::{CaptureOverrides, Rasterizer};
use crate::download::Downloader;
use crate::surface::SurfaceSet;
use crate::utils::sanitize_file_stem;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ColorType, DynamicImage, ImageEncoder, RgbaImage};
use log::{debug, info, warn};
use serde::Serialize;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::time::Instant;
use zip::{write::FileOptions, CompressionMethod, ZipWriter};

/// JPEG quality used for archived slides (0.9 on a 0-1 scale)
pub const JPEG_QUALITY: u8 = 90;

/// Image format for archived slides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ArchiveFormat {
    #[default]
    Png,
    Jpeg,
}

impl ArchiveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Png => "png",
            ArchiveFormat::Jpeg => "jpeg",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            ArchiveFormat::Png => "image/png",
            ArchiveFormat::Jpeg => "image/jpeg",
        }
    }
}

/// What an export produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    SingleImage,
    Zip,
    TextJson,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportState {
    Idle,
    Running,
    Succeeded,
    FailedFatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    Captured,
    Skipped,
}

/// Transient state of one export; reads the run, never writes it
#[derive(Debug)]
pub struct ExportJob<'a> {
    run: &'a CarouselRun,
    kind: ArtifactKind,
    state: ExportState,
    items: Vec<ItemState>,
    completed_count: usize,
}

impl<'a> ExportJob<'a> {
    pub fn new(run: &'a CarouselRun, kind: ArtifactKind) -> Self {
        Self {
            run,
            kind,
            state: ExportState::Idle,
            items: vec![ItemState::Pending; run.len()],
            completed_count: 0,
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn state(&self) -> ExportState {
        self.state
    }

    pub fn items(&self) -> &[ItemState] {
        &self.items
    }

    pub fn completed_count(&self) -> usize {
        self.completed_count
    }

    fn start(&mut self) {
        debug_assert_eq!(self.state, ExportState::Idle);
        self.state = ExportState::Running;
        info!("Exporting {:?} for {} slides", self.kind, self.run.len());
    }

    fn settle(&mut self, index: usize, state: ItemState) {
        if let Some(item) = self.items.get_mut(index) {
            *item = state;
            self.completed_count += 1;
        }
    }

    fn succeed(&mut self) {
        self.state = ExportState::Succeeded;
    }

    fn fail(&mut self, err: &CarouselError) {
        self.state = ExportState::FailedFatal;
        warn!("{:?} export failed: {}", self.kind, err);
    }
}

/// Summary of a finished archive export
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub state: ExportState,
    pub items: Vec<ItemState>,
    pub entries: Vec<String>,
    pub artifact: PathBuf,
}

impl ExportReport {
    pub fn captured(&self) -> usize {
        self.items.iter().filter(|s| **s == ItemState::Captured).count()
    }

    pub fn skipped(&self) -> usize {
        self.items.iter().filter(|s| **s == ItemState::Skipped).count()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TextExportEntry<'a> {
    title: &'a str,
    content: &'a str,
    image_prompt: &'a str,
    display_brand_name: &'a str,
    footer_text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    logo_url: Option<&'a str>,
    title_font_color: &'a str,
}

/// File-name-safe carousel name
pub fn carousel_file_stem(run: &CarouselRun) -> String {
    sanitize_file_stem(run.carousel_title())
}

pub fn text_export_filename(run: &CarouselRun) -> String {
    format!("{}_content.json", carousel_file_stem(run))
}

pub fn archive_filename(run: &CarouselRun) -> String {
    format!("{}_slides.zip", carousel_file_stem(run))
}

pub fn slide_image_filename(run: &CarouselRun, index: usize) -> String {
    let stem = carousel_file_stem(run);
    let stem = if stem.is_empty() { "slide".to_string() } else { stem };
    format!("{}_{}_image.png", stem, index + 1)
}

fn archive_entry_name(stem: &str, index: usize, format: ArchiveFormat) -> String {
    format!("{}_slide_{}.{}", stem, index + 1, format.extension())
}

/// Encode a captured slide
pub fn encode_bitmap(bitmap: &RgbaImage, format: ArchiveFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    match format {
        ArchiveFormat::Png => {
            PngEncoder::new(&mut buffer).write_image(
                bitmap.as_raw(),
                bitmap.width(),
                bitmap.height(),
                ColorType::Rgba8,
            )?;
        }
        ArchiveFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgba8(bitmap.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY).encode(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ColorType::Rgb8,
            )?;
        }
    }
    Ok(buffer)
}

/// Rasterize one slide and download it as PNG
pub fn export_single_image(
    run: &CarouselRun,
    surfaces: &SurfaceSet,
    slide_id: &str,
    filename: &str,
    rasterizer: &dyn Rasterizer,
    downloader: &mut dyn Downloader,
) -> Result<PathBuf> {
    let index = run
        .position(slide_id)
        .ok_or_else(|| CarouselError::UnknownSlide(slide_id.to_string()))?;

    let mut job = ExportJob::new(run, ArtifactKind::SingleImage);
    job.start();

    let result = rasterizer
        .capture(surfaces.get(slide_id), &CaptureOverrides::default())
        .and_then(|bitmap| encode_bitmap(&bitmap, ArchiveFormat::Png))
        .and_then(|png| downloader.save(filename, ArchiveFormat::Png.mime(), &png));

    match result {
        Ok(path) => {
            job.settle(index, ItemState::Captured);
            job.succeed();
            info!("Slide {} saved to {:?}", index + 1, path);
            Ok(path)
        }
        Err(err) => {
            job.settle(index, ItemState::Skipped);
            job.fail(&err);
            Err(err)
        }
    }
}

/// Pretty-printed JSON of every slide's text and branding
pub fn text_export_json(run: &CarouselRun) -> Result<String> {
    let entries = run
        .records
        .iter()
        .map(|r| TextExportEntry {
            title: &r.title,
            content: &r.content,
            image_prompt: &r.image_prompt,
            display_brand_name: &r.branding.display_brand_name,
            footer_text: &r.branding.footer_text,
            logo_url: r.branding.logo_url.as_deref(),
            title_font_color: &r.branding.title_font_color,
        })
        .collect::<Vec<_>>();
    Ok(serde_json::to_string_pretty(&entries)?)
}

/// Download the text of all slides as JSON; `None` when there is nothing to export
pub fn export_all_text(
    run: &CarouselRun,
    filename: &str,
    downloader: &mut dyn Downloader,
) -> Result<Option<PathBuf>> {
    if run.is_empty() {
        info!("No slides to export as text");
        return Ok(None);
    }

    let mut job = ExportJob::new(run, ArtifactKind::TextJson);
    job.start();

    let result = text_export_json(run)
        .and_then(|json| downloader.save(filename, "application/json", json.as_bytes()));

    match result {
        Ok(path) => {
            job.succeed();
            Ok(Some(path))
        }
        Err(err) => {
            job.fail(&err);
            Err(err)
        }
    }
}

/// Capture every slide into one ZIP archive and download it.
///
/// Slides that cannot be captured or encoded are skipped. Only failures to
/// build, finalize or save the archive abort the export. Returns `None`
/// when the run has no slides.
pub fn export_all_as_archive(
    run: &CarouselRun,
    surfaces: &SurfaceSet,
    format: ArchiveFormat,
    rasterizer: &dyn Rasterizer,
    downloader: &mut dyn Downloader,
    sink: &mut dyn ProgressSink,
) -> Result<Option<ExportReport>> {
    if run.is_empty() {
        info!("No slides to package");
        return Ok(None);
    }

    let stem = carousel_file_stem(run);
    let overrides = CaptureOverrides::default();
    let mut job = ExportJob::new(run, ArtifactKind::Zip);
    job.start();

    let start_time = Instant::now();
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    // PNG and JPEG payloads are already compressed
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);

    let batch = run_sequential(&run.records, Phase::PackagingArchive, sink, |i, record| {
        let encoded = rasterizer
            .capture(surfaces.get(&record.id), &overrides)
            .map_err(|e| {
                warn!("Error capturing slide {} ({}): {}", i + 1, record.id, e);
                e
            })
            .and_then(|bitmap| {
                encode_bitmap(&bitmap, format).map_err(|e| {
                    warn!("Could not encode slide {}: {}", i + 1, e);
                    e
                })
            });
        let bytes = match encoded {
            Ok(bytes) => bytes,
            Err(e) => {
                job.settle(i, ItemState::Skipped);
                return Err(ItemFailure::Skip(e));
            }
        };

        let entry = archive_entry_name(&stem, i, format);
        info!("Adding {} to archive", entry);
        zip.start_file(entry.as_str(), options)
            .map_err(|e| ItemFailure::Fatal(e.into()))?;
        zip.write_all(&bytes).map_err(|e| {
            ItemFailure::Fatal(CarouselError::ArchiveFinalizeError(format!(
                "Failed to write {}: {}",
                entry, e
            )))
        })?;
        job.settle(i, ItemState::Captured);
        debug!("{} of {} slides settled", job.completed_count(), run.len());
        Ok(entry)
    });

    let batch = match batch {
        Ok(batch) => batch,
        Err(err) => {
            job.fail(&err);
            return Err(err);
        }
    };

    let entries: Vec<String> = batch
        .outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            ItemOutcome::Completed(entry) => Some(entry),
            ItemOutcome::Skipped(_) => None,
        })
        .collect();

    info!("Finalizing ZIP archive");
    let finalized = zip
        .finish()
        .map(Cursor::into_inner)
        .map_err(|e| CarouselError::ArchiveFinalizeError(e.to_string()))
        .and_then(|bytes| {
            downloader
                .save(&archive_filename(run), "application/zip", &bytes)
                .map_err(|e| CarouselError::ArchiveFinalizeError(e.to_string()))
        });

    let artifact = match finalized {
        Ok(path) => path,
        Err(err) => {
            job.fail(&err);
            return Err(err);
        }
    };
    job.succeed();

    info!(
        "Archive complete. Packaged {} of {} slides in {:.2} seconds",
        entries.len(),
        run.len(),
        start_time.elapsed().as_secs_f64()
    );

    Ok(Some(ExportReport {
        state: job.state(),
        items: job.items().to_vec(),
        entries,
        artifact,
    }))
}
