use carousel_slides::export::ExportState;
use carousel_slides::{
    export_all_as_archive, export_all_text, export_single_image, ArchiveFormat, AspectRatio,
    Branding, CaptureOverrides, CarouselError, CarouselRun, DirectoryDownloader, Downloader,
    Phase, Rasterizer, RecordingProgress, Result, SlideRecord, SlideSpec, SlideSurface, SurfaceSet,
};
use image::{Rgba, RgbaImage};
use std::collections::HashSet;
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use tempfile::TempDir;
use zip::ZipArchive;

/// Paints a solid bitmap at the requested size, failing for selected slides
struct FakeRasterizer {
    failing: HashSet<String>,
}

impl FakeRasterizer {
    fn new() -> Self {
        Self {
            failing: HashSet::new(),
        }
    }

    fn failing(ids: &[&str]) -> Self {
        Self {
            failing: ids.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Rasterizer for FakeRasterizer {
    fn capture(
        &self,
        surface: Option<&SlideSurface>,
        overrides: &CaptureOverrides,
    ) -> Result<RgbaImage> {
        let surface = surface
            .ok_or_else(|| CarouselError::CaptureError("Slide element not found".to_string()))?;
        if self.failing.contains(&surface.slide_id) {
            return Err(CarouselError::CaptureError(format!(
                "canvas tainted for {}",
                surface.slide_id
            )));
        }
        let (width, height) = overrides.output_size(surface);
        // Keep test bitmaps small
        Ok(RgbaImage::from_pixel(
            (width / 40).max(1),
            (height / 40).max(1),
            Rgba([10, 20, 30, 255]),
        ))
    }
}

/// Refuses every download
struct BrokenDownloader;

impl Downloader for BrokenDownloader {
    fn save(&mut self, filename: &str, _mime: &str, _bytes: &[u8]) -> Result<PathBuf> {
        Err(CarouselError::FileReadError(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            format!("cannot write {}", filename),
        )))
    }
}

fn create_run(titles: &[&str]) -> CarouselRun {
    let branding = Branding::default();
    let records = titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            let spec = SlideSpec::with_id(&format!("s{}", i + 1), title, "Body text");
            SlideRecord::from_spec(&spec, AspectRatio::Square, &branding)
        })
        .collect();
    CarouselRun {
        records,
        aspect_ratio: AspectRatio::Square,
        current_index: 0,
    }
}

fn archive_entries(path: &PathBuf) -> Vec<String> {
    let bytes = fs::read(path).expect("Failed to read archive");
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("Archive should be a valid ZIP");
    (0..archive.len())
        .map(|i| archive.by_index(i).expect("entry").name().to_string())
        .collect()
}

#[test]
fn test_archive_contains_every_captured_slide() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut downloader = DirectoryDownloader::new(temp_dir.path()).expect("downloader");
    let run = create_run(&["Launch Week", "Two", "Three"]);
    let surfaces = SurfaceSet::mount(&run);
    let mut progress = RecordingProgress::new();

    let report = export_all_as_archive(
        &run,
        &surfaces,
        ArchiveFormat::Png,
        &FakeRasterizer::new(),
        &mut downloader,
        &mut progress,
    )
    .expect("export should succeed")
    .expect("run is not empty");

    assert_eq!(report.state, ExportState::Succeeded);
    assert_eq!(report.artifact, temp_dir.path().join("Launch_Week_slides.zip"));
    assert_eq!(
        archive_entries(&report.artifact),
        vec![
            "Launch_Week_slide_1.png",
            "Launch_Week_slide_2.png",
            "Launch_Week_slide_3.png"
        ]
    );
    assert_eq!(progress.percents(), vec![33, 67, 100]);
    assert!(progress
        .updates
        .iter()
        .all(|u| u.phase == Phase::PackagingArchive));
}

#[test]
fn test_archive_skips_failed_captures() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut downloader = DirectoryDownloader::new(temp_dir.path()).expect("downloader");
    let run = create_run(&["Deck", "Two", "Three", "Four", "Five"]);
    let surfaces = SurfaceSet::mount(&run);
    let mut progress = RecordingProgress::new();

    let report = export_all_as_archive(
        &run,
        &surfaces,
        ArchiveFormat::Jpeg,
        &FakeRasterizer::failing(&["s2", "s4"]),
        &mut downloader,
        &mut progress,
    )
    .unwrap()
    .unwrap();

    assert_eq!(report.captured(), 3);
    assert_eq!(report.skipped(), 2);
    assert_eq!(
        archive_entries(&report.artifact),
        vec!["Deck_slide_1.jpeg", "Deck_slide_3.jpeg", "Deck_slide_5.jpeg"]
    );
    assert_eq!(progress.updates.len(), 5);
    assert_eq!(progress.last_percent(), Some(100));
}

#[test]
fn test_archive_with_absent_surface() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut downloader = DirectoryDownloader::new(temp_dir.path()).expect("downloader");
    let run = create_run(&["Deck", "Two"]);
    let mut surfaces = SurfaceSet::mount(&run);
    surfaces.unmount("s1");
    let mut progress = RecordingProgress::new();

    let report = export_all_as_archive(
        &run,
        &surfaces,
        ArchiveFormat::Png,
        &FakeRasterizer::new(),
        &mut downloader,
        &mut progress,
    )
    .expect("a missing surface only skips that slide")
    .unwrap();

    assert_eq!(archive_entries(&report.artifact), vec!["Deck_slide_2.png"]);
    assert_eq!(progress.last_percent(), Some(100));
}

#[test]
fn test_archive_of_empty_run_is_a_no_op() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut downloader = DirectoryDownloader::new(temp_dir.path()).expect("downloader");
    let run = CarouselRun::default();
    let mut progress = RecordingProgress::new();

    let report = export_all_as_archive(
        &run,
        &SurfaceSet::default(),
        ArchiveFormat::Png,
        &FakeRasterizer::new(),
        &mut downloader,
        &mut progress,
    )
    .unwrap();

    assert!(report.is_none());
    assert!(progress.updates.is_empty());
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_archive_download_failure_is_fatal() {
    let run = create_run(&["Deck", "Two"]);
    let before = run.clone();
    let surfaces = SurfaceSet::mount(&run);
    let mut progress = RecordingProgress::new();

    let result = export_all_as_archive(
        &run,
        &surfaces,
        ArchiveFormat::Png,
        &FakeRasterizer::new(),
        &mut BrokenDownloader,
        &mut progress,
    );

    match result {
        Err(CarouselError::ArchiveFinalizeError(message)) => {
            assert!(message.contains("cannot write Deck_slides.zip"))
        }
        other => panic!("expected a finalize error, got {:?}", other.map(|r| r.is_some())),
    }
    assert_eq!(run, before);
}

#[test]
fn test_single_image_export() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut downloader = DirectoryDownloader::new(temp_dir.path()).expect("downloader");
    let run = create_run(&["Deck", "Two"]);
    let mut surfaces = SurfaceSet::mount(&run);

    let path = export_single_image(
        &run,
        &surfaces,
        "s2",
        "Deck_2_image.png",
        &FakeRasterizer::new(),
        &mut downloader,
    )
    .expect("single image export should succeed");

    let saved = image::open(&path).expect("saved file should be an image");
    assert_eq!((saved.width(), saved.height()), (40, 40));

    surfaces.unmount("s1");
    let missing = export_single_image(
        &run,
        &surfaces,
        "s1",
        "Deck_1_image.png",
        &FakeRasterizer::new(),
        &mut downloader,
    );
    assert!(matches!(missing, Err(CarouselError::CaptureError(_))));
    assert!(!temp_dir.path().join("Deck_1_image.png").exists());
}

#[test]
fn test_text_export_writes_identical_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut downloader = DirectoryDownloader::new(temp_dir.path()).expect("downloader");
    let run = create_run(&["Deck", "Two"]);

    let first = export_all_text(&run, "first.json", &mut downloader)
        .unwrap()
        .expect("text export path");
    let second = export_all_text(&run, "second.json", &mut downloader)
        .unwrap()
        .expect("text export path");

    let first = fs::read(first).unwrap();
    assert_eq!(first, fs::read(second).unwrap());

    let parsed: serde_json::Value = serde_json::from_slice(&first).unwrap();
    let entries = parsed.as_array().expect("array of slides");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1]["title"], "Two");
    assert_eq!(entries[0]["displayBrandName"], "BTGenZ");
    assert_eq!(entries[0]["titleFontColor"], "#FFFFFF");

    let empty = export_all_text(&CarouselRun::default(), "empty.json", &mut downloader).unwrap();
    assert!(empty.is_none());
    assert!(!temp_dir.path().join("empty.json").exists());
}
