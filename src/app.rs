// ABOUTME: Application session tying the form, slide store, generation loop and exports together
// ABOUTME: Owns the error banner and status shown to the user between operations

use crate::batch::BatchReport;
use crate::config::DEFAULT_API_KEY_ERROR_MESSAGE;
use crate::download::Downloader;
use crate::errors::{CarouselError, Result};
use crate::export::{
    export_all_as_archive, export_all_text, export_single_image, slide_image_filename,
    text_export_filename, ArchiveFormat, ExportReport,
};
use crate::form::CarouselForm;
use crate::genai::ImageGenerator;
use crate::generation::generate_backgrounds;
use crate::model::CarouselRun;
use crate::progress::{Phase, StatusReporter};
use crate::rasterize::Rasterizer;
use crate::store::{Direction, SlideStore};
use crate::surface::SurfaceSet;
use log::{error, info, warn};
use std::path::PathBuf;

/// One user session: a carousel run plus the collaborators that act on it
pub struct CarouselStudio {
    api_key: Option<String>,
    generator: Box<dyn ImageGenerator>,
    rasterizer: Box<dyn Rasterizer>,
    downloader: Box<dyn Downloader>,
    store: SlideStore,
    surfaces: SurfaceSet,
    status: StatusReporter,
    banner: Option<String>,
}

impl CarouselStudio {
    pub fn new(
        api_key: Option<String>,
        generator: Box<dyn ImageGenerator>,
        rasterizer: Box<dyn Rasterizer>,
        downloader: Box<dyn Downloader>,
    ) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        let banner = if api_key.is_none() {
            warn!("API key is not configured; image generation is disabled");
            Some(DEFAULT_API_KEY_ERROR_MESSAGE.to_string())
        } else {
            None
        };

        Self {
            api_key,
            generator,
            rasterizer,
            downloader,
            store: SlideStore::new(),
            surfaces: SurfaceSet::default(),
            status: StatusReporter::new(),
            banner,
        }
    }

    /// The session-level error, if any
    pub fn error(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn run(&self) -> &CarouselRun {
        self.store.run()
    }

    pub fn surfaces(&self) -> &SurfaceSet {
        &self.surfaces
    }

    pub fn status(&self) -> &StatusReporter {
        &self.status
    }

    /// Submit the form without generating any background.
    ///
    /// Used for text export and HTML previews, which need no API key.
    pub fn load_carousel(&mut self, form: &CarouselForm) -> Result<()> {
        let slides = form.valid_slides();
        let submitted = form
            .branding()
            .and_then(|branding| self.store.submit(&slides, form.aspect_ratio, &branding));
        if let Err(err) = submitted {
            return Err(self.raise(err));
        }

        self.surfaces = SurfaceSet::mount(self.store.run());
        Ok(())
    }

    /// Submit the form and generate a background for every slide
    pub fn generate_carousel(&mut self, form: &CarouselForm) -> Result<BatchReport<()>> {
        let Some(api_key) = self.api_key.clone() else {
            return Err(self.raise(CarouselError::ConfigurationError(
                DEFAULT_API_KEY_ERROR_MESSAGE.to_string(),
            )));
        };

        self.banner = None;
        self.load_carousel(form)?;

        self.status.begin(Phase::GeneratingImages);
        let result = generate_backgrounds(
            &mut self.store,
            self.generator.as_ref(),
            &api_key,
            &mut self.status,
        );
        self.status.reset();
        self.surfaces = SurfaceSet::mount(self.store.run());

        match result {
            Ok(report) => {
                info!(
                    "Carousel ready: {} of {} backgrounds generated",
                    report.completed(),
                    self.store.run().len()
                );
                Ok(report)
            }
            Err(err) => Err(self.raise(err)),
        }
    }

    pub fn next_slide(&mut self) {
        self.store.advance(Direction::Forward);
    }

    pub fn prev_slide(&mut self) {
        self.store.advance(Direction::Backward);
    }

    pub fn go_to_slide(&mut self, index: usize) {
        self.store.go_to(index);
    }

    /// Download one slide as a PNG.
    ///
    /// Only slides whose background finished generating can be downloaded.
    pub fn download_slide_image(&mut self, slide_id: &str) -> Result<PathBuf> {
        let run = self.store.run();
        let Some(index) = run.position(slide_id) else {
            return Err(self.raise(CarouselError::UnknownSlide(slide_id.to_string())));
        };
        if !run.records[index].is_export_ready() {
            warn!("Slide {} has no background yet, not downloading", index + 1);
            return Err(CarouselError::SlideNotReady(slide_id.to_string()));
        }
        let filename = slide_image_filename(run, index);

        let result = export_single_image(
            run,
            &self.surfaces,
            slide_id,
            &filename,
            self.rasterizer.as_ref(),
            self.downloader.as_mut(),
        );
        result.map_err(|err| self.raise(err))
    }

    /// Download the text of every slide as JSON
    pub fn download_all_text(&mut self) -> Result<Option<PathBuf>> {
        let run = self.store.run();
        let filename = text_export_filename(run);
        export_all_text(run, &filename, self.downloader.as_mut())
    }

    /// Download every slide packed into one ZIP archive
    pub fn download_all_slides_zip(&mut self, format: ArchiveFormat) -> Result<Option<ExportReport>> {
        self.status.begin(Phase::PackagingArchive);
        let result = export_all_as_archive(
            self.store.run(),
            &self.surfaces,
            format,
            self.rasterizer.as_ref(),
            self.downloader.as_mut(),
            &mut self.status,
        );
        self.status.reset();
        result.map_err(|err| self.raise(err))
    }

    fn raise(&mut self, err: CarouselError) -> CarouselError {
        error!("{}", err);
        self.banner = Some(err.to_string());
        err
    }
}
