// ABOUTME: Background generation loop for a submitted carousel
// ABOUTME: Requests one image per slide in order and records each outcome on its slide

use crate::batch::{run_sequential, BatchReport, ItemFailure};
use crate::errors::{CarouselError, Result};
use crate::genai::ImageGenerator;
use crate::model::SlideId;
use crate::progress::{Phase, ProgressSink};
use crate::store::SlideStore;
use crate::utils::truncate_chars;
use log::{error, info, warn};
use std::time::Instant;

/// Longest upstream message kept on a failed slide
const IMAGE_ERROR_CHARS: usize = 150;

/// Generate a background for every slide of the current run.
///
/// Failures stay on their slide and the loop moves on. A rejected API key
/// stops the loop: every unfinished slide gets the error and it is returned.
pub fn generate_backgrounds(
    store: &mut SlideStore,
    generator: &dyn ImageGenerator,
    api_key: &str,
    sink: &mut dyn ProgressSink,
) -> Result<BatchReport<()>> {
    let jobs: Vec<(SlideId, String)> = store
        .run()
        .records
        .iter()
        .map(|r| (r.id.clone(), r.image_prompt.clone()))
        .collect();

    info!("Generating backgrounds for {} slides", jobs.len());
    let start_time = Instant::now();

    let result = run_sequential(&jobs, Phase::GeneratingImages, sink, |i, (id, prompt)| {
        store.mark_loading(id).map_err(ItemFailure::Fatal)?;

        match generator.generate_image(api_key, prompt) {
            Ok(base64_image) => {
                let url = format!("data:image/png;base64,{}", base64_image);
                store.set_image(id, url).map_err(ItemFailure::Fatal)?;
                Ok(())
            }
            Err(err) => {
                if err.is_generation_failure() {
                    warn!("Image for slide {} was not generated: {}", i + 1, err);
                } else {
                    error!("Error generating image for slide {}: {}", i + 1, err);
                }
                store
                    .set_image_error(id, failure_message(&err))
                    .map_err(ItemFailure::Fatal)?;
                match err {
                    // Every later call would be rejected the same way
                    CarouselError::ConfigurationError(_) => Err(ItemFailure::Fatal(err)),
                    _ => Err(ItemFailure::Skip(err)),
                }
            }
        }
    });

    let report = match result {
        Ok(report) => report,
        Err(err) => {
            if matches!(err, CarouselError::ConfigurationError(_)) {
                fail_unfinished(store, &err)?;
            }
            return Err(err);
        }
    };

    info!(
        "Generated {} of {} backgrounds in {:.2} seconds",
        report.completed(),
        jobs.len(),
        start_time.elapsed().as_secs_f64()
    );

    Ok(report)
}

fn failure_message(err: &CarouselError) -> String {
    format!(
        "Failed to load image. {}",
        truncate_chars(&err.to_string(), IMAGE_ERROR_CHARS)
    )
}

/// Record `err` on every slide that has neither an image nor an error
fn fail_unfinished(store: &mut SlideStore, err: &CarouselError) -> Result<()> {
    let unfinished: Vec<SlideId> = store
        .run()
        .records
        .iter()
        .filter(|r| r.image_url().is_none() && r.image_error().is_none())
        .map(|r| r.id.clone())
        .collect();

    if !unfinished.is_empty() {
        warn!("Stopping generation; {} slides left without a background", unfinished.len());
    }
    for id in unfinished {
        store.set_image_error(&id, failure_message(err))?;
    }
    Ok(())
}
