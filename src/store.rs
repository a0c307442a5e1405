// ABOUTME: Slide record store for the carousel-slides application
// ABOUTME: Owns the current run; per-slide updates go through a pure reducer

use crate::config::{MAX_CONTENT_CHARS, MAX_SLIDES, MAX_TITLE_CHARS};
use crate::errors::{CarouselError, Result};
use crate::model::{AspectRatio, Branding, CarouselRun, ImageState, SlideId, SlideRecord, SlideSpec};
use log::{debug, info, warn};
use std::collections::HashSet;

/// Per-slide status change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlideEvent {
    MarkLoading { id: SlideId },
    ImageReady { id: SlideId, url: String },
    ImageFailed { id: SlideId, message: String },
}

impl SlideEvent {
    pub fn slide_id(&self) -> &str {
        match self {
            SlideEvent::MarkLoading { id }
            | SlideEvent::ImageReady { id, .. }
            | SlideEvent::ImageFailed { id, .. } => id,
        }
    }
}

/// Direction for cyclic navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Compute the next record list from an event.
///
/// Only the record whose id matches the event changes; an unknown id
/// returns the list untouched.
pub fn reduce(mut records: Vec<SlideRecord>, event: &SlideEvent) -> Vec<SlideRecord> {
    let Some(record) = records.iter_mut().find(|r| r.id == event.slide_id()) else {
        return records;
    };

    record.image = match event {
        SlideEvent::MarkLoading { .. } => ImageState::Loading,
        SlideEvent::ImageReady { url, .. } => ImageState::Ready(url.clone()),
        SlideEvent::ImageFailed { message, .. } => ImageState::Failed(message.clone()),
    };

    records
}

/// In-memory owner of the current carousel run
#[derive(Debug, Default)]
pub struct SlideStore {
    run: CarouselRun,
}

impl SlideStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run(&self) -> &CarouselRun {
        &self.run
    }

    pub fn current_index(&self) -> usize {
        self.run.current_index
    }

    /// Replace the whole run with fresh records for `specs`.
    ///
    /// Nothing changes when the submission is rejected.
    pub fn submit(
        &mut self,
        specs: &[SlideSpec],
        aspect_ratio: AspectRatio,
        branding: &Branding,
    ) -> Result<()> {
        validate_specs(specs)?;

        let records = specs
            .iter()
            .map(|spec| SlideRecord::from_spec(spec, aspect_ratio, branding))
            .collect::<Vec<_>>();

        info!(
            "Submitted carousel with {} slides at aspect ratio {}",
            records.len(),
            aspect_ratio
        );

        self.run = CarouselRun {
            records,
            aspect_ratio,
            current_index: 0,
        };
        Ok(())
    }

    /// Move the display pointer one slide, wrapping at both ends
    pub fn advance(&mut self, direction: Direction) {
        let len = self.run.len();
        if len == 0 {
            return;
        }
        self.run.current_index = match direction {
            Direction::Forward => (self.run.current_index + 1) % len,
            Direction::Backward => (self.run.current_index + len - 1) % len,
        };
    }

    pub fn go_to(&mut self, index: usize) {
        let len = self.run.len();
        if len == 0 {
            return;
        }
        self.run.current_index = index % len;
    }

    pub fn mark_loading(&mut self, id: &str) -> Result<()> {
        self.apply(SlideEvent::MarkLoading { id: id.to_string() })
    }

    pub fn set_image(&mut self, id: &str, url: String) -> Result<()> {
        self.apply(SlideEvent::ImageReady {
            id: id.to_string(),
            url,
        })
    }

    pub fn set_image_error(&mut self, id: &str, message: String) -> Result<()> {
        self.apply(SlideEvent::ImageFailed {
            id: id.to_string(),
            message,
        })
    }

    /// Apply one event to the run
    pub fn apply(&mut self, event: SlideEvent) -> Result<()> {
        let Some(record) = self.run.record(event.slide_id()) else {
            warn!("Ignoring update for unknown slide {}", event.slide_id());
            return Err(CarouselError::UnknownSlide(event.slide_id().to_string()));
        };

        let expected_loading = !matches!(event, SlideEvent::MarkLoading { .. });
        if expected_loading && !record.is_image_loading() {
            debug!("Slide {} finished without being marked loading", record.id);
        }

        let records = std::mem::take(&mut self.run.records);
        self.run.records = reduce(records, &event);
        Ok(())
    }
}

fn validate_specs(specs: &[SlideSpec]) -> Result<()> {
    if specs.is_empty() || specs.iter().all(SlideSpec::is_blank) {
        return Err(CarouselError::ValidationError(
            "Please add at least one slide with a title and content.".to_string(),
        ));
    }

    if specs.len() > MAX_SLIDES {
        return Err(CarouselError::ValidationError(format!(
            "A carousel can have at most {} slides, got {}.",
            MAX_SLIDES,
            specs.len()
        )));
    }

    let mut seen = HashSet::with_capacity(specs.len());
    for (i, spec) in specs.iter().enumerate() {
        if !seen.insert(spec.id.as_str()) {
            return Err(CarouselError::ValidationError(format!(
                "Duplicate slide id '{}'",
                spec.id
            )));
        }
        if spec.title.chars().count() > MAX_TITLE_CHARS {
            return Err(CarouselError::ValidationError(format!(
                "Slide {} title is longer than {} characters.",
                i + 1,
                MAX_TITLE_CHARS
            )));
        }
        if spec.content.chars().count() > MAX_CONTENT_CHARS {
            return Err(CarouselError::ValidationError(format!(
                "Slide {} content is longer than {} characters.",
                i + 1,
                MAX_CONTENT_CHARS
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(n: usize) -> Vec<SlideSpec> {
        (0..n)
            .map(|i| SlideSpec::with_id(&format!("s{}", i), &format!("Title {}", i), "Body"))
            .collect()
    }

    fn submitted(n: usize) -> SlideStore {
        let mut store = SlideStore::new();
        store
            .submit(&specs(n), AspectRatio::Square, &Branding::default())
            .expect("submission should succeed");
        store
    }

    #[test]
    fn submit_creates_one_idle_record_per_spec_in_order() {
        let store = submitted(3);
        let run = store.run();
        assert_eq!(run.len(), 3);
        for (i, record) in run.records.iter().enumerate() {
            assert_eq!(record.id, format!("s{}", i));
            assert_eq!(record.image, ImageState::Idle);
        }
        assert_eq!(run.current_index, 0);
    }

    #[test]
    fn rejected_submission_leaves_run_untouched() {
        let mut store = submitted(2);
        let before = store.run().clone();

        let blank = vec![SlideSpec::with_id("x", "  ", "\n")];
        assert!(matches!(
            store.submit(&blank, AspectRatio::Portrait, &Branding::default()),
            Err(CarouselError::ValidationError(_))
        ));
        assert!(store
            .submit(&[], AspectRatio::Portrait, &Branding::default())
            .is_err());
        assert!(store
            .submit(&specs(MAX_SLIDES + 1), AspectRatio::Portrait, &Branding::default())
            .is_err());

        let dupes = vec![SlideSpec::with_id("d", "A", ""), SlideSpec::with_id("d", "B", "")];
        assert!(store
            .submit(&dupes, AspectRatio::Portrait, &Branding::default())
            .is_err());

        let long_title = vec![SlideSpec::with_id("l", &"t".repeat(MAX_TITLE_CHARS + 1), "")];
        assert!(store
            .submit(&long_title, AspectRatio::Portrait, &Branding::default())
            .is_err());

        assert_eq!(store.run(), &before);
    }

    #[test]
    fn advance_is_cyclic() {
        let mut store = submitted(4);
        store.go_to(2);
        for _ in 0..4 {
            store.advance(Direction::Forward);
        }
        assert_eq!(store.current_index(), 2);

        store.go_to(0);
        store.advance(Direction::Backward);
        assert_eq!(store.current_index(), 3);
    }

    #[test]
    fn navigation_on_empty_run_is_noop() {
        let mut store = SlideStore::new();
        store.advance(Direction::Forward);
        store.advance(Direction::Backward);
        store.go_to(5);
        assert_eq!(store.current_index(), 0);
    }

    #[test]
    fn updates_touch_only_their_record() {
        let mut store = submitted(3);
        store.mark_loading("s1").unwrap();
        assert!(store.run().records[1].is_image_loading());
        assert_eq!(store.run().records[0].image, ImageState::Idle);

        store.set_image("s1", "data:image/png;base64,AAAA".to_string()).unwrap();
        assert_eq!(
            store.run().records[1].image_url(),
            Some("data:image/png;base64,AAAA")
        );
        assert!(!store.run().records[1].is_image_loading());
        assert_eq!(store.run().records[2].image, ImageState::Idle);
    }

    #[test]
    fn unknown_slide_is_an_error() {
        let mut store = submitted(1);
        let before = store.run().clone();
        assert!(matches!(
            store.set_image_error("missing", "nope".to_string()),
            Err(CarouselError::UnknownSlide(_))
        ));
        assert_eq!(store.run(), &before);
    }

    #[test]
    fn reduce_ignores_unknown_ids() {
        let records = submitted(2).run().records.clone();
        let next = reduce(
            records.clone(),
            &SlideEvent::MarkLoading {
                id: "ghost".to_string(),
            },
        );
        assert_eq!(next, records);
    }
}
