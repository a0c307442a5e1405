use super::*;
use crate::genai::{classify_failure, Upstream};
use reqwest::StatusCode;
use std::cell::RefCell;
use std::rc::Rc;

/// Answers from a script, one entry per call, and remembers the prompts it saw
struct ScriptedGenerator {
    answers: RefCell<Vec<std::result::Result<String, Upstream>>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedGenerator {
    fn new(answers: Vec<std::result::Result<String, Upstream>>) -> Self {
        Self {
            answers: RefCell::new(answers.into_iter().rev().collect()),
            prompts: RefCell::new(Vec::new()),
        }
    }
}

impl ImageGenerator for ScriptedGenerator {
    fn generate_image(&self, _api_key: &str, prompt: &str) -> Result<String> {
        self.prompts.borrow_mut().push(prompt.to_string());
        match self.answers.borrow_mut().pop() {
            Some(Ok(data)) => Ok(data),
            Some(Err(upstream)) => Err(classify_failure(upstream, prompt)),
            None => Ok("AAAA".to_string()),
        }
    }
}

fn submitted_store(specs: &[SlideSpec], aspect_ratio: AspectRatio) -> SlideStore {
    let mut store = SlideStore::new();
    store
        .submit(specs, aspect_ratio, &Branding::default())
        .expect("submission should be accepted");
    store
}

#[test]
fn test_submit_creates_one_idle_record_per_spec() {
    let specs = vec![
        SlideSpec::with_id("a", "First", "one"),
        SlideSpec::with_id("b", "Second", "two"),
        SlideSpec::with_id("c", "Third", "three"),
    ];
    let store = submitted_store(&specs, AspectRatio::Portrait);
    let run = store.run();

    assert_eq!(run.len(), 3);
    assert_eq!(run.current_index, 0);
    for (spec, record) in specs.iter().zip(&run.records) {
        assert_eq!(record.id, spec.id);
        assert_eq!(record.title, spec.title);
        assert_eq!(record.content, spec.content);
        assert_eq!(record.image, ImageState::Idle);
        assert!(record.image_prompt.contains(&spec.title));
        assert!(record.image_prompt.contains("4:5"));
    }
}

#[test]
fn test_generation_success_sets_image_url() {
    let mut store = submitted_store(&[SlideSpec::new("A", "B")], AspectRatio::Square);
    let generator = ScriptedGenerator::new(vec![Ok("iVBORw0KGgo=".to_string())]);
    let mut progress = RecordingProgress::new();

    let report = generate_backgrounds(&mut store, &generator, "key", &mut progress)
        .expect("generation loop should finish");

    assert_eq!(report.completed(), 1);
    let record = &store.run().records[0];
    assert_eq!(record.image_url(), Some("data:image/png;base64,iVBORw0KGgo="));
    assert_eq!(record.image_error(), None);
    assert!(!record.is_image_loading());
}

#[test]
fn test_generation_rate_limit_stays_on_slide() {
    let mut store = submitted_store(&[SlideSpec::new("A", "B")], AspectRatio::Square);
    let generator = ScriptedGenerator::new(vec![Err(Upstream::Http {
        status: StatusCode::TOO_MANY_REQUESTS,
        message: "RESOURCE_EXHAUSTED: quota".to_string(),
    })]);
    let mut progress = RecordingProgress::new();

    let report = generate_backgrounds(&mut store, &generator, "key", &mut progress)
        .expect("a rate limit must not abort the run");

    assert_eq!(report.skipped(), 1);
    let record = &store.run().records[0];
    assert_eq!(record.image_url(), None);
    let message = record.image_error().expect("slide should carry the error");
    assert!(message.starts_with("Failed to load image."));
    assert!(message.contains("rate limits"));
    assert_eq!(progress.last_percent(), Some(100));
}

#[test]
fn test_generation_leaves_every_slide_in_one_terminal_state() {
    let specs: Vec<SlideSpec> = (1..=5)
        .map(|i| SlideSpec::new(&format!("Slide {}", i), "body"))
        .collect();
    let mut store = submitted_store(&specs, AspectRatio::Landscape);
    let generator = ScriptedGenerator::new(vec![
        Ok("AAAA".to_string()),
        Err(Upstream::Message("Image blocked by safety filter: SAFETY".to_string())),
        Ok("AAAA".to_string()),
        Err(Upstream::Http {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "INTERNAL: boom".to_string(),
        }),
        Ok("AAAA".to_string()),
    ]);
    let mut progress = RecordingProgress::new();

    generate_backgrounds(&mut store, &generator, "key", &mut progress).unwrap();

    for record in &store.run().records {
        let terminal = [record.image_url().is_some(), record.image_error().is_some()];
        assert_eq!(terminal.iter().filter(|t| **t).count(), 1, "{:?}", record);
        assert!(!record.is_image_loading());
    }
    assert!(store.run().records[1]
        .image_error()
        .unwrap()
        .contains("safety policies"));
    assert!(store.run().records[3].image_error().unwrap().contains("boom"));
}

#[test]
fn test_generation_visits_slides_in_order_with_monotonic_progress() {
    let specs: Vec<SlideSpec> = ["one", "two", "three"]
        .iter()
        .map(|t| SlideSpec::new(t, ""))
        .collect();
    let mut store = submitted_store(&specs, AspectRatio::Square);
    let generator = ScriptedGenerator::new(Vec::new());
    let mut progress = RecordingProgress::new();

    generate_backgrounds(&mut store, &generator, "key", &mut progress).unwrap();

    let prompts = generator.prompts.borrow();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[0].contains("one"));
    assert!(prompts[1].contains("two"));
    assert!(prompts[2].contains("three"));

    assert_eq!(progress.percents(), vec![33, 67, 100]);
    assert!(progress
        .updates
        .iter()
        .all(|u| u.phase == Phase::GeneratingImages && u.total == 3));
}

#[test]
fn test_navigation_is_cyclic() {
    let specs: Vec<SlideSpec> = (0..4).map(|i| SlideSpec::new(&i.to_string(), "")).collect();
    let mut store = submitted_store(&specs, AspectRatio::Square);

    for _ in 0..4 {
        store.advance(Direction::Forward);
    }
    assert_eq!(store.current_index(), 0);

    store.advance(Direction::Backward);
    assert_eq!(store.current_index(), 3);
    store.advance(Direction::Forward);
    store.advance(Direction::Forward);
    assert_eq!(store.current_index(), 1);
}

#[test]
fn test_text_export_is_deterministic() {
    let mut store = submitted_store(
        &[
            SlideSpec::with_id("a", "Deck", "Intro"),
            SlideSpec::with_id("b", "Second", "More"),
        ],
        AspectRatio::Square,
    );
    let first = text_export_json(store.run()).unwrap();

    // Images are not part of the text export
    store.mark_loading("a").unwrap();
    store.set_image("a", "data:image/png;base64,AAAA".to_string()).unwrap();
    let second = text_export_json(store.run()).unwrap();

    assert_eq!(first, second);
    assert!(first.starts_with("[\n  {\n    \"title\": \"Deck\""));
    assert!(first.contains("\"imagePrompt\""));
    assert!(!first.contains("logoUrl"));
}

#[test]
fn test_surfaces_follow_run() {
    let mut store = submitted_store(
        &[SlideSpec::with_id("a", "Title <b>", "Body")],
        AspectRatio::Portrait,
    );
    store.mark_loading("a").unwrap();

    let surfaces = SurfaceSet::mount(store.run());
    let surface = surfaces.get("a").expect("surface for slide a");
    assert_eq!((surface.width, surface.height), (800, 1000));
    assert!(surface.html.contains("Title &lt;b&gt;"));
    assert!(surfaces.get("missing").is_none());
}

/// Shared journal of generator calls and progress reports
type Journal = Rc<RefCell<Vec<String>>>;

struct JournalGenerator {
    journal: Journal,
}

impl ImageGenerator for JournalGenerator {
    fn generate_image(&self, _api_key: &str, prompt: &str) -> Result<String> {
        let title = prompt
            .split('"')
            .nth(1)
            .and_then(|quoted| quoted.split(" - ").next())
            .unwrap_or_default();
        self.journal.borrow_mut().push(format!("generate {}", title));
        Ok("AAAA".to_string())
    }
}

struct JournalSink {
    journal: Journal,
}

impl ProgressSink for JournalSink {
    fn report(&mut self, update: ProgressUpdate) {
        self.journal
            .borrow_mut()
            .push(format!("committed {}/{}", update.completed, update.total));
    }
}

#[test]
fn test_each_slide_commits_before_the_next_request() {
    let specs: Vec<SlideSpec> = ["one", "two", "three"]
        .iter()
        .map(|t| SlideSpec::new(t, "body"))
        .collect();
    let mut store = submitted_store(&specs, AspectRatio::Square);
    let journal: Journal = Rc::new(RefCell::new(Vec::new()));
    let generator = JournalGenerator {
        journal: Rc::clone(&journal),
    };
    let mut sink = JournalSink {
        journal: Rc::clone(&journal),
    };

    generate_backgrounds(&mut store, &generator, "key", &mut sink).unwrap();

    assert_eq!(
        *journal.borrow(),
        vec![
            "generate one",
            "committed 1/3",
            "generate two",
            "committed 2/3",
            "generate three",
            "committed 3/3",
        ]
    );
    assert!(store.run().records.iter().all(|r| r.image_url().is_some()));
}

#[test]
fn test_rejected_key_stops_the_loop() {
    let specs: Vec<SlideSpec> = (1..=4)
        .map(|i| SlideSpec::new(&format!("Slide {}", i), "body"))
        .collect();
    let mut store = submitted_store(&specs, AspectRatio::Square);
    let generator = ScriptedGenerator::new(vec![
        Ok("AAAA".to_string()),
        Err(Upstream::Http {
            status: StatusCode::BAD_REQUEST,
            message: "INVALID_ARGUMENT: API key not valid. Please pass a valid API key.".to_string(),
        }),
    ]);
    let mut progress = RecordingProgress::new();

    let result = generate_backgrounds(&mut store, &generator, "key", &mut progress);

    assert!(matches!(result, Err(CarouselError::ConfigurationError(_))));
    assert_eq!(generator.prompts.borrow().len(), 2);
    assert_eq!(progress.percents(), vec![25]);

    let records = &store.run().records;
    assert!(records[0].image_url().is_some());
    for record in &records[1..] {
        let message = record.image_error().expect("unfinished slides carry the error");
        assert!(message.contains("API Key is invalid."));
        assert!(!record.is_image_loading());
    }
}
