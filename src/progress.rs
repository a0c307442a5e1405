// ABOUTME: Progress and status reporting for long-running carousel operations
// ABOUTME: Turns batch position into a 0-100 value and a phase label for display

use log::info;

/// What the application is busy with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    GeneratingImages,
    PackagingArchive,
    Processing,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "Idle",
            Phase::GeneratingImages => "Generating stunning visuals...",
            Phase::PackagingArchive => "Packaging slides into ZIP...",
            Phase::Processing => "Processing...",
        }
    }
}

/// Position of a batch after an item finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub phase: Phase,
    pub completed: usize,
    pub total: usize,
}

impl ProgressUpdate {
    pub fn percent(&self) -> u8 {
        percent(self.completed, self.total)
    }
}

/// `round(100 * completed / total)`, clamped to 0..=100
pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let value = (100.0 * completed as f64 / total as f64).round();
    value.clamp(0.0, 100.0) as u8
}

/// Receiver of progress updates
pub trait ProgressSink {
    fn report(&mut self, update: ProgressUpdate);
}

/// Current status as shown to the user
#[derive(Debug, Clone, Default)]
pub struct StatusReporter {
    phase: Phase,
    progress: u8,
}

impl StatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// Enter a phase with the bar back at zero
    pub fn begin(&mut self, phase: Phase) {
        self.phase = phase;
        self.progress = 0;
        info!("{}", phase.label());
    }

    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.progress = 0;
    }
}

impl ProgressSink for StatusReporter {
    fn report(&mut self, update: ProgressUpdate) {
        self.phase = update.phase;
        self.progress = update.percent();
        info!(
            "{} {}/{} ({}%)",
            update.phase.label(),
            update.completed,
            update.total,
            self.progress
        );
    }
}

/// Keeps every update, useful for summaries and assertions
#[derive(Debug, Clone, Default)]
pub struct RecordingProgress {
    pub updates: Vec<ProgressUpdate>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn percents(&self) -> Vec<u8> {
        self.updates.iter().map(ProgressUpdate::percent).collect()
    }

    pub fn last_percent(&self) -> Option<u8> {
        self.updates.last().map(ProgressUpdate::percent)
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&mut self, update: ProgressUpdate) {
        self.updates.push(update);
    }
}
