// ABOUTME: Sequential batch processor shared by the generation and export loops
// ABOUTME: Runs one item at a time in order, reporting progress after every attempt

use crate::errors::{CarouselError, Result};
use crate::progress::{Phase, ProgressSink, ProgressUpdate};
use log::warn;

/// Why a single item did not complete
#[derive(Debug)]
pub enum ItemFailure {
    /// Recorded and skipped; the batch goes on
    Skip(CarouselError),
    /// Aborts the batch
    Fatal(CarouselError),
}

/// Result of one item once the batch is done
#[derive(Debug)]
pub enum ItemOutcome<T> {
    Completed(T),
    Skipped(CarouselError),
}

impl<T> ItemOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, ItemOutcome::Completed(_))
    }
}

/// Outcomes of a finished batch, in item order
#[derive(Debug)]
pub struct BatchReport<T> {
    pub outcomes: Vec<ItemOutcome<T>>,
}

impl<T> BatchReport<T> {
    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_completed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.completed()
    }
}

/// Run `op` over `items` strictly in order.
///
/// Item `i` is fully processed, and its progress reported, before item
/// `i + 1` starts. A `Fatal` failure stops the batch and is returned.
pub fn run_sequential<I, T, F>(
    items: &[I],
    phase: Phase,
    sink: &mut dyn ProgressSink,
    mut op: F,
) -> Result<BatchReport<T>>
where
    F: FnMut(usize, &I) -> std::result::Result<T, ItemFailure>,
{
    let total = items.len();
    let mut outcomes = Vec::with_capacity(total);

    for (i, item) in items.iter().enumerate() {
        let outcome = match op(i, item) {
            Ok(value) => ItemOutcome::Completed(value),
            Err(ItemFailure::Skip(err)) => {
                warn!("Skipping item {} of {}: {}", i + 1, total, err);
                ItemOutcome::Skipped(err)
            }
            Err(ItemFailure::Fatal(err)) => return Err(err),
        };
        outcomes.push(outcome);

        sink.report(ProgressUpdate {
            phase,
            completed: i + 1,
            total,
        });
    }

    Ok(BatchReport { outcomes })
}
