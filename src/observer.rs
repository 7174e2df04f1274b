use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, info, warn};

use crate::{dialect::Dialect, fetch::FetchError, util::truncate_string};

/// Totals of a finished (or cancelled) run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Distinct locators that were fetched, nested ones included
    pub fetched: usize,
    pub failed: usize,
    pub entries: usize,
    pub cancelled: bool,
}

/// Receives the pipeline's lifecycle events.
///
/// Every method defaults to doing nothing, so implementors only pick what they need.
pub trait RunObserver: Send + Sync {
    /// Input was read, `locators` distinct locators are queued
    fn run_started(&self, _locators: usize) {}

    /// A locator is about to be fetched. `depth` is 0 for locators from the input list
    fn locator_started(&self, _locator: &str, _dialect: Dialect, _depth: u8) {}

    /// A locator appeared more than once and won't be fetched again
    fn locator_skipped(&self, _locator: &str) {}

    fn fetch_failed(&self, _error: &FetchError) {}

    /// A locator was parsed. `parsed` counts raw entries, `added` the ones that changed
    /// the result set, `nested` the playlists queued for the next layer
    fn locator_done(&self, _locator: &str, _parsed: usize, _added: usize, _nested: usize) {}

    fn finished(&self, _summary: &RunSummary) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// Forwards events to `tracing`: failures at `warn`, lifecycle at `debug`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn run_started(&self, locators: usize) {
        info!("Processing {locators} locators");
    }

    fn locator_started(&self, locator: &str, dialect: Dialect, depth: u8) {
        debug!(depth, %dialect, "Fetching {locator}");
    }

    fn locator_skipped(&self, locator: &str) {
        debug!("Already processed {locator}, skipping");
    }

    fn fetch_failed(&self, error: &FetchError) {
        if error.is_timeout() {
            warn!("Timed out fetching {}", error.locator());
        } else {
            warn!("{error}");
        }
    }

    fn locator_done(&self, locator: &str, parsed: usize, added: usize, nested: usize) {
        debug!(parsed, added, nested, "Done with {locator}");
    }

    fn finished(&self, summary: &RunSummary) {
        if summary.cancelled {
            warn!("Run was cancelled, keeping what was gathered so far");
        }
        if summary.failed > 0 && summary.failed == summary.fetched {
            error!("Every one of the {} locators failed", summary.failed);
        }
        info!(
            "Gathered {} unique streams from {} locators ({} failed)",
            summary.entries, summary.fetched, summary.failed
        );
    }
}

/// Drives a terminal progress bar, then hands every event to an inner observer
#[derive(Debug)]
pub struct ProgressObserver<O> {
    bar: ProgressBar,
    inner: O,
}

impl<O: RunObserver> ProgressObserver<O> {
    /// The bar is sized when the run starts and grows as nested locators are found
    ///
    /// # Panics
    /// Should never panic, the template is a constant.
    #[must_use]
    pub fn new(inner: O) -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}")
                .unwrap(),
        );
        Self { bar, inner }
    }
}

impl<O: RunObserver> RunObserver for ProgressObserver<O> {
    fn run_started(&self, locators: usize) {
        self.bar.set_length(locators as u64);
        self.inner.run_started(locators);
    }

    fn locator_started(&self, locator: &str, dialect: Dialect, depth: u8) {
        self.bar.set_message(truncate_string(locator, 60));
        self.inner.locator_started(locator, dialect, depth);
    }

    fn locator_skipped(&self, locator: &str) {
        self.inner.locator_skipped(locator);
    }

    fn fetch_failed(&self, error: &FetchError) {
        self.bar.suspend(|| self.inner.fetch_failed(error));
        self.bar.inc(1);
    }

    fn locator_done(&self, locator: &str, parsed: usize, added: usize, nested: usize) {
        self.bar.inc_length(nested as u64);
        self.bar.inc(1);
        self.inner.locator_done(locator, parsed, added, nested);
    }

    fn finished(&self, summary: &RunSummary) {
        self.bar.finish_and_clear();
        self.inner.finished(summary);
    }
}
