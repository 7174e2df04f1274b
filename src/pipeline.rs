use std::{collections::HashSet, sync::Arc};

use futures_util::{StreamExt as _, stream};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::{
    config::{MAX_NESTED_DEPTH, PipelineSettings},
    dialect::{self, Dialect},
    fetch::{FetchError, FetchErrorKind, Fetcher},
    merge::{Entry, ResultSet},
    observer::{RunObserver, RunSummary, TracingObserver},
    parser,
    sanitize::sanitize,
};

/// Outcome of [`Pipeline::run_until`]
#[derive(Debug, Clone, Default)]
pub struct Harvest {
    /// Deduplicated entries in first-seen address order
    pub entries: Vec<Entry>,
    /// One row per fetched locator, in the order they were consumed
    pub reports: Vec<LocatorReport>,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocatorStatus {
    Ok,
    Network,
    HttpStatus,
}

impl From<FetchErrorKind> for LocatorStatus {
    fn from(kind: FetchErrorKind) -> Self {
        match kind {
            FetchErrorKind::Network => Self::Network,
            FetchErrorKind::HttpStatus => Self::HttpStatus,
        }
    }
}

/// How a single locator fared. Serialized as one row of the `--report` CSV
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocatorReport {
    pub locator: String,
    pub dialect: Dialect,
    pub depth: u8,
    pub status: LocatorStatus,
    /// Raw entries parsed from the body, nested playlists included
    pub entries: usize,
    /// Error message when the fetch failed
    pub detail: String,
}

impl LocatorReport {
    fn failed(dialect: Dialect, depth: u8, error: &FetchError) -> Self {
        Self {
            locator: error.locator().to_string(),
            dialect,
            depth,
            status: error.kind().into(),
            entries: 0,
            detail: error.to_string(),
        }
    }
}

/// Takes locators through fetch, dialect detection, parsing, sanitization and merging
pub struct Pipeline {
    fetcher: Fetcher,
    settings: PipelineSettings,
    observer: Arc<dyn RunObserver>,
}

impl Pipeline {
    /// Builds a pipeline with its own HTTP client, reporting to `tracing`
    ///
    /// # Errors
    /// Errors when the HTTP client can't be built
    pub fn new(settings: PipelineSettings) -> Result<Self, reqwest::Error> {
        Ok(Self::with_fetcher(Fetcher::new(settings.timeout)?, settings))
    }

    #[must_use]
    pub fn with_fetcher(fetcher: Fetcher, settings: PipelineSettings) -> Self {
        Self {
            fetcher,
            settings,
            observer: Arc::new(TracingObserver),
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Processes every locator and returns the merged entries
    pub async fn run<I, S>(&self, locators: I) -> Vec<Entry>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.run_until(locators, &CancellationToken::new())
            .await
            .entries
    }

    /// Processes locators until done or until `ct` is cancelled.
    ///
    /// Blank and repeated locators are skipped. A locator that fails to fetch is reported
    /// to the observer and contributes nothing. Fetches overlap up to the configured
    /// parallelism, but bodies are consumed in input order so the output doesn't depend
    /// on which server answers first. On cancellation whatever was merged is returned.
    #[instrument(skip_all)]
    pub async fn run_until<I, S>(&self, locators: I, ct: &CancellationToken) -> Harvest
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut visited = HashSet::new();
        let mut results = ResultSet::new(self.settings.merge_policy);
        let mut summary = RunSummary::default();
        let mut reports = Vec::new();

        let mut layer = Vec::new();
        for locator in locators {
            let locator = locator.as_ref().trim();
            if locator.is_empty() {
                continue;
            }
            if visited.insert(locator.to_string()) {
                layer.push(locator.to_string());
            } else {
                self.observer.locator_skipped(locator);
            }
        }
        self.observer.run_started(layer.len());

        let max_depth = self.settings.nested_depth.min(MAX_NESTED_DEPTH);
        let mut depth = 0;
        while !layer.is_empty() && !ct.is_cancelled() {
            let follow_nested = depth < max_depth;
            let mut next_layer = Vec::new();

            let fetches = stream::iter(layer)
                .map(move |locator| async move {
                    let dialect = dialect::detect(&locator);
                    self.observer.locator_started(&locator, dialect, depth);
                    let body = self.fetcher.fetch(&locator).await;
                    (locator, dialect, body)
                })
                .buffered(self.settings.parallelism.max(1))
                .take_until(ct.cancelled());
            tokio::pin!(fetches);

            while let Some((locator, dialect, body)) = fetches.next().await {
                summary.fetched += 1;
                let content = match body {
                    Ok(content) => content,
                    Err(e) => {
                        summary.failed += 1;
                        self.observer.fetch_failed(&e);
                        reports.push(LocatorReport::failed(dialect, depth, &e));
                        continue;
                    }
                };

                let (mut parsed, mut added, mut nested) = (0, 0, 0);
                for raw in
                    parser::parse_with_fallback(&content, dialect, &self.settings.unknown_name)
                {
                    parsed += 1;

                    if follow_nested && dialect::detect(&raw.address).is_playlist() {
                        if visited.insert(raw.address.clone()) {
                            next_layer.push(raw.address);
                            nested += 1;
                        }
                        continue;
                    }

                    if results.merge(Entry::new(sanitize(&raw.raw_name), raw.address)) {
                        added += 1;
                    }
                }
                self.observer.locator_done(&locator, parsed, added, nested);
                reports.push(LocatorReport {
                    locator,
                    dialect,
                    depth,
                    status: LocatorStatus::Ok,
                    entries: parsed,
                    detail: String::new(),
                });
            }

            layer = next_layer;
            depth += 1;
        }

        summary.cancelled = ct.is_cancelled();
        summary.entries = results.len();
        self.observer.finished(&summary);

        Harvest {
            entries: results.into_entries(),
            reports,
            summary,
        }
    }
}
