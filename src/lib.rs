#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
#![warn(clippy::perf)]
#![warn(clippy::complexity)]
#![warn(clippy::style)]
#![allow(clippy::multiple_crate_versions)]

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

use config::Settings;
use observer::{RunObserver, RunSummary};
use pipeline::Pipeline;

pub mod config;
pub mod dialect;
pub mod fetch;
pub mod listing;
pub mod merge;
pub mod observer;
pub mod parser;
pub mod pipeline;
pub mod sanitize;
pub mod util;

/// Reads the locator list, gathers every stream and writes the deduplicated listing.
///
/// Failing locators only shrink the output. Cancelling `ct` stops fetching early but
/// the listing is still written with what was merged so far.
///
/// # Errors
/// Errors when the locator list can't be read (nothing is fetched and the output is left
/// untouched), when the HTTP client can't be built or when the output or report can't be
/// written
pub async fn harvest(
    settings: &Settings,
    observer: Arc<dyn RunObserver>,
    ct: &CancellationToken,
) -> Result<RunSummary> {
    let locators = listing::read_locators(&settings.input).await?;

    let pipeline = Pipeline::new(settings.pipeline.clone())
        .context("Building HTTP client")?
        .with_observer(observer);
    let harvest = pipeline.run_until(&locators, ct).await;

    listing::write_entries(&settings.output, &harvest.entries, settings.format).await?;
    info!(
        "Wrote {} entries to {}",
        harvest.entries.len(),
        settings.output.display()
    );

    if let Some(path) = &settings.report {
        listing::write_report(path, &harvest.reports).await?;
        info!(
            "Wrote the status of {} locators to {}",
            harvest.reports.len(),
            path.display()
        );
    }

    Ok(harvest.summary)
}
