#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
#![warn(clippy::perf)]
#![warn(clippy::complexity)]
#![warn(clippy::style)]
#![allow(clippy::multiple_crate_versions)]

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use iptv_merge::{
    config::{
        DEFAULT_INPUT, DEFAULT_OUTPUT, DEFAULT_PARALLELISM, MAX_NESTED_DEPTH, PipelineSettings,
        Settings,
    },
    harvest,
    listing::OutputFormat,
    merge::MergePolicy,
    observer::{ProgressObserver, RunObserver, TracingObserver},
    parser::UNKNOWN_CHANNEL,
    util::{spawn_ct_watcher, spawn_deadline, warn_ulimit},
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Fetches IPTV playlists and writes a deduplicated `name,address` listing
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File listing one playlist URL per line
    #[arg(env = "IPTV_MERGE_INPUT", default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Where the merged listing is written
    #[arg(short, long, env = "IPTV_MERGE_OUTPUT", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, env = "IPTV_MERGE_FORMAT", default_value_t = OutputFormat::Plain)]
    format: OutputFormat,

    /// Also write the fetch status of every locator to this CSV file
    #[arg(long, env = "IPTV_MERGE_REPORT")]
    report: Option<PathBuf>,

    /// Per-request timeout, in seconds
    #[arg(short, long, env = "IPTV_MERGE_TIMEOUT", default_value_t = 10)]
    timeout: u64,

    /// The amount of parallel fetches
    #[arg(short, long, env = "IPTV_MERGE_PARALLELISM", default_value_t = DEFAULT_PARALLELISM)]
    parallelism: usize,

    /// Also fetch playlists linked from the input playlists (0 or 1 layer)
    #[arg(
        long,
        env = "IPTV_MERGE_NESTED_DEPTH",
        default_value_t = 0,
        value_parser = clap::value_parser!(u8).range(0..=i64::from(MAX_NESTED_DEPTH))
    )]
    nested_depth: u8,

    /// Which name is kept when an address is listed under several names
    #[arg(long, value_enum, env = "IPTV_MERGE_MERGE_POLICY", default_value_t = MergePolicy::FirstNonEmpty)]
    merge_policy: MergePolicy,

    /// Name given to playlist entries without a title
    #[arg(long, env = "IPTV_MERGE_UNKNOWN_NAME", default_value = UNKNOWN_CHANNEL)]
    unknown_name: String,

    /// Stop fetching after this many seconds and write what was gathered
    #[arg(long, env = "IPTV_MERGE_DEADLINE")]
    deadline: Option<u64>,

    /// Show a progress bar
    #[arg(long)]
    progress: bool,

    /// Log every locator, not only failures
    #[arg(short, long)]
    verbose: bool,
}

impl From<Args> for Settings {
    fn from(args: Args) -> Self {
        Self {
            input: args.input,
            output: args.output,
            format: args.format,
            report: args.report,
            pipeline: PipelineSettings {
                timeout: Duration::from_secs(args.timeout),
                parallelism: args.parallelism,
                nested_depth: args.nested_depth,
                merge_policy: args.merge_policy,
                unknown_name: args.unknown_name,
            },
            deadline: args.deadline.map(Duration::from_secs),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let progress = args.progress;
    let settings = Settings::from(args);
    warn_ulimit(settings.pipeline.parallelism);

    let ct = CancellationToken::new();
    spawn_ct_watcher(ct.clone());
    if let Some(deadline) = settings.deadline {
        spawn_deadline(ct.clone(), deadline);
    }

    let observer: Arc<dyn RunObserver> = if progress {
        Arc::new(ProgressObserver::new(TracingObserver))
    } else {
        Arc::new(TracingObserver)
    };

    let summary = harvest(&settings, observer, &ct).await?;
    info!("All done! {} unique streams", summary.entries);

    Ok(())
}
