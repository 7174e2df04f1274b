use std::{path::PathBuf, time::Duration};

use crate::{fetch::DEFAULT_TIMEOUT, listing::OutputFormat, merge::MergePolicy, parser::UNKNOWN_CHANNEL};

pub const DEFAULT_INPUT: &str = "source.txt";
pub const DEFAULT_OUTPUT: &str = "results.txt";
pub const DEFAULT_PARALLELISM: usize = 8;
/// Deepest layer of nested playlists that may be followed
pub const MAX_NESTED_DEPTH: u8 = 1;

/// Everything a run needs, independent of where the values came from
#[derive(Debug, Clone)]
pub struct Settings {
    /// File listing one locator per line
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: OutputFormat,
    /// Where the per-locator status CSV goes, if anywhere
    pub report: Option<PathBuf>,
    pub pipeline: PipelineSettings,
    /// Stop scheduling new fetches once this much time has passed
    pub deadline: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output: PathBuf::from(DEFAULT_OUTPUT),
            format: OutputFormat::default(),
            report: None,
            pipeline: PipelineSettings::default(),
            deadline: None,
        }
    }
}

/// Knobs of [`crate::pipeline::Pipeline`]
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Per-request timeout
    pub timeout: Duration,
    /// How many fetches may be in flight at once
    pub parallelism: usize,
    /// 0 treats every parsed address as a stream, 1 also fetches addresses that look
    /// like playlists found in the input locators. Clamped to [`MAX_NESTED_DEPTH`]
    pub nested_depth: u8,
    pub merge_policy: MergePolicy,
    /// Name used for `#EXTINF` lines without a title
    pub unknown_name: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            parallelism: DEFAULT_PARALLELISM,
            nested_depth: 0,
            merge_policy: MergePolicy::default(),
            unknown_name: UNKNOWN_CHANNEL.to_string(),
        }
    }
}
