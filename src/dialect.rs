use std::fmt;

use serde::Serialize;

/// Playlist text formats understood by [`crate::parser`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `#EXTM3U` playlist where `#EXTINF` lines carry the channel metadata
    Extm3u,
    /// One stream address per line, no metadata
    Line,
    /// Anything else. Parsed as a single `name,address` record
    Generic,
}

impl Dialect {
    /// Whether a locator of this dialect points at another playlist rather than a stream
    #[must_use]
    pub const fn is_playlist(self) -> bool {
        matches!(self, Self::Extm3u | Self::Line)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Extm3u => "extm3u",
            Self::Line => "line",
            Self::Generic => "generic",
        })
    }
}

/// Infers the dialect of a locator from its suffix.
///
/// Query strings and fragments are ignored, and so is the case of the extension.
#[must_use]
pub fn detect(locator: &str) -> Dialect {
    let path = locator
        .split_once(['?', '#'])
        .map_or(locator, |(path, _)| path)
        .trim_end();

    if has_suffix(path, ".m3u") {
        Dialect::Extm3u
    } else if has_suffix(path, ".txt") {
        Dialect::Line
    } else {
        Dialect::Generic
    }
}

fn has_suffix(path: &str, suffix: &str) -> bool {
    path.len() >= suffix.len()
        && path
            .get(path.len() - suffix.len()..)
            .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
}
