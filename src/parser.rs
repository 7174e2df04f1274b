use std::{str::Lines, sync::LazyLock};

use regex::Regex;

use crate::dialect::Dialect;

/// Header line of an EXTM3U playlist
pub const EXTM3U_HEADER: &str = "#EXTM3U";
/// Prefix of the metadata line describing the next stream
pub const EXTINF_MARKER: &str = "#EXTINF:";
/// Name given to an `#EXTINF` entry with no recoverable title
pub const UNKNOWN_CHANNEL: &str = "unknown channel";

static TVG_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"tvg-name="([^"]*)""#).unwrap());

/// A `(name, address)` pair as it appears in the playlist, before sanitization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub raw_name: String,
    pub address: String,
}

impl RawEntry {
    fn new(raw_name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            raw_name: raw_name.into(),
            address: address.into(),
        }
    }
}

/// Parses playlist content of the given dialect into raw entries, lazily and in line order.
///
/// Never fails: lines that can't be understood are skipped.
#[must_use]
pub fn parse(content: &str, dialect: Dialect) -> RawEntries<'_> {
    parse_with_fallback(content, dialect, UNKNOWN_CHANNEL)
}

/// Same as [`parse`], but `#EXTINF` lines without a usable title are named `fallback_name`
#[must_use]
pub fn parse_with_fallback<'a>(
    content: &'a str,
    dialect: Dialect,
    fallback_name: &'a str,
) -> RawEntries<'a> {
    let inner = match dialect {
        Dialect::Extm3u => Inner::Extm3u {
            lines: content.lines(),
            state: State::AwaitingMetaOrAddress,
            fallback_name,
        },
        Dialect::Line => Inner::Line(content.lines()),
        Dialect::Generic => Inner::Generic(Some(content)),
    };

    RawEntries { inner }
}

/// Iterator returned by [`parse`]
#[derive(Debug)]
pub struct RawEntries<'a> {
    inner: Inner<'a>,
}

#[derive(Debug)]
enum Inner<'a> {
    Extm3u {
        lines: Lines<'a>,
        state: State,
        fallback_name: &'a str,
    },
    Line(Lines<'a>),
    Generic(Option<&'a str>),
}

#[derive(Debug)]
enum State {
    AwaitingMetaOrAddress,
    HaveMetaPendingAddress(String),
}

impl Iterator for RawEntries<'_> {
    type Item = RawEntry;

    fn next(&mut self) -> Option<RawEntry> {
        match &mut self.inner {
            Inner::Extm3u {
                lines,
                state,
                fallback_name,
            } => {
                for line in lines.by_ref() {
                    let line = line.trim();
                    if line.starts_with(EXTM3U_HEADER) {
                        continue;
                    }

                    if let Some(descriptor) = line.strip_prefix(EXTINF_MARKER) {
                        *state = State::HaveMetaPendingAddress(extinf_name(descriptor).map_or_else(
                            || (*fallback_name).to_string(),
                            str::to_string,
                        ));
                    } else if line.starts_with("http") {
                        let name = match std::mem::replace(state, State::AwaitingMetaOrAddress) {
                            State::HaveMetaPendingAddress(name) => name,
                            State::AwaitingMetaOrAddress => String::new(),
                        };
                        return Some(RawEntry::new(name, line));
                    }
                }

                // Metadata without an address line is dropped
                *state = State::AwaitingMetaOrAddress;
                None
            }
            Inner::Line(lines) => lines
                .map(str::trim)
                .filter(|line| !line.starts_with('#'))
                .find(|line| line.starts_with("http"))
                .map(|line| RawEntry::new("", line)),
            Inner::Generic(content) => {
                let content = content.take()?.trim();
                if content.is_empty() {
                    return None;
                }

                Some(content.split_once(',').map_or_else(
                    || RawEntry::new("", content),
                    |(name, address)| RawEntry::new(name.trim(), address.trim()),
                ))
            }
        }
    }
}

/// Recovers the channel name from the part of an `#EXTINF:` line after the marker.
///
/// Prefers a non-empty `tvg-name` attribute, then the title after the last comma that
/// isn't inside quotes, cut at the first `(`.
fn extinf_name(descriptor: &str) -> Option<&str> {
    if let Some(name) = TVG_NAME_REGEX
        .captures(descriptor)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|name| !name.trim().is_empty())
    {
        return Some(name);
    }

    let title = &descriptor[last_top_level_comma(descriptor)? + 1..];
    let title = title.split('(').next().unwrap_or(title).trim();
    (!title.is_empty()).then_some(title)
}

fn last_top_level_comma(descriptor: &str) -> Option<usize> {
    let mut in_quotes = false;
    let mut last = None;
    for (i, c) in descriptor.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => last = Some(i),
            _ => {}
        }
    }
    last
}
