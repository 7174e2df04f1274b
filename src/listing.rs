use std::{fmt::Write as _, path::Path};

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::{debug, instrument};

use crate::{merge::Entry, pipeline::LocatorReport};

const UTF8_BOM: &str = "\u{feff}";
// csv only writes headers once the first row is serialized
const REPORT_HEADER: &str = "locator,dialect,depth,status,entries,detail\n";

/// How entries are written out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `name,address` with no escaping, names containing commas stay ambiguous
    #[default]
    Plain,
    /// RFC 4180 `name,address`, fields quoted when they contain `,`, `"` or a line break
    Csv,
    /// One `{"name":…,"address":…}` JSON object per line
    Jsonl,
}

/// Reads the locator list: one locator per line, blank lines and `#` comments ignored.
///
/// # Errors
/// Errors when the file can't be read. The run can't continue without it.
#[instrument]
pub async fn read_locators(path: &Path) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Unable to read locator list {}", path.display()))?;

    let locators = parse_locators(&content);
    debug!("Read {} locators", locators.len());
    Ok(locators)
}

fn parse_locators(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Renders entries, one per line
///
/// # Errors
/// Errors if an entry can't be serialized
pub fn render(entries: &[Entry], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Plain => {
            let mut out = String::new();
            for entry in entries {
                writeln!(out, "{},{}", entry.name, entry.address)?;
            }
            Ok(out)
        }
        OutputFormat::Csv => {
            let mut writer = csv_writer(false);
            for entry in entries {
                writer
                    .write_record([&entry.name, &entry.address])
                    .context("Serializing entry")?;
            }
            finish_csv(writer)
        }
        OutputFormat::Jsonl => {
            let mut out = String::new();
            for entry in entries {
                out.push_str(&serde_json::to_string(entry).context("Serializing entry")?);
                out.push('\n');
            }
            Ok(out)
        }
    }
}

fn csv_writer(has_headers: bool) -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .has_headers(has_headers)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| e.into_error())
        .context("Flushing CSV")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

/// Writes the listing to `path`, replacing whatever was there
///
/// # Errors
/// Errors when the file can't be written
#[instrument(skip(entries))]
pub async fn write_entries(path: &Path, entries: &[Entry], format: OutputFormat) -> Result<()> {
    let listing = render(entries, format)?;
    tokio::fs::write(path, listing)
        .await
        .with_context(|| format!("Unable to write results to {}", path.display()))
}

/// Renders the per-locator status report as CSV with a header row.
///
/// The text starts with a byte order mark so spreadsheet tools pick UTF-8.
///
/// # Errors
/// Errors if a row can't be serialized
pub fn render_report(reports: &[LocatorReport]) -> Result<String> {
    let mut writer = csv_writer(true);
    for report in reports {
        writer.serialize(report).context("Serializing locator report")?;
    }

    let mut out = String::from(UTF8_BOM);
    if reports.is_empty() {
        out.push_str(REPORT_HEADER);
    }
    out.push_str(&finish_csv(writer)?);
    Ok(out)
}

/// Writes the status of every fetched locator to `path`
///
/// # Errors
/// Errors when the file can't be written
#[instrument(skip(reports))]
pub async fn write_report(path: &Path, reports: &[LocatorReport]) -> Result<()> {
    let report = render_report(reports)?;
    tokio::fs::write(path, report)
        .await
        .with_context(|| format!("Unable to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dialect::Dialect, pipeline::LocatorStatus};

    fn sample() -> Vec<Entry> {
        vec![
            Entry::new("CCTV-1", "http://s/1"),
            Entry::new("", "http://s/2?a=1,2"),
            Entry::new("Say \"hi\", TV", "http://s/3"),
        ]
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        let content = "http://a/1.m3u\n\n   \n# backup\n  http://a/2.txt  \r\n";
        assert_eq!(parse_locators(content), vec!["http://a/1.m3u", "http://a/2.txt"]);
    }

    #[test]
    fn plain_format_is_unescaped() {
        assert_eq!(
            render(&sample(), OutputFormat::Plain).unwrap(),
            "CCTV-1,http://s/1\n,http://s/2?a=1,2\nSay \"hi\", TV,http://s/3\n"
        );
    }

    #[test]
    fn csv_format_quotes_when_needed() {
        assert_eq!(
            render(&sample(), OutputFormat::Csv).unwrap(),
            "CCTV-1,http://s/1\n,\"http://s/2?a=1,2\"\n\"Say \"\"hi\"\", TV\",http://s/3\n"
        );
    }

    #[test]
    fn jsonl_format_is_one_object_per_line() {
        let out = render(&sample(), OutputFormat::Jsonl).unwrap();
        let parsed: Vec<Entry> = out
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(parsed, sample());
        assert!(out.starts_with(r#"{"name":"CCTV-1","address":"http://s/1"}"#));
    }

    #[test]
    fn empty_listing_renders_nothing() {
        assert_eq!(render(&[], OutputFormat::Plain).unwrap(), "");
    }

    #[test]
    fn csv_format_terminates_every_row() {
        let out = render(&[Entry::new("a\nb", "http://s/1")], OutputFormat::Csv).unwrap();
        assert_eq!(out, "\"a\nb\",http://s/1\n");
        assert_eq!(render(&[], OutputFormat::Csv).unwrap(), "");
    }

    #[test]
    fn report_has_bom_header_and_one_row_per_locator() {
        let reports = [
            LocatorReport {
                locator: "http://a/1.m3u".into(),
                dialect: Dialect::Extm3u,
                depth: 0,
                status: LocatorStatus::Ok,
                entries: 2,
                detail: String::new(),
            },
            LocatorReport {
                locator: "http://a/2.txt".into(),
                dialect: Dialect::Line,
                depth: 1,
                status: LocatorStatus::HttpStatus,
                entries: 0,
                detail: "http://a/2.txt responded with 404 Not Found".into(),
            },
        ];

        assert_eq!(
            render_report(&reports).unwrap(),
            "\u{feff}locator,dialect,depth,status,entries,detail\n\
             http://a/1.m3u,extm3u,0,ok,2,\n\
             http://a/2.txt,line,1,http-status,0,http://a/2.txt responded with 404 Not Found\n"
        );
    }

    #[test]
    fn empty_report_still_has_a_header() {
        assert_eq!(
            render_report(&[]).unwrap(),
            "\u{feff}locator,dialect,depth,status,entries,detail\n"
        );
    }

    #[tokio::test]
    async fn missing_locator_list_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_locators(&dir.path().join("nope.txt")).await.unwrap_err();
        assert!(err.to_string().contains("nope.txt"));
    }

    #[tokio::test]
    async fn writes_and_replaces_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.txt");
        tokio::fs::write(&path, "stale\n").await.unwrap();

        write_entries(&path, &sample()[..1], OutputFormat::Plain)
            .await
            .unwrap();

        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            "CCTV-1,http://s/1\n"
        );
    }
}
