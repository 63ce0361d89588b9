//! JSON and CSV writers for scrape results.
//!
//! Files are named `{profile}_videos.json` and `{profile}_videos.csv`. Each
//! writer creates the output directory itself, so either can run alone.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::output_file;
use crate::error::{OutputFormat, Result, ScrapeError};
use crate::types::{format_timestamp, ItemRecord, ScrapeResult};

pub const CSV_HEADER: [&str; 7] = [
    "URL",
    "Title",
    "Thumbnail",
    "Likes",
    "Comments",
    "Views",
    "ExtractedAt",
];

/// Path a writer uses for `profile_id` inside `dir`.
pub fn output_path(dir: &Path, profile_id: &str, format: OutputFormat) -> PathBuf {
    output_file(dir, profile_id, &format!("videos.{}", format.extension()))
}

fn create_file(dir: &Path, profile_id: &str, format: OutputFormat) -> Result<(std::fs::File, PathBuf)> {
    let path = output_path(dir, profile_id, format);
    let fail = |source| ScrapeError::WriteFailure {
        format,
        path: path.clone(),
        source,
    };
    std::fs::create_dir_all(dir).map_err(fail)?;
    let file = std::fs::File::create(&path).map_err(fail)?;
    Ok((file, path))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonDocument<'a> {
    profile: &'a str,
    total_videos: usize,
    extracted_at: String,
    videos: &'a [ItemRecord],
}

/// Writer for the JSON document.
pub struct JsonWriter;

impl JsonWriter {
    /// Write `{dir}/{profile}_videos.json`.
    pub fn write_to_dir(result: &ScrapeResult, dir: &Path) -> Result<PathBuf> {
        let (mut file, path) = create_file(dir, &result.profile_id, OutputFormat::Json)?;
        Self::write_to(result, &mut file).map_err(|source| ScrapeError::WriteFailure {
            format: OutputFormat::Json,
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Write the pretty-printed document to any writer.
    pub fn write_to<W: Write>(result: &ScrapeResult, writer: &mut W) -> std::io::Result<()> {
        let document = JsonDocument {
            profile: &result.profile_id,
            total_videos: result.total_count(),
            extracted_at: format_timestamp(&result.extracted_at),
            videos: result.items(),
        };
        serde_json::to_writer_pretty(&mut *writer, &document).map_err(std::io::Error::other)?;
        writer.flush()
    }
}

/// Writer for the CSV table.
///
/// Only the title column is quoted. The other columns are written raw, so a
/// comma or quote in a URL or statistic shifts the row.
pub struct CsvWriter;

impl CsvWriter {
    /// Write `{dir}/{profile}_videos.csv`.
    pub fn write_to_dir(result: &ScrapeResult, dir: &Path) -> Result<PathBuf> {
        let (mut file, path) = create_file(dir, &result.profile_id, OutputFormat::Csv)?;
        Self::write_to(result, &mut file).map_err(|source| ScrapeError::WriteFailure {
            format: OutputFormat::Csv,
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Write header and rows joined by `\n`, without a trailing newline.
    pub fn write_to<W: Write>(result: &ScrapeResult, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(Self::render(result).as_bytes())?;
        writer.flush()
    }

    pub fn render(result: &ScrapeResult) -> String {
        std::iter::once(CSV_HEADER.join(","))
            .chain(result.items().iter().map(csv_row))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn csv_row(record: &ItemRecord) -> String {
    [
        record.resource_url.clone(),
        quote(&record.title),
        record.thumbnail_url.clone(),
        record.like_count.to_string(),
        record.comment_count.to_string(),
        record.view_count.to_string(),
        format_timestamp(&record.extracted_at),
    ]
    .join(",")
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Paths written, or the failure, per format.
#[derive(Debug)]
pub struct WriteReport {
    pub json: Result<PathBuf>,
    pub csv: Result<PathBuf>,
}

impl WriteReport {
    pub fn all_succeeded(&self) -> bool {
        self.json.is_ok() && self.csv.is_ok()
    }
}

/// Run both writers; a failure in one is logged and does not stop the other.
pub fn write_all(result: &ScrapeResult, dir: &Path) -> WriteReport {
    let report = WriteReport {
        json: JsonWriter::write_to_dir(result, dir),
        csv: CsvWriter::write_to_dir(result, dir),
    };
    for (format, outcome) in [
        (OutputFormat::Json, &report.json),
        (OutputFormat::Csv, &report.csv),
    ] {
        match outcome {
            Ok(path) => tracing::info!("{format} saved: {}", path.display()),
            Err(e) => tracing::error!("{e}"),
        }
    }
    report
}
