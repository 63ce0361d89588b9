//! Reelscrape: drives a profile's lazily loaded post feed to completion and
//! extracts per-item metadata into JSON and CSV files.

pub mod config;
pub mod error;
pub mod extract;
pub mod navigator;
pub mod pagination;
pub mod pipeline;
pub mod renderer;
pub mod types;
pub mod writer;

pub use config::{BrowserOptions, Markup, ResourceKind, ScrapeConfig};
pub use error::{ErrorKind, OutputFormat, Result, ScrapeError};
pub use extract::{Extraction, Extractor};
pub use pagination::{PaginationOutcome, StallDetector, StopReason};
pub use pipeline::{ScrapeReport, Scraper};
pub use renderer::chromium::{find_chromium, ChromiumRenderer};
pub use renderer::snapshot::SnapshotRenderer;
pub use renderer::{RenderContext, Renderer};
pub use types::*;
pub use writer::{write_all, CsvWriter, JsonWriter, WriteReport};
