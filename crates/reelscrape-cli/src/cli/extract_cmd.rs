//! `reelscrape extract`: run extraction and the writers over a saved page.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use reelscrape::config::{normalize_profile, resolve_output_dir};
use reelscrape::{write_all, Extractor, ScrapeConfig, ScrapeResult};

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Saved page HTML, e.g. from `scrape --dump-html`.
    #[arg(long)]
    pub html: PathBuf,

    /// Profile the page belongs to; names the output files.
    #[arg(long)]
    pub profile: String,

    /// URL relative links are resolved against. Defaults to the profile URL.
    #[arg(long)]
    pub page_url: Option<String>,

    /// Directory for the output files.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

pub fn run(args: ExtractArgs) -> Result<()> {
    let profile = normalize_profile(&args.profile);
    let mut config = ScrapeConfig::new(&profile);
    config.output_dir = resolve_output_dir(args.output_dir.as_deref());
    config.validate()?;

    let html = std::fs::read_to_string(&args.html)
        .with_context(|| format!("failed to read {}", args.html.display()))?;
    let page_url = args.page_url.unwrap_or_else(|| config.profile_url());

    let extraction = Extractor::new(&config.markup)?.extract(&html, &page_url);
    let result = ScrapeResult::new(profile, extraction.records);
    let report = write_all(&result, &config.output_dir);

    println!(
        "{} items extracted ({} skipped) from {}",
        result.total_count(),
        extraction.skipped.len(),
        args.html.display()
    );
    report.json?;
    report.csv?;
    Ok(())
}
