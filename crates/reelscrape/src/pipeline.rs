//! End-to-end scrape of one profile: navigate, paginate, extract, write.

use crate::config::ScrapeConfig;
use crate::error::{Result, ScrapeError};
use crate::extract::Extractor;
use crate::navigator;
use crate::pagination::{self, PaginationOutcome};
use crate::renderer::{RenderContext, Renderer};
use crate::types::ScrapeResult;
use crate::writer::{self, WriteReport};

/// What a completed run produced.
#[derive(Debug)]
pub struct ScrapeReport {
    pub result: ScrapeResult,
    pub pagination: PaginationOutcome,
    pub writes: WriteReport,
    /// Item elements dropped for missing a link or thumbnail.
    pub skipped: usize,
}

/// Runs the scrape stages against a renderer it owns.
pub struct Scraper {
    config: ScrapeConfig,
    renderer: Box<dyn Renderer>,
}

impl Scraper {
    pub fn new(config: ScrapeConfig, renderer: Box<dyn Renderer>) -> Self {
        Self { config, renderer }
    }

    /// Run every stage once. The page context is closed and the renderer
    /// shut down on every path, including failures.
    pub async fn run(self) -> Result<ScrapeReport> {
        let outcome = self.run_with_context().await;
        if let Err(e) = self.renderer.shutdown().await {
            tracing::warn!("Browser shutdown failed: {e:#}");
        }
        outcome
    }

    async fn run_with_context(&self) -> Result<ScrapeReport> {
        self.config.validate()?;
        let extractor = Extractor::new(&self.config.markup)?;

        let mut ctx = self
            .renderer
            .new_context()
            .await
            .map_err(|e| ScrapeError::from_renderer(&e))?;
        let outcome = self.drive(ctx.as_mut(), &extractor).await;
        if let Err(e) = ctx.close().await {
            tracing::warn!("Closing page failed: {e:#}");
        }
        outcome
    }

    async fn drive(&self, ctx: &mut dyn RenderContext, extractor: &Extractor) -> Result<ScrapeReport> {
        let config = &self.config;

        if !config.browser.blocked_resources.is_empty() {
            ctx.block_resources(&config.browser.blocked_resources)
                .await
                .map_err(|e| ScrapeError::from_renderer(&e))?;
        }

        let nav = navigator::open_profile(ctx, config).await?;
        let pagination = pagination::load_all(ctx, config).await;

        let html = ctx
            .get_html()
            .await
            .map_err(|e| ScrapeError::from_renderer(&e))?;
        let page_url = match ctx.get_url().await {
            Ok(url) if !url.is_empty() => url,
            _ => nav.final_url,
        };

        if config.dump_html {
            let path = config.output_file("page.html");
            let written = std::fs::create_dir_all(&config.output_dir)
                .and_then(|_| std::fs::write(&path, &html));
            match written {
                Ok(()) => tracing::info!("Page HTML saved: {}", path.display()),
                Err(e) => tracing::warn!("Could not save page HTML to {}: {e}", path.display()),
            }
        }

        tracing::info!("Extracting item data...");
        let extraction = extractor.extract(&html, &page_url);
        let result = ScrapeResult::new(config.profile_id.clone(), extraction.records);

        if result.is_empty() {
            tracing::warn!("No items extracted for @{}", config.profile_id);
        }

        let writes = writer::write_all(&result, &config.output_dir);
        tracing::info!(
            "Scraping complete: {} items for @{}",
            result.total_count(),
            config.profile_id
        );

        Ok(ScrapeReport {
            result,
            pagination,
            writes,
            skipped: extraction.skipped.len(),
        })
    }
}
