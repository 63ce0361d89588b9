//! `reelscrape scrape`: run the full pipeline against a live browser.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use reelscrape::config::{resolve_output_dir, resolve_profile, PROFILE_ENV};
use reelscrape::{ChromiumRenderer, ResourceKind, ScrapeConfig, ScrapeReport, Scraper};

/// Exit status when the pipeline failed and `--fail-on-error` is set.
const PIPELINE_FAILURE: u8 = 2;
/// Exit status when no profile was given or the configuration is invalid.
const CONFIG_ERROR: u8 = 1;

#[derive(Args, Debug, Clone, Default)]
pub struct ScrapeArgs {
    /// Profile username, with or without a leading @. Falls back to REELSCRAPE_PROFILE.
    pub profile: Option<String>,

    /// Directory for the output files. Falls back to REELSCRAPE_OUTPUT_DIR.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Site origin the profile path is appended to.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Wait after each scroll, in milliseconds.
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Upper bound on scroll iterations.
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Consecutive measurements without growth that end scrolling.
    #[arg(long)]
    pub stall_threshold: Option<u32>,

    /// Page load timeout, in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Wait after the page loads before checking for posts, in milliseconds.
    #[arg(long)]
    pub settle_ms: Option<u64>,

    /// Show the browser window.
    #[arg(long)]
    pub headful: bool,

    /// Override the browser user agent.
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Viewport width in pixels.
    #[arg(long)]
    pub viewport_width: Option<u32>,

    /// Viewport height in pixels.
    #[arg(long)]
    pub viewport_height: Option<u32>,

    /// Resource types to block (stylesheet, font, image, media).
    #[arg(long, value_delimiter = ',', conflicts_with = "no_block")]
    pub block: Option<Vec<ResourceKind>>,

    /// Load every resource type.
    #[arg(long)]
    pub no_block: bool,

    /// Chromium executable. Falls back to REELSCRAPE_CHROMIUM_PATH, then PATH.
    #[arg(long)]
    pub chromium_path: Option<PathBuf>,

    /// Also save the final page HTML as {profile}_page.html.
    #[arg(long)]
    pub dump_html: bool,

    /// Exit with status 2 when scraping or writing fails.
    #[arg(long)]
    pub fail_on_error: bool,
}

impl ScrapeArgs {
    /// Build the run configuration, or `None` when no profile is available.
    pub fn to_config(&self) -> Option<ScrapeConfig> {
        let profile = resolve_profile(self.profile.as_deref())?;
        let mut config = ScrapeConfig::new(&profile);
        config.output_dir = resolve_output_dir(self.output_dir.as_deref());

        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(ms) = self.delay_ms {
            config.iteration_delay_ms = ms;
        }
        if let Some(n) = self.max_iterations {
            config.max_iterations = n;
        }
        if let Some(n) = self.stall_threshold {
            config.stall_threshold = n;
        }
        if let Some(ms) = self.timeout_ms {
            config.navigation_timeout_ms = ms;
        }
        if let Some(ms) = self.settle_ms {
            config.settle_delay_ms = ms;
        }
        config.dump_html = self.dump_html;

        let browser = &mut config.browser;
        browser.headless = !self.headful;
        if let Some(ua) = &self.user_agent {
            browser.user_agent = Some(ua.clone());
        }
        if let Some(w) = self.viewport_width {
            browser.viewport_width = w;
        }
        if let Some(h) = self.viewport_height {
            browser.viewport_height = h;
        }
        if self.no_block {
            browser.blocked_resources.clear();
        } else if let Some(kinds) = &self.block {
            browser.blocked_resources = kinds.clone();
        }
        if let Some(path) = &self.chromium_path {
            browser.chromium_path = Some(path.clone());
        }

        Some(config)
    }
}

pub async fn run(args: ScrapeArgs) -> Result<ExitCode> {
    let Some(config) = args.to_config() else {
        tracing::error!("No profile given. Usage: reelscrape <username> (or set {PROFILE_ENV})");
        return Ok(ExitCode::from(CONFIG_ERROR));
    };
    if let Err(e) = config.validate() {
        tracing::error!("{e}");
        return Ok(ExitCode::from(CONFIG_ERROR));
    }

    tracing::info!("Starting scrape of @{}", config.profile_id);

    let outcome = match ChromiumRenderer::launch(&config.browser).await {
        Ok(renderer) => Scraper::new(config, Box::new(renderer))
            .run()
            .await
            .map_err(anyhow::Error::from),
        Err(e) => Err(e),
    };

    Ok(ExitCode::from(exit_status(&outcome, args.fail_on_error)))
}

/// Log the outcome and pick the process exit status.
fn exit_status(outcome: &Result<ScrapeReport>, fail_on_error: bool) -> u8 {
    let failed = match outcome {
        Ok(report) => {
            for path in [&report.writes.json, &report.writes.csv].into_iter().flatten() {
                println!("{}", path.display());
            }
            !report.writes.all_succeeded()
        }
        Err(e) => {
            tracing::error!("Scraping failed: {e:#}");
            if let Some(hint) = e
                .downcast_ref::<reelscrape::ScrapeError>()
                .and_then(|se| se.kind().guidance())
            {
                tracing::error!("{hint}");
            }
            true
        }
    };

    if failed && fail_on_error {
        PIPELINE_FAILURE
    } else {
        0
    }
}
