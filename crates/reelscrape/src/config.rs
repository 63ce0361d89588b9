//! Scrape configuration and resolution from flags, environment and defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, ScrapeError};

pub const DEFAULT_BASE_URL: &str = "https://www.tiktok.com";
pub const DEFAULT_OUTPUT_DIR: &str = "./tiktok_data";
pub const DEFAULT_ITERATION_DELAY_MS: u64 = 2_000;
pub const DEFAULT_MAX_ITERATIONS: u32 = 50;
pub const DEFAULT_STALL_THRESHOLD: u32 = 3;
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 3_000;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const PROFILE_ENV: &str = "REELSCRAPE_PROFILE";
pub const OUTPUT_DIR_ENV: &str = "REELSCRAPE_OUTPUT_DIR";
pub const CHROMIUM_PATH_ENV: &str = "REELSCRAPE_CHROMIUM_PATH";

/// Request resource types the browser can be told to drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Stylesheet,
    Font,
    Image,
    Media,
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stylesheet" | "css" => Ok(ResourceKind::Stylesheet),
            "font" => Ok(ResourceKind::Font),
            "image" | "img" => Ok(ResourceKind::Image),
            "media" => Ok(ResourceKind::Media),
            other => Err(format!(
                "unknown resource type '{other}' (expected stylesheet, font, image or media)"
            )),
        }
    }
}

/// CSS selectors describing the profile page markup.
#[derive(Debug, Clone)]
pub struct Markup {
    /// Any of these marks a rendered post list.
    pub list_markers: Vec<String>,
    pub item: String,
    pub link: String,
    pub image: String,
    /// Title lookups, tried in order.
    pub titles: Vec<String>,
    pub count: String,
    pub icon: String,
    pub emphasis: String,
}

impl Default for Markup {
    fn default() -> Self {
        Self {
            list_markers: vec![
                r#"[data-e2e="user-post-item-list"]"#.to_string(),
                r#"[data-e2e="user-post-item"]"#.to_string(),
                ".video-feed-container".to_string(),
            ],
            item: r#"[data-e2e="user-post-item"]"#.to_string(),
            link: "a".to_string(),
            image: "img".to_string(),
            titles: vec![
                r#"[data-e2e="user-post-item-desc"]"#.to_string(),
                ".video-meta-caption".to_string(),
            ],
            count: ".video-count".to_string(),
            icon: "svg".to_string(),
            emphasis: "strong".to_string(),
        }
    }
}

/// Browser launch settings.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub user_agent: Option<String>,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub blocked_resources: Vec<ResourceKind>,
    pub chromium_path: Option<PathBuf>,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
            viewport_width: 1366,
            viewport_height: 768,
            blocked_resources: vec![
                ResourceKind::Stylesheet,
                ResourceKind::Font,
                ResourceKind::Image,
            ],
            chromium_path: std::env::var(CHROMIUM_PATH_ENV).ok().map(PathBuf::from),
        }
    }
}

/// Everything one scrape run needs.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub profile_id: String,
    pub output_dir: PathBuf,
    pub base_url: String,
    pub iteration_delay_ms: u64,
    pub max_iterations: u32,
    pub stall_threshold: u32,
    pub navigation_timeout_ms: u64,
    pub settle_delay_ms: u64,
    /// Save the final page snapshot next to the outputs.
    pub dump_html: bool,
    pub markup: Markup,
    pub browser: BrowserOptions,
}

impl ScrapeConfig {
    pub fn new(profile_id: &str) -> Self {
        Self {
            profile_id: normalize_profile(profile_id),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            base_url: DEFAULT_BASE_URL.to_string(),
            iteration_delay_ms: DEFAULT_ITERATION_DELAY_MS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            stall_threshold: DEFAULT_STALL_THRESHOLD,
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            dump_html: false,
            markup: Markup::default(),
            browser: BrowserOptions::default(),
        }
    }

    /// URL of the profile page.
    pub fn profile_url(&self) -> String {
        format!(
            "{}/@{}",
            self.base_url.trim_end_matches('/'),
            self.profile_id
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.profile_id.is_empty() {
            return Err(ScrapeError::Config("profile id is empty".into()));
        }
        if self.profile_id.contains(['/', '?', '#']) || self.profile_id.contains(char::is_whitespace) {
            return Err(ScrapeError::Config(format!(
                "profile id '{}' contains characters not allowed in a username",
                self.profile_id
            )));
        }
        if self.max_iterations == 0 {
            return Err(ScrapeError::Config("max_iterations must be at least 1".into()));
        }
        if self.stall_threshold == 0 {
            return Err(ScrapeError::Config("stall_threshold must be at least 1".into()));
        }
        url::Url::parse(&self.base_url)
            .map_err(|e| ScrapeError::Config(format!("invalid base url '{}': {e}", self.base_url)))?;
        Ok(())
    }

    /// Path of the output file with the given suffix, e.g. `videos.json`.
    pub fn output_file(&self, suffix: &str) -> PathBuf {
        output_file(&self.output_dir, &self.profile_id, suffix)
    }
}

pub(crate) fn output_file(dir: &Path, profile_id: &str, suffix: &str) -> PathBuf {
    dir.join(format!("{profile_id}_{suffix}"))
}

/// Strip surrounding whitespace and a leading `@`.
pub fn normalize_profile(raw: &str) -> String {
    raw.trim().trim_start_matches('@').to_string()
}

/// Resolve the profile id: explicit value, then `REELSCRAPE_PROFILE`.
pub fn resolve_profile(explicit: Option<&str>) -> Option<String> {
    explicit
        .map(str::to_string)
        .or_else(|| std::env::var(PROFILE_ENV).ok())
        .map(|p| normalize_profile(&p))
        .filter(|p| !p.is_empty())
}

/// Resolve the output directory: explicit value, then `REELSCRAPE_OUTPUT_DIR`, then the default.
pub fn resolve_output_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Ok(env_path) = std::env::var(OUTPUT_DIR_ENV) {
        if !env_path.trim().is_empty() {
            return PathBuf::from(env_path);
        }
    }

    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_url_strips_at_and_slash() {
        let mut config = ScrapeConfig::new("@some.creator");
        config.base_url = "https://example.test/".into();
        assert_eq!(config.profile_url(), "https://example.test/@some.creator");
    }

    #[test]
    fn test_validate_rejects_empty_profile() {
        let config = ScrapeConfig::new("  @ ");
        assert!(matches!(config.validate(), Err(ScrapeError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let mut config = ScrapeConfig::new("someone");
        config.max_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = ScrapeConfig::new("someone");
        config.stall_threshold = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_path_like_profile() {
        assert!(ScrapeConfig::new("a/b").validate().is_err());
        assert!(ScrapeConfig::new("someone").validate().is_ok());
    }

    #[test]
    fn test_resolve_explicit_profile_wins() {
        assert_eq!(resolve_profile(Some("@alice")).as_deref(), Some("alice"));
    }

    #[test]
    fn test_resolve_explicit_output_dir_wins() {
        let dir = resolve_output_dir(Some(Path::new("/tmp/out")));
        assert_eq!(dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_resource_kind_parse() {
        assert_eq!("CSS".parse::<ResourceKind>(), Ok(ResourceKind::Stylesheet));
        assert_eq!("image".parse::<ResourceKind>(), Ok(ResourceKind::Image));
        assert!("script".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_output_file_naming() {
        let mut config = ScrapeConfig::new("bob");
        config.output_dir = PathBuf::from("out");
        assert_eq!(config.output_file("videos.json"), PathBuf::from("out/bob_videos.json"));
    }
}
