//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine. `chromium` drives a real Chromium via chromiumoxide;
//! `snapshot` replays recorded page states for offline runs and tests.

pub mod chromium;
pub mod snapshot;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ResourceKind;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab) for rendering pages.
///
/// The DOM helpers have script-based default implementations; renderers
/// without a script engine override them.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Fail every subsequent request whose resource type is in `kinds`.
    async fn block_resources(&mut self, kinds: &[ResourceKind]) -> Result<()>;
    /// Execute JavaScript in the page context and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Get the full page HTML.
    async fn get_html(&self) -> Result<String>;
    /// Get the current URL.
    async fn get_url(&self) -> Result<String>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;

    /// Number of elements matching a CSS selector.
    async fn count(&self, selector: &str) -> Result<usize> {
        let script = format!(
            "document.querySelectorAll({}).length",
            serde_json::to_string(selector)?
        );
        let value = self.execute_js(&script).await?;
        let n = value
            .as_u64()
            .with_context(|| format!("element count for {selector} was not a number: {value}"))?;
        Ok(n as usize)
    }

    /// Whether any element matches a CSS selector.
    async fn exists(&self, selector: &str) -> Result<bool> {
        let script = format!(
            "!!document.querySelector({})",
            serde_json::to_string(selector)?
        );
        let value = self.execute_js(&script).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Scroll to the bottom of the document to trigger lazy loading.
    async fn scroll_to_bottom(&mut self) -> Result<()> {
        self.execute_js(
            "(() => { window.scrollTo(0, document.body.scrollHeight); return document.body.scrollHeight; })()",
        )
        .await?;
        Ok(())
    }
}
