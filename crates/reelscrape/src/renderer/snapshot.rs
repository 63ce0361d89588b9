//! Replay renderer over recorded page states.
//!
//! Each scroll advances to the next recorded frame (the last frame repeats),
//! which reproduces a lazily loaded feed without a browser.

use super::{NavigationResult, RenderContext, Renderer};
use crate::config::ResourceKind;
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
struct Script {
    frames: Vec<String>,
    final_url: Option<String>,
    navigation_error: Option<String>,
    fail_scroll_at: Option<usize>,
}

#[derive(Debug, Default)]
struct Counters {
    active: AtomicUsize,
    scrolls: AtomicUsize,
    shut_down: AtomicBool,
    blocked: Mutex<Vec<ResourceKind>>,
}

/// A renderer that serves pre-recorded HTML frames.
#[derive(Debug)]
pub struct SnapshotRenderer {
    script: Arc<Script>,
    counters: Arc<Counters>,
}

impl SnapshotRenderer {
    /// Frames are served in order, one per scroll.
    pub fn new(frames: Vec<String>) -> Self {
        Self {
            script: Arc::new(Script {
                frames,
                ..Script::default()
            }),
            counters: Arc::new(Counters::default()),
        }
    }

    /// A single, static page.
    pub fn from_html(html: impl Into<String>) -> Self {
        Self::new(vec![html.into()])
    }

    /// URL reported after navigation instead of the requested one.
    pub fn with_url(self, url: impl Into<String>) -> Self {
        self.map_script(|s| s.final_url = Some(url.into()))
    }

    /// Make every navigation fail with `message`.
    pub fn fail_navigation(self, message: impl Into<String>) -> Self {
        self.map_script(|s| s.navigation_error = Some(message.into()))
    }

    /// Make the scroll with the given zero-based index fail.
    pub fn fail_scroll_at(self, index: usize) -> Self {
        self.map_script(|s| s.fail_scroll_at = Some(index))
    }

    /// Observer that stays valid after the renderer is handed off.
    pub fn probe(&self) -> SnapshotProbe {
        SnapshotProbe {
            counters: Arc::clone(&self.counters),
        }
    }

    fn map_script(self, f: impl FnOnce(&mut Script)) -> Self {
        let mut script = Arc::try_unwrap(self.script).unwrap_or_else(|shared| (*shared).clone());
        f(&mut script);
        Self {
            script: Arc::new(script),
            counters: self.counters,
        }
    }
}

/// Read-only view of a `SnapshotRenderer`'s lifecycle counters.
#[derive(Debug, Clone)]
pub struct SnapshotProbe {
    counters: Arc<Counters>,
}

impl SnapshotProbe {
    pub fn active_contexts(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }

    pub fn scrolls(&self) -> usize {
        self.counters.scrolls.load(Ordering::SeqCst)
    }

    pub fn is_shut_down(&self) -> bool {
        self.counters.shut_down.load(Ordering::SeqCst)
    }

    /// Resource types the last context was asked to block.
    pub fn blocked_resources(&self) -> Vec<ResourceKind> {
        self.counters
            .blocked
            .lock()
            .map(|kinds| kinds.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Renderer for SnapshotRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        if self.counters.shut_down.load(Ordering::SeqCst) {
            bail!("renderer already shut down");
        }
        self.counters.active.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SnapshotContext {
            script: Arc::clone(&self.script),
            counters: Arc::clone(&self.counters),
            url: "about:blank".to_string(),
            frame: 0,
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        self.counters.shut_down.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.counters.active.load(Ordering::SeqCst)
    }
}

/// A context positioned on one frame of the recording.
pub struct SnapshotContext {
    script: Arc<Script>,
    counters: Arc<Counters>,
    url: String,
    frame: usize,
}

impl SnapshotContext {
    fn current(&self) -> &str {
        self.script
            .frames
            .get(self.frame)
            .or_else(|| self.script.frames.last())
            .map_or("", String::as_str)
    }

    fn matches(&self, selector: &str) -> Result<usize> {
        let sel = Selector::parse(selector)
            .map_err(|e| anyhow!("invalid selector {selector}: {e:?}"))?;
        let document = Html::parse_document(self.current());
        Ok(document.select(&sel).count())
    }
}

#[async_trait]
impl RenderContext for SnapshotContext {
    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
        if let Some(message) = &self.script.navigation_error {
            bail!("{message}");
        }
        self.url = self
            .script
            .final_url
            .clone()
            .unwrap_or_else(|| url.to_string());
        self.frame = 0;
        Ok(NavigationResult {
            final_url: self.url.clone(),
            load_time_ms: 0,
        })
    }

    async fn block_resources(&mut self, kinds: &[ResourceKind]) -> Result<()> {
        if let Ok(mut blocked) = self.counters.blocked.lock() {
            *blocked = kinds.to_vec();
        }
        Ok(())
    }

    async fn execute_js(&self, _script: &str) -> Result<serde_json::Value> {
        bail!("script evaluation is not available for recorded snapshots")
    }

    async fn get_html(&self) -> Result<String> {
        Ok(self.current().to_string())
    }

    async fn get_url(&self) -> Result<String> {
        Ok(self.url.clone())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.counters.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn count(&self, selector: &str) -> Result<usize> {
        self.matches(selector)
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        Ok(self.matches(selector)? > 0)
    }

    async fn scroll_to_bottom(&mut self) -> Result<()> {
        let index = self.counters.scrolls.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_scroll_at == Some(index) {
            bail!("page crashed while scrolling");
        }
        if self.frame + 1 < self.script.frames.len() {
            self.frame += 1;
        }
        Ok(())
    }
}
