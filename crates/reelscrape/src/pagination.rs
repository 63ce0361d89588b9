//! Incremental loading of a lazily populated item list.
//!
//! The loop measures the item count, triggers more content, waits, and stops
//! once the count has not grown for `stall_threshold` consecutive
//! measurements or after `max_iterations` iterations. Lazy-load endpoints
//! never announce the end of the list, so the cap is the only hard bound.

use std::time::Duration;

use serde::Serialize;

use crate::config::ScrapeConfig;
use crate::renderer::RenderContext;

/// Loop state after each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LoadState {
    /// The last measurement showed growth (or nothing was measured yet).
    Loading,
    /// One or more consecutive measurements without growth.
    Stalled,
    /// Terminal.
    Done,
}

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum StopReason {
    Stalled,
    IterationCap,
    TriggerFailed(String),
}

/// Count-based stall detection, independent of any browser.
#[derive(Debug, Clone)]
pub struct StallDetector {
    stall_threshold: u32,
    max_iterations: u32,
    previous: usize,
    current: usize,
    stall_count: u32,
    iterations: u32,
}

impl StallDetector {
    pub fn new(stall_threshold: u32, max_iterations: u32) -> Self {
        Self {
            stall_threshold,
            max_iterations,
            previous: 0,
            current: 0,
            stall_count: 0,
            iterations: 0,
        }
    }

    /// Record a measured item count.
    pub fn observe(&mut self, count: usize) -> LoadState {
        if count == self.previous {
            self.stall_count += 1;
        } else {
            self.stall_count = 0;
        }
        self.current = count;
        self.state()
    }

    /// Close the iteration after the trigger and wait.
    pub fn complete_iteration(&mut self) -> LoadState {
        self.previous = self.current;
        self.iterations += 1;
        self.state()
    }

    pub fn state(&self) -> LoadState {
        if self.stop_reason().is_some() {
            LoadState::Done
        } else if self.stall_count > 0 {
            LoadState::Stalled
        } else {
            LoadState::Loading
        }
    }

    /// Set once the loop must end; stall detection wins over the cap.
    pub fn stop_reason(&self) -> Option<StopReason> {
        if self.stall_count >= self.stall_threshold {
            Some(StopReason::Stalled)
        } else if self.iterations >= self.max_iterations {
            Some(StopReason::IterationCap)
        } else {
            None
        }
    }

    pub fn stall_count(&self) -> u32 {
        self.stall_count
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }
}

/// Summary of a completed pagination loop.
#[derive(Debug, Clone, Serialize)]
pub struct PaginationOutcome {
    /// Last measured item count.
    pub final_count: usize,
    pub iterations: u32,
    /// Every count measured, in order.
    pub measurements: Vec<usize>,
    pub stop_reason: StopReason,
}

/// Drive the page's lazy loading until the item count stabilizes.
///
/// A failure while measuring or scrolling ends the loop early with whatever
/// has loaded; it is never propagated.
pub async fn load_all(ctx: &mut dyn RenderContext, config: &ScrapeConfig) -> PaginationOutcome {
    tracing::info!("Scrolling to load items...");

    let delay = Duration::from_millis(config.iteration_delay_ms);
    let mut detector = StallDetector::new(config.stall_threshold, config.max_iterations);
    let mut measurements = Vec::new();
    let mut failure = None;

    while detector.state() != LoadState::Done {
        let count = match ctx.count(&config.markup.item).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!("Measuring items failed, stopping early: {e:#}");
                failure = Some(format!("{e:#}"));
                break;
            }
        };
        measurements.push(count);
        let state = detector.observe(count);
        tracing::info!("Items loaded: {count}");
        tracing::debug!(
            iteration = detector.iterations(),
            stall_count = detector.stall_count(),
            ?state,
            "pagination step"
        );

        if let Err(e) = ctx.scroll_to_bottom().await {
            tracing::warn!("Scroll failed, stopping early: {e:#}");
            failure = Some(format!("{e:#}"));
            break;
        }
        tokio::time::sleep(delay).await;
        detector.complete_iteration();
    }

    let stop_reason = match failure {
        Some(message) => StopReason::TriggerFailed(message),
        None => detector.stop_reason().unwrap_or(StopReason::IterationCap),
    };
    let outcome = PaginationOutcome {
        final_count: measurements.last().copied().unwrap_or(0),
        iterations: detector.iterations(),
        measurements,
        stop_reason,
    };

    tracing::info!(
        "Scrolling finished after {} iterations ({:?}), {} items loaded",
        outcome.iterations,
        outcome.stop_reason,
        outcome.final_count
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::snapshot::SnapshotRenderer;
    use crate::renderer::Renderer;

    /// Feed a count sequence through the detector the way `load_all` does.
    fn run_counts(counts: &[usize], threshold: u32, cap: u32) -> (usize, Option<StopReason>) {
        let mut detector = StallDetector::new(threshold, cap);
        let mut measured = 0;
        for &count in counts {
            if detector.state() == LoadState::Done {
                break;
            }
            detector.observe(count);
            measured += 1;
            detector.complete_iteration();
        }
        (measured, detector.stop_reason())
    }

    #[test]
    fn test_stops_on_third_repeat() {
        let (measured, reason) = run_counts(&[5, 10, 10, 10, 10, 10, 10], 3, 50);
        assert_eq!(measured, 5);
        assert_eq!(reason, Some(StopReason::Stalled));
    }

    #[test]
    fn test_growth_resets_stall_counter() {
        let mut detector = StallDetector::new(3, 50);
        detector.observe(4);
        detector.complete_iteration();
        assert_eq!(detector.observe(4), LoadState::Stalled);
        detector.complete_iteration();
        assert_eq!(detector.observe(4), LoadState::Stalled);
        detector.complete_iteration();
        assert_eq!(detector.observe(9), LoadState::Loading);
        assert_eq!(detector.stall_count(), 0);
    }

    #[test]
    fn test_iteration_cap_bounds_growing_list() {
        let counts: Vec<usize> = (1..=500).collect();
        let (measured, reason) = run_counts(&counts, 3, 50);
        assert_eq!(measured, 50);
        assert_eq!(reason, Some(StopReason::IterationCap));
    }

    #[test]
    fn test_termination_bound_over_many_sequences() {
        // Deterministic pseudo-random sequences mixing growth and plateaus.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for _ in 0..200 {
            let mut counts = Vec::new();
            let mut current = 0usize;
            for _ in 0..120 {
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                if seed % 3 == 0 {
                    current += (seed % 7) as usize;
                }
                counts.push(current);
            }
            let (measured, reason) = run_counts(&counts, 3, 20);
            assert!(measured <= 20);
            assert!(reason.is_some());
            if reason == Some(StopReason::Stalled) {
                let tail = &counts[measured.saturating_sub(4)..measured];
                assert!(tail.iter().all(|&c| c == tail[0]));
            }
        }
    }

    #[test]
    fn test_empty_feed_stalls_from_zero() {
        let (measured, reason) = run_counts(&[0, 0, 0, 0], 3, 50);
        assert_eq!(measured, 3);
        assert_eq!(reason, Some(StopReason::Stalled));
    }

    fn frame(items: usize) -> String {
        let body: String = (0..items)
            .map(|i| format!(r#"<div data-e2e="user-post-item"><a href="/v/{i}">v</a></div>"#))
            .collect();
        format!("<html><body>{body}</body></html>")
    }

    fn fast_config() -> ScrapeConfig {
        let mut config = ScrapeConfig::new("someone");
        config.iteration_delay_ms = 0;
        config
    }

    #[tokio::test]
    async fn test_load_all_reaches_stable_count() {
        let renderer = SnapshotRenderer::new(vec![frame(5), frame(10), frame(12)]);
        let mut ctx = renderer.new_context().await.unwrap();

        let outcome = load_all(ctx.as_mut(), &fast_config()).await;

        assert_eq!(outcome.measurements, vec![5, 10, 12, 12, 12, 12]);
        assert_eq!(outcome.final_count, 12);
        assert_eq!(outcome.iterations, 6);
        assert_eq!(outcome.stop_reason, StopReason::Stalled);
        assert_eq!(renderer.probe().scrolls(), 6);
    }

    #[tokio::test]
    async fn test_scroll_failure_keeps_partial_progress() {
        let renderer =
            SnapshotRenderer::new(vec![frame(5), frame(10), frame(12)]).fail_scroll_at(1);
        let mut ctx = renderer.new_context().await.unwrap();

        let outcome = load_all(ctx.as_mut(), &fast_config()).await;

        assert_eq!(outcome.measurements, vec![5, 10]);
        assert_eq!(outcome.final_count, 10);
        assert_eq!(outcome.iterations, 1);
        assert!(matches!(outcome.stop_reason, StopReason::TriggerFailed(_)));
    }

    #[tokio::test]
    async fn test_cap_of_one_measures_once() {
        let renderer = SnapshotRenderer::new(vec![frame(3), frame(6)]);
        let mut ctx = renderer.new_context().await.unwrap();
        let mut config = fast_config();
        config.max_iterations = 1;

        let outcome = load_all(ctx.as_mut(), &config).await;

        assert_eq!(outcome.measurements, vec![3]);
        assert_eq!(outcome.stop_reason, StopReason::IterationCap);
    }
}
