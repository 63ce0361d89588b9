//! Profile page loading and post-list validation.

use std::time::Duration;

use crate::config::ScrapeConfig;
use crate::error::{Result, ScrapeError};
use crate::renderer::{NavigationResult, RenderContext};

/// Load the profile page and confirm that a post list rendered.
///
/// Single attempt: a timeout, a connectivity failure, or a page without any
/// of the configured list markers is returned as a typed error.
pub async fn open_profile(
    ctx: &mut dyn RenderContext,
    config: &ScrapeConfig,
) -> Result<NavigationResult> {
    let url = config.profile_url();
    tracing::info!("Navigating to profile @{}: {url}", config.profile_id);

    let nav = ctx
        .navigate(&url, config.navigation_timeout_ms)
        .await
        .map_err(|e| ScrapeError::from_navigation(&e, &url, config.navigation_timeout_ms))?;

    tokio::time::sleep(Duration::from_millis(config.settle_delay_ms)).await;

    for marker in &config.markup.list_markers {
        let present = ctx
            .exists(marker)
            .await
            .map_err(|e| ScrapeError::from_renderer(&e))?;
        if present {
            tracing::info!(
                "Profile loaded in {}ms (marker {marker})",
                nav.load_time_ms
            );
            return Ok(nav);
        }
    }

    Err(ScrapeError::ProfileNotFound {
        profile: config.profile_id.clone(),
    })
}
