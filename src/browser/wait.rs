use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::debug;

use super::{Browser, BrowserError};
use crate::config::WaitConfig;

/// Bounds for every blocking poll the scraper performs.
#[derive(Debug, Clone, Copy)]
pub struct Waits {
    pub dom: Duration,
    pub results: Duration,
    pub panel: Duration,
    pub table: Duration,
    pub poll: Duration,
}

impl From<&WaitConfig> for Waits {
    fn from(cfg: &WaitConfig) -> Self {
        Self {
            dom: Duration::from_secs(cfg.dom_secs),
            results: Duration::from_secs(cfg.results_secs),
            panel: Duration::from_secs(cfg.panel_secs),
            table: Duration::from_secs(cfg.table_secs),
            poll: Duration::from_millis(cfg.poll_ms),
        }
    }
}

/// Block until `document.readyState == "complete"`.
pub async fn wait_dom_complete(browser: &dyn Browser, waits: &Waits) -> Result<(), BrowserError> {
    let deadline = Instant::now() + waits.dom;
    loop {
        if browser.ready_state().await? == "complete" {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(BrowserError::Timeout {
                what: "document.readyState == complete".into(),
                timeout: waits.dom,
            });
        }
        sleep(waits.poll).await;
    }
}

/// Poll until at least one element matches. `Ok(false)` on timeout.
pub async fn wait_for_selector(
    browser: &dyn Browser,
    selector: &str,
    timeout: Duration,
    poll: Duration,
) -> Result<bool, BrowserError> {
    let deadline = Instant::now() + timeout;
    loop {
        if browser.count(selector).await? > 0 {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            debug!("No `{}` after {:?}", selector, timeout);
            return Ok(false);
        }
        sleep(poll).await;
    }
}
