//! Pipeline orchestrator: ties browser → portal scraper → output together.
//!
//! ## Run
//!
//! 1. Create the run directory (`json/`, `html/`, `png/`).
//! 2. Start a WebDriver session.
//! 3. Search the portal and assemble every subject found, one at a time.
//! 4. Write the output document, plus a copy under `json/`. An empty
//!    search writes nothing and fails the run.
//! 5. Quit the browser whatever happened.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::browser::{Browser, Waits, WebDriverBrowser};
use crate::config::AppConfig;
use crate::evidence::{FileEvidence, RunDir, write_report};
use crate::portal::http_client::HttpClient;
use crate::portal::resolver::BenefitResolver;
use crate::portal::structured::StructuredFetcher;
use crate::portal::{PortalScraper, RunStats};

pub struct Pipeline {
    config: AppConfig,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    fn build_scraper(&self, run_dir: RunDir) -> Result<PortalScraper> {
        let portal = &self.config.portal;
        let waits = Waits::from(&self.config.waits);

        let fetcher = StructuredFetcher::new(
            &portal.base_url,
            portal.page_size,
            Box::new(HttpClient::new(portal)),
        );
        let resolver = BenefitResolver::new(fetcher, waits, portal.strict_segments);

        PortalScraper::new(
            &portal.base_url,
            portal.results_page_size,
            portal.max_subjects,
            waits,
            resolver,
            Box::new(FileEvidence::new(run_dir)),
        )
        .with_context(|| format!("Invalid portal base url {:?}", portal.base_url))
    }

    pub async fn run(&self, query: Option<&str>, out: &Path) -> Result<RunStats> {
        let run_dir = RunDir::create(&self.config.output.evidence_dir)
            .context("Failed to create run directory")?;
        info!("Run directory: {:?}", run_dir.root());

        let browser = WebDriverBrowser::launch(&self.config.browser)
            .await
            .context("Failed to start browser")?;

        let outcome = self.execute(&browser, &run_dir, query, out).await;

        if let Err(e) = browser.quit().await {
            warn!("Failed to quit browser: {}", e);
        }
        outcome
    }

    /// Scrape with an already running browser and write the output document.
    /// Nothing is written when the scrape fails.
    pub async fn execute(
        &self,
        browser: &dyn Browser,
        run_dir: &RunDir,
        query: Option<&str>,
        out: &Path,
    ) -> Result<RunStats> {
        let scraper = self.build_scraper(run_dir.clone())?;
        let (report, stats) = scraper.run(browser, query).await.context("Scrape failed")?;

        write_report(out, &report)?;
        let copy = run_dir.json_dir().join(file_name_or_default(out));
        write_report(&copy, &report)?;

        info!(
            "=== Done: {} subjects ({} failed) | {} cards ({} failed) | {} installments → {:?} ===",
            stats.subjects_attempted - stats.subjects_failed,
            stats.subjects_failed,
            stats.cards_attempted,
            stats.cards_failed,
            stats.installments,
            out,
        );

        Ok(stats)
    }
}

fn file_name_or_default(path: &Path) -> PathBuf {
    path.file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("beneficiarios.json"))
}
