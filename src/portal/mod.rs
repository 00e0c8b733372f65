pub mod cleaner;
pub mod error;
pub mod http_client;
pub mod parsers;
pub mod rendered;
pub mod resolver;
pub mod segments;
pub mod structured;

use chrono::Local;
use tracing::{debug, error, info, warn};
use url::Url;

use self::cleaner::subject_id_from_url;
use self::error::ScrapeError;
use self::parsers::{
    COOKIEBAR_CLOSE_SELECTOR, RECEIPTS_HEADER_SELECTOR, RECEIPTS_TABLE_SELECTOR,
    RESULT_LINK_SELECTOR, labelled_field, parse_cards, parse_result_links,
};
use self::resolver::BenefitResolver;
use crate::browser::wait::{wait_dom_complete, wait_for_selector};
use crate::browser::{Browser, BrowserError, Waits};
use crate::evidence::EvidenceSink;
use crate::models::{RunReport, SubjectRecord};

// ── Stats ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunStats {
    pub subjects_attempted: usize,
    pub subjects_failed: usize,
    pub cards_attempted: usize,
    pub cards_failed: usize,
    pub installments: usize,
}

// ── Portal scraper ────────────────────────────────────────────────────────────

pub struct PortalScraper {
    base_url: Url,
    results_page_size: u32,
    max_subjects: usize,
    waits: Waits,
    resolver: BenefitResolver,
    evidence: Box<dyn EvidenceSink>,
}

impl PortalScraper {
    pub fn new(
        base_url: &str,
        results_page_size: u32,
        max_subjects: usize,
        waits: Waits,
        resolver: BenefitResolver,
        evidence: Box<dyn EvidenceSink>,
    ) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?,
            results_page_size,
            max_subjects,
            waits,
            resolver,
            evidence,
        })
    }

    /// Beneficiary result list, first page only.
    pub fn search_url(&self, query: Option<&str>) -> Result<Url, url::ParseError> {
        let mut url = self.base_url.join("pessoa-fisica/busca/lista")?;
        {
            let mut q = url.query_pairs_mut();
            q.append_pair("pagina", "1")
                .append_pair("tamanhoPagina", &self.results_page_size.to_string())
                .append_pair("beneficiarioProgramaSocial", "true");
            if let Some(term) = query.map(str::trim).filter(|t| !t.is_empty()) {
                q.append_pair("termo", term);
            }
        }
        Ok(url)
    }

    /// Search, then assemble every subject found. Only an empty search fails.
    pub async fn run(
        &self,
        browser: &dyn Browser,
        query: Option<&str>,
    ) -> Result<(RunReport, RunStats), ScrapeError> {
        let links = self.search(browser, query).await?;
        let mut stats = RunStats::default();
        let mut subjects = Vec::with_capacity(links.len());

        for (i, link) in links.iter().enumerate() {
            info!("Subject {}/{}: {}", i + 1, links.len(), link);
            stats.subjects_attempted += 1;

            match self.assemble_subject(browser, link, &mut stats).await {
                Ok(subject) => subjects.push(subject),
                Err(e) => {
                    error!("Subject {} failed: {}", link, e);
                    stats.subjects_failed += 1;
                    self.evidence.capture(browser, "beneficiario").await;
                }
            }
        }

        let report = RunReport {
            query: query.map(str::to_string),
            generated_at: Local::now().naive_local(),
            subjects,
        };
        Ok((report, stats))
    }

    pub async fn search(
        &self,
        browser: &dyn Browser,
        query: Option<&str>,
    ) -> Result<Vec<String>, ScrapeError> {
        let url = self.search_url(query).map_err(|e| BrowserError::Other(e.to_string()))?;
        info!("Searching beneficiaries: {}", url);

        browser.goto(url.as_str()).await?;
        wait_dom_complete(browser, &self.waits).await?;
        // the list renders client-side; the source is parsed either way
        let rendered =
            wait_for_selector(browser, RESULT_LINK_SELECTOR, self.waits.results, self.waits.poll)
                .await?;
        if !rendered {
            debug!("Result list did not render, scanning raw page source");
        }

        let html = browser.source().await?;
        let mut links = parse_result_links(&html, &self.base_url)?;

        if links.is_empty() {
            self.evidence.capture(browser, "erro_lista").await;
            return Err(ScrapeError::NoResults {
                query: query.map(str::to_string),
            });
        }

        self.evidence.capture(browser, "sucesso_lista").await;
        links.truncate(self.max_subjects);
        info!("{} beneficiaries found", links.len());
        Ok(links)
    }

    /// Subject fields plus every benefit card, each resolved to installments.
    /// A failing card is logged and left empty.
    pub async fn assemble_subject(
        &self,
        browser: &dyn Browser,
        url: &str,
        stats: &mut RunStats,
    ) -> Result<SubjectRecord, ScrapeError> {
        let subject_err = |source: BrowserError| ScrapeError::SubjectResolution {
            url: url.to_string(),
            source,
        };

        browser.goto(url).await.map_err(subject_err)?;
        wait_dom_complete(browser, &self.waits).await.map_err(subject_err)?;

        let subject_id = subject_id_from_url(url).unwrap_or_default();
        let html = browser.source().await.map_err(subject_err)?;
        let name = labelled_field(&html, "Nome")?;
        let document_id = labelled_field(&html, "CPF")?;
        let locality = labelled_field(&html, "Localidade")?;
        let evidence_ref = self.evidence.capture(browser, "ficha").await;

        let mut benefits = Vec::new();
        if self.expand_receipts(browser).await.map_err(subject_err)? {
            let page_url = browser.current_url().await.map_err(subject_err)?;
            let page = Url::parse(&page_url)
                .or_else(|_| Url::parse(url))
                .map_err(|e| subject_err(BrowserError::Other(e.to_string())))?;
            let html = browser.source().await.map_err(subject_err)?;
            benefits = parse_cards(&html, &page)?;
            debug!("{}: {} benefit cards", name, benefits.len());

            for card in benefits.iter_mut() {
                stats.cards_attempted += 1;
                match self.resolver.resolve(card, &subject_id, browser).await {
                    Ok(installments) => {
                        info!("  {} → {} installments", card.title, installments.len());
                        stats.installments += installments.len();
                        card.installments = installments;
                    }
                    Err(e) => {
                        error!("Benefit {} failed: {}", card.detail_url, e);
                        stats.cards_failed += 1;
                        self.evidence.capture(browser, "beneficio").await;
                    }
                }

                // following a card navigates away from the subject page
                browser.goto(page.as_str()).await.map_err(subject_err)?;
                wait_dom_complete(browser, &self.waits).await.map_err(subject_err)?;
                self.expand_receipts(browser).await.map_err(subject_err)?;
            }
        } else {
            warn!("{}: receipts panel not available", url);
        }

        Ok(SubjectRecord {
            name,
            document_id,
            locality,
            evidence_ref,
            source_url: url.to_string(),
            benefits,
        })
    }

    /// Open the receipts accordion. Already open is a no-op; an intercepted
    /// click closes the cookie bar and retries once. Returns whether the
    /// panel's table is present afterwards.
    async fn expand_receipts(&self, browser: &dyn Browser) -> Result<bool, BrowserError> {
        let class = match browser.attribute(RECEIPTS_HEADER_SELECTOR, "class").await {
            Ok(class) => class.unwrap_or_default(),
            Err(BrowserError::NoSuchElement(_)) => return Ok(false),
            Err(e) => return Err(e),
        };

        if !class.split_whitespace().any(|c| c == "active") {
            match browser.click(RECEIPTS_HEADER_SELECTOR).await {
                Ok(()) => {}
                Err(BrowserError::ClickIntercepted(_)) => {
                    debug!("Receipts header click intercepted, closing cookie bar");
                    let retried = match browser.click(COOKIEBAR_CLOSE_SELECTOR).await {
                        Ok(()) => browser.click(RECEIPTS_HEADER_SELECTOR).await,
                        Err(e) => Err(e),
                    };
                    if let Err(e) = retried {
                        warn!("Could not expand receipts panel: {}", e);
                    }
                }
                Err(e) => return Err(e),
            }
        }

        wait_for_selector(browser, RECEIPTS_TABLE_SELECTOR, self.waits.panel, self.waits.poll).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
