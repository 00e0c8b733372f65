//! Benefit resolver: structured endpoint first, rendered table second.

use tracing::{debug, warn};

use super::error::ScrapeError;
use super::rendered;
use super::structured::StructuredFetcher;
use crate::browser::{Browser, Waits};
use crate::models::{BenefitCard, InstallmentRecord};

pub struct BenefitResolver {
    fetcher: StructuredFetcher,
    waits: Waits,
    strict_segments: bool,
}

impl BenefitResolver {
    pub fn new(fetcher: StructuredFetcher, waits: Waits, strict_segments: bool) -> Self {
        Self {
            fetcher,
            waits,
            strict_segments,
        }
    }

    /// The structured path runs once; any failure there sends the card to the
    /// fallback, also once. Only a fallback failure reaches the caller.
    pub async fn resolve(
        &self,
        card: &BenefitCard,
        subject_id: &str,
        browser: &dyn Browser,
    ) -> Result<Vec<InstallmentRecord>, ScrapeError> {
        if !card.segment.is_known() {
            if self.strict_segments {
                return Err(ScrapeError::UnknownSegment(card.segment.slug().to_string()));
            }
            warn!(
                "Unknown segment `{}` for {}; using the two-field schema",
                card.segment, card.detail_url
            );
        }

        match self
            .fetcher
            .fetch(&card.segment, &card.benefit_id, subject_id, browser)
            .await
        {
            Ok(records) => return Ok(records),
            Err(e) => warn!("Structured fetch failed for {}: {}", card.detail_url, e),
        }

        debug!("Falling back to rendered table for {}", card.detail_url);
        rendered::scrape(&card.segment, &card.detail_url, browser, &self.waits)
            .await
            .map_err(|source| ScrapeError::CardResolution {
                link: card.detail_url.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SummaryFields;
    use crate::testing::{FakeBrowser, FakeTransport};
    use tokio_test::{assert_err, assert_ok};

    const DETAIL: &str = "https://portal.test/beneficios/safra/77";
    const TABLE: &str = "<table><tbody>\
        <tr><td>01/2023</td><td>CE</td><td>CRATO</td><td>1.200,00</td></tr>\
        </tbody></table>";
    const SAFRA_BODY: &str =
        r#"{"data":[{"mesFolha":"01/2023","uf":"CE","municipio":"CRATO","valor":"1.200,00"}]}"#;

    fn card(url: &str) -> BenefitCard {
        BenefitCard::new("Garantia-Safra".into(), url.into(), SummaryFields::default())
    }

    fn resolver(transport: FakeTransport, strict: bool) -> BenefitResolver {
        let fetcher = StructuredFetcher::new("https://portal.test", 1000, Box::new(transport));
        BenefitResolver::new(fetcher, Waits::for_tests(), strict)
    }

    #[tokio::test]
    async fn test_structured_success_skips_fallback() {
        let transport = FakeTransport::ok(SAFRA_BODY);
        let calls = transport.requests();
        let browser = FakeBrowser::new().page(DETAIL, TABLE);
        let r = resolver(transport, false);

        let recs = assert_ok!(r.resolve(&card(DETAIL), "1", &browser).await);
        assert_eq!(recs.len(), 1);
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert!(browser.visits().is_empty());
    }

    #[tokio::test]
    async fn test_structured_failure_runs_fallback_once_without_retry() {
        let transport = FakeTransport::failing();
        let calls = transport.requests();
        let browser = FakeBrowser::new().page(DETAIL, TABLE);
        let r = resolver(transport, false);

        let recs = assert_ok!(r.resolve(&card(DETAIL), "1", &browser).await);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].get("municipio"), Some("CRATO"));
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(browser.visits(), vec![DETAIL.to_string()]);
    }

    #[tokio::test]
    async fn test_malformed_json_falls_back() {
        let transport = FakeTransport::ok(r#"{"data":[{"mesFolha":"01/2023"}]}"#);
        let browser = FakeBrowser::new().page(DETAIL, TABLE);
        let r = resolver(transport, false);

        let recs = assert_ok!(r.resolve(&card(DETAIL), "1", &browser).await);
        assert_eq!(recs.len(), 1);
        assert_eq!(browser.visits().len(), 1);
    }

    #[tokio::test]
    async fn test_fallback_timeout_is_empty_not_error() {
        let browser = FakeBrowser::new().page(DETAIL, "<div>sem dados</div>");
        let r = resolver(FakeTransport::failing(), false);

        let recs = assert_ok!(r.resolve(&card(DETAIL), "1", &browser).await);
        assert!(recs.is_empty());
    }

    #[tokio::test]
    async fn test_both_paths_failing_is_card_error() {
        let browser = FakeBrowser::new().page(DETAIL, TABLE).fail_on(DETAIL);
        let r = resolver(FakeTransport::failing(), false);

        let err = assert_err!(r.resolve(&card(DETAIL), "1", &browser).await);
        assert!(matches!(err, ScrapeError::CardResolution { ref link, .. } if link == DETAIL));
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_unknown_segment() {
        let url = "https://portal.test/beneficios/bpc/5";
        let transport = FakeTransport::failing();
        let calls = transport.requests();
        let browser = FakeBrowser::new().page(url, TABLE);
        let r = resolver(transport, true);

        let err = assert_err!(r.resolve(&card(url), "1", &browser).await);
        assert!(matches!(err, ScrapeError::UnknownSegment(ref s) if s == "bpc"));
        assert!(calls.lock().unwrap().is_empty());
        assert!(browser.visits().is_empty());
    }

    #[tokio::test]
    async fn test_lenient_mode_uses_degenerate_schema() {
        let url = "https://portal.test/beneficios/bpc/5";
        let browser = FakeBrowser::new()
            .page(url, "<table><tbody><tr><td>05/2024</td><td>1.412,00</td></tr></tbody></table>");
        let r = resolver(FakeTransport::failing(), false);

        let recs = assert_ok!(r.resolve(&card(url), "1", &browser).await);
        assert_eq!(recs[0].field_names(), vec!["mes_ref", "valor"]);
    }
}
