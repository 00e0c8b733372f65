use scraper::{ElementRef, Html, Selector};
use tracing::warn;
use url::Url;

use super::cleaner::{absolute_url, normalize_text};
use crate::browser::BrowserError;
use crate::models::{BenefitCard, SummaryFields};

pub const RESULT_LINK_SELECTOR: &str = "#resultados a.link-busca-nome";
const LOOSE_RESULT_LINK_SELECTOR: &str = "a.link-busca-nome[href^='/busca/pessoa-fisica/']";

pub const RECEIPTS_HEADER_SELECTOR: &str =
    "button.header[aria-controls='accordion-recebimentos-recursos']";
pub const RECEIPTS_TABLE_SELECTOR: &str = "#accordion-recebimentos-recursos div.br-table";
pub const COOKIEBAR_CLOSE_SELECTOR: &str = "#cookiebar_close";
const CARD_SELECTOR: &str = "#accordion-recebimentos-recursos div.br-table div.responsive";

fn selector(css: &str) -> Result<Selector, BrowserError> {
    Selector::parse(css).map_err(|e| BrowserError::InvalidSelector(format!("{}: {:?}", css, e)))
}

fn text_of(el: ElementRef<'_>) -> String {
    normalize_text(&el.text().collect::<String>())
}

// ── Search result list ────────────────────────────────────────────────────────

/// Beneficiary links on the result list, absolute, de-duplicated in page order.
pub fn parse_result_links(html: &str, base: &Url) -> Result<Vec<String>, BrowserError> {
    let doc = Html::parse_document(html);

    let mut links = Vec::new();
    for css in [RESULT_LINK_SELECTOR, LOOSE_RESULT_LINK_SELECTOR] {
        let sel = selector(css)?;
        for a in doc.select(&sel) {
            let Some(href) = a.value().attr("href") else { continue };
            let url = absolute_url(base, href);
            if !links.contains(&url) {
                links.push(url);
            }
        }
        if !links.is_empty() {
            break;
        }
    }

    Ok(links)
}

// ── Subject page ──────────────────────────────────────────────────────────────

/// Value shown next to a bold label: `<strong>Nome</strong><span>…</span>`.
/// Missing labels read as the empty string.
pub fn labelled_field(html: &str, label: &str) -> Result<String, BrowserError> {
    let doc = Html::parse_document(html);
    let strong = selector("strong")?;

    let value = doc
        .select(&strong)
        .filter(|s| text_of(*s) == label)
        .find_map(|s| {
            s.next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|sib| sib.value().name() == "span")
        })
        .map(text_of)
        .unwrap_or_default();

    Ok(value)
}

/// One card per entry of the receipts panel. Entries without a data row or
/// action link are skipped.
pub fn parse_cards(html: &str, page_url: &Url) -> Result<Vec<BenefitCard>, BrowserError> {
    let doc = Html::parse_document(html);
    let box_sel = selector(CARD_SELECTOR)?;
    let strong_sel = selector("strong")?;
    let row_sel = selector("tbody tr")?;
    let td_sel = selector("td")?;
    let link_sel = selector("a.br-button")?;

    let mut cards = Vec::new();
    for (i, card_box) in doc.select(&box_sel).enumerate() {
        let title = card_box.select(&strong_sel).next().map(text_of).unwrap_or_default();

        let Some(row) = card_box.select(&row_sel).next() else {
            warn!("Card {} ({}) has no data row", i, title);
            continue;
        };
        let Some(href) = row
            .select(&link_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            warn!("Card {} ({}) has no detail link", i, title);
            continue;
        };

        let cols: Vec<String> = row.select(&td_sel).map(text_of).collect();
        let col = |n: usize| cols.get(n).cloned().unwrap_or_default();
        let summary = SummaryFields {
            id: col(1),
            name: col(2),
            total_received: col(3),
        };

        cards.push(BenefitCard::new(title, absolute_url(page_url, href), summary));
    }

    Ok(cards)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
