//! Rendered-table fallback: scrape the installment table from the detail page.

use scraper::{Html, Selector};
use tracing::{debug, info};

use super::cleaner::normalize_text;
use super::segments::Segment;
use crate::browser::wait::{wait_dom_complete, wait_for_selector};
use crate::browser::{Browser, BrowserError, Waits};
use crate::models::InstallmentRecord;

pub const ROW_SELECTOR: &str = "table tbody tr";

/// Navigate to the detail page and read its table. A table that never
/// renders is zero installments, not an error.
pub async fn scrape(
    segment: &Segment,
    detail_url: &str,
    browser: &dyn Browser,
    waits: &Waits,
) -> Result<Vec<InstallmentRecord>, BrowserError> {
    browser.goto(detail_url).await?;
    wait_dom_complete(browser, waits).await?;

    if !wait_for_selector(browser, ROW_SELECTOR, waits.table, waits.poll).await? {
        info!("{}: no installment rows rendered within {:?}", detail_url, waits.table);
        return Ok(Vec::new());
    }

    let html = browser.source().await?;
    let records = parse_rows(segment, &html)?;
    debug!("{}: {} rows from rendered table", detail_url, records.len());
    Ok(records)
}

/// Map each `td` row by column index through the segment schema.
/// Rows with fewer cells than the schema are skipped.
pub fn parse_rows(segment: &Segment, html: &str) -> Result<Vec<InstallmentRecord>, BrowserError> {
    let doc = Html::parse_document(html);
    let row_sel = Selector::parse(ROW_SELECTOR)
        .map_err(|e| BrowserError::InvalidSelector(format!("{}: {:?}", ROW_SELECTOR, e)))?;
    let td_sel = Selector::parse("td")
        .map_err(|e| BrowserError::InvalidSelector(format!("td: {:?}", e)))?;

    let schema = segment.schema();
    let mut out = Vec::new();

    for tr in doc.select(&row_sel) {
        let cells: Vec<String> = tr
            .select(&td_sel)
            .map(|td| normalize_text(&td.text().collect::<String>()))
            .collect();

        if cells.len() < schema.min_columns() {
            continue;
        }

        let mut rec = InstallmentRecord::default();
        for (f, cell) in schema.fields.iter().zip(cells) {
            rec.push(f.output, cell);
        }
        out.push(rec);
    }

    Ok(out)
}
