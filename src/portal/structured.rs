//! Structured fetcher: the JSON endpoint behind a benefit's detail table.
//!
//! The endpoint only answers requests that carry the browser's session
//! cookies and user agent, so a [`SessionSnapshot`] is taken from the live
//! browser on every call.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::cleaner::json_scalar_to_string;
use super::segments::Segment;
use crate::browser::{Browser, BrowserError};
use crate::models::InstallmentRecord;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("response has no `data` array")]
    MissingData,

    #[error("row {row} is not a JSON object")]
    RowNotObject { row: usize },

    #[error("row {row} lacks field `{field}`")]
    MissingField { row: usize, field: &'static str },

    #[error("row {row} has a non-scalar `{field}`")]
    NonScalarField { row: usize, field: &'static str },

    #[error("could not read browser session: {0}")]
    Session(#[from] BrowserError),

    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),
}

// ── Transport ─────────────────────────────────────────────────────────────────

/// Browser state a side request must replay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub cookies: Vec<(String, String)>,
    pub user_agent: String,
    pub referer: String,
}

impl SessionSnapshot {
    pub async fn capture(browser: &dyn Browser) -> Result<Self, BrowserError> {
        Ok(Self {
            cookies: browser.cookies().await?,
            user_agent: browser.user_agent().await?,
            referer: browser.current_url().await?,
        })
    }
}

#[async_trait]
pub trait JsonTransport: Send + Sync {
    /// GET `url` replaying `session`; returns the body of a 2xx response.
    async fn get_json(&self, url: &Url, session: &SessionSnapshot) -> Result<String, FetchError>;
}

// ── Fetcher ───────────────────────────────────────────────────────────────────

pub struct StructuredFetcher {
    base_url: String,
    page_size: u32,
    transport: Box<dyn JsonTransport>,
}

impl StructuredFetcher {
    pub fn new(base_url: &str, page_size: u32, transport: Box<dyn JsonTransport>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size,
            transport,
        }
    }

    /// Everything in one page, newest first, only the schema's columns.
    pub fn endpoint_url(
        &self,
        segment: &Segment,
        benefit_id: &str,
        subject_id: &str,
    ) -> Result<Url, FetchError> {
        let schema = segment.schema();
        let endpoint = format!(
            "{}/beneficios/{}/{}",
            self.base_url,
            segment.slug(),
            schema.endpoint_path
        );
        let page_size = self.page_size.to_string();
        let columns = schema.selected_columns();

        let url = Url::parse_with_params(
            &endpoint,
            &[
                ("paginacaoSimples", "true"),
                ("tamanhoPagina", page_size.as_str()),
                ("offset", "0"),
                ("direcaoOrdenacao", "desc"),
                ("colunaOrdenacao", schema.sort_column),
                ("colunasSelecionadas", columns.as_str()),
                (schema.id_param, benefit_id),
                ("pessoa", subject_id),
            ],
        )?;
        Ok(url)
    }

    pub async fn fetch(
        &self,
        segment: &Segment,
        benefit_id: &str,
        subject_id: &str,
        browser: &dyn Browser,
    ) -> Result<Vec<InstallmentRecord>, FetchError> {
        let url = self.endpoint_url(segment, benefit_id, subject_id)?;
        let session = SessionSnapshot::capture(browser).await?;

        debug!("{} {}: structured fetch ({} cookies)", segment, benefit_id, session.cookies.len());
        let body = self.transport.get_json(&url, &session).await?;

        let records = parse_rows(segment, &body)?;
        debug!("{} {}: {} rows from endpoint", segment, benefit_id, records.len());
        Ok(records)
    }
}

/// Map the endpoint's `data` rows through the segment schema.
/// One bad row fails the whole response.
pub fn parse_rows(segment: &Segment, body: &str) -> Result<Vec<InstallmentRecord>, FetchError> {
    let doc: Value = serde_json::from_str(body)?;
    let rows = doc
        .get("data")
        .and_then(Value::as_array)
        .ok_or(FetchError::MissingData)?;

    let schema = segment.schema();
    let mut out = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let obj = row.as_object().ok_or(FetchError::RowNotObject { row: i })?;

        let mut rec = InstallmentRecord::default();
        for f in schema.fields {
            let value = obj
                .get(f.source)
                .ok_or(FetchError::MissingField { row: i, field: f.source })?;
            let text = json_scalar_to_string(value)
                .ok_or(FetchError::NonScalarField { row: i, field: f.source })?;
            rec.push(f.output, text);
        }
        out.push(rec);
    }

    Ok(out)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
