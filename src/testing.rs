//! In-memory stand-ins for the browser, the JSON transport and evidence
//! capture, shared by the unit tests.

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

use crate::browser::{Browser, BrowserError, Waits};
use crate::evidence::EvidenceSink;
use crate::portal::parsers::RECEIPTS_HEADER_SELECTOR;
use crate::portal::structured::{FetchError, JsonTransport, SessionSnapshot};

impl Waits {
    pub fn for_tests() -> Self {
        Self {
            dom: Duration::from_millis(30),
            results: Duration::from_millis(30),
            panel: Duration::from_millis(30),
            table: Duration::from_millis(30),
            poll: Duration::from_millis(5),
        }
    }
}

/// Fresh directory under the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("portal_rpa_{}_{}", name, std::process::id()));
    std::fs::remove_dir_all(&dir).ok();
    dir
}

// ── Browser ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeState {
    current: String,
    visits: Vec<String>,
    clicks: Vec<String>,
    intercepts_left: usize,
}

/// Serves canned HTML per URL. Selectors are evaluated with `scraper`
/// against the current page.
#[derive(Default)]
pub struct FakeBrowser {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
    ready_state: Option<String>,
    state: Mutex<FakeState>,
}

impl FakeBrowser {
    pub const USER_AGENT: &'static str = "FakeAgent/1.0";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Navigating to `url` fails.
    pub fn fail_on(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn with_ready_state(mut self, state: &str) -> Self {
        self.ready_state = Some(state.to_string());
        self
    }

    /// The next `n` clicks on the receipts header are intercepted.
    pub fn intercept_clicks(self, n: usize) -> Self {
        self.state.lock().unwrap().intercepts_left = n;
        self
    }

    pub fn visits(&self) -> Vec<String> {
        self.state.lock().unwrap().visits.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    fn current_html(&self) -> String {
        let state = self.state.lock().unwrap();
        self.pages.get(&state.current).cloned().unwrap_or_default()
    }

    fn parse_selector(css: &str) -> Result<Selector, BrowserError> {
        Selector::parse(css).map_err(|_| BrowserError::InvalidSelector(css.to_string()))
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        let mut state = self.state.lock().unwrap();
        state.visits.push(url.to_string());
        if self.failing.contains(url) {
            return Err(BrowserError::Other(format!("net::ERR_CONNECTION_RESET at {}", url)));
        }
        state.current = url.to_string();
        Ok(())
    }

    async fn ready_state(&self) -> Result<String, BrowserError> {
        Ok(self.ready_state.clone().unwrap_or_else(|| "complete".to_string()))
    }

    async fn count(&self, selector: &str) -> Result<usize, BrowserError> {
        let sel = Self::parse_selector(selector)?;
        Ok(Html::parse_document(&self.current_html()).select(&sel).count())
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>, BrowserError> {
        let sel = Self::parse_selector(selector)?;
        let doc = Html::parse_document(&self.current_html());
        let elem = doc
            .select(&sel)
            .next()
            .ok_or_else(|| BrowserError::NoSuchElement(selector.to_string()))?;
        Ok(elem.value().attr(name).map(str::to_string))
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let mut state = self.state.lock().unwrap();
        state.clicks.push(selector.to_string());
        if selector == RECEIPTS_HEADER_SELECTOR && state.intercepts_left > 0 {
            state.intercepts_left -= 1;
            return Err(BrowserError::ClickIntercepted(selector.to_string()));
        }
        Ok(())
    }

    async fn source(&self) -> Result<String, BrowserError> {
        Ok(self.current_html())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.state.lock().unwrap().current.clone())
    }

    async fn cookies(&self) -> Result<Vec<(String, String)>, BrowserError> {
        Ok(vec![
            ("JSESSIONID".to_string(), "abc123".to_string()),
            ("cookiebar".to_string(), "CookieAllowed".to_string()),
        ])
    }

    async fn user_agent(&self) -> Result<String, BrowserError> {
        Ok(Self::USER_AGENT.to_string())
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>, BrowserError> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }
}

// ── Transport ─────────────────────────────────────────────────────────────────

pub type SeenRequests = Arc<Mutex<Vec<(Url, SessionSnapshot)>>>;

pub struct FakeTransport {
    body: Option<String>,
    seen: SeenRequests,
}

impl FakeTransport {
    pub fn ok(body: &str) -> Self {
        Self {
            body: Some(body.to_string()),
            seen: SeenRequests::default(),
        }
    }

    /// Every request answers HTTP 403.
    pub fn failing() -> Self {
        Self {
            body: None,
            seen: SeenRequests::default(),
        }
    }

    pub fn requests(&self) -> SeenRequests {
        Arc::clone(&self.seen)
    }
}

#[async_trait]
impl JsonTransport for FakeTransport {
    async fn get_json(&self, url: &Url, session: &SessionSnapshot) -> Result<String, FetchError> {
        self.seen.lock().unwrap().push((url.clone(), session.clone()));
        self.body.clone().ok_or_else(|| FetchError::Status {
            url: url.to_string(),
            status: 403,
        })
    }
}

// ── Evidence ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingEvidence {
    prefixes: Arc<Mutex<Vec<String>>>,
}

impl RecordingEvidence {
    pub fn prefixes(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.prefixes)
    }
}

#[async_trait]
impl EvidenceSink for RecordingEvidence {
    async fn capture(&self, _browser: &dyn Browser, prefix: &str) -> Option<String> {
        self.prefixes.lock().unwrap().push(prefix.to_string());
        Some(format!("{}_00000000", prefix))
    }
}

// ── Portal pages ──────────────────────────────────────────────────────────────

pub mod html {
    /// Search result list with one name link per href.
    pub fn result_list(hrefs: &[&str]) -> String {
        let links: String = hrefs
            .iter()
            .map(|h| format!(r#"<li><a class="link-busca-nome" href="{}">NOME</a></li>"#, h))
            .collect();
        format!(r#"<html><body><div id="resultados"><ul>{}</ul></div></body></html>"#, links)
    }

    /// Subject page with labelled fields and one receipts card per
    /// (title, detail href).
    pub fn subject_page(name: &str, cpf: &str, locality: &str, cards: &[(&str, &str)]) -> String {
        let boxes: String = cards
            .iter()
            .map(|(title, href)| {
                format!(
                    r#"<div class="responsive"><strong>{title}</strong>
                    <table><thead><tr><th>Detalhar</th><th>NIS</th><th>Nome</th><th>Valor</th></tr></thead>
                    <tbody><tr><td></td><td>1.234.567.890-1</td><td>{name}</td><td>R$ 2.400,00</td>
                    <td><a class="br-button" href="{href}">Detalhar</a></td></tr></tbody></table></div>"#
                )
            })
            .collect();

        format!(
            r#"<html><body>
            <section class="dados-tabelados">
              <div><strong>Nome</strong> <span>{name}</span></div>
              <div><strong>CPF</strong> <span>{cpf}</span></div>
              <div><strong>Localidade</strong> <span>{locality}</span></div>
            </section>
            <button class="header" aria-controls="accordion-recebimentos-recursos">Recebimentos de recursos</button>
            <div id="accordion-recebimentos-recursos"><div class="br-table">{boxes}</div></div>
            <div id="cookiebar"><button id="cookiebar_close">Fechar</button></div>
            </body></html>"#
        )
    }
}
