//! Browser capability interface.
//!
//! The portal scraper only ever talks to [`Browser`]; the WebDriver-backed
//! implementation lives in [`webdriver`]. DOM content is read through
//! `source()` and parsed with `scraper`, so the trait stays small.

pub mod wait;
pub mod webdriver;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use self::wait::Waits;
pub use self::webdriver::WebDriverBrowser;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("no element matches `{0}`")]
    NoSuchElement(String),

    #[error("click on `{0}` was intercepted by another element")]
    ClickIntercepted(String),

    #[error("timed out after {timeout:?} waiting for {what}")]
    Timeout { what: String, timeout: Duration },

    #[error("invalid selector `{0}`")]
    InvalidSelector(String),

    #[error("webdriver error: {0}")]
    WebDriver(#[from] thirtyfour::error::WebDriverError),

    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait Browser: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), BrowserError>;

    /// `document.readyState` of the current page.
    async fn ready_state(&self) -> Result<String, BrowserError>;

    /// Number of elements matching a CSS selector.
    async fn count(&self, selector: &str) -> Result<usize, BrowserError>;

    /// Attribute of the first element matching `selector`.
    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>, BrowserError>;

    async fn click(&self, selector: &str) -> Result<(), BrowserError>;

    async fn source(&self) -> Result<String, BrowserError>;

    async fn current_url(&self) -> Result<String, BrowserError>;

    /// (name, value) pairs of every cookie visible to the current page.
    async fn cookies(&self) -> Result<Vec<(String, String)>, BrowserError>;

    /// `navigator.userAgent`, so side requests look like the browser.
    async fn user_agent(&self) -> Result<String, BrowserError>;

    async fn screenshot_png(&self) -> Result<Vec<u8>, BrowserError>;
}
