use async_trait::async_trait;
use thirtyfour::error::WebDriverError;
use thirtyfour::fantoccini::error::{CmdError, ErrorStatus};
use thirtyfour::prelude::*;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, warn};

use super::{Browser, BrowserError};
use crate::config::BrowserConfig;

/// Chrome driven through a WebDriver server (chromedriver).
pub struct WebDriverBrowser {
    driver: WebDriver,
}

impl WebDriverBrowser {
    pub async fn launch(config: &BrowserConfig) -> Result<Self, BrowserError> {
        let mut args = vec![
            format!("--window-size={}", config.window_size),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-blink-features=AutomationControlled".to_string(),
            "--lang=pt-BR".to_string(),
            format!("--user-agent={}", config.user_agent),
        ];
        if !config.visible {
            args.insert(0, "--headless=new".to_string());
        }

        let mut caps = DesiredCapabilities::chrome();
        caps.add_chrome_option("args", args)?;

        info!("Connecting to WebDriver at {} (visible: {})", config.webdriver_url, config.visible);

        // chromedriver may still be starting when we are launched alongside it
        let strategy = ExponentialBackoff::from_millis(250)
            .map(jitter)
            .take(config.connect_retries);
        let url = config.webdriver_url.clone();
        let driver = Retry::spawn(strategy, || {
            let url = url.clone();
            let caps = caps.clone();
            async move {
                WebDriver::new(&url, caps).await.inspect_err(|e| {
                    warn!("WebDriver connection failed: {}", e);
                })
            }
        })
        .await?;

        Ok(Self { driver })
    }

    pub async fn quit(self) -> Result<(), BrowserError> {
        self.driver.quit().await?;
        Ok(())
    }

    async fn first(&self, selector: &str) -> Result<WebElement, BrowserError> {
        match self.driver.find(By::Css(selector)).await {
            Ok(elem) => Ok(elem),
            Err(WebDriverError::NoSuchElement(_)) => {
                Err(BrowserError::NoSuchElement(selector.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// chromedriver reports an intercepted click as a standard command error.
fn map_click_error(selector: &str, err: WebDriverError) -> BrowserError {
    match err {
        WebDriverError::CmdError(CmdError::Standard(ref wd))
            if matches!(wd.error, ErrorStatus::ElementClickIntercepted) =>
        {
            BrowserError::ClickIntercepted(selector.to_string())
        }
        WebDriverError::NoSuchElement(_) => BrowserError::NoSuchElement(selector.to_string()),
        e => e.into(),
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        debug!("Navigating to {}", url);
        self.driver.goto(url).await?;
        Ok(())
    }

    async fn ready_state(&self) -> Result<String, BrowserError> {
        let ret = self.driver.execute("return document.readyState;", Vec::new()).await?;
        Ok(ret.json().as_str().unwrap_or_default().to_string())
    }

    async fn count(&self, selector: &str) -> Result<usize, BrowserError> {
        Ok(self.driver.find_all(By::Css(selector)).await?.len())
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>, BrowserError> {
        let elem = self.first(selector).await?;
        Ok(elem.attr(name).await?)
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        let elem = self.first(selector).await?;
        elem.click().await.map_err(|e| map_click_error(selector, e))
    }

    async fn source(&self) -> Result<String, BrowserError> {
        Ok(self.driver.source().await?)
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.driver.current_url().await?.to_string())
    }

    async fn cookies(&self) -> Result<Vec<(String, String)>, BrowserError> {
        let cookies = self.driver.get_all_cookies().await?;
        Ok(cookies
            .into_iter()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect())
    }

    async fn user_agent(&self) -> Result<String, BrowserError> {
        let ret = self.driver.execute("return navigator.userAgent;", Vec::new()).await?;
        ret.json()
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BrowserError::Other("navigator.userAgent is not a string".into()))
    }

    async fn screenshot_png(&self) -> Result<Vec<u8>, BrowserError> {
        Ok(self.driver.screenshot_as_png().await?)
    }
}
