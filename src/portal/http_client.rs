use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, REFERER};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::structured::{FetchError, JsonTransport, SessionSnapshot};
use crate::config::PortalConfig;

/// reqwest transport. A new client and cookie jar is built per request so
/// the cookies are always the browser's current ones.
pub struct HttpClient {
    timeout: Duration,
}

impl HttpClient {
    pub fn new(config: &PortalConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    fn client_for(
        &self,
        url: &Url,
        session: &SessionSnapshot,
    ) -> Result<reqwest::Client, FetchError> {
        let jar = Jar::default();
        for (name, value) in &session.cookies {
            jar.add_cookie_str(&format!("{}={}", name, value), url);
        }

        reqwest::Client::builder()
            .user_agent(session.user_agent.as_str())
            .timeout(self.timeout)
            .gzip(true)
            .cookie_provider(Arc::new(jar))
            .build()
            .map_err(|source| FetchError::Http { url: url.to_string(), source })
    }
}

#[async_trait]
impl JsonTransport for HttpClient {
    async fn get_json(&self, url: &Url, session: &SessionSnapshot) -> Result<String, FetchError> {
        let client = self.client_for(url, session)?;
        debug!("GET {}", url);

        let resp = client
            .get(url.clone())
            .header(ACCEPT, "application/json, text/plain, */*")
            .header(REFERER, session.referer.as_str())
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await
            .map_err(|source| FetchError::Http { url: url.to_string(), source })?;

        let status = resp.status();
        if !status.is_success() {
            warn!("HTTP {} from {}", status, url);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        resp.text()
            .await
            .map_err(|source| FetchError::Http { url: url.to_string(), source })
    }
}
