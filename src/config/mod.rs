use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub portal: PortalConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub waits: WaitConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Portal endpoints and extraction behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PortalConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// `tamanhoPagina` for the structured endpoint; large enough to fetch
    /// every installment in one page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_results_page_size")]
    pub results_page_size: u32,

    #[serde(default = "default_max_subjects")]
    pub max_subjects: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Fail cards whose segment the registry does not know instead of
    /// reading them with the two-field schema.
    #[serde(default)]
    pub strict_segments: bool,
}

/// WebDriver session
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrowserConfig {
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default)]
    pub visible: bool,

    #[serde(default = "default_window_size")]
    pub window_size: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_connect_retries")]
    pub connect_retries: usize,
}

/// Bounds for blocking waits
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WaitConfig {
    #[serde(default = "default_dom_secs")]
    pub dom_secs: u64,

    #[serde(default = "default_results_secs")]
    pub results_secs: u64,

    #[serde(default = "default_panel_secs")]
    pub panel_secs: u64,

    #[serde(default = "default_table_secs")]
    pub table_secs: u64,

    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,
}

/// Where results and evidence go
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_evidence_dir")]
    pub evidence_dir: PathBuf,

    #[serde(default = "default_output_file")]
    pub file: PathBuf,
}

// ── Defaults ─────────────────────────────────────────────────────────────────

fn default_base_url() -> String {
    "https://portaldatransparencia.gov.br".to_string()
}
fn default_page_size() -> u32 {
    1000
}
fn default_results_page_size() -> u32 {
    10
}
fn default_max_subjects() -> usize {
    10
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}
fn default_window_size() -> String {
    "1920,1080".to_string()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36"
        .to_string()
}
fn default_connect_retries() -> usize {
    3
}
fn default_dom_secs() -> u64 {
    20
}
fn default_results_secs() -> u64 {
    30
}
fn default_panel_secs() -> u64 {
    10
}
fn default_table_secs() -> u64 {
    30
}
fn default_poll_ms() -> u64 {
    500
}
fn default_evidence_dir() -> PathBuf {
    PathBuf::from("test_data")
}
fn default_output_file() -> PathBuf {
    PathBuf::from("beneficiarios.json")
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            results_page_size: default_results_page_size(),
            max_subjects: default_max_subjects(),
            request_timeout_secs: default_request_timeout_secs(),
            strict_segments: false,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            visible: false,
            window_size: default_window_size(),
            user_agent: default_user_agent(),
            connect_retries: default_connect_retries(),
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            dom_secs: default_dom_secs(),
            results_secs: default_results_secs(),
            panel_secs: default_panel_secs(),
            table_secs: default_table_secs(),
            poll_ms: default_poll_ms(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            evidence_dir: default_evidence_dir(),
            file: default_output_file(),
        }
    }
}

// ── Loader ───────────────────────────────────────────────────────────────────

impl AppConfig {
    /// Load configuration from file + environment overrides
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let cfg = config::Config::builder()
            .add_source(
                config::File::with_name("config/default")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name("config/local")
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(config::Environment::with_prefix("PORTAL").separator("__"))
            .build()?;

        let app_cfg: AppConfig = cfg.try_deserialize().unwrap_or_else(|e| {
            warn!("Invalid configuration ({}), using defaults", e);
            AppConfig::default()
        });
        Ok(app_cfg)
    }
}
