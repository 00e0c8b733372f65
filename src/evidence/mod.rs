//! Run directory, failure evidence and the output document.
//!
//! Layout of one run:
//!
//! ```text
//! <evidence_dir>/test_2024-05-01_14-03-22/
//!     json/   output document copy
//!     html/   <prefix>_<id>.html page snapshots
//!     png/    <prefix>_<id>.png  screenshots
//! ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Local;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::browser::Browser;
use crate::models::RunReport;

// ── Sink ──────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait EvidenceSink: Send + Sync {
    /// Snapshot the current page. Returns the correlation reference, or
    /// `None` when nothing could be written. Never fails the caller.
    async fn capture(&self, browser: &dyn Browser, prefix: &str) -> Option<String>;
}

// ── Run directory ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RunDir {
    root: PathBuf,
}

impl RunDir {
    pub fn create(base: &Path) -> Result<Self> {
        let root = base.join(Local::now().format("test_%Y-%m-%d_%H-%M-%S").to_string());
        for sub in ["json", "html", "png"] {
            let dir = root.join(sub);
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Could not create dir {:?}", dir))?;
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn json_dir(&self) -> PathBuf {
        self.root.join("json")
    }

    fn html_path(&self, reference: &str) -> PathBuf {
        self.root.join("html").join(format!("{}.html", reference))
    }

    fn png_path(&self, reference: &str) -> PathBuf {
        self.root.join("png").join(format!("{}.png", reference))
    }
}

/// Writes evidence into a [`RunDir`].
pub struct FileEvidence {
    run_dir: RunDir,
}

impl FileEvidence {
    pub fn new(run_dir: RunDir) -> Self {
        Self { run_dir }
    }
}

/// `<prefix>_<8 hex digits>`
pub fn correlation_ref(prefix: &str) -> String {
    format!("{}_{:08x}", prefix, rand::random::<u32>())
}

#[async_trait]
impl EvidenceSink for FileEvidence {
    async fn capture(&self, browser: &dyn Browser, prefix: &str) -> Option<String> {
        let reference = correlation_ref(prefix);
        let mut written = false;

        match browser.source().await {
            Ok(html) => match tokio::fs::write(self.run_dir.html_path(&reference), html).await {
                Ok(()) => written = true,
                Err(e) => warn!("Could not write snapshot {}: {}", reference, e),
            },
            Err(e) => warn!("Could not read page source for {}: {}", reference, e),
        }

        match browser.screenshot_png().await {
            Ok(png) => match tokio::fs::write(self.run_dir.png_path(&reference), png).await {
                Ok(()) => written = true,
                Err(e) => warn!("Could not write screenshot {}: {}", reference, e),
            },
            Err(e) => warn!("Could not take screenshot for {}: {}", reference, e),
        }

        if written {
            info!("Evidence saved: {}", reference);
            Some(reference)
        } else {
            None
        }
    }
}

// ── Output document ───────────────────────────────────────────────────────────

/// Pretty JSON, UTF-8, non-ASCII kept as is.
pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Could not create dir {:?}", parent))?;
    }
    let file = File::create(path).with_context(|| format!("Could not create {:?}", path))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("Could not write report to {:?}", path))?;
    Ok(())
}
