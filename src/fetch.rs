use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{Result, WatchError};
use crate::extract::SourceKind;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
pub const DEFAULT_OCR_COMMAND: &str = "tesseract {image} stdout";

static GID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[#?&]gid=(\d+)").unwrap());

/// Where a run gets its raw content from.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self, kind: SourceKind) -> Result<String>;
}

/// Fetches the published sheet over HTTP; OCR content goes through an external command.
pub struct HttpSource {
    client: reqwest::Client,
    page_url: String,
    csv_url: String,
    timeout: Duration,
    snapshot_path: Option<PathBuf>,
    ocr_command: String,
}

impl HttpSource {
    pub fn new(
        page_url: &str,
        csv_url: Option<&str>,
        user_agent: &str,
        timeout: Duration,
        snapshot_path: Option<PathBuf>,
        ocr_command: &str,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            page_url: page_url.to_string(),
            csv_url: csv_url
                .map(str::to_string)
                .unwrap_or_else(|| csv_export_url(page_url)),
            timeout,
            snapshot_path,
            ocr_command: ocr_command.to_string(),
        })
    }

    async fn get(&self, url: &str) -> Result<Vec<u8>> {
        info!("Fetching {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(WatchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await?;
        debug!("Received {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }

    async fn fetch_inner(&self, kind: SourceKind) -> Result<String> {
        match kind {
            SourceKind::Page => {
                let body = self.get(&self.page_url).await?;
                self.snapshot(&body);
                Ok(String::from_utf8_lossy(&body).into_owned())
            }
            SourceKind::Csv => {
                let body = self.get(&self.csv_url).await?;
                self.snapshot(&body);
                Ok(String::from_utf8_lossy(&body).into_owned())
            }
            SourceKind::Image => {
                let body = self.get(&self.page_url).await?;
                let image = self
                    .snapshot_path
                    .clone()
                    .unwrap_or_else(|| std::env::temp_dir().join("sheet_watch_capture.png"));
                std::fs::write(&image, &body).map_err(|e| WatchError::Ocr(format!(
                    "cannot write capture to {:?}: {}",
                    image, e
                )))?;
                run_ocr(&self.ocr_command, &image).await
            }
        }
    }

    /// Best-effort diagnostic copy of the fetched body.
    fn snapshot(&self, body: &[u8]) {
        let Some(path) = &self.snapshot_path else {
            return;
        };
        match std::fs::write(path, body) {
            Ok(()) => info!("Snapshot saved as {:?}", path),
            Err(e) => warn!("Could not save snapshot {:?}: {}", path, e),
        }
    }
}

#[async_trait]
impl ContentSource for HttpSource {
    async fn fetch(&self, kind: SourceKind) -> Result<String> {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Loading sheet...");
        pb.enable_steady_tick(Duration::from_millis(120));

        let result = tokio::time::timeout(self.timeout, self.fetch_inner(kind)).await;
        pb.finish_and_clear();

        match result {
            Ok(inner) => inner,
            Err(_) => Err(WatchError::Timeout(self.timeout.as_secs())),
        }
    }
}

/// Run the configured OCR command; `{image}` is replaced by the capture path.
async fn run_ocr(command: &str, image: &Path) -> Result<String> {
    let image = image.to_string_lossy();
    let mut parts = command
        .split_whitespace()
        .map(|p| p.replace("{image}", &image));
    let program = parts
        .next()
        .ok_or_else(|| WatchError::Ocr("empty OCR command".to_string()))?;

    let output = tokio::process::Command::new(&program)
        .args(parts)
        .output()
        .await
        .map_err(|e| WatchError::Ocr(format!("cannot run {}: {}", program, e)))?;

    if !output.status.success() {
        return Err(WatchError::Ocr(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// CSV export link for a Google Sheets URL; other URLs are returned unchanged.
pub fn csv_export_url(url: &str) -> String {
    let gid = GID_RE.captures(url).map(|c| c[1].to_string());
    let with_gid = |base: &str| match &gid {
        Some(g) => format!("{}/export?format=csv&gid={}", base, g),
        None => format!("{}/export?format=csv", base),
    };

    if let Some(i) = url.find("/pubhtml") {
        let base = &url[..i];
        return match &gid {
            Some(g) => format!("{}/pub?output=csv&gid={}", base, g),
            None => format!("{}/pub?output=csv", base),
        };
    }
    for marker in ["/edit", "/htmlview", "/preview"] {
        if let Some(i) = url.find(marker) {
            return with_gid(&url[..i]);
        }
    }
    url.to_string()
}
