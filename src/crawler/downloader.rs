//! Bounded image download pool
//!
//! One pool is built per run and reused for every album page. It owns a
//! semaphore whose permit count is the only concurrency knob: each image task
//! holds a permit for as long as it is talking to the network or the disk.
//!
//! Every image is written to `<file>.part` first and renamed onto its final
//! name only once the whole body has arrived, so a failed or interrupted
//! download never leaves a truncated file under the final name.

use crate::config::DownloadConfig;
use reqwest::header::REFERER;
use reqwest::Client;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// One image to fetch and the file it goes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadItem {
    pub url: String,
    pub path: PathBuf,
}

/// Final state of one download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// File written to its destination
    Downloaded { bytes: u64, attempts: u32 },
    /// Destination already existed and `skip-existing` is on
    AlreadyPresent,
    /// Every attempt failed; nothing was written
    Skipped { attempts: u32, reason: String },
}

/// Tally of one batch handed to [`DownloadPool::download_all`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub downloaded: usize,
    pub already_present: usize,
    pub skipped: usize,
}

impl BatchReport {
    fn record(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Downloaded { .. } => self.downloaded += 1,
            DownloadOutcome::AlreadyPresent => self.already_present += 1,
            DownloadOutcome::Skipped { .. } => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.downloaded + self.already_present + self.skipped
    }
}

/// Failure of a single download attempt
#[derive(Debug, Error)]
enum AttemptError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
struct Settings {
    max_attempts: u32,
    retry_delay: Duration,
    timeout: Duration,
    skip_existing: bool,
}

/// Long-lived pool downloading images with bounded parallelism
#[derive(Debug, Clone)]
pub struct DownloadPool {
    client: Client,
    permits: Arc<Semaphore>,
    workers: usize,
    settings: Arc<Settings>,
}

impl DownloadPool {
    /// Creates a pool sharing `client`'s connection pool
    pub fn new(client: Client, config: &DownloadConfig) -> Self {
        let workers = config.workers.max(1) as usize;

        Self {
            client,
            permits: Arc::new(Semaphore::new(workers)),
            workers,
            settings: Arc::new(Settings {
                max_attempts: config.max_attempts.max(1),
                retry_delay: Duration::from_millis(config.retry_delay_ms),
                timeout: Duration::from_secs(config.timeout_secs),
                skip_existing: config.skip_existing,
            }),
        }
    }

    /// Number of downloads allowed to run at once
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Downloads a batch and waits until every item has finished
    ///
    /// Items are independent: a failed item is logged and counted as skipped,
    /// and never stops the others.
    ///
    /// # Arguments
    ///
    /// * `items` - Images of one album page, each with a distinct destination
    /// * `referer` - Referer header sent with every image request
    pub async fn download_all(&self, items: Vec<DownloadItem>, referer: &str) -> BatchReport {
        let mut tasks = JoinSet::new();

        for item in items {
            let client = self.client.clone();
            let permits = Arc::clone(&self.permits);
            let settings = Arc::clone(&self.settings);
            let referer = referer.to_string();

            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return DownloadOutcome::Skipped {
                        attempts: 0,
                        reason: "download pool closed".to_string(),
                    };
                };
                download_one(&client, &item, &referer, &settings).await
            });
        }

        let mut report = BatchReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.record(&outcome),
                Err(e) => {
                    tracing::error!("Download task aborted: {}", e);
                    report.skipped += 1;
                }
            }
        }

        report
    }

    /// Downloads a single item with the pool's retry settings
    ///
    /// Does not take a permit; use [`download_all`](Self::download_all) for
    /// bounded batches.
    pub async fn download(&self, item: &DownloadItem, referer: &str) -> DownloadOutcome {
        download_one(&self.client, item, referer, &self.settings).await
    }
}

async fn download_one(
    client: &Client,
    item: &DownloadItem,
    referer: &str,
    settings: &Settings,
) -> DownloadOutcome {
    if settings.skip_existing && fs::metadata(&item.path).await.is_ok() {
        tracing::debug!("Already present: {}", item.path.display());
        return DownloadOutcome::AlreadyPresent;
    }

    if let Some(parent) = item.path.parent() {
        if let Err(e) = fs::create_dir_all(parent).await {
            tracing::warn!("Cannot create folder {}: {}", parent.display(), e);
            return DownloadOutcome::Skipped {
                attempts: 0,
                reason: e.to_string(),
            };
        }
    }

    let part = part_path(&item.path);
    let mut last_error = String::new();

    for attempt in 1..=settings.max_attempts {
        match fetch_to_file(client, &item.url, referer, &part, settings.timeout).await {
            Ok(bytes) => match fs::rename(&part, &item.path).await {
                Ok(()) => {
                    tracing::info!("Downloaded: {}", item.path.display());
                    return DownloadOutcome::Downloaded {
                        bytes,
                        attempts: attempt,
                    };
                }
                Err(e) => last_error = AttemptError::from(e).to_string(),
            },
            Err(e) => last_error = e.to_string(),
        }

        discard(&part).await;
        tracing::warn!(
            "Attempt {} failed for {}: {}",
            attempt,
            item.url,
            last_error
        );

        if attempt < settings.max_attempts {
            tokio::time::sleep(settings.retry_delay).await;
        }
    }

    tracing::warn!("Skipping failed download: {}", item.url);
    DownloadOutcome::Skipped {
        attempts: settings.max_attempts,
        reason: last_error,
    }
}

/// Streams one response body into `part`, returning the number of bytes
async fn fetch_to_file(
    client: &Client,
    url: &str,
    referer: &str,
    part: &Path,
    timeout: Duration,
) -> Result<u64, AttemptError> {
    let mut response = client
        .get(url)
        .header(REFERER, referer)
        .timeout(timeout)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(AttemptError::Status(status.as_u16()));
    }

    let mut file = fs::File::create(part).await?;
    let mut bytes = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        bytes += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(bytes)
}

async fn discard(part: &Path) {
    if let Err(e) = fs::remove_file(part).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!("Could not remove {}: {}", part.display(), e);
        }
    }
}

/// Temporary path a download is streamed into before the final rename
pub fn part_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(OsString::new);
    name.push(".part");
    path.with_file_name(name)
}
