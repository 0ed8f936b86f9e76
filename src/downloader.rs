use futures_util::StreamExt;
use reqwest::header::{HeaderMap, CONTENT_RANGE, RANGE};
use reqwest::{Client, StatusCode};
use std::path::Path;
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::models::{DownloadOutcome, DownloadTarget, FileDescriptor, SkipReason};

/// Custom errors for download operations.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),
    #[error("server returned HTTP {0}")]
    Status(u16),
    #[error("size mismatch: expected {expected} bytes, have {actual}")]
    SizeMismatch { expected: u64, actual: u64 },
}

/// What a single GET ended with.
enum Transfer {
    Written { bytes: u64, resumed: bool },
    AlreadyComplete,
    /// 416 or a mismatched 206 that does not line up with the local file.
    Inconsistent,
}

/// Downloads files one after another over a shared, pooled client.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Look at what is already on disk for `descriptor` inside `dir`.
    ///
    /// A file that is smaller than the expected size (or of unknown final
    /// size) is resumed. A file exactly the expected size is complete. A
    /// file larger than expected cannot be a prefix and is started over.
    pub async fn prepare(
        &self,
        descriptor: FileDescriptor,
        dir: &Path,
    ) -> Result<DownloadTarget, DownloadError> {
        let local_path = dir.join(&descriptor.filename);
        let on_disk = match tokio::fs::metadata(&local_path).await {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        let bytes_already_present = match descriptor.expected_size {
            Some(size) if on_disk > size => 0,
            _ => on_disk,
        };
        Ok(DownloadTarget {
            descriptor,
            local_path,
            bytes_already_present,
        })
    }

    /// Bring `target.local_path` up to date with the remote file.
    pub async fn download_file(&self, target: &DownloadTarget) -> DownloadOutcome {
        if self.is_complete(target).await {
            debug!("{} already complete", target.local_path.display());
            return DownloadOutcome::Skipped(SkipReason::AlreadyComplete);
        }

        match self.transfer(target).await {
            Ok(Transfer::Written { bytes, resumed }) => DownloadOutcome::Downloaded { bytes, resumed },
            Ok(Transfer::AlreadyComplete) => DownloadOutcome::Skipped(SkipReason::AlreadyComplete),
            Ok(Transfer::Inconsistent) => {
                debug!(
                    "range for {} does not match the local file, retrying from scratch",
                    target.descriptor.remote_url
                );
                match self.fetch_whole(target).await {
                    Ok(bytes) => DownloadOutcome::Downloaded { bytes, resumed: false },
                    Err(e) => DownloadOutcome::Failed(e),
                }
            }
            Err(e) => DownloadOutcome::Failed(e),
        }
    }

    /// The local file exists and already has the expected size.
    async fn is_complete(&self, target: &DownloadTarget) -> bool {
        let present = target.bytes_already_present;
        if target.descriptor.expected_size != Some(present) {
            return false;
        }
        if present > 0 {
            return true;
        }
        // an empty expected file only counts once it exists and is still empty
        tokio::fs::metadata(&target.local_path)
            .await
            .map(|meta| meta.is_file() && meta.len() == 0)
            .unwrap_or(false)
    }

    /// Internal method to perform one GET, ranged when there is something to resume.
    async fn transfer(&self, target: &DownloadTarget) -> Result<Transfer, DownloadError> {
        let offset = if target.wants_range() {
            target.bytes_already_present
        } else {
            0
        };

        let mut request = self.client.get(&target.descriptor.remote_url);
        if offset > 0 {
            request = request.header(RANGE, format!("bytes={}-", offset));
        }
        let resp = request.send().await?;
        let status = resp.status();

        match status {
            StatusCode::PARTIAL_CONTENT if offset > 0 => {
                if let Some(start) = content_range_start(resp.headers()) {
                    if start != offset {
                        return Ok(Transfer::Inconsistent);
                    }
                }
                debug!(
                    "resuming {} at byte {} ({:?} bytes left)",
                    target.local_path.display(),
                    offset,
                    target.remaining_bytes()
                );
                let bytes = write_body(resp, &target.local_path, true).await?;
                self.check_size(target).await?;
                Ok(Transfer::Written { bytes, resumed: true })
            }
            StatusCode::RANGE_NOT_SATISFIABLE if offset > 0 => {
                let total = target
                    .descriptor
                    .expected_size
                    .or_else(|| content_range_total(resp.headers()));
                // drain whatever the server sent so the connection can be reused
                let _ = resp.bytes().await;
                match total {
                    Some(total) if total == offset => Ok(Transfer::AlreadyComplete),
                    None => Ok(Transfer::AlreadyComplete),
                    Some(_) => Ok(Transfer::Inconsistent),
                }
            }
            s if s.is_success() => {
                if offset > 0 {
                    debug!(
                        "server ignored range for {}, starting over",
                        target.descriptor.remote_url
                    );
                }
                let bytes = self.write_from_start(resp, target).await?;
                Ok(Transfer::Written { bytes, resumed: false })
            }
            s => Err(DownloadError::Status(s.as_u16())),
        }
    }

    /// Plain GET without `Range`, overwriting whatever is on disk.
    async fn fetch_whole(&self, target: &DownloadTarget) -> Result<u64, DownloadError> {
        let resp = self.client.get(&target.descriptor.remote_url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status.as_u16()));
        }
        self.write_from_start(resp, target).await
    }

    async fn write_from_start(
        &self,
        resp: reqwest::Response,
        target: &DownloadTarget,
    ) -> Result<u64, DownloadError> {
        let bytes = write_body(resp, &target.local_path, false).await?;
        self.check_size(target).await?;
        Ok(bytes)
    }

    async fn check_size(&self, target: &DownloadTarget) -> Result<(), DownloadError> {
        if let Some(expected) = target.descriptor.expected_size {
            let actual = tokio::fs::metadata(&target.local_path).await?.len();
            if actual != expected {
                return Err(DownloadError::SizeMismatch { expected, actual });
            }
        }
        Ok(())
    }
}

/// Stream the body to `path` chunk by chunk. Bytes written before an error stay on disk.
async fn write_body(
    resp: reqwest::Response,
    path: &Path,
    append: bool,
) -> Result<u64, DownloadError> {
    let mut options = OpenOptions::new();
    options.create(true).write(true);
    if append {
        options.append(true);
    } else {
        options.truncate(true);
    }
    let mut file = options.open(path).await?;

    let mut written = 0u64;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                file.flush().await?;
                return Err(e.into());
            }
        };
        file.write_all(&bytes).await?;
        written += bytes.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// `bytes 200-499/500` -> 200
fn content_range_start(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get(CONTENT_RANGE)?.to_str().ok()?;
    let range = value.strip_prefix("bytes ")?;
    let (span, _) = range.split_once('/')?;
    let (start, _) = span.split_once('-')?;
    start.trim().parse().ok()
}

/// `bytes */500` or `bytes 0-9/500` -> 500
fn content_range_total(headers: &HeaderMap) -> Option<u64> {
    let value = headers.get(CONTENT_RANGE)?.to_str().ok()?;
    let (_, total) = value.strip_prefix("bytes ")?.split_once('/')?;
    total.trim().parse().ok()
}
