// src/manager.rs

use crate::config::RunConfiguration;
use crate::directory::{self, FilesystemError};
use crate::downloader::Downloader;
use crate::fetcher::{FetchError, ThreadFetcher};
use crate::models::{DownloadOutcome, RunSummary};
use crate::thread_url::{self, ThreadUrlError};
use reqwest::Client;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("chanarch/", env!("CARGO_PKG_VERSION"));

/// Failures that stop the run before any thread is touched.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("no thread URLs or URL files given")]
    NoInput,
    #[error("output directory: {0}")]
    BaseDirectory(#[source] FilesystemError),
    #[error("cannot read thread list {}: {source}", path.display())]
    InputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Why a single thread was skipped.
#[derive(Debug, Error)]
pub enum ThreadError {
    #[error(transparent)]
    Url(#[from] ThreadUrlError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

/// Turn the contents of a thread list into urls. Blank lines and `#` comments are dropped.
pub fn parse_url_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Direct urls first, then each list file in the order given.
pub async fn collect_thread_urls(config: &RunConfiguration) -> Result<Vec<String>, RunError> {
    let mut urls: Vec<String> = config
        .input_urls
        .iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect();

    for path in &config.input_files {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| RunError::InputFile {
                path: path.clone(),
                source,
            })?;
        let listed = parse_url_list(&contents);
        debug!("{} thread(s) listed in {}", listed.len(), path.display());
        urls.extend(listed);
    }
    Ok(urls)
}

/// Drives every thread of a run, one after another.
pub struct BatchRunner {
    config: RunConfiguration,
    fetcher: ThreadFetcher,
    downloader: Downloader,
}

impl BatchRunner {
    pub fn new(config: RunConfiguration) -> Result<Self, RunError> {
        // one pooled client for the whole run; requests to the same host reuse connections
        let http_client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            fetcher: ThreadFetcher::new(http_client.clone(), config.endpoints.clone()),
            downloader: Downloader::new(http_client),
            config,
        })
    }

    pub async fn run(&self) -> Result<RunSummary, RunError> {
        if !self.config.has_input() {
            return Err(RunError::NoInput);
        }
        directory::ensure_dir(&self.config.output_base_dir)
            .await
            .map_err(RunError::BaseDirectory)?;
        let urls = collect_thread_urls(&self.config).await?;

        let mut summary = RunSummary::default();
        for url in &urls {
            match self.process_thread(url, &mut summary).await {
                Ok(()) => summary.threads_processed += 1,
                Err(e) => {
                    info!("Skipping thread {}: {}", url, e);
                    summary.threads_skipped += 1;
                }
            }
        }

        info!("Completed all downloads");
        Ok(summary)
    }

    async fn process_thread(&self, url: &str, summary: &mut RunSummary) -> Result<(), ThreadError> {
        let thread = thread_url::parse(url)?;
        let files = self.fetcher.fetch_thread(&thread).await?;
        let dir = directory::ensure_thread_dir(&self.config.output_base_dir, &thread).await?;

        info!(
            "Downloading {} ({} files) to {}",
            thread,
            files.len(),
            dir.display()
        );

        for descriptor in files {
            let filename = descriptor.filename.clone();
            let outcome = match self.downloader.prepare(descriptor, &dir).await {
                Ok(target) => self.downloader.download_file(&target).await,
                Err(e) => DownloadOutcome::Failed(e),
            };
            match &outcome {
                DownloadOutcome::Downloaded { bytes, resumed: true } => {
                    info!("{}: resumed, {} bytes fetched", filename, bytes)
                }
                DownloadOutcome::Downloaded { bytes, .. } => {
                    info!("{}: downloaded {} bytes", filename, bytes)
                }
                DownloadOutcome::Skipped(reason) => info!("{}: skipped, {}", filename, reason),
                DownloadOutcome::Failed(e) => info!("{}: failed, {}", filename, e),
            }
            summary.record(&outcome);
        }

        info!("Finished {}", thread);
        Ok(())
    }
}

/// Run a whole batch with a fresh client.
pub async fn run(config: RunConfiguration) -> Result<RunSummary, RunError> {
    BatchRunner::new(config)?.run().await
}
