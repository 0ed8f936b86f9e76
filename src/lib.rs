pub mod cli;
pub mod config;
pub mod directory;
pub mod downloader;
pub mod fetcher;
pub mod manager;
pub mod models;
pub mod thread_url;

pub use manager::run;

/// Convenient type alias exposing common structs.
pub mod prelude {
    pub use crate::config::{RunConfiguration, Verbosity};
    pub use crate::downloader::{DownloadError, Downloader};
    pub use crate::fetcher::{Endpoints, FetchError, ThreadFetcher};
    pub use crate::manager::{run, BatchRunner, RunError};
    pub use crate::models::{
        DownloadOutcome, DownloadTarget, FileDescriptor, RunSummary, SkipReason, ThreadReference,
    };
}
