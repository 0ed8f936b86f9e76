// src/models.rs

use std::fmt;
use std::path::PathBuf;

use crate::downloader::DownloadError;

/// A thread parsed out of a thread URL. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadReference {
    pub board: String,
    pub thread_id: u64,
    pub source_url: String,
    /// True when the thread URL used https.
    pub secure: bool,
}

impl ThreadReference {
    /// Name of the per-thread directory, e.g. `wg_12345`.
    pub fn dir_name(&self) -> String {
        format!("{}_{}", self.board, self.thread_id)
    }
}

impl fmt::Display for ThreadReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/thread/{}", self.board, self.thread_id)
    }
}

/// One attachment found in a thread, in post order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Local filename, `<tim><ext>`. Unique within a thread.
    pub filename: String,
    pub remote_url: String,
    pub expected_size: Option<u64>,
    /// Name the file had on the uploader's machine.
    pub original_name: Option<String>,
    /// Base64 MD5 as reported by the site.
    pub md5: Option<String>,
}

/// A file about to be transferred.
#[derive(Debug, Clone)]
pub struct DownloadTarget {
    pub descriptor: FileDescriptor,
    pub local_path: PathBuf,
    /// Size of the partial file already on disk, 0 if there is nothing to resume.
    pub bytes_already_present: u64,
}

impl DownloadTarget {
    /// Returns the number of bytes still missing, if the final size is known.
    pub fn remaining_bytes(&self) -> Option<u64> {
        self.descriptor
            .expected_size
            .map(|size| size.saturating_sub(self.bytes_already_present))
    }

    /// Whether the request should carry a `Range` header.
    pub fn wants_range(&self) -> bool {
        self.bytes_already_present > 0
            && self
                .descriptor
                .expected_size
                .map_or(true, |size| self.bytes_already_present < size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyComplete,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyComplete => f.write_str("already complete"),
        }
    }
}

/// Result of a single file transfer.
#[derive(Debug)]
pub enum DownloadOutcome {
    /// `bytes` is what came over the wire in this run, not the file size.
    Downloaded { bytes: u64, resumed: bool },
    Skipped(SkipReason),
    Failed(DownloadError),
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub threads_processed: usize,
    pub threads_skipped: usize,
    pub files_downloaded: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &DownloadOutcome) {
        match outcome {
            DownloadOutcome::Downloaded { .. } => self.files_downloaded += 1,
            DownloadOutcome::Skipped(_) => self.files_skipped += 1,
            DownloadOutcome::Failed(_) => self.files_failed += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "threads: {} processed, {} skipped; files: {} downloaded, {} skipped, {} failed",
            self.threads_processed,
            self.threads_skipped,
            self.files_downloaded,
            self.files_skipped,
            self.files_failed
        )
    }
}
