// src/thread_url.rs

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use crate::models::ThreadReference;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThreadUrlError {
    #[error("not a thread url: {0:?}")]
    Malformed(String),
    #[error("invalid thread number in {0:?}")]
    ThreadId(String),
}

fn thread_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^http(s?)://boards\.[^/\s]+/([a-z0-9]+)/thread/([0-9]+)(?:[/?#]\S*)?$")
            .expect("thread url regex is valid")
    })
}

/// Parse `http(s)://boards.<site>/<board>/thread/<id>[/...]`.
///
/// Pure string work, no network access.
pub fn parse(raw_url: &str) -> Result<ThreadReference, ThreadUrlError> {
    let raw = raw_url.trim();
    let caps = thread_regex()
        .captures(raw)
        .ok_or_else(|| ThreadUrlError::Malformed(raw.to_string()))?;

    let thread_id: u64 = caps[3]
        .parse()
        .map_err(|_| ThreadUrlError::ThreadId(raw.to_string()))?;
    if thread_id == 0 {
        return Err(ThreadUrlError::ThreadId(raw.to_string()));
    }

    Ok(ThreadReference {
        board: caps[2].to_string(),
        thread_id,
        source_url: raw.to_string(),
        secure: &caps[1] == "s",
    })
}
