// src/fetcher.rs

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::models::{FileDescriptor, ThreadReference};

/// Network or HTTP failure reaching the thread endpoint.
#[derive(Debug, Error)]
pub enum ThreadFetchError {
    #[error("thread {0} is dead (404)")]
    Dead(String),
    #[error("thread endpoint returned HTTP {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),
}

/// The thread endpoint answered, but not with a thread we understand.
#[derive(Debug, Error)]
pub enum ThreadParseError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unrecognized thread document")]
    UnknownSchema,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Fetch(#[from] ThreadFetchError),
    #[error(transparent)]
    Parse(#[from] ThreadParseError),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Fetch(ThreadFetchError::Network(e))
    }
}

/// Where thread data and media live.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Endpoints {
    /// The 4chan read-only API. The scheme follows the thread url.
    #[default]
    FourChan,
    Custom { api_base: Url, media_base: Url },
}

impl Endpoints {
    /// Point both endpoints at explicit base urls.
    pub fn custom(api_base: &str, media_base: &str) -> Result<Self, url::ParseError> {
        Ok(Endpoints::Custom {
            api_base: base_url(api_base)?,
            media_base: base_url(media_base)?,
        })
    }

    fn bases(&self, secure: bool) -> Result<(Url, Url), url::ParseError> {
        match self {
            Endpoints::FourChan => {
                let scheme = if secure { "https" } else { "http" };
                Ok((
                    Url::parse(&format!("{scheme}://a.4cdn.org/"))?,
                    Url::parse(&format!("{scheme}://i.4cdn.org/"))?,
                ))
            }
            Endpoints::Custom { api_base, media_base } => {
                Ok((api_base.clone(), media_base.clone()))
            }
        }
    }

    /// `<api>/<board>/thread/<id>.json`
    pub fn thread_url(&self, thread: &ThreadReference) -> Result<Url, url::ParseError> {
        let (api, _) = self.bases(thread.secure)?;
        api.join(&format!("{}/thread/{}.json", thread.board, thread.thread_id))
    }

    /// `<media>/<board>/<file>`
    pub fn media_url(&self, thread: &ThreadReference, filename: &str) -> Result<Url, url::ParseError> {
        let (_, media) = self.bases(thread.secure)?;
        media.join(&format!("{}/{}", thread.board, filename))
    }
}

fn base_url(raw: &str) -> Result<Url, url::ParseError> {
    if raw.ends_with('/') {
        Url::parse(raw)
    } else {
        Url::parse(&format!("{raw}/"))
    }
}

/// Thread document layouts we know how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadSchema {
    /// `{"posts": [...]}` with at most one attachment per post.
    Standard,
    /// Same envelope, but posts may carry an `extra_files` array and
    /// `tim` may be a string.
    MultiAttachment,
}

impl ThreadSchema {
    pub fn detect(doc: &Value) -> Result<Self, ThreadParseError> {
        let posts = doc
            .get("posts")
            .and_then(Value::as_array)
            .ok_or(ThreadParseError::UnknownSchema)?;
        if posts.iter().any(|post| !post.is_object()) {
            return Err(ThreadParseError::UnknownSchema);
        }
        if posts.iter().any(|post| post.get("extra_files").is_some()) {
            Ok(ThreadSchema::MultiAttachment)
        } else {
            Ok(ThreadSchema::Standard)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Tim {
    Number(u64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct Attachment {
    tim: Option<Tim>,
    ext: Option<String>,
    fsize: Option<u64>,
    filename: Option<String>,
    md5: Option<String>,
    #[serde(default)]
    filedeleted: u8,
}

#[derive(Debug, Deserialize)]
struct StandardThread {
    posts: Vec<StandardPost>,
}

#[derive(Debug, Deserialize)]
struct StandardPost {
    no: u64,
    #[serde(flatten)]
    file: Attachment,
}

#[derive(Debug, Deserialize)]
struct MultiAttachmentThread {
    posts: Vec<MultiAttachmentPost>,
}

#[derive(Debug, Deserialize)]
struct MultiAttachmentPost {
    no: u64,
    #[serde(flatten)]
    file: Attachment,
    #[serde(default)]
    extra_files: Vec<Attachment>,
}

/// Fetches a thread document and turns it into the list of files to download.
#[derive(Debug, Clone)]
pub struct ThreadFetcher {
    client: Client,
    endpoints: Endpoints,
}

impl ThreadFetcher {
    pub fn new(client: Client, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    /// One GET against the thread endpoint. Files come back in post order.
    pub async fn fetch_thread(
        &self,
        thread: &ThreadReference,
    ) -> Result<Vec<FileDescriptor>, FetchError> {
        let url = self
            .endpoints
            .thread_url(thread)
            .map_err(ThreadFetchError::from)?;
        debug!("fetching thread {} from {}", thread, url);

        let resp = self.client.get(url).send().await?;
        match resp.status() {
            StatusCode::NOT_FOUND => {
                return Err(ThreadFetchError::Dead(thread.to_string()).into());
            }
            status if !status.is_success() => {
                return Err(ThreadFetchError::Status(status.as_u16()).into());
            }
            _ => {}
        }

        let body = resp.bytes().await?;
        self.parse_thread(thread, &body)
    }

    /// Decode a thread document that has already been downloaded.
    pub fn parse_thread(
        &self,
        thread: &ThreadReference,
        body: &[u8],
    ) -> Result<Vec<FileDescriptor>, FetchError> {
        let doc: Value = serde_json::from_slice(body).map_err(ThreadParseError::from)?;
        let schema = ThreadSchema::detect(&doc)?;
        debug!(?schema, "thread {} document", thread);

        let files = match schema {
            ThreadSchema::Standard => self.parse_standard(thread, doc)?,
            ThreadSchema::MultiAttachment => self.parse_multi_attachment(thread, doc)?,
        };
        Ok(files)
    }

    fn parse_standard(
        &self,
        thread: &ThreadReference,
        doc: Value,
    ) -> Result<Vec<FileDescriptor>, FetchError> {
        let parsed: StandardThread = serde_json::from_value(doc).map_err(ThreadParseError::from)?;
        let mut files = Vec::new();
        for post in parsed.posts {
            if let Some(file) = self.descriptor(thread, post.no, post.file)? {
                files.push(file);
            }
        }
        Ok(files)
    }

    fn parse_multi_attachment(
        &self,
        thread: &ThreadReference,
        doc: Value,
    ) -> Result<Vec<FileDescriptor>, FetchError> {
        let parsed: MultiAttachmentThread =
            serde_json::from_value(doc).map_err(ThreadParseError::from)?;
        let mut files = Vec::new();
        for post in parsed.posts {
            let no = post.no;
            for attachment in std::iter::once(post.file).chain(post.extra_files) {
                if let Some(file) = self.descriptor(thread, no, attachment)? {
                    files.push(file);
                }
            }
        }
        Ok(files)
    }

    fn descriptor(
        &self,
        thread: &ThreadReference,
        post_no: u64,
        attachment: Attachment,
    ) -> Result<Option<FileDescriptor>, FetchError> {
        if attachment.filedeleted == 1 {
            debug!(post = post_no, "file deleted, skipping");
            return Ok(None);
        }
        let (Some(tim), Some(ext)) = (attachment.tim, attachment.ext) else {
            return Ok(None);
        };
        let stem = match tim {
            Tim::Number(n) => n.to_string(),
            Tim::Text(s) => s,
        };
        // tim is server-assigned; anything else would let the name escape the thread dir
        if stem.is_empty()
            || !stem.chars().all(|c| c.is_ascii_alphanumeric())
            || !ext.starts_with('.')
            || ext.contains(['/', '\\'])
        {
            debug!(post = post_no, tim = %stem, ext = %ext, "unusable file name, skipping");
            return Ok(None);
        }

        let filename = format!("{stem}{ext}");
        let remote_url = self
            .endpoints
            .media_url(thread, &filename)
            .map_err(ThreadFetchError::from)?;

        Ok(Some(FileDescriptor {
            filename,
            remote_url: remote_url.to_string(),
            expected_size: attachment.fsize,
            original_name: attachment.filename.map(|name| format!("{name}{ext}")),
            md5: attachment.md5,
        }))
    }
}
