//! Media relay pipeline
//!
//! Every plugin follows the same steps: query an upstream JSON API, pick a
//! media variant, check its size, stage it in the scratch directory, attach
//! it to a reply and delete it again. This module owns the HTTP and disk side
//! of those steps so the plugins only decide what to fetch and what to say.

mod best_effort;
mod error;
mod scratch;
mod select;

use futures::StreamExt;
use reqwest::Client as HttpClient;
use reqwest::header::{CONTENT_LENGTH, HeaderMap};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::host::{Attachment, Messenger, OutboundMessage};

pub use best_effort::best_effort;
pub use error::RelayError;
pub use scratch::{ScratchDir, StagedFile};
pub use select::select_preferred;

/// Default transfer ceiling: 150 MiB
pub const DEFAULT_MAX_BYTES: u64 = 150 * MIB;
/// Timeout for JSON API calls
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(20);
/// Timeout for thumbnail downloads and size probes
pub const THUMBNAIL_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout for full media downloads
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

const MIB: u64 = 1024 * 1024;

/// A media file to deliver into a conversation
pub struct MediaRequest {
    /// Direct URL of the media file
    pub media_url: String,
    /// Optional preview image sent along with the media
    pub thumbnail_url: Option<String>,
    /// Text of the outbound message
    pub caption: String,
    /// Prefix for the staged file name (`youtube`, `tiktok`, `yt`, ...)
    pub file_prefix: String,
    /// Builds the reply used instead of the file when it is too large
    pub oversize_notice: fn(u64, &str) -> String,
}

/// How a media request ended up in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The file was staged and attached
    Attached,
    /// The file was over the ceiling; only its link was sent
    LinkOnly { bytes: u64 },
}

/// Shared HTTP client, scratch directory and transfer ceiling
pub struct MediaRelay {
    http: HttpClient,
    scratch: ScratchDir,
    max_bytes: u64,
}

impl MediaRelay {
    /// Create a relay staging into `scratch`
    ///
    /// # Arguments
    /// * `scratch` - Directory for staged files
    /// * `max_bytes` - Largest file that will be downloaded and attached
    ///
    /// # Returns
    /// A new MediaRelay instance
    pub fn new(scratch: ScratchDir, max_bytes: u64) -> anyhow::Result<Self> {
        // Per-request timeouts are set on every call; this only bounds connecting
        let http = HttpClient::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            scratch,
            max_bytes,
        })
    }

    pub fn scratch(&self) -> &ScratchDir {
        &self.scratch
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Query a JSON endpoint
    ///
    /// Network errors, timeouts, non-success statuses and undecodable
    /// bodies all come back as None; the cause is only logged.
    pub async fn fetch_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Option<T> {
        debug!("GET {} {:?}", url, query);

        let response = match self.http.get(url).query(query).timeout(timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Request to {} failed: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("{} answered with status {}", url, response.status());
            return None;
        }

        match response.json::<T>().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!("Unusable payload from {}: {}", url, e);
                None
            }
        }
    }

    /// Ask the server how large a resource is without downloading it
    ///
    /// # Returns
    /// The advertised size, or None when the probe fails or the header is absent
    pub async fn probe_size(&self, url: &str) -> Option<u64> {
        let response = match self.http.head(url).timeout(THUMBNAIL_TIMEOUT).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Size probe for {} failed: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            debug!("Size probe for {} answered {}", url, response.status());
            return None;
        }

        content_length(response.headers())
    }

    /// Stream a resource into a new file in the scratch directory
    ///
    /// The ceiling is checked against the advertised length before the body
    /// is read and again while streaming. A partially written file is
    /// removed before the error is returned.
    pub async fn stage(
        &self,
        url: &str,
        prefix: &str,
        ext: &str,
        timeout: Duration,
    ) -> Result<StagedFile, RelayError> {
        self.scratch.ensure().await?;

        let response = self.http.get(url).timeout(timeout).send().await?;
        if !response.status().is_success() {
            return Err(RelayError::Status(response.status()));
        }

        if let Some(bytes) = content_length(response.headers()).filter(|b| *b > self.max_bytes) {
            return Err(RelayError::Oversize { bytes });
        }

        let staged = StagedFile::new(self.scratch.unique_path(prefix, ext));
        let mut file = tokio::fs::File::create(staged.path()).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            if written > self.max_bytes {
                return Err(RelayError::Oversize { bytes: written });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        debug!("Staged {} bytes from {} at {}", written, url, staged.path().display());
        Ok(staged)
    }

    /// Stage a preview image, giving up quietly on any failure
    pub async fn stage_thumbnail(&self, url: &str) -> Option<StagedFile> {
        match self.stage(url, "thumb", ".jpg", THUMBNAIL_TIMEOUT).await {
            Ok(staged) => Some(staged),
            Err(e) => {
                warn!("Thumbnail {} skipped: {}", url, e);
                None
            }
        }
    }

    /// Run the size guard, stage the media and post it
    ///
    /// Every staged file is removed before this returns, whichever way it
    /// returns.
    ///
    /// # Arguments
    /// * `messenger` - Host client used for the reply
    /// * `thread_id` - Conversation to post into
    /// * `reply_to` - Message the reply answers, if any
    /// * `request` - What to fetch and what to say
    pub async fn deliver(
        &self,
        messenger: &dyn Messenger,
        thread_id: &str,
        reply_to: Option<&str>,
        request: MediaRequest,
    ) -> Result<Delivery, RelayError> {
        let thumbnail = match &request.thumbnail_url {
            Some(url) => self.stage_thumbnail(url).await,
            None => None,
        };

        if let Some(bytes) = self.probe_size(&request.media_url).await {
            if bytes > self.max_bytes {
                info!("{} is {} bytes, sending the link instead", request.media_url, bytes);
                return self
                    .send_link_only(messenger, thread_id, reply_to, &request, thumbnail, bytes)
                    .await;
            }
        }

        let ext = extension_from_url(&request.media_url, ".mp4");
        let media = match self
            .stage(&request.media_url, &request.file_prefix, &ext, DOWNLOAD_TIMEOUT)
            .await
        {
            Ok(media) => media,
            Err(RelayError::Oversize { bytes }) => {
                return self
                    .send_link_only(messenger, thread_id, reply_to, &request, thumbnail, bytes)
                    .await;
            }
            Err(e) => {
                if let Some(thumbnail) = thumbnail {
                    thumbnail.discard().await;
                }
                return Err(e);
            }
        };

        let mut message = OutboundMessage::text(request.caption.clone());
        if let Some(reply_to) = reply_to {
            message = message.reply_to(reply_to);
        }
        if let Some(thumbnail) = &thumbnail {
            message = message.attach(Attachment::File(thumbnail.path().to_path_buf()));
        }
        message = message.attach(Attachment::File(media.path().to_path_buf()));

        let sent = messenger.send(thread_id, message).await;

        media.discard().await;
        if let Some(thumbnail) = thumbnail {
            thumbnail.discard().await;
        }

        sent.map_err(RelayError::Send)?;
        Ok(Delivery::Attached)
    }

    async fn send_link_only(
        &self,
        messenger: &dyn Messenger,
        thread_id: &str,
        reply_to: Option<&str>,
        request: &MediaRequest,
        thumbnail: Option<StagedFile>,
        bytes: u64,
    ) -> Result<Delivery, RelayError> {
        let mut message = OutboundMessage::text((request.oversize_notice)(bytes, &request.media_url));
        if let Some(reply_to) = reply_to {
            message = message.reply_to(reply_to);
        }
        if let Some(thumbnail) = &thumbnail {
            message = message.attach(Attachment::File(thumbnail.path().to_path_buf()));
        }

        let sent = messenger.send(thread_id, message).await;
        if let Some(thumbnail) = thumbnail {
            thumbnail.discard().await;
        }

        sent.map_err(RelayError::Send)?;
        Ok(Delivery::LinkOnly { bytes })
    }
}

/// Size in whole MiB, rounded to nearest
pub fn megabytes(bytes: u64) -> u64 {
    (bytes as f64 / MIB as f64).round() as u64
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

/// File extension of the URL path (with the dot), or `default`
pub fn extension_from_url(url: &str, default: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            let last = parsed.path_segments()?.next_back()?.to_string();
            let (_, ext) = last.rsplit_once('.')?;
            let valid = !ext.is_empty()
                && ext.len() <= 5
                && ext.chars().all(|c| c.is_ascii_alphanumeric());
            valid.then(|| format!(".{}", ext.to_lowercase()))
        })
        .unwrap_or_else(|| default.to_string())
}
