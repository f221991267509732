use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::api::group_thousands;
use crate::api::youtube::{DownloadResponse, SearchResult};
use crate::commands::{ChatListener, Command};
use crate::config::Endpoints;
use crate::host::{Attachment, InboundEvent, Messenger, OutboundMessage};
use crate::relay::{
    Delivery, MediaRelay, MediaRequest, QUERY_TIMEOUT, RelayError, best_effort, megabytes,
};
use crate::sessions::SessionStore;

/// How many search hits are offered for selection
pub const MAX_RESULTS: usize = 5;

const DIVIDER: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// A search hit remembered until the user picks one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
}

impl From<&SearchResult> for Candidate {
    fn from(result: &SearchResult) -> Self {
        Candidate {
            title: result.title().to_string(),
            url: result.url().to_string(),
            thumbnail: result.thumbnail.clone(),
        }
    }
}

/// Pending selections, keyed by conversation
pub type PendingSelections = SessionStore<Vec<Candidate>>;

/// Interactive YouTube search: `.yt <terms>` lists hits, a digit reply downloads one
pub struct YoutubeCommand {
    messenger: Arc<dyn Messenger>,
    relay: Arc<MediaRelay>,
    endpoints: Endpoints,
    sessions: Arc<PendingSelections>,
}

impl YoutubeCommand {
    /// Create a new YouTube command
    ///
    /// # Arguments
    /// * `messenger` - The host client for replies
    /// * `relay` - The media relay used for thumbnails and downloads
    /// * `endpoints` - Upstream API base URLs
    /// * `sessions` - Store for the per-conversation result lists
    pub fn new(
        messenger: Arc<dyn Messenger>,
        relay: Arc<MediaRelay>,
        endpoints: Endpoints,
        sessions: Arc<PendingSelections>,
    ) -> Self {
        YoutubeCommand {
            messenger,
            relay,
            endpoints,
            sessions,
        }
    }

    async fn reply(&self, event: &InboundEvent, text: &str) -> Result<String> {
        let message = OutboundMessage::text(text).reply_to(event.message_id.clone());
        self.messenger.send(&event.thread_id, message).await
    }

    async fn search(&self, event: &InboundEvent, query: &str) -> Result<()> {
        let url = format!("{}/search", self.endpoints.youtube_search);
        let results: Option<Vec<SearchResult>> = self
            .relay
            .fetch_json(&url, &[("query", query)], QUERY_TIMEOUT)
            .await;

        let Some(results) = results else {
            anyhow::bail!("search API unavailable");
        };

        if results.is_empty() {
            self.reply(event, "😔 No videos found! Try another keyword.").await?;
            return Ok(());
        }

        let videos: Vec<SearchResult> = results.into_iter().take(MAX_RESULTS).collect();
        self.sessions
            .set(&event.thread_id, videos.iter().map(Candidate::from).collect())
            .await;
        info!("Stored {} candidates for {}", videos.len(), event.thread_id);

        let mut thumbnails = Vec::new();
        for video in &videos {
            if let Some(thumbnail) = video.thumbnail.as_deref() {
                if let Some(staged) = self.relay.stage_thumbnail(thumbnail).await {
                    thumbnails.push(staged);
                }
            }
        }

        let mut message = OutboundMessage::text(result_listing(query, &videos))
            .reply_to(event.message_id.clone());
        for staged in &thumbnails {
            message = message.attach(Attachment::File(staged.path().to_path_buf()));
        }

        let sent = self.messenger.send(&event.thread_id, message).await;
        for staged in thumbnails {
            staged.discard().await;
        }
        sent?;

        Ok(())
    }

    async fn download(&self, event: &InboundEvent, candidate: &Candidate) -> Result<Delivery, RelayError> {
        best_effort(
            "download notice",
            self.messenger.send(
                &event.thread_id,
                OutboundMessage::text(format!("⏳ Downloading **{}**... Please wait!", candidate.title)),
            ),
        )
        .await;

        let url = format!("{}/downloader/alldownloader", self.endpoints.rest);
        let response: Option<DownloadResponse> = self
            .relay
            .fetch_json(&url, &[("url", candidate.url.as_str())], QUERY_TIMEOUT)
            .await;

        let links = response
            .and_then(DownloadResponse::links)
            .ok_or_else(|| RelayError::UpstreamUnavailable("invalid downloader response structure".to_string()))?;
        let video_url = links.best().ok_or(RelayError::NoResourceFound)?;

        let request = MediaRequest {
            media_url: video_url,
            thumbnail_url: None,
            caption: format!(
                "✅ **Download Successful!**\n\n🎬 **Title:** {}\n📥 Your video is ready!",
                candidate.title
            ),
            file_prefix: "yt".to_string(),
            oversize_notice,
        };

        self.relay
            .deliver(self.messenger.as_ref(), &event.thread_id, None, request)
            .await
    }
}

/// The menu index in `text`, if it is exactly one ASCII digit
pub fn parse_selection(text: &str) -> Option<usize> {
    let mut chars = text.trim().chars();
    let digit = chars.next()?.to_digit(10)?;
    if chars.next().is_some() {
        return None;
    }
    Some(digit as usize)
}

fn oversize_notice(bytes: u64, url: &str) -> String {
    format!(
        "⚠️ This video is too large to send (≈{} MB).\nDirect link: {}",
        megabytes(bytes),
        url
    )
}

fn result_listing(query: &str, videos: &[SearchResult]) -> String {
    let mut msg = format!(
        "🎬 **YouTube Search Results** 🎬\n🔎 **Query:** {}\n\n{}\n",
        query, DIVIDER
    );

    for (i, video) in videos.iter().enumerate() {
        let views = video
            .views
            .map(group_thousands)
            .unwrap_or_else(|| "N/A".to_string());
        msg.push_str(&format!("✨ **{}. {}**\n", i + 1, video.title()));
        msg.push_str(&format!("👤 Channel: {}\n", video.channel()));
        msg.push_str(&format!("⏱ Duration: {}\n", video.timestamp()));
        msg.push_str(&format!("👁 Views: {}\n", views));
        msg.push_str(DIVIDER);
        msg.push('\n');
    }

    msg.push_str(&format!(
        "\n📥 Reply with **1-{}** to download your chosen video!\n⚡ Powered by Aminul API",
        videos.len()
    ));
    msg
}

#[async_trait]
impl Command for YoutubeCommand {
    async fn execute(&self, event: &InboundEvent, args: Vec<&str>) -> Result<Option<OutboundMessage>> {
        let query = args.join(" ");
        let query = query.trim();
        if query.is_empty() {
            return Ok(Some(OutboundMessage::text("❌ Please provide a search term!")));
        }

        if let Err(e) = self.search(event, query).await {
            error!("Search error: {}", e);
            best_effort(
                "search error reply",
                self.reply(event, "⚠️ Failed to fetch YouTube videos. Try again later."),
            )
            .await;
        }

        Ok(None)
    }

    fn help(&self) -> &str {
        "{pn} [search term] - Search YouTube\nReply 1-5 to download the video"
    }
}

#[async_trait]
impl ChatListener for YoutubeCommand {
    async fn on_chat(&self, event: &InboundEvent) -> Result<()> {
        let Some(index) = parse_selection(&event.body) else {
            return Ok(());
        };
        let Some(pending) = self.sessions.get(&event.thread_id).await else {
            return Ok(());
        };

        if index == 0 || index > pending.len() {
            best_effort("invalid selection reply", self.reply(event, "❌ Invalid selection!")).await;
            return Ok(());
        }

        // Consume the list before downloading so a repeated digit does nothing
        let Some(candidates) = self.sessions.delete(&event.thread_id).await else {
            debug!("Selection in {} was consumed concurrently", event.thread_id);
            return Ok(());
        };
        let Some(candidate) = candidates.get(index - 1) else {
            return Ok(());
        };

        info!("Downloading '{}' for {}", candidate.title, event.thread_id);
        match self.download(event, candidate).await {
            Ok(_) => {}
            Err(RelayError::NoResourceFound) => {
                best_effort(
                    "restricted video reply",
                    self.reply(event, "❌ Cannot download this video. It may be restricted."),
                )
                .await;
            }
            Err(e) => {
                error!("Download error: {}", e);
                best_effort(
                    "download error reply",
                    self.reply(event, "❌ Error occurred while downloading the video. Try again later."),
                )
                .await;
            }
        }

        Ok(())
    }
}
