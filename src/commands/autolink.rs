use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::api::Envelope;
use crate::api::downloader::{CapcutData, FacebookData, MediaChoice, TiktokData, YoutubeData};
use crate::commands::ChatListener;
use crate::config::Endpoints;
use crate::host::{InboundEvent, Messenger, OutboundMessage, Reaction};
use crate::relay::{
    Delivery, MediaRelay, MediaRequest, QUERY_TIMEOUT, RelayError, best_effort, megabytes,
};

/// Cached regex for the first link in a message
static URL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)https?://\S+").expect("Failed to compile URL regex"));

static LINK_PATTERNS: Lazy<Vec<(LinkKind, Regex)>> = Lazy::new(|| {
    [
        (LinkKind::YouTube, r"(?i)youtube\.com|youtu\.be"),
        (LinkKind::TikTok, r"(?i)tiktok\.com"),
        (LinkKind::Facebook, r"(?i)facebook\.com|fb\.watch"),
        (LinkKind::CapCut, r"(?i)capcut\.com/template-detail"),
    ]
    .into_iter()
    .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("Failed to compile link regex")))
    .collect()
});

/// The link families the autolink plugin downloads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    YouTube,
    TikTok,
    Facebook,
    CapCut,
}

impl LinkKind {
    /// Classify a URL; None for unsupported sites
    pub fn classify(url: &str) -> Option<Self> {
        LINK_PATTERNS
            .iter()
            .find(|(_, pattern)| pattern.is_match(url))
            .map(|(kind, _)| *kind)
    }

    /// Lower-case name, also used as the staged file prefix
    pub fn name(self) -> &'static str {
        match self {
            LinkKind::YouTube => "youtube",
            LinkKind::TikTok => "tiktok",
            LinkKind::Facebook => "facebook",
            LinkKind::CapCut => "capcut",
        }
    }

    fn label(self) -> String {
        self.name().to_uppercase()
    }

    fn endpoint(self, endpoints: &Endpoints) -> String {
        match self {
            LinkKind::YouTube => format!("{}/api/youtube/download", endpoints.downloader),
            LinkKind::TikTok => format!("{}/api/tiktok/download", endpoints.downloader),
            LinkKind::Facebook => format!("{}/api/meta/download", endpoints.downloader),
            LinkKind::CapCut => format!("{}/api/capcut/download", endpoints.capcut),
        }
    }

    fn decode(self, data: Value) -> Option<MediaChoice> {
        let choice = match self {
            LinkKind::YouTube => serde_json::from_value::<YoutubeData>(data).map(YoutubeData::into_choice),
            LinkKind::TikTok => serde_json::from_value::<TiktokData>(data).map(TiktokData::into_choice),
            LinkKind::Facebook => serde_json::from_value::<FacebookData>(data).map(FacebookData::into_choice),
            LinkKind::CapCut => serde_json::from_value::<CapcutData>(data).map(CapcutData::into_choice),
        };

        choice
            .map_err(|e| warn!("Unexpected {} payload: {}", self.name(), e))
            .ok()
    }
}

/// First http(s) link in `text`
pub fn extract_url(text: &str) -> Option<&str> {
    URL_REGEX.find(text).map(|m| m.as_str())
}

fn oversize_notice(bytes: u64, url: &str) -> String {
    format!("⚠️ ভিডিও সাইজ বড় (≈{} MB)\nDirect link: {}", megabytes(bytes), url)
}

fn caption(kind: LinkKind, choice: &MediaChoice) -> String {
    let title = choice
        .title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| kind.label());
    let duration = choice
        .duration
        .as_deref()
        .map(|d| format!("\n⏱️ Duration: {}", d))
        .unwrap_or_default();

    format!("🎬 {} Video{}\n📥 Sending video...", title, duration)
}

/// Downloads videos from supported links posted in any conversation
pub struct AutolinkListener {
    messenger: Arc<dyn Messenger>,
    relay: Arc<MediaRelay>,
    endpoints: Endpoints,
}

impl AutolinkListener {
    /// Create a new autolink listener
    ///
    /// # Arguments
    /// * `messenger` - The host client for replies and reactions
    /// * `relay` - The media relay used for staging
    /// * `endpoints` - Upstream API base URLs
    pub fn new(messenger: Arc<dyn Messenger>, relay: Arc<MediaRelay>, endpoints: Endpoints) -> Self {
        AutolinkListener {
            messenger,
            relay,
            endpoints,
        }
    }

    async fn react(&self, event: &InboundEvent, reaction: Reaction) {
        best_effort("autolink reaction", self.messenger.react(&event.message_id, reaction)).await;
    }

    async fn notify(&self, event: &InboundEvent, text: String) {
        let message = OutboundMessage::text(text).reply_to(event.message_id.clone());
        best_effort("autolink reply", self.messenger.send(&event.thread_id, message)).await;
    }

    async fn relay_link(&self, event: &InboundEvent, kind: LinkKind, url: &str) -> Result<Delivery, RelayError> {
        let envelope: Option<Envelope<Value>> = self
            .relay
            .fetch_json(&kind.endpoint(&self.endpoints), &[("url", url)], QUERY_TIMEOUT)
            .await;

        let data = envelope
            .and_then(Envelope::into_data)
            .ok_or_else(|| RelayError::UpstreamUnavailable(format!("{} downloader returned no data", kind.name())))?;
        let choice = kind
            .decode(data)
            .ok_or_else(|| RelayError::UpstreamUnavailable(format!("{} downloader payload is malformed", kind.name())))?;

        let caption = caption(kind, &choice);
        let media_url = choice
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or(RelayError::NoResourceFound)?;

        let request = MediaRequest {
            media_url,
            thumbnail_url: choice.thumbnail.filter(|t| !t.trim().is_empty()),
            caption,
            file_prefix: kind.name().to_string(),
            oversize_notice,
        };

        self.relay
            .deliver(self.messenger.as_ref(), &event.thread_id, Some(&event.message_id), request)
            .await
    }
}

#[async_trait]
impl ChatListener for AutolinkListener {
    async fn on_chat(&self, event: &InboundEvent) -> Result<()> {
        // A quoted message is only read when the reply itself is empty
        let text = if event.body.trim().is_empty() {
            event.reply_body.as_deref().unwrap_or_default()
        } else {
            event.body.as_str()
        };
        let Some(url) = extract_url(text) else {
            return Ok(());
        };
        let Some(kind) = LinkKind::classify(url) else {
            debug!("Ignoring unsupported link {}", url);
            return Ok(());
        };

        info!("Autolink {} in {}: {}", kind.name(), event.thread_id, url);
        self.react(event, Reaction::Pending).await;

        match self.relay_link(event, kind, url).await {
            Ok(Delivery::Attached) => {
                self.react(event, Reaction::Success).await;
            }
            Ok(Delivery::LinkOnly { bytes }) => {
                info!("Sent direct link for {} ({} bytes)", url, bytes);
                self.react(event, Reaction::Success).await;
            }
            Err(RelayError::UpstreamUnavailable(reason)) => {
                warn!("Autolink upstream unavailable: {}", reason);
                self.react(event, Reaction::Warning).await;
                self.notify(event, format!("⚠️ {} ভিডিও পাওয়া যায়নি।", kind.label())).await;
            }
            Err(RelayError::NoResourceFound) => {
                self.notify(event, "❌ ডাউনলোড URL পাওয়া যায়নি।".to_string()).await;
            }
            Err(e) => {
                error!("alldl autolink error: {}", e);
                self.react(event, Reaction::Failure).await;
                self.notify(event, "❌ ডাউনলোডার API তে সমস্যা হয়েছে। পরে চেষ্টা করো।".to_string())
                    .await;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::DEFAULT_MAX_BYTES;
    use crate::test_helpers::{
        RecordingMessenger, create_test_endpoints, create_test_relay, scratch_is_empty,
    };
    use crate::host::Attachment;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;
    use tempfile::{TempDir, tempdir};

    const TIKTOK_LINK: &str = "https://vt.tiktok.com/ZS123/";

    fn setup(server: &ServerGuard, messenger: Arc<RecordingMessenger>) -> (TempDir, Arc<MediaRelay>, AutolinkListener) {
        let dir = tempdir().unwrap();
        let relay = Arc::new(create_test_relay(dir.path(), DEFAULT_MAX_BYTES));
        let listener = AutolinkListener::new(messenger, relay.clone(), create_test_endpoints(&server.url()));
        (dir, relay, listener)
    }

    async fn mock_tiktok(server: &mut ServerGuard, link: &str) -> mockito::Mock {
        let body = json!({
            "success": true,
            "data": {
                "title": "Dance",
                "thumbnail": format!("{}/cdn/thumb.jpg", server.url()),
                "downloads": [
                    {"text": "Download MP4", "url": format!("{}/cdn/sd.mp4", server.url())},
                    {"text": "Download MP4 HD", "url": format!("{}/cdn/hd.mp4", server.url())}
                ]
            }
        });
        server
            .mock("GET", "/api/tiktok/download")
            .match_query(Matcher::UrlEncoded("url".into(), link.into()))
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    #[test]
    fn test_classify_supported_families() {
        assert_eq!(LinkKind::classify("https://www.youtube.com/watch?v=abc"), Some(LinkKind::YouTube));
        assert_eq!(LinkKind::classify("https://youtu.be/abc"), Some(LinkKind::YouTube));
        assert_eq!(LinkKind::classify("https://www.TikTok.com/@a/video/1"), Some(LinkKind::TikTok));
        assert_eq!(LinkKind::classify("https://www.facebook.com/watch?v=1"), Some(LinkKind::Facebook));
        assert_eq!(LinkKind::classify("https://fb.watch/xyz/"), Some(LinkKind::Facebook));
        assert_eq!(
            LinkKind::classify("https://www.capcut.com/template-detail/123"),
            Some(LinkKind::CapCut)
        );
    }

    #[test]
    fn test_classify_ignores_unsupported() {
        assert_eq!(LinkKind::classify("https://vimeo.com/123"), None);
        assert_eq!(LinkKind::classify("https://www.capcut.com/editor"), None);
        assert_eq!(LinkKind::classify("https://example.com/page"), None);
    }

    #[test]
    fn test_extract_url() {
        assert_eq!(
            extract_url("look at this https://youtu.be/abc please"),
            Some("https://youtu.be/abc")
        );
        assert_eq!(extract_url("HTTP://FB.WATCH/x"), Some("HTTP://FB.WATCH/x"));
        assert_eq!(extract_url("no links here"), None);
    }

    #[test]
    fn test_caption() {
        let choice = MediaChoice {
            title: Some("Clip".to_string()),
            duration: Some("15.3s".to_string()),
            ..Default::default()
        };
        assert_eq!(
            caption(LinkKind::CapCut, &choice),
            "🎬 Clip Video\n⏱️ Duration: 15.3s\n📥 Sending video..."
        );
        assert_eq!(
            caption(LinkKind::TikTok, &MediaChoice::default()),
            "🎬 TIKTOK Video\n📥 Sending video..."
        );
    }

    #[tokio::test]
    async fn test_tiktok_link_is_relayed() {
        let mut server = Server::new_async().await;
        let api = mock_tiktok(&mut server, TIKTOK_LINK).await;
        let _thumb = server.mock("GET", "/cdn/thumb.jpg").with_body(vec![1u8; 32]).create_async().await;
        let hd = server.mock("GET", "/cdn/hd.mp4").with_body(vec![2u8; 1024]).create_async().await;

        let messenger = Arc::new(RecordingMessenger::new());
        let (_dir, relay, listener) = setup(&server, messenger.clone());

        let event = InboundEvent::new("t1", "m1", format!("wow {}", TIKTOK_LINK));
        listener.on_chat(&event).await.unwrap();

        api.assert_async().await;
        hd.assert_async().await;
        assert_eq!(messenger.reactions(), vec![Reaction::Pending, Reaction::Success]);

        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].thread_id, "t1");
        assert!(sent[0].message.body.starts_with("🎬 Dance Video"));
        assert_eq!(sent[0].files_present, vec![true, true]);
        assert!(scratch_is_empty(relay.scratch()));
    }

    #[tokio::test]
    async fn test_unsupported_link_is_ignored() {
        let server = Server::new_async().await;
        let messenger = Arc::new(RecordingMessenger::new());
        let (_dir, _relay, listener) = setup(&server, messenger.clone());

        listener
            .on_chat(&InboundEvent::new("t1", "m1", "https://vimeo.com/123"))
            .await
            .unwrap();
        listener.on_chat(&InboundEvent::new("t1", "m2", "hello")).await.unwrap();

        assert!(messenger.sent().is_empty());
        assert!(messenger.reactions().is_empty());
    }

    #[tokio::test]
    async fn test_link_in_quoted_message() {
        let mut server = Server::new_async().await;
        let api = server
            .mock("GET", "/api/meta/download")
            .match_query(Matcher::UrlEncoded("url".into(), "https://fb.watch/abc/".into()))
            .with_body(r#"{"success": true, "data": {"data": []}}"#)
            .create_async()
            .await;

        let messenger = Arc::new(RecordingMessenger::new());
        let (_dir, _relay, listener) = setup(&server, messenger.clone());

        let event = InboundEvent::new("t1", "m1", "  ").with_reply_body("https://fb.watch/abc/");
        listener.on_chat(&event).await.unwrap();

        api.assert_async().await;
        assert_eq!(messenger.bodies(), vec!["❌ ডাউনলোড URL পাওয়া যায়নি।".to_string()]);
    }

    #[tokio::test]
    async fn test_chatter_replying_to_a_link_is_ignored() {
        let mut server = Server::new_async().await;
        let api = server
            .mock("GET", "/api/tiktok/download")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let messenger = Arc::new(RecordingMessenger::new());
        let (_dir, _relay, listener) = setup(&server, messenger.clone());

        let event = InboundEvent::new("t1", "m1", "lol nice").with_reply_body(TIKTOK_LINK);
        listener.on_chat(&event).await.unwrap();

        api.assert_async().await;
        assert!(messenger.sent().is_empty());
        assert!(messenger.reactions().is_empty());
    }

    #[test]
    fn test_capcut_payload_with_text_duration_decodes() {
        let choice = LinkKind::CapCut
            .decode(json!({
                "title": "T",
                "duration": "15300",
                "medias": [{"quality": "HD No Watermark", "url": "u"}]
            }))
            .unwrap();

        assert_eq!(choice.url.as_deref(), Some("u"));
        assert_eq!(choice.duration.as_deref(), Some("15.3s"));
    }

    #[tokio::test]
    async fn test_upstream_failure_warns() {
        let mut server = Server::new_async().await;
        let _api = server
            .mock("GET", "/api/tiktok/download")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let messenger = Arc::new(RecordingMessenger::new());
        let (_dir, relay, listener) = setup(&server, messenger.clone());

        listener
            .on_chat(&InboundEvent::new("t1", "m1", TIKTOK_LINK))
            .await
            .unwrap();

        assert_eq!(messenger.reactions(), vec![Reaction::Pending, Reaction::Warning]);
        assert_eq!(messenger.bodies(), vec!["⚠️ TIKTOK ভিডিও পাওয়া যায়নি।".to_string()]);
        assert!(scratch_is_empty(relay.scratch()));
    }

    #[tokio::test]
    async fn test_unsuccessful_envelope_warns() {
        let mut server = Server::new_async().await;
        let _api = server
            .mock("GET", "/api/capcut/download")
            .match_query(Matcher::Any)
            .with_body(r#"{"success": false, "message": "rate limited"}"#)
            .create_async()
            .await;

        let messenger = Arc::new(RecordingMessenger::new());
        let (_dir, _relay, listener) = setup(&server, messenger.clone());

        listener
            .on_chat(&InboundEvent::new("t1", "m1", "https://www.capcut.com/template-detail/77"))
            .await
            .unwrap();

        assert_eq!(messenger.bodies(), vec!["⚠️ CAPCUT ভিডিও পাওয়া যায়নি।".to_string()]);
    }

    #[tokio::test]
    async fn test_staging_failure_cleans_up_and_reports() {
        let mut server = Server::new_async().await;
        let _api = mock_tiktok(&mut server, TIKTOK_LINK).await;
        let _thumb = server.mock("GET", "/cdn/thumb.jpg").with_body(vec![1u8; 32]).create_async().await;
        let _hd = server.mock("GET", "/cdn/hd.mp4").with_status(502).create_async().await;

        let messenger = Arc::new(RecordingMessenger::new());
        let (_dir, relay, listener) = setup(&server, messenger.clone());

        listener
            .on_chat(&InboundEvent::new("t1", "m1", TIKTOK_LINK))
            .await
            .unwrap();

        assert_eq!(messenger.reactions(), vec![Reaction::Pending, Reaction::Failure]);
        assert_eq!(
            messenger.bodies(),
            vec!["❌ ডাউনলোডার API তে সমস্যা হয়েছে। পরে চেষ্টা করো।".to_string()]
        );
        assert!(scratch_is_empty(relay.scratch()));
    }

    #[tokio::test]
    async fn test_reaction_failures_do_not_stop_delivery() {
        let mut server = Server::new_async().await;
        let _api = mock_tiktok(&mut server, TIKTOK_LINK).await;
        let _thumb = server.mock("GET", "/cdn/thumb.jpg").with_status(404).create_async().await;
        let _hd = server.mock("GET", "/cdn/hd.mp4").with_body(vec![2u8; 64]).create_async().await;

        let messenger = Arc::new(RecordingMessenger::failing_reactions());
        let (_dir, relay, listener) = setup(&server, messenger.clone());

        listener
            .on_chat(&InboundEvent::new("t1", "m1", TIKTOK_LINK))
            .await
            .unwrap();

        // Both reactions were attempted even though the host rejected them
        assert_eq!(messenger.reactions(), vec![Reaction::Pending, Reaction::Success]);
        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        // Thumbnail failed, so only the video is attached
        assert_eq!(sent[0].message.attachments.len(), 1);
        assert!(scratch_is_empty(relay.scratch()));
    }

    #[tokio::test]
    async fn test_parallel_conversations_use_separate_files() {
        let mut server = Server::new_async().await;
        let _api = mock_tiktok(&mut server, TIKTOK_LINK).await;
        let _thumb = server.mock("GET", "/cdn/thumb.jpg").with_body(vec![1u8; 32]).create_async().await;
        let _hd = server.mock("GET", "/cdn/hd.mp4").with_body(vec![2u8; 4096]).create_async().await;

        let messenger = Arc::new(RecordingMessenger::new());
        let (_dir, relay, listener) = setup(&server, messenger.clone());

        let first = InboundEvent::new("t1", "m1", TIKTOK_LINK);
        let second = InboundEvent::new("t2", "m2", TIKTOK_LINK);
        let (a, b) = tokio::join!(listener.on_chat(&first), listener.on_chat(&second));
        a.unwrap();
        b.unwrap();

        let sent = messenger.sent();
        assert_eq!(sent.len(), 2);
        let mut paths: Vec<_> = sent
            .iter()
            .flat_map(|s| s.message.attachments.clone())
            .filter_map(|a| match a {
                Attachment::File(path) => Some(path),
                Attachment::Remote(_) => None,
            })
            .collect();
        assert_eq!(paths.len(), 4);
        paths.sort();
        paths.dedup();
        assert_eq!(paths.len(), 4);
        assert!(sent.iter().all(|s| s.files_present.iter().all(|p| *p)));
        assert!(scratch_is_empty(relay.scratch()));
    }
}
