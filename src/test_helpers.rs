#![allow(dead_code)]
/// Test helpers for unit tests
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::{Config, Endpoints};
use crate::host::{Attachment, InboundEvent, Messenger, OutboundMessage, Reaction};
use crate::relay::{MediaRelay, ScratchDir};

/// A message captured by [`RecordingMessenger`]
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub thread_id: String,
    pub message: OutboundMessage,
    /// For each attachment: whether it was readable at send time (remote ones count as present)
    pub files_present: Vec<bool>,
}

/// Messenger that records everything instead of posting it
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<SentMessage>>,
    reactions: Mutex<Vec<(String, Reaction)>>,
    fail_sends: bool,
    fail_reactions: bool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A messenger whose sends are recorded and then rejected
    pub fn failing() -> Self {
        RecordingMessenger {
            fail_sends: true,
            ..Default::default()
        }
    }

    /// A messenger whose reactions are recorded and then rejected
    pub fn failing_reactions() -> Self {
        RecordingMessenger {
            fail_reactions: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.sent().into_iter().map(|s| s.message.body).collect()
    }

    pub fn reactions(&self) -> Vec<Reaction> {
        self.reactions
            .lock()
            .unwrap()
            .iter()
            .map(|(_, reaction)| *reaction)
            .collect()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(&self, thread_id: &str, message: OutboundMessage) -> Result<String> {
        let files_present = message
            .attachments
            .iter()
            .map(|attachment| match attachment {
                Attachment::File(path) => path.is_file(),
                Attachment::Remote(_) => true,
            })
            .collect();

        let mut sent = self.sent.lock().unwrap();
        sent.push(SentMessage {
            thread_id: thread_id.to_string(),
            message,
            files_present,
        });

        if self.fail_sends {
            return Err(anyhow!("host rejected the message"));
        }
        Ok(format!("sent-{}", sent.len()))
    }

    async fn react(&self, message_id: &str, reaction: Reaction) -> Result<()> {
        self.reactions
            .lock()
            .unwrap()
            .push((message_id.to_string(), reaction));

        if self.fail_reactions {
            return Err(anyhow!("reactions are disabled"));
        }
        Ok(())
    }
}

/// Create a relay staging into `<dir>/scratch`
pub fn create_test_relay(dir: &Path, max_bytes: u64) -> MediaRelay {
    MediaRelay::new(ScratchDir::new(dir.join("scratch")), max_bytes).unwrap()
}

/// True when the scratch directory is missing or holds no entries
pub fn scratch_is_empty(scratch: &ScratchDir) -> bool {
    match std::fs::read_dir(scratch.path()) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}

/// Endpoints that all point at one mock server
pub fn create_test_endpoints(base: &str) -> Endpoints {
    Endpoints {
        downloader: base.to_string(),
        capcut: base.to_string(),
        rest: base.to_string(),
        youtube_search: base.to_string(),
    }
}

/// Create a test config for unit tests
pub fn create_test_config(scratch_dir: &str) -> Config {
    Config::new(
        scratch_dir.to_string(),
        create_test_endpoints("http://127.0.0.1:9"),
        150,
        Duration::from_secs(600),
        1024,
    )
}

/// Create an inbound event in thread `t1`
pub fn create_test_event(body: &str) -> InboundEvent {
    InboundEvent::new("t1", "m1", body)
}
