use anyhow::Result;
use async_trait::async_trait;
use chrono::Local;
use colored::Colorize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::host::{Attachment, InboundEvent, Messenger, OutboundMessage, Reaction};

/// A local host that prints everything the bot posts to the terminal
pub struct ConsoleMessenger {
    next_id: AtomicU64,
}

impl Default for ConsoleMessenger {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleMessenger {
    pub fn new() -> Self {
        ConsoleMessenger {
            next_id: AtomicU64::new(1),
        }
    }

    fn timestamp() -> String {
        Local::now().format("%H:%M:%S").to_string()
    }

    async fn describe(attachment: &Attachment) -> String {
        match attachment {
            Attachment::File(path) => {
                // Staged files are removed right after the send, so read the size now
                let size = tokio::fs::metadata(path)
                    .await
                    .map(|meta| format!("{} bytes", meta.len()))
                    .unwrap_or_else(|_| "missing".to_string());
                format!("file {} ({})", path.display(), size)
            }
            Attachment::Remote(url) => format!("stream {}", url),
        }
    }
}

#[async_trait]
impl Messenger for ConsoleMessenger {
    async fn send(&self, thread_id: &str, message: OutboundMessage) -> Result<String> {
        let id = format!("bot-{}", self.next_id.fetch_add(1, Ordering::Relaxed));

        let header = match &message.reply_to {
            Some(reply_to) => format!("[{}] bot -> {} (re {})", Self::timestamp(), thread_id, reply_to),
            None => format!("[{}] bot -> {}", Self::timestamp(), thread_id),
        };
        println!("{}", header.dimmed());
        println!("{}", message.body.green());

        for attachment in &message.attachments {
            println!("  {} {}", "+".cyan(), Self::describe(attachment).await);
        }

        debug!("Posted {} to {}", id, thread_id);
        Ok(id)
    }

    async fn react(&self, message_id: &str, reaction: Reaction) -> Result<()> {
        println!(
            "{}",
            format!("[{}] {} on {}", Self::timestamp(), reaction.emoji(), message_id).yellow()
        );
        Ok(())
    }
}

/// Turns stdin lines into inbound events for one conversation
///
/// A line starting with `^ ` replies to the previous line, so the previous
/// text becomes the quoted body.
pub struct ConsoleInput {
    thread_id: String,
    count: u64,
    previous: Option<String>,
}

impl ConsoleInput {
    pub fn new(thread_id: impl Into<String>) -> Self {
        ConsoleInput {
            thread_id: thread_id.into(),
            count: 0,
            previous: None,
        }
    }

    /// Convert a line into an event, skipping blank lines
    pub fn next_event(&mut self, line: &str) -> Option<InboundEvent> {
        let line = line.trim_end();
        if line.trim().is_empty() {
            return None;
        }

        self.count += 1;
        let message_id = format!("in-{}", self.count);

        let event = match line.strip_prefix("^ ") {
            Some(body) => {
                let event = InboundEvent::new(&self.thread_id, message_id, body);
                match self.previous.take() {
                    Some(quoted) => event.with_reply_body(quoted),
                    None => event,
                }
            }
            None => InboundEvent::new(&self.thread_id, message_id, line),
        };

        self.previous = Some(event.body.clone());
        Some(event)
    }
}
