//! The boundary between the plugins and the host bot runtime
//!
//! Plugins never talk to a chat platform directly. They receive an
//! [`InboundEvent`] and answer through a [`Messenger`], which the host
//! provides (the console host in this crate, a mock in tests).

mod console;

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;

pub use console::{ConsoleInput, ConsoleMessenger};

/// A chat message delivered to the bot by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// The conversation the message was posted in
    pub thread_id: String,
    /// The host's identifier for this message
    pub message_id: String,
    /// The message text
    pub body: String,
    /// Text of the message this one replies to, if any
    pub reply_body: Option<String>,
}

impl InboundEvent {
    /// Create an event without a quoted message
    pub fn new(
        thread_id: impl Into<String>,
        message_id: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        InboundEvent {
            thread_id: thread_id.into(),
            message_id: message_id.into(),
            body: body.into(),
            reply_body: None,
        }
    }

    /// Attach the text of the quoted message
    pub fn with_reply_body(mut self, reply_body: impl Into<String>) -> Self {
        self.reply_body = Some(reply_body.into());
        self
    }
}

/// Something the host should attach to an outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// A file staged in the scratch directory; only valid until the send completes
    File(PathBuf),
    /// A remote resource the host streams itself
    Remote(String),
}

/// A message the bot wants the host to post
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundMessage {
    pub body: String,
    pub attachments: Vec<Attachment>,
    /// Message id this message answers, if any
    pub reply_to: Option<String>,
}

impl OutboundMessage {
    /// A plain text message
    pub fn text(body: impl Into<String>) -> Self {
        OutboundMessage {
            body: body.into(),
            ..Default::default()
        }
    }

    /// Add an attachment
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Mark the message as a reply to `message_id`
    pub fn reply_to(mut self, message_id: impl Into<String>) -> Self {
        self.reply_to = Some(message_id.into());
        self
    }
}

/// Status markers the bot puts on a triggering message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Pending,
    Warning,
    Success,
    Failure,
}

impl Reaction {
    /// The emoji the host shows for this reaction
    pub fn emoji(self) -> &'static str {
        match self {
            Reaction::Pending => "⏳",
            Reaction::Warning => "⚠️",
            Reaction::Success => "✅",
            Reaction::Failure => "❌",
        }
    }
}

/// Outbound side of the host runtime
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Post a message into a conversation
    ///
    /// # Arguments
    /// * `thread_id` - The conversation to post into
    /// * `message` - The message to post
    ///
    /// # Returns
    /// The host's id for the posted message. File attachments may be
    /// deleted as soon as this returns.
    async fn send(&self, thread_id: &str, message: OutboundMessage) -> Result<String>;

    /// Put a reaction on an existing message
    async fn react(&self, message_id: &str, reaction: Reaction) -> Result<()>;
}
