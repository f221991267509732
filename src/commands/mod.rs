mod autolink;
mod basic;
mod handler;
mod surah;
mod youtube;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::host::{InboundEvent, OutboundMessage};

pub use autolink::AutolinkListener;
pub use basic::HelpCommand;
pub use handler::CommandHandler;
pub use surah::SurahCommand;
pub use youtube::YoutubeCommand;

/// Trait for defining chat commands
#[async_trait]
pub trait Command: Send + Sync {
    /// Execute the command based on a chat message
    ///
    /// # Arguments
    /// * `event` - The chat message that triggered the command
    /// * `args` - The arguments provided to the command
    ///
    /// # Returns
    /// A reply for the handler to post, or None when the command answered on its own
    async fn execute(&self, event: &InboundEvent, args: Vec<&str>) -> Result<Option<OutboundMessage>>;

    /// Get the help text for this command
    fn help(&self) -> &str;
}

/// Trait for plugins that look at every chat message, not just commands
#[async_trait]
pub trait ChatListener: Send + Sync {
    /// Inspect a message and act on it if it is meant for this plugin
    async fn on_chat(&self, event: &InboundEvent) -> Result<()>;
}

/// A registry of available commands and listeners
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Arc<dyn Command>>,
    aliases: HashMap<String, String>,
    listeners: Vec<Arc<dyn ChatListener>>,
}

impl CommandRegistry {
    /// Create a new empty command registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command with the given name
    ///
    /// # Arguments
    /// * `name` - The name of the command (without prefix)
    /// * `command` - The command implementation
    pub fn register<S: Into<String>>(&mut self, name: S, command: Arc<dyn Command>) {
        self.commands.insert(name.into().to_lowercase(), command);
    }

    /// Make `alias` resolve to the command registered as `name`
    pub fn alias<S: Into<String>>(&mut self, alias: S, name: S) {
        self.aliases
            .insert(alias.into().to_lowercase(), name.into().to_lowercase());
    }

    /// Register a listener; listeners run in registration order
    pub fn listen(&mut self, listener: Arc<dyn ChatListener>) {
        self.listeners.push(listener);
    }

    /// Check if a command exists in the registry
    ///
    /// # Arguments
    /// * `name` - The name or alias of the command to check
    ///
    /// # Returns
    /// true if the command exists, false otherwise
    pub fn has_command<S: AsRef<str>>(&self, name: S) -> bool {
        self.get_command(name).is_some()
    }

    /// Get a command from the registry, following aliases
    ///
    /// # Arguments
    /// * `name` - The name or alias of the command to get
    ///
    /// # Returns
    /// Some(command) if the command exists, None otherwise
    pub fn get_command<S: AsRef<str>>(&self, name: S) -> Option<Arc<dyn Command>> {
        let name = name.as_ref();
        let name = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        self.commands.get(name).cloned()
    }

    /// Get all command names in the registry, sorted
    pub fn get_command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }

    /// All registered listeners
    pub fn listeners(&self) -> Vec<Arc<dyn ChatListener>> {
        self.listeners.clone()
    }
}
