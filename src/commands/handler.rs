use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::commands::CommandRegistry;
use crate::host::{InboundEvent, Messenger};

/// Handler for processing incoming chat messages and executing commands
pub struct CommandHandler {
    messenger: Arc<dyn Messenger>,
    registry: Arc<RwLock<CommandRegistry>>,
    prefix: String,
}

impl CommandHandler {
    /// Create a new command handler
    ///
    /// # Arguments
    /// * `messenger` - The host client for sending replies
    /// * `registry` - The registry of available commands and listeners
    /// * `prefix` - The command prefix (e.g., ".")
    ///
    /// # Returns
    /// A new CommandHandler instance
    pub fn new(
        messenger: Arc<dyn Messenger>,
        registry: Arc<RwLock<CommandRegistry>>,
        prefix: String,
    ) -> Self {
        CommandHandler {
            messenger,
            registry,
            prefix,
        }
    }

    /// Process an incoming chat message
    ///
    /// A prefixed message naming a registered command runs that command.
    /// Every other message is offered to the listeners.
    ///
    /// # Arguments
    /// * `event` - The chat message to process
    ///
    /// # Returns
    /// A Result indicating whether a command reply could be posted
    pub async fn handle_message(&self, event: InboundEvent) -> Result<()> {
        let content = event.body.trim();

        if let Some(without_prefix) = content.strip_prefix(self.prefix.as_str()) {
            // Parse the command name and arguments
            let parts: Vec<&str> = without_prefix.split_whitespace().collect();

            if let Some((name, args)) = parts.split_first() {
                let command_name = name.to_lowercase();
                let command = self.registry.read().await.get_command(&command_name);

                if let Some(command) = command {
                    info!("Executing command: {} in {}", command_name, event.thread_id);
                    match command.execute(&event, args.to_vec()).await {
                        Ok(Some(reply)) => {
                            // Send the response to the chat
                            self.messenger
                                .send(&event.thread_id, reply.reply_to(event.message_id.clone()))
                                .await?;
                        }
                        Ok(None) => {
                            // No response needed
                            debug!("Command executed with no response: {}", command_name);
                        }
                        Err(e) => {
                            // Command execution failed
                            error!("Command execution failed: {}", e);
                        }
                    }
                    return Ok(());
                }
            }
        }

        let listeners = self.registry.read().await.listeners();
        for listener in listeners {
            if let Err(e) = listener.on_chat(&event).await {
                error!("Chat listener failed: {}", e);
            }
        }

        Ok(())
    }
}
