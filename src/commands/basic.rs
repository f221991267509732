use anyhow::Result;
use async_trait::async_trait;

use crate::commands::Command;
use crate::host::{InboundEvent, OutboundMessage};

/// A command that displays help information for all commands
pub struct HelpCommand {
    prefix: String,
    descriptions: Vec<(String, String)>,
}

impl HelpCommand {
    /// Create a new help command
    ///
    /// # Arguments
    /// * `prefix` - The command prefix (e.g., ".")
    /// * `descriptions` - A list of (command_name, help_text) pairs
    ///
    /// # Returns
    /// A new HelpCommand instance
    pub fn new(prefix: String, descriptions: Vec<(String, String)>) -> Self {
        HelpCommand {
            prefix,
            descriptions,
        }
    }
}

#[async_trait]
impl Command for HelpCommand {
    async fn execute(&self, _event: &InboundEvent, args: Vec<&str>) -> Result<Option<OutboundMessage>> {
        let Some(first) = args.first() else {
            // Show a list of all commands
            let commands: Vec<String> = self
                .descriptions
                .iter()
                .map(|(name, _)| format!("{}{}", self.prefix, name))
                .collect();

            return Ok(Some(OutboundMessage::text(format!(
                "Available commands: {}",
                commands.join(", ")
            ))));
        };

        // Show help for a specific command
        let command_name = first.trim_start_matches(self.prefix.as_str()).to_lowercase();

        let reply = match self
            .descriptions
            .iter()
            .find(|(name, _)| name.to_lowercase() == command_name)
        {
            Some((_, help)) => help.replace("{pn}", &format!("{}{}", self.prefix, command_name)),
            None => format!("Unknown command: {}{}", self.prefix, command_name),
        };

        Ok(Some(OutboundMessage::text(reply)))
    }

    fn help(&self) -> &str {
        "{pn} [command] - Shows help information for available commands"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::create_test_event;

    #[tokio::test]
    async fn test_help_command() -> Result<()> {
        let descriptions = vec![
            ("surah".to_string(), "{pn} <surah_number>".to_string()),
            ("help".to_string(), "Shows help information".to_string()),
        ];

        let command = HelpCommand::new(".".to_string(), descriptions);
        let event = create_test_event(".help");

        // Execute the command with no args (list all commands)
        let result = command.execute(&event, Vec::new()).await?;
        assert_eq!(
            result.map(|m| m.body),
            Some("Available commands: .surah, .help".to_string())
        );

        // Execute the command with a specific command
        let result = command.execute(&event, vec![".Surah"]).await?;
        assert_eq!(result.map(|m| m.body), Some(".surah <surah_number>".to_string()));

        let result = command.execute(&event, vec!["nope"]).await?;
        assert_eq!(result.map(|m| m.body), Some("Unknown command: .nope".to_string()));
        Ok(())
    }
}
