mod api;
mod cli;
mod commands;
mod config;
mod host;
mod relay;
mod sessions;
#[cfg(test)]
mod test_helpers;

use anyhow::Result;
use clap::Parser;
use std::fs::File;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::RwLock;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use commands::{
    AutolinkListener, Command, CommandHandler, CommandRegistry, HelpCommand, SurahCommand,
    YoutubeCommand,
};
use config::Config;
use host::{ConsoleInput, ConsoleMessenger, Messenger};
use relay::{MediaRelay, ScratchDir, megabytes};
use sessions::SessionStore;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// The main entry point for the application
#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match &cli.command {
        Some(Commands::Start { thread }) => {
            start_bot(cli.prefix.clone(), thread.clone()).await?;
        }
        Some(Commands::GenEnv { path }) => {
            generate_env_file(path)?;
        }
        Some(Commands::Sweep) => {
            sweep().await?;
        }
        None => {
            // Default to start command if no subcommand is specified
            start_bot(cli.prefix.clone(), None).await?;
        }
    }

    Ok(())
}

/// Start the bot on the console transport
async fn start_bot(prefix: String, thread_override: Option<String>) -> Result<()> {
    // Load configuration
    info!("Loading configuration");
    let config = Config::from_env()?;
    let thread_id = thread_override.unwrap_or_else(|| "console".to_string());

    info!("Starting relay chatbot");

    let scratch = ScratchDir::new(&config.scratch_dir);
    scratch.ensure().await?;
    info!("Scratch directory: {}", scratch.path().display());

    let relay = Arc::new(MediaRelay::new(scratch, config.max_transfer_bytes())?);
    info!("Transfer ceiling: {} MB", megabytes(relay.max_bytes()));
    let messenger: Arc<dyn Messenger> = Arc::new(ConsoleMessenger::new());
    let sessions = Arc::new(SessionStore::new(config.session_ttl, config.session_capacity));

    let autolink = Arc::new(AutolinkListener::new(
        messenger.clone(),
        relay.clone(),
        config.endpoints.clone(),
    ));
    let surah = Arc::new(SurahCommand::new(
        messenger.clone(),
        relay.clone(),
        config.endpoints.clone(),
        prefix.clone(),
    ));
    let youtube = Arc::new(YoutubeCommand::new(
        messenger.clone(),
        relay.clone(),
        config.endpoints.clone(),
        sessions.clone(),
    ));

    // Set up command descriptions for help command
    let descriptions = vec![
        ("surah".to_string(), surah.help().to_string()),
        ("yt".to_string(), youtube.help().to_string()),
        (
            "help".to_string(),
            "{pn} [command] - Shows help information for available commands".to_string(),
        ),
    ];

    // Set up command registry
    let registry_arc = Arc::new(RwLock::new(CommandRegistry::new()));
    {
        let mut registry = registry_arc.write().await;
        registry.register("surah", surah);
        registry.alias("quran", "surah");
        registry.register("yt", youtube.clone());
        registry.alias("youtube", "yt");
        registry.alias("yts", "yt");
        registry.register("help", Arc::new(HelpCommand::new(prefix.clone(), descriptions)));

        registry.listen(autolink);
        registry.listen(youtube);

        info!(
            "Registered commands: {} with prefix: '{}'",
            registry.get_command_names().join(", "),
            prefix
        );
    }

    // Create command handler
    let command_handler = Arc::new(CommandHandler::new(messenger, registry_arc, prefix));

    // Expired selections are dropped in the background
    let sweeper_sessions = sessions.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            let purged = sweeper_sessions.purge_expired().await;
            if !purged.is_empty() {
                debug!("Expired selections in: {}", purged.join(", "));
            }
            debug!(
                "Session sweep purged {} entries, {} pending",
                purged.len(),
                sweeper_sessions.len().await
            );
        }
    });

    info!("Bot is now running in '{}'. Type messages, Ctrl+C to exit.", thread_id);
    let mut input = ConsoleInput::new(thread_id);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("Input closed");
                    break;
                };
                let Some(event) = input.next_event(&line) else {
                    continue;
                };

                // Each message is handled on its own task so slow downloads never block input
                let handler = command_handler.clone();
                tokio::spawn(async move {
                    if let Err(e) = handler.handle_message(event).await {
                        error!("Error handling message: {}", e);
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    info!("Shutting down...");

    Ok(())
}

/// Remove leftover staged files
async fn sweep() -> Result<()> {
    let config = Config::from_env()?;
    let scratch = ScratchDir::new(&config.scratch_dir);

    let removed = scratch.clear().await?;
    info!("Removed {} files from {}", removed, scratch.path().display());

    Ok(())
}

/// Generate a sample .env file
fn generate_env_file(path: &str) -> Result<()> {
    info!("Generating sample .env file at {}", path);

    let contents = r#"# Directory for temporary media files
SCRATCH_DIR=./tmp
# Largest file the bot will attach, in megabytes
MAX_TRANSFER_MB=150
# How long a YouTube result list stays selectable, in seconds
SESSION_TTL_SECS=600
# Maximum number of conversations with a pending result list
SESSION_CAPACITY=1024
# Optional: upstream API base URLs
# DOWNLOADER_API_URL=https://aminul-all-downloader.vercel.app
# CAPCUT_API_URL=http://menu.panelaimbot.com:3010
# REST_API_URL=https://aminul-rest-api-three.vercel.app
# YOUTUBE_SEARCH_API_URL=https://aminul-youtube-api.vercel.app
"#;

    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())?;

    info!("Sample .env file generated successfully!");

    Ok(())
}
