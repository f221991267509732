use clap::{Parser, Subcommand};

/// A chat bot that relays videos, surahs and YouTube picks into conversations
#[derive(Parser, Debug)]
#[command(name = "relay_chatbot")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A chat bot that relays media into conversations", long_about = None)]
pub struct Cli {
    /// Enable debug mode
    #[arg(short, long)]
    pub debug: bool,

    /// The command prefix for the bot
    #[arg(short, long, default_value = ".")]
    pub prefix: String,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the bot on the console transport
    Start {
        /// Conversation id to attach console input to
        #[arg(short, long)]
        thread: Option<String>,
    },

    /// Generate a sample .env file
    GenEnv {
        /// Path to output the sample .env file
        #[arg(default_value = ".env.example")]
        path: String,
    },

    /// Remove every file left in the scratch directory
    Sweep,
}
