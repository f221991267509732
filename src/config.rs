use anyhow::{Context, Result};
use dotenv::dotenv;
use std::env;
use std::time::Duration;

/// Base URLs of the upstream APIs the plugins call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// YouTube, TikTok and Facebook downloader
    pub downloader: String,
    /// CapCut template downloader
    pub capcut: String,
    /// REST API serving surah data and the generic video downloader
    pub rest: String,
    /// YouTube search API
    pub youtube_search: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Endpoints {
            downloader: "https://aminul-all-downloader.vercel.app".to_string(),
            capcut: "http://menu.panelaimbot.com:3010".to_string(),
            rest: "https://aminul-rest-api-three.vercel.app".to_string(),
            youtube_search: "https://aminul-youtube-api.vercel.app".to_string(),
        }
    }
}

impl Endpoints {
    /// Defaults, each overridable through its environment variable
    fn from_env() -> Self {
        let defaults = Endpoints::default();
        Endpoints {
            downloader: env::var("DOWNLOADER_API_URL").unwrap_or(defaults.downloader),
            capcut: env::var("CAPCUT_API_URL").unwrap_or(defaults.capcut),
            rest: env::var("REST_API_URL").unwrap_or(defaults.rest),
            youtube_search: env::var("YOUTUBE_SEARCH_API_URL").unwrap_or(defaults.youtube_search),
        }
    }
}

/// Configuration for the relay bot
pub struct Config {
    /// Directory for files staged during a send
    pub scratch_dir: String,
    /// Upstream API base URLs
    pub endpoints: Endpoints,
    /// Largest file (in MiB) that is downloaded and attached
    pub max_transfer_mb: u64,
    /// How long a pending YouTube selection stays valid
    pub session_ttl: Duration,
    /// How many conversations may hold a pending selection at once
    pub session_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// # Returns
    /// A Result containing the Config if successful, or an error if a numeric variable is malformed
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        // Optional scratch directory, default to ./tmp
        let scratch_dir = env::var("SCRATCH_DIR").unwrap_or_else(|_| "./tmp".to_string());

        let max_transfer_mb = parse_var("MAX_TRANSFER_MB", 150)?;
        let session_ttl_secs = parse_var("SESSION_TTL_SECS", 600)?;
        let session_capacity = parse_var("SESSION_CAPACITY", 1024)?;

        Ok(Config {
            scratch_dir,
            endpoints: Endpoints::from_env(),
            max_transfer_mb,
            session_ttl: Duration::from_secs(session_ttl_secs),
            session_capacity: session_capacity as usize,
        })
    }

    /// Create a new config directly from values (useful for testing)
    #[allow(dead_code)]
    pub fn new(
        scratch_dir: String,
        endpoints: Endpoints,
        max_transfer_mb: u64,
        session_ttl: Duration,
        session_capacity: usize,
    ) -> Self {
        Config {
            scratch_dir,
            endpoints,
            max_transfer_mb,
            session_ttl,
            session_capacity,
        }
    }

    /// The transfer ceiling in bytes
    pub fn max_transfer_bytes(&self) -> u64 {
        self.max_transfer_mb.saturating_mul(1024 * 1024)
    }
}

fn parse_var(name: &str, default: u64) -> Result<u64> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} must be a whole number, got '{}'", name, value)),
        Err(_) => Ok(default),
    }
}
