use serde::Deserialize;

use crate::api::{lenient, lenient_count, lenient_text};

/// One hit from the search API, which answers with a bare JSON array
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub author: Option<Author>,
    #[serde(default, deserialize_with = "lenient")]
    pub duration: Option<Length>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub views: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Author {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Length {
    /// Human readable length such as `3:32`
    #[serde(default, deserialize_with = "lenient_text")]
    pub timestamp: Option<String>,
}

impl SearchResult {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }

    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or_default()
    }

    pub fn channel(&self) -> &str {
        self.author
            .as_ref()
            .and_then(|a| a.name.as_deref())
            .unwrap_or("Unknown")
    }

    pub fn timestamp(&self) -> &str {
        self.duration
            .as_ref()
            .and_then(|d| d.timestamp.as_deref())
            .unwrap_or("N/A")
    }
}

/// Generic downloader response: the links sit at `data.data.{high,low}`
#[derive(Debug, Deserialize)]
pub struct DownloadResponse {
    pub data: Option<DownloadWrapper>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadWrapper {
    pub data: Option<DownloadLinks>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadLinks {
    #[serde(default, deserialize_with = "lenient_text")]
    pub high: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub low: Option<String>,
}

impl DownloadResponse {
    /// The link block, if the response has the expected nesting
    pub fn links(self) -> Option<DownloadLinks> {
        self.data?.data
    }
}

impl DownloadLinks {
    /// High quality when offered, else low
    pub fn best(self) -> Option<String> {
        self.high
            .filter(|url| !url.is_empty())
            .or(self.low.filter(|url| !url.is_empty()))
    }
}
