use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::api::quran::{Ayah, SurahData, SurahInfo, SurahResponse};
use crate::commands::Command;
use crate::config::Endpoints;
use crate::host::{Attachment, InboundEvent, Messenger, OutboundMessage};
use crate::relay::{MediaRelay, QUERY_TIMEOUT, best_effort};

const SURAH_COUNT: u16 = 114;

/// Looks up a surah and posts its summary plus recitation audio
pub struct SurahCommand {
    messenger: Arc<dyn Messenger>,
    relay: Arc<MediaRelay>,
    endpoints: Endpoints,
    prefix: String,
}

impl SurahCommand {
    /// Create a new surah command
    ///
    /// # Arguments
    /// * `messenger` - The host client for replies
    /// * `relay` - Shared HTTP side of the relay
    /// * `endpoints` - Upstream API base URLs
    /// * `prefix` - The command prefix, shown in the usage example
    pub fn new(
        messenger: Arc<dyn Messenger>,
        relay: Arc<MediaRelay>,
        endpoints: Endpoints,
        prefix: String,
    ) -> Self {
        SurahCommand {
            messenger,
            relay,
            endpoints,
            prefix,
        }
    }

    fn guidance(&self) -> String {
        format!(
            "📖 | Please provide a valid surah number (1-{}).\nExample: {}surah 103",
            SURAH_COUNT, self.prefix
        )
    }

    async fn reply(&self, event: &InboundEvent, message: OutboundMessage) -> Result<String> {
        self.messenger
            .send(&event.thread_id, message.reply_to(event.message_id.clone()))
            .await
    }

    async fn lookup(&self, event: &InboundEvent, number: u16) -> Result<()> {
        let url = format!("{}/quran/surah", self.endpoints.rest);
        let number_param = number.to_string();

        let response: Option<SurahResponse> = self
            .relay
            .fetch_json(&url, &[("number", number_param.as_str())], QUERY_TIMEOUT)
            .await;

        let Some(response) = response else {
            anyhow::bail!("surah API unavailable");
        };

        let data = match response.data {
            Some(data) if response.status => data,
            _ => {
                warn!("Surah API reported failure for {}", number);
                self.reply(event, OutboundMessage::text("⚠️ | Failed to fetch Surah data."))
                    .await?;
                return Ok(());
            }
        };

        self.reply(event, OutboundMessage::text(summary(&data, number))).await?;

        // The host streams the recitation itself
        if let Some(audio) = data.audio {
            self.reply(event, OutboundMessage::default().attach(Attachment::Remote(audio)))
                .await?;
        }

        info!("Sent surah {} to {}", number, event.thread_id);
        Ok(())
    }
}

/// Parse a surah number in 1..=114
pub fn parse_surah_number(arg: Option<&str>) -> Option<u16> {
    arg?
        .trim()
        .parse::<u16>()
        .ok()
        .filter(|n| (1..=SURAH_COUNT).contains(n))
}

fn or_na(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or("N/A")
}

fn summary(data: &SurahData, number: u16) -> String {
    let (no_surah, no_ayah) = (SurahInfo::default(), Ayah::default());
    let surah = data.surah.as_ref().unwrap_or(&no_surah);
    let ayah = data.first_ayah.as_ref().unwrap_or(&no_ayah);
    format!(
        "📖 | {} ({})\n\n🔢 Number: {}\n📜 Total Ayahs: {}\n📌 Revelation: {}\n\n🕌 First Ayah (Arabic):\n{}\n\n🌍 First Ayah (English):\n{}\n\n⚡ Powered by Aminul REST API",
        or_na(&surah.name),
        or_na(&surah.arabic_name),
        surah.number.clone().unwrap_or_else(|| number.to_string()),
        or_na(&surah.total_ayahs),
        or_na(&surah.revelation_type),
        or_na(&ayah.arabic),
        or_na(&ayah.english),
    )
}

#[async_trait]
impl Command for SurahCommand {
    async fn execute(&self, event: &InboundEvent, args: Vec<&str>) -> Result<Option<OutboundMessage>> {
        let Some(number) = parse_surah_number(args.first().copied()) else {
            return Ok(Some(OutboundMessage::text(self.guidance())));
        };

        if let Err(e) = self.lookup(event, number).await {
            error!("Quran command error: {}", e);
            best_effort(
                "surah error reply",
                self.reply(event, OutboundMessage::text("⚠️ | Server error. Try again later.")),
            )
            .await;
        }

        Ok(None)
    }

    fn help(&self) -> &str {
        "{pn} <surah_number> - Get Surah info + audio\nExample: {pn} 103"
    }
}
