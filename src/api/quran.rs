use serde::Deserialize;

use crate::api::{lenient, lenient_text};

/// The surah endpoint wraps its payload in `{ status, data }`
#[derive(Debug, Deserialize)]
pub struct SurahResponse {
    #[serde(default)]
    pub status: bool,
    pub data: Option<SurahData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SurahData {
    #[serde(deserialize_with = "lenient")]
    pub surah: Option<SurahInfo>,
    #[serde(deserialize_with = "lenient")]
    pub first_ayah: Option<Ayah>,
    /// Recitation audio
    #[serde(deserialize_with = "lenient_text")]
    pub audio: Option<String>,
}

/// Every field is display-only, so numbers may arrive as text and vice versa
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SurahInfo {
    #[serde(deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub arabic_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub number: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub total_ayahs: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub revelation_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Ayah {
    #[serde(deserialize_with = "lenient_text")]
    pub arabic: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub english: Option<String>,
}
