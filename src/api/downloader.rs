use serde::Deserialize;
use serde_json::Value;

use crate::api::{display_value, lenient_list, lenient_number, lenient_text};
use crate::relay::select_preferred;

/// What the autolink plugin needs from any downloader payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaChoice {
    /// Direct URL of the selected variant
    pub url: Option<String>,
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub duration: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct YoutubeData {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub thumbnail: Option<String>,
    pub duration: Option<Value>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub formats: Vec<YoutubeFormat>,
}

#[derive(Debug, Deserialize)]
pub struct YoutubeFormat {
    #[serde(rename = "type", default, deserialize_with = "lenient_text")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub url: Option<String>,
}

impl YoutubeData {
    pub fn into_choice(self) -> MediaChoice {
        let url = select_preferred(&self.formats, &["video_with_audio", "video"], |f: &YoutubeFormat| {
            f.kind.as_deref()
        })
        .and_then(|f| f.url.clone());

        MediaChoice {
            url,
            title: self.title,
            thumbnail: self.thumbnail,
            duration: self.duration.as_ref().and_then(display_value),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TiktokData {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub downloads: Vec<TiktokDownload>,
}

#[derive(Debug, Deserialize)]
pub struct TiktokDownload {
    #[serde(default, deserialize_with = "lenient_text")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub url: Option<String>,
}

impl TiktokData {
    pub fn into_choice(self) -> MediaChoice {
        let url = select_preferred(&self.downloads, &["mp4 hd"], |d: &TiktokDownload| d.text.as_deref())
            .and_then(|d| d.url.clone());

        MediaChoice {
            url,
            title: self.title,
            thumbnail: self.thumbnail,
            duration: None,
        }
    }
}

/// Facebook nests its variants one level deeper: `data.data[]`
#[derive(Debug, Deserialize)]
pub struct FacebookData {
    #[serde(default, deserialize_with = "lenient_list")]
    pub data: Vec<FacebookItem>,
}

#[derive(Debug, Deserialize)]
pub struct FacebookItem {
    #[serde(default, deserialize_with = "lenient_text")]
    pub resolution: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub download: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub link: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub thumbnail: Option<String>,
}

impl FacebookData {
    pub fn into_choice(self) -> MediaChoice {
        let Some(item) = select_preferred(&self.data, &["720"], |i: &FacebookItem| i.resolution.as_deref())
        else {
            return MediaChoice::default();
        };

        MediaChoice {
            url: item
                .url
                .clone()
                .or_else(|| item.download.clone())
                .or_else(|| item.link.clone()),
            title: Some(item.title.clone().unwrap_or_else(|| "Facebook Video".to_string())),
            thumbnail: item.thumbnail.clone(),
            duration: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CapcutData {
    #[serde(default, deserialize_with = "lenient_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub thumbnail: Option<String>,
    /// Template length in milliseconds
    #[serde(default, deserialize_with = "lenient_number")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub medias: Vec<CapcutMedia>,
}

#[derive(Debug, Deserialize)]
pub struct CapcutMedia {
    #[serde(default, deserialize_with = "lenient_text")]
    pub quality: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub url: Option<String>,
}

impl CapcutData {
    pub fn into_choice(self) -> MediaChoice {
        let url = select_preferred(&self.medias, &["hd no watermark", "no watermark"], |m: &CapcutMedia| {
            m.quality.as_deref()
        })
        .and_then(|m| m.url.clone());

        MediaChoice {
            url,
            title: Some(self.title.unwrap_or_else(|| "CapCut Template".to_string())),
            thumbnail: self.thumbnail,
            duration: self
                .duration
                .filter(|ms| *ms > 0.0)
                .map(|ms| format!("{:.1}s", ms / 1000.0)),
        }
    }
}
