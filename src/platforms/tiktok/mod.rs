use anyhow::anyhow;
use reelrelay_core::models::media::MediaMetadata;

use crate::core::filename::video_file_name;
use crate::platforms::FetchError;

/// The mobile feed endpoint only returns the post payload for OPTIONS requests.
pub const FEED_METHOD: reqwest::Method = reqwest::Method::OPTIONS;

const FEED_PATH: &str = "/aweme/v1/feed/";

// Fixed Android app fingerprint the feed endpoint expects.
const DEVICE_PARAMS: &[(&str, &str)] = &[
    ("iid", "7318518857994389254"),
    ("device_id", "7318517321748022790"),
    ("channel", "googleplay"),
    ("app_name", "musical_ly"),
    ("version_code", "300904"),
    ("device_platform", "android"),
    ("device_type", "ASUS_Z01QD"),
    ("version", "9"),
];

#[derive(Clone)]
pub struct TikTokClient {
    client: reqwest::Client,
    api_base: String,
}

impl TikTokClient {
    pub fn new(client: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
        }
    }

    fn feed_url(&self, video_id: &str) -> anyhow::Result<url::Url> {
        let base = format!("{}{}", self.api_base.trim_end_matches('/'), FEED_PATH);
        let mut params = vec![("aweme_id", video_id)];
        params.extend_from_slice(DEVICE_PARAMS);
        Ok(url::Url::parse_with_params(&base, &params)?)
    }

    pub async fn fetch_metadata(&self, video_id: &str) -> Result<MediaMetadata, FetchError> {
        let feed = self.fetch_feed(video_id).await?;
        let metadata = parse_feed(&feed, video_id)?;
        tracing::debug!("TikTok: {} -> {}", video_id, metadata.video_url);
        Ok(metadata)
    }

    async fn fetch_feed(&self, video_id: &str) -> anyhow::Result<serde_json::Value> {
        let url = self.feed_url(video_id)?;

        tracing::debug!("TikTok: querying feed for {}", video_id);

        let response = self.client.request(FEED_METHOD, url).send().await?;
        tracing::debug!("TikTok: feed HTTP status {}", response.status());

        let body = response.text().await?;
        let data = serde_json::from_str(&body).map_err(|e| {
            tracing::warn!("TikTok: feed JSON parse error: {}", e);
            anyhow!("Feed response for {} is not JSON", video_id)
        })?;

        Ok(data)
    }
}

fn parse_feed(data: &serde_json::Value, video_id: &str) -> Result<MediaMetadata, FetchError> {
    let item = data
        .get("aweme_list")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or(FetchError::NotFound)?;

    let video_url = item
        .pointer("/video/play_addr/url_list/0")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or(FetchError::NoPlayableUrl)?
        .to_string();

    let thumbnail_url = item
        .pointer("/video/cover/url_list/0")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    Ok(MediaMetadata {
        video_url,
        thumbnail_url,
        display_name: Some(video_file_name(video_id)),
    })
}
