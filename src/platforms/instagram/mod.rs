use std::sync::LazyLock;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use rand::RngExt;
use regex::Regex;
use reelrelay_core::models::media::{MediaDetail, MediaKind, ResolvedPost};
use reelrelay_core::models::settings::ProxySettings;

use crate::core::http_client::apply_proxy;
use crate::platforms::traits::PostResolver;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
const IG_APP_ID: &str = "936619743392459";
const GQL_DOC_ID: &str = "8845758582119845";
const DEFAULT_BASE: &str = "https://www.instagram.com";

static EMBED_INIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""init",\[\],\[(.*?)\]\],"#).unwrap());
static EMBED_EXTRA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"window\.__additionalDataLoaded\('extra',\s*(\{.*?\})\s*\)"#).unwrap()
});

pub struct InstagramResolver {
    client: reqwest::Client,
    redirect_client: reqwest::Client,
    base: String,
}

struct GqlTokens {
    csrf_token: String,
    device_id: String,
    machine_id: String,
    lsd_token: String,
    app_id: String,
    comet_req: String,
    jazoest: String,
}

impl InstagramResolver {
    pub fn new(
        timeout: Duration,
        connect_timeout: Duration,
        proxy: &ProxySettings,
    ) -> anyhow::Result<Self> {
        let client = apply_proxy(reqwest::Client::builder(), proxy)
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        let redirect_client = apply_proxy(reqwest::Client::builder(), proxy)
            .user_agent("curl/7.88.1")
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            client,
            redirect_client,
            base: DEFAULT_BASE.to_string(),
        })
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into().trim_end_matches('/').to_string();
        self
    }

    fn path_segments(url: &str) -> Vec<String> {
        url::Url::parse(url)
            .map(|parsed| {
                parsed
                    .path()
                    .split('/')
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn extract_post_id(url: &str) -> Option<String> {
        let segments = Self::path_segments(url);
        let marker = segments
            .iter()
            .position(|s| matches!(s.as_str(), "p" | "reel" | "reels" | "tv"))?;
        segments.get(marker + 1).cloned()
    }

    fn is_share_url(url: &str) -> bool {
        Self::path_segments(url).first().map(String::as_str) == Some("share")
    }

    fn is_story_url(url: &str) -> bool {
        Self::path_segments(url).first().map(String::as_str) == Some("stories")
    }

    async fn resolve_share_link(&self, url: &str) -> anyhow::Result<String> {
        let response = self.redirect_client.get(url).send().await?;
        let final_url = response.url().to_string();

        if final_url.contains("/share/") {
            return Err(anyhow!("Share link {} did not redirect to a post", url));
        }

        Ok(final_url)
    }

    fn extract_object_entry(name: &str, html: &str) -> Option<serde_json::Value> {
        let pattern = format!(r#"\["{}",.*?,(\{{.*?\}}),\d+\]"#, regex::escape(name));
        let re = Regex::new(&pattern).ok()?;
        let json_str = re.captures(html)?.get(1)?.as_str();
        serde_json::from_str(json_str).ok()
    }

    fn extract_number_from_query(name: &str, html: &str) -> Option<String> {
        let pattern = format!(r"{}=(\d+)", regex::escape(name));
        let re = Regex::new(&pattern).ok()?;
        re.captures(html)?.get(1).map(|m| m.as_str().to_string())
    }

    fn entry_string(entry: Option<&serde_json::Value>, key: &str) -> Option<String> {
        let value = entry?.get(key)?;
        value
            .as_str()
            .map(|s| s.to_string())
            .or_else(|| value.as_u64().map(|n| n.to_string()))
    }

    fn random_base64url(len: usize) -> String {
        use base64::Engine;
        let bytes: Vec<u8> = (0..len).map(|_| rand::rng().random::<u8>()).collect();
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }

    fn tokens_from_html(html: &str) -> GqlTokens {
        let security = Self::extract_object_entry("InstagramSecurityConfig", html);
        let polaris = Self::extract_object_entry("PolarisSiteData", html);
        let web_config = Self::extract_object_entry("DGWWebConfig", html);
        let lsd = Self::extract_object_entry("LSD", html);

        GqlTokens {
            csrf_token: Self::entry_string(security.as_ref(), "csrf_token").unwrap_or_default(),
            device_id: Self::entry_string(polaris.as_ref(), "device_id").unwrap_or_default(),
            machine_id: Self::entry_string(polaris.as_ref(), "machine_id").unwrap_or_default(),
            lsd_token: Self::entry_string(lsd.as_ref(), "token")
                .unwrap_or_else(|| Self::random_base64url(8)),
            app_id: Self::entry_string(web_config.as_ref(), "appId")
                .unwrap_or_else(|| IG_APP_ID.to_string()),
            comet_req: Self::extract_number_from_query("__comet_req", html)
                .unwrap_or_else(|| "7".to_string()),
            jazoest: Self::extract_number_from_query("jazoest", html).unwrap_or_else(|| {
                let val: u32 = rand::rng().random_range(1000..10000);
                val.to_string()
            }),
        }
    }

    async fn fetch_tokens(&self, post_id: &str) -> anyhow::Result<GqlTokens> {
        let url = format!("{}/p/{}/", self.base, post_id);

        let html = self
            .client
            .get(&url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-GB,en;q=0.9")
            .header("Sec-Fetch-Dest", "document")
            .header("Sec-Fetch-Mode", "navigate")
            .header("Sec-Fetch-Site", "none")
            .send()
            .await?
            .text()
            .await?;

        Ok(Self::tokens_from_html(&html))
    }

    async fn request_gql(&self, post_id: &str) -> anyhow::Result<serde_json::Value> {
        let tokens = self.fetch_tokens(post_id).await?;

        let cookie = [
            (!tokens.csrf_token.is_empty()).then(|| format!("csrftoken={}", tokens.csrf_token)),
            (!tokens.device_id.is_empty()).then(|| format!("ig_did={}", tokens.device_id)),
            (!tokens.machine_id.is_empty()).then(|| format!("mid={}", tokens.machine_id)),
            Some("ig_nrcb=1".to_string()),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("; ");

        let variables = serde_json::json!({
            "shortcode": post_id,
            "fetch_tagged_user_count": null,
            "hoisted_comment_id": null,
            "hoisted_reply_id": null
        });

        let body = format!(
            "av=0&__d=www&__user=0&__a=1&__req=3&__comet_req={}&lsd={}&jazoest={}&fb_api_caller_class=RelayModern&fb_api_req_friendly_name=PolarisPostActionLoadPostQueryQuery&variables={}&server_timestamps=true&doc_id={}",
            urlencoding::encode(&tokens.comet_req),
            urlencoding::encode(&tokens.lsd_token),
            urlencoding::encode(&tokens.jazoest),
            urlencoding::encode(&variables.to_string()),
            GQL_DOC_ID,
        );

        let response = self
            .client
            .post(format!("{}/graphql/query", self.base))
            .header("Accept", "*/*")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("x-ig-app-id", &tokens.app_id)
            .header("X-FB-LSD", &tokens.lsd_token)
            .header("X-CSRFToken", &tokens.csrf_token)
            .header("X-FB-Friendly-Name", "PolarisPostActionLoadPostQueryQuery")
            .header("x-asbd-id", "129477")
            .header("Cookie", &cookie)
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("Instagram GQL returned HTTP {}", response.status()));
        }

        let json: serde_json::Value = response.json().await?;

        let data = json
            .get("data")
            .ok_or_else(|| anyhow!("GQL response has no data"))?;

        match data
            .get("xdt_shortcode_media")
            .or_else(|| data.get("shortcode_media"))
        {
            Some(m) if !m.is_null() => Ok(m.clone()),
            _ => Err(anyhow!("Post {} not found via GQL", post_id)),
        }
    }

    async fn request_embed(&self, post_id: &str) -> anyhow::Result<serde_json::Value> {
        let url = format!("{}/p/{}/embed/captioned/", self.base, post_id);

        let html = self
            .client
            .get(&url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-GB,en;q=0.9")
            .send()
            .await?
            .text()
            .await?;

        Self::embed_data_from_html(&html)
    }

    fn embed_data_from_html(html: &str) -> anyhow::Result<serde_json::Value> {
        if let Some(json_str) = EMBED_INIT_RE.captures(html).and_then(|c| c.get(1)) {
            if let Ok(embed_data) = serde_json::from_str::<serde_json::Value>(json_str.as_str()) {
                if let Some(context_json) = embed_data.get("contextJSON").and_then(|v| v.as_str()) {
                    return Ok(serde_json::from_str(context_json)?);
                }
            }
        }

        if let Some(json_str) = EMBED_EXTRA_RE.captures(html).and_then(|c| c.get(1)) {
            return Ok(serde_json::from_str(json_str.as_str())?);
        }

        Err(anyhow!("No embed data found"))
    }

    fn detail_from_node(node: &serde_json::Value) -> Option<MediaDetail> {
        let is_video = node
            .get("is_video")
            .and_then(|v| v.as_bool())
            .unwrap_or_else(|| node.get("video_url").is_some());

        let display_url = node
            .get("display_url")
            .or_else(|| node.get("thumbnail_src"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let (kind, url) = if is_video {
            (MediaKind::Video, node.get("video_url").and_then(|v| v.as_str())?.to_string())
        } else {
            (MediaKind::Image, display_url.clone()?)
        };

        Some(MediaDetail {
            kind,
            url,
            thumbnail: display_url,
        })
    }

    fn media_from_gql(data: &serde_json::Value) -> ResolvedPost {
        let mut post = ResolvedPost::default();

        if let Some(edges) = data
            .pointer("/edge_sidecar_to_children/edges")
            .and_then(|v| v.as_array())
        {
            for detail in edges
                .iter()
                .filter_map(|edge| edge.get("node"))
                .filter_map(Self::detail_from_node)
            {
                post.push(detail);
            }
            if !post.url_list.is_empty() {
                return post;
            }
        }

        if let Some(detail) = Self::detail_from_node(data) {
            post.push(detail);
        }

        post
    }

    fn media_from_embed(data: &serde_json::Value) -> ResolvedPost {
        if let Some(media) = data
            .get("gql_data")
            .and_then(|g| g.get("shortcode_media").or_else(|| g.get("xdt_shortcode_media")))
        {
            return Self::media_from_gql(media);
        }

        match data.get("media") {
            Some(media) if media.get("display_url").is_some() || media.get("video_url").is_some() => {
                Self::media_from_gql(media)
            }
            _ => Self::media_from_gql(data),
        }
    }
}

#[async_trait]
impl PostResolver for InstagramResolver {
    fn name(&self) -> &str {
        "instagram"
    }

    async fn resolve(&self, url: &str) -> anyhow::Result<ResolvedPost> {
        if Self::is_story_url(url) {
            return Err(anyhow!("Instagram stories require a logged-in session"));
        }

        let canonical = if Self::is_share_url(url) {
            self.resolve_share_link(url).await?
        } else {
            url.to_string()
        };

        let post_id = Self::extract_post_id(&canonical)
            .ok_or_else(|| anyhow!("Could not extract a post id from {}", canonical))?;

        match self.request_gql(&post_id).await {
            Ok(data) => Ok(Self::media_from_gql(&data)),
            Err(gql_err) => {
                tracing::debug!("Instagram GQL failed for {}: {}, trying embed", post_id, gql_err);
                let data = self.request_embed(&post_id).await.map_err(|embed_err| {
                    tracing::debug!("Instagram embed also failed for {}: {}", post_id, embed_err);
                    anyhow!("Post {} not found or private", post_id)
                })?;
                Ok(Self::media_from_embed(&data))
            }
        }
    }
}
