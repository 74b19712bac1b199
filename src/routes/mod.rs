use axum::http::header::CONTENT_DISPOSITION;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Json, Router};
use reelrelay_core::models::settings::CorsSettings;
use serde::Deserialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::routes::error::ApiError;
use crate::AppState;

pub mod error;
pub mod instagram;
pub mod messages;
pub mod tiktok;

#[derive(Debug, Default, Deserialize)]
pub struct UrlBody {
    #[serde(default)]
    pub url: Option<String>,
}

pub(crate) fn requested_url(url: Option<String>) -> Result<String, ApiError> {
    url.map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request(messages::MISSING_URL))
}

async fn welcome() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": messages::WELCOME }))
}

pub fn cors_layer(settings: &CorsSettings) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([CONTENT_DISPOSITION]);

    if settings.allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin.trim()) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                None
            }
        })
        .collect();

    tracing::info!("CORS allow-list has {} origin(s)", origins.len());
    layer.allow_origin(AllowOrigin::list(origins))
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.cors);

    Router::new()
        .route("/", get(welcome))
        .route("/get-video-id", post(tiktok::get_video_id))
        .route("/download", get(tiktok::missing_id))
        .route("/download/", get(tiktok::missing_id))
        .route("/download/{id_video}", get(tiktok::download))
        .route("/get-video-id-instagram", post(instagram::get_video_info))
        .route("/download-instagram", get(instagram::download))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::extract::{Query, State};
    use axum::http::{header, StatusCode};
    use axum::response::Redirect;
    use axum::routing::options;
    use reelrelay_core::models::media::{MediaDetail, MediaKind, ResolvedPost};
    use reelrelay_core::models::settings::RelaySettings;
    use serde_json::{json, Value};

    use super::*;
    use crate::platforms::traits::PostResolver;
    use crate::test_support::spawn_upstream;

    const VIDEO_ID: &str = "1234567890123456789";

    struct FakeResolver {
        post: Option<ResolvedPost>,
    }

    #[async_trait]
    impl PostResolver for FakeResolver {
        fn name(&self) -> &str {
            "fake"
        }

        async fn resolve(&self, _url: &str) -> anyhow::Result<ResolvedPost> {
            self.post
                .clone()
                .ok_or_else(|| anyhow::anyhow!("resolver exploded"))
        }
    }

    async fn feed(
        State(base): State<String>,
        Query(params): Query<std::collections::HashMap<String, String>>,
    ) -> Json<Value> {
        match params.get("aweme_id").map(String::as_str) {
            Some(VIDEO_ID) => Json(json!({"aweme_list": [{
                "video": {
                    "play_addr": {"url_list": [format!("{}/media/clip.mp4", base)]},
                    "cover": {"url_list": [format!("{}/media/cover.jpeg", base)]}
                }
            }]})),
            Some("111") => Json(json!({"aweme_list": [{"video": {}}]})),
            _ => Json(json!({"aweme_list": []})),
        }
    }

    async fn upstream() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let app = Router::new()
            .route("/shortlink", get(|| async {
                Redirect::temporary("/@someone/video/1234567890123456789?lang=en")
            }))
            .route("/@someone/video/{id}", get(|| async { "post page" }))
            .route("/no-video-marker", get(|| async { "plain page" }))
            .route("/dead-link", get(|| async { Redirect::temporary("/removed") }))
            .route("/removed", get(|| async { StatusCode::NOT_FOUND }))
            .route("/aweme/v1/feed/", options(feed))
            .route("/media/clip.mp4", get(|| async { "tiktok-bytes" }))
            .route("/cdn/file.mp4", get(|| async { "instagram-bytes" }))
            .route("/cdn/gone.mp4", get(|| async { StatusCode::FORBIDDEN }))
            .with_state(base.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        base
    }

    async fn relay(upstream_base: &str, post: Option<ResolvedPost>) -> String {
        let mut settings = RelaySettings::default();
        settings.upstream.tiktok_api_base = upstream_base.to_string();
        settings.upstream.request_timeout_secs = 5;
        relay_with(settings, post).await
    }

    async fn relay_with(settings: RelaySettings, post: Option<ResolvedPost>) -> String {
        let state = AppState::new(settings)
            .unwrap()
            .with_post_resolver(Arc::new(FakeResolver { post }));
        spawn_upstream(router(state)).await
    }

    fn instagram_post(url: &str) -> ResolvedPost {
        let mut post = ResolvedPost::default();
        post.push(MediaDetail {
            kind: MediaKind::Video,
            url: url.to_string(),
            thumbnail: Some("https://cdn.example/thumb.jpg".to_string()),
        });
        post
    }

    async fn post_json(url: String, body: Value) -> (StatusCode, Value) {
        let resp = reqwest::Client::new().post(url).json(&body).send().await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    async fn get_json(url: String) -> (StatusCode, Value) {
        let resp = reqwest::get(url).await.unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    #[tokio::test]
    async fn welcome_message() {
        let up = upstream().await;
        let base = relay(&up, None).await;
        let (status, body) = get_json(format!("{}/", base)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], messages::WELCOME);
    }

    #[tokio::test]
    async fn short_link_resolves_to_video_id() {
        let up = upstream().await;
        let base = relay(&up, None).await;

        let (status, body) = post_json(
            format!("{}/get-video-id", base),
            json!({"url": format!("{}/shortlink", up)}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["videoId"], VIDEO_ID);
        assert_eq!(body["videoUrl"], format!("{}/media/clip.mp4", up));
        assert_eq!(body["thumbnailUrl"], format!("{}/media/cover.jpeg", up));
    }

    #[tokio::test]
    async fn url_without_marker_is_invalid() {
        let up = upstream().await;
        let base = relay(&up, None).await;

        let (status, body) = post_json(
            format!("{}/get-video-id", base),
            json!({"url": format!("{}/no-video-marker", up)}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], messages::INVALID_URL);
    }

    #[tokio::test]
    async fn missing_url_field() {
        let up = upstream().await;
        let base = relay(&up, None).await;

        let (status, body) = post_json(format!("{}/get-video-id", base), json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], messages::MISSING_URL);

        let resp = reqwest::Client::new()
            .post(format!("{}/get-video-id", base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unresolvable_url() {
        let up = upstream().await;
        let base = relay(&up, None).await;

        let (status, body) = post_json(
            format!("{}/get-video-id", base),
            json!({"url": "http://127.0.0.1:1/shortlink"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], messages::UNRESOLVED_URL);
    }

    #[tokio::test]
    async fn short_link_to_missing_page_is_unresolved() {
        let up = upstream().await;
        let base = relay(&up, None).await;

        let (status, body) = post_json(
            format!("{}/get-video-id", base),
            json!({"url": format!("{}/dead-link", up)}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], messages::UNRESOLVED_URL);
    }

    #[tokio::test]
    async fn download_streams_video() {
        let up = upstream().await;
        let base = relay(&up, None).await;

        let resp = reqwest::get(format!("{}/download/{}", base, VIDEO_ID)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            format!("attachment; filename={}.mp4", VIDEO_ID).as_str()
        );
        assert_eq!(resp.text().await.unwrap(), "tiktok-bytes");
    }

    #[tokio::test]
    async fn download_of_deleted_video_is_not_found() {
        let up = upstream().await;
        let base = relay(&up, None).await;

        let (status, body) = get_json(format!("{}/download/999", base)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], messages::VIDEO_NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_play_url_differs_from_not_found() {
        let up = upstream().await;
        let base = relay(&up, None).await;

        let (status, body) = get_json(format!("{}/download/111", base)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], messages::NO_PLAYABLE_URL);
    }

    #[tokio::test]
    async fn download_without_id() {
        let up = upstream().await;
        let base = relay(&up, None).await;

        let (status, body) = get_json(format!("{}/download/", base)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], messages::MISSING_VIDEO_ID);
    }

    #[tokio::test]
    async fn instagram_info() {
        let up = upstream().await;
        let base = relay(&up, Some(instagram_post("https://cdn.example/v/AQ_clip.mp4?oh=abc"))).await;

        let (status, body) = post_json(
            format!("{}/get-video-id-instagram", base),
            json!({"url": "https://www.instagram.com/reel/Cabc/"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["videoUrl"], "https://cdn.example/v/AQ_clip.mp4?oh=abc");
        assert_eq!(body["videoName"], "AQ_clip.mp4");
        assert_eq!(body["thumbnail"], "https://cdn.example/thumb.jpg");
    }

    #[tokio::test]
    async fn instagram_post_without_media() {
        let up = upstream().await;
        let base = relay(&up, Some(ResolvedPost::default())).await;

        let (status, body) = post_json(
            format!("{}/get-video-id-instagram", base),
            json!({"url": "https://www.instagram.com/p/Cabc/"}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], messages::NO_DOWNLOADABLE_FILE);
    }

    #[tokio::test]
    async fn instagram_resolver_failure() {
        let up = upstream().await;
        let base = relay(&up, None).await;

        let (status, body) = post_json(
            format!("{}/get-video-id-instagram", base),
            json!({"url": "https://www.instagram.com/p/Cabc/"}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], messages::INSTAGRAM_FETCH_FAILED);
    }

    #[tokio::test]
    async fn instagram_download_strips_query_from_name() {
        let up = upstream().await;
        let base = relay(&up, None).await;

        let resp = reqwest::get(format!("{}/download-instagram?url={}/cdn/file.mp4?sig=abc", base, up))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_DISPOSITION], "attachment; filename=file.mp4");
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "video/mp4");
        assert_eq!(resp.text().await.unwrap(), "instagram-bytes");
    }

    #[tokio::test]
    async fn instagram_download_errors() {
        let up = upstream().await;
        let base = relay(&up, None).await;

        let (status, body) = get_json(format!("{}/download-instagram", base)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], messages::MISSING_URL);

        let (status, body) =
            get_json(format!("{}/download-instagram?url=http://127.0.0.1:1/x.mp4", base)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], messages::MEDIA_CONNECT_FAILED);

        let (status, body) =
            get_json(format!("{}/download-instagram?url={}/cdn/gone.mp4", base, up)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], messages::MEDIA_DOWNLOAD_FAILED);

        let (status, body) = get_json(format!("{}/download-instagram?url=not-a-url", base)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], messages::REQUEST_FAILED);
    }

    #[tokio::test]
    async fn cors_allows_any_origin_by_default() {
        let up = upstream().await;
        let base = relay(&up, None).await;

        let resp = reqwest::Client::new()
            .get(format!("{}/", base))
            .header(header::ORIGIN, "https://app.example")
            .send()
            .await
            .unwrap();
        assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn cors_allow_list_only_echoes_listed_origins() {
        let mut settings = RelaySettings::default();
        settings.cors.allowed_origins = vec![
            "https://a.example".to_string(),
            "bad\norigin".to_string(),
        ];
        let base = relay_with(settings, None).await;

        let origin_header = |origin: &'static str| {
            let url = format!("{}/", base);
            async move {
                let resp = reqwest::Client::new()
                    .get(url)
                    .header(header::ORIGIN, origin)
                    .send()
                    .await
                    .unwrap();
                assert_eq!(resp.status(), StatusCode::OK);
                resp.headers()
                    .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                    .map(|v| v.to_str().unwrap().to_string())
            }
        };

        assert_eq!(
            origin_header("https://a.example").await.as_deref(),
            Some("https://a.example")
        );
        assert_eq!(origin_header("https://b.example").await, None);
    }

    #[test]
    fn requested_url_rejects_blank() {
        assert!(requested_url(None).is_err());
        assert!(requested_url(Some("   ".into())).is_err());
        assert_eq!(requested_url(Some(" https://a/b ".into())).unwrap(), "https://a/b");
    }
}
