use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::filename::file_name_from_url;
use crate::core::stream_proxy::{open_stream, StreamError};
use crate::routes::error::ApiError;
use crate::routes::messages::*;
use crate::routes::{requested_url, UrlBody};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstagramInfoResponse {
    pub video_url: String,
    pub video_name: Option<String>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    #[serde(default)]
    url: Option<String>,
}

pub async fn get_video_info(
    State(state): State<AppState>,
    body: Result<Json<UrlBody>, JsonRejection>,
) -> Result<Json<InstagramInfoResponse>, ApiError> {
    let url = requested_url(body.ok().and_then(|Json(b)| b.url))?;

    tracing::info!("Resolving Instagram post {}", url);

    let post = state.instagram.resolve(&url).await.map_err(|e| {
        tracing::warn!("{} resolver failed for {}: {:#}", state.instagram.name(), url, e);
        ApiError::internal(INSTAGRAM_FETCH_FAILED)
    })?;

    let file_url = post
        .url_list
        .first()
        .ok_or_else(|| ApiError::not_found(NO_DOWNLOADABLE_FILE))?;

    let thumbnail = post
        .media_details
        .first()
        .and_then(|detail| detail.thumbnail.clone());

    Ok(Json(InstagramInfoResponse {
        video_url: file_url.clone(),
        video_name: file_name_from_url(file_url),
        thumbnail,
    }))
}

pub async fn download(
    State(state): State<AppState>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let url = requested_url(query.ok().and_then(|Query(q)| q.url))?;

    let scheme_ok = url::Url::parse(&url)
        .map(|parsed| matches!(parsed.scheme(), "http" | "https"))
        .unwrap_or(false);
    if !scheme_ok {
        tracing::warn!("Refusing to fetch {}", url);
        return Err(ApiError::internal(REQUEST_FAILED));
    }

    tracing::info!("Downloading Instagram media from {}", url);

    let pending = open_stream(&state.clients.stream, &url, state.stream_idle_timeout())
        .await
        .map_err(|e| {
            tracing::error!("Instagram: {}", e);
            match e {
                StreamError::Connect { .. } => ApiError::internal(MEDIA_CONNECT_FAILED),
                _ => ApiError::internal(MEDIA_DOWNLOAD_FAILED),
            }
        })?;

    let file_name = file_name_from_url(&url).unwrap_or_else(|| "video.mp4".to_string());
    Ok(pending.into_response(&file_name))
}
