use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use reelrelay_core::core::video_id::extract_video_id;
use serde::Serialize;

use crate::core::filename::video_file_name;
use crate::core::redirect::resolve_redirects;
use crate::core::stream_proxy::open_stream;
use crate::platforms::FetchError;
use crate::routes::error::ApiError;
use crate::routes::messages::*;
use crate::routes::{requested_url, UrlBody};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoIdResponse {
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub video_id: String,
}

fn fetch_failure(err: FetchError, video_id: &str, generic: &'static str) -> ApiError {
    match err {
        FetchError::NotFound => {
            tracing::debug!("TikTok: no entries for {}", video_id);
            ApiError::not_found(VIDEO_NOT_FOUND)
        }
        FetchError::NoPlayableUrl => {
            tracing::warn!("TikTok: entry for {} has no play_addr", video_id);
            ApiError::internal(NO_PLAYABLE_URL)
        }
        FetchError::Upstream(e) => {
            tracing::warn!("TikTok: feed lookup for {} failed: {:#}", video_id, e);
            ApiError::internal(generic)
        }
    }
}

pub async fn get_video_id(
    State(state): State<AppState>,
    body: Result<Json<UrlBody>, JsonRejection>,
) -> Result<Json<VideoIdResponse>, ApiError> {
    let url = requested_url(body.ok().and_then(|Json(b)| b.url))?;

    let full_url = resolve_redirects(&state.clients.api, &url)
        .await
        .map_err(|e| {
            tracing::warn!("Could not resolve {}: {:#}", url, e);
            ApiError::bad_request(UNRESOLVED_URL)
        })?;

    let video_id = extract_video_id(&full_url).ok_or_else(|| {
        tracing::debug!("No video id in {}", full_url);
        ApiError::bad_request(INVALID_URL)
    })?;

    let metadata = state
        .tiktok
        .fetch_metadata(&video_id)
        .await
        .map_err(|e| fetch_failure(e, &video_id, VIDEO_FETCH_FAILED))?;

    Ok(Json(VideoIdResponse {
        video_url: metadata.video_url,
        thumbnail_url: metadata.thumbnail_url,
        video_id,
    }))
}

pub async fn download(
    State(state): State<AppState>,
    Path(id_video): Path<String>,
) -> Result<Response, ApiError> {
    let video_id = id_video.trim();
    if video_id.is_empty() {
        return Err(ApiError::bad_request(MISSING_VIDEO_ID));
    }

    let metadata = state
        .tiktok
        .fetch_metadata(video_id)
        .await
        .map_err(|e| fetch_failure(e, video_id, VIDEO_DOWNLOAD_FAILED))?;

    let pending = open_stream(
        &state.clients.stream,
        &metadata.video_url,
        state.stream_idle_timeout(),
    )
    .await
    .map_err(|e| {
        tracing::warn!("TikTok: {}", e);
        ApiError::internal(VIDEO_DOWNLOAD_FAILED)
    })?;

    tracing::info!("Streaming TikTok video {} from {}", video_id, pending.url());

    let file_name = metadata
        .display_name
        .unwrap_or_else(|| video_file_name(video_id));
    Ok(pending.into_response(&file_name))
}

pub async fn missing_id() -> ApiError {
    ApiError::bad_request(MISSING_VIDEO_ID)
}
