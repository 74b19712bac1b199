use std::pin::Pin;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use futures::{Stream, StreamExt};

use crate::core::filename::attachment_disposition;

pub const VIDEO_CONTENT_TYPE: &str = "video/mp4";

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("could not connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("upstream answered HTTP {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("stream from {url} broke after {sent} bytes: {source}")]
    Interrupted {
        url: String,
        sent: u64,
        #[source]
        source: reqwest::Error,
    },
    #[error("no data from {url} for {secs}s after {sent} bytes")]
    Stalled { url: String, sent: u64, secs: u64 },
}

type UpstreamBody = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Upstream response that has been opened but not forwarded. Nothing has been
/// written to the caller yet, so a failure here can still become an error
/// response.
pub struct PendingStream {
    url: String,
    response: reqwest::Response,
    idle_timeout: Duration,
}

pub async fn open_stream(
    client: &reqwest::Client,
    url: &str,
    idle_timeout: Duration,
) -> Result<PendingStream, StreamError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| StreamError::Connect {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(StreamError::Status {
            url: url.to_string(),
            status,
        });
    }

    tracing::debug!(
        "Opened upstream {} (content-length {:?})",
        url,
        response.content_length()
    );

    Ok(PendingStream {
        url: url.to_string(),
        response,
        idle_timeout,
    })
}

impl PendingStream {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Commits status and download headers and hands the upstream body to the
    /// caller chunk by chunk. From here on failures are only logged.
    pub fn into_response(self, file_name: &str) -> Response {
        let content_length = self.response.content_length();
        let upstream: UpstreamBody = Box::pin(self.response.bytes_stream());
        let body = Body::from_stream(relay_body(self.url, upstream, self.idle_timeout));

        let mut response = Response::new(body);
        *response.status_mut() = StatusCode::OK;

        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(VIDEO_CONTENT_TYPE));
        let disposition = HeaderValue::from_str(&attachment_disposition(file_name))
            .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=video.mp4"));
        headers.insert(header::CONTENT_DISPOSITION, disposition);
        if let Some(len) = content_length {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
        }

        response
    }
}

struct Transfer {
    url: String,
    sent: u64,
    polled: bool,
    finished: bool,
}

impl Transfer {
    fn new(url: String) -> Self {
        Self {
            url,
            sent: 0,
            polled: false,
            finished: false,
        }
    }

    /// True when the caller went away while the body was being forwarded.
    /// A body dropped before its first poll (HEAD requests) does not count.
    fn caller_disconnected(&self) -> bool {
        self.polled && !self.finished
    }
}

impl Drop for Transfer {
    fn drop(&mut self) {
        if self.caller_disconnected() {
            tracing::warn!(
                "Caller disconnected after {} bytes, aborting upstream fetch of {}",
                self.sent,
                self.url
            );
        } else if !self.finished {
            tracing::debug!("Body for {} dropped before streaming started", self.url);
        }
    }
}

struct RelayState {
    upstream: UpstreamBody,
    idle_timeout: Duration,
    transfer: Transfer,
}

fn relay_body(
    url: String,
    upstream: UpstreamBody,
    idle_timeout: Duration,
) -> impl Stream<Item = Result<Bytes, StreamError>> + Send {
    let state = RelayState {
        upstream,
        idle_timeout,
        transfer: Transfer::new(url),
    };

    futures::stream::unfold(Some(state), |state| async move {
        let mut state = state?;
        state.transfer.polled = true;

        match tokio::time::timeout(state.idle_timeout, state.upstream.next()).await {
            Ok(Some(Ok(chunk))) => {
                state.transfer.sent += chunk.len() as u64;
                Some((Ok(chunk), Some(state)))
            }
            Ok(Some(Err(source))) => {
                state.transfer.finished = true;
                let err = StreamError::Interrupted {
                    url: state.transfer.url.clone(),
                    sent: state.transfer.sent,
                    source,
                };
                tracing::error!("Download failed mid-stream: {}", err);
                Some((Err(err), None))
            }
            Ok(None) => {
                state.transfer.finished = true;
                tracing::info!(
                    "Streamed {} bytes from {}",
                    state.transfer.sent,
                    state.transfer.url
                );
                None
            }
            Err(_) => {
                state.transfer.finished = true;
                let err = StreamError::Stalled {
                    url: state.transfer.url.clone(),
                    sent: state.transfer.sent,
                    secs: state.idle_timeout.as_secs(),
                };
                tracing::error!("Download failed mid-stream: {}", err);
                Some((Err(err), None))
            }
        }
    })
}
