pub use reelrelay_core::platforms::traits;

pub mod instagram;
pub mod tiktok;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("upstream returned no media entries")]
    NotFound,
    #[error("first media entry has no playable URL")]
    NoPlayableUrl,
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}
