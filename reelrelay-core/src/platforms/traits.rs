use async_trait::async_trait;

use crate::models::media::ResolvedPost;

/// Turns a sharing-platform post URL into its direct media links.
#[async_trait]
pub trait PostResolver: Send + Sync {
    fn name(&self) -> &str;
    async fn resolve(&self, url: &str) -> anyhow::Result<ResolvedPost>;
}
