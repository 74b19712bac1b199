/// Follows the redirect chain of `url` with a real GET and returns the last URL
/// reached. Some short-link hosts only redirect on GET, so this never uses HEAD.
/// The hop limit comes from the client's redirect policy. A non-2xx final
/// answer is an error.
pub async fn resolve_redirects(client: &reqwest::Client, url: &str) -> anyhow::Result<String> {
    let response = client.get(url).send().await?.error_for_status()?;

    let final_url = response.url().to_string();
    if final_url != url {
        tracing::debug!("Resolved {} -> {}", url, final_url);
    }

    Ok(final_url)
}
