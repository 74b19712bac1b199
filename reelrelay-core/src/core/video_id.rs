const VIDEO_MARKER: &str = "/video/";
const VIDEO_ID_LEN: usize = 19;

/// Pulls the media identifier out of a canonical TikTok post URL.
///
/// Segments longer than 19 characters are cut at the first `?` found at or after
/// offset 19. Without such a `?` the first 19 characters are kept.
pub fn extract_video_id(url: &str) -> Option<String> {
    let start = url.find(VIDEO_MARKER)? + VIDEO_MARKER.len();
    let segment = &url[start..];

    if segment.is_empty() {
        return None;
    }

    if segment.chars().count() <= VIDEO_ID_LEN {
        return Some(segment.to_string());
    }

    let query_start = segment
        .char_indices()
        .skip(VIDEO_ID_LEN)
        .find(|(_, c)| *c == '?')
        .map(|(i, _)| i);

    let id = match query_start {
        Some(end) => segment[..end].to_string(),
        None => segment.chars().take(VIDEO_ID_LEN).collect(),
    };

    Some(id)
}
