const FALLBACK_NAME: &str = "video.mp4";

/// Last path segment of a media URL, query string stripped.
pub fn file_name_from_url(url: &str) -> Option<String> {
    let path = url.split('?').next().unwrap_or(url);
    let path = path.split('#').next().unwrap_or(path);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
        .map(|s| s.to_string())
}

pub fn video_file_name(video_id: &str) -> String {
    format!("{}.mp4", video_id)
}

/// Header-safe file name: filesystem-forbidden characters dropped, anything
/// outside printable ASCII replaced by `_`.
pub fn sanitize_header_file_name(name: &str) -> String {
    let name = sanitize_filename::sanitize(name);
    let name: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != ';' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let name = name.trim_matches('_');

    if name.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        name.to_string()
    }
}

pub fn attachment_disposition(name: &str) -> String {
    format!("attachment; filename={}", sanitize_header_file_name(name))
}
