#[derive(Debug, Clone, PartialEq)]
pub struct MediaMetadata {
    pub video_url: String,
    pub thumbnail_url: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaDetail {
    pub kind: MediaKind,
    pub url: String,
    pub thumbnail: Option<String>,
}

/// Direct media links behind a single sharing-platform post, in post order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedPost {
    pub url_list: Vec<String>,
    pub media_details: Vec<MediaDetail>,
}

impl ResolvedPost {
    pub fn push(&mut self, detail: MediaDetail) {
        self.url_list.push(detail.url.clone());
        self.media_details.push(detail);
    }
}
