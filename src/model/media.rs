use std::sync::LazyLock;

use regex::Regex;

use crate::reddit_api::RedditVideo;

const IMAGE_EXTENSIONS: [&str; 4] = [".png", ".jpg", ".jpeg", ".gif"];
const REDDIT_VIDEO_HOST: &str = "v.redd.it";

// The rewrite keeps only the scheme and host before the new extension, so
// `http://i.imgur.com/x.jpg` becomes `http://i.imgur.com.jpeg`. Existing links
// depend on this exact output.
static IMGUR_JPG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://(?:[im]\.)?imgur\.com)/.+\.jpg$").expect("valid imgur jpg pattern")
});
static IMGUR_GIFV: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:[im]\.)?imgur\.com/.+\.gifv$").expect("valid imgur gifv pattern")
});
static YOUTUBE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:(?:www|m)\.)?(?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/)([A-Za-z0-9_-]{11})")
        .expect("valid youtube pattern")
});
static STREAMABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?streamable\.com/([A-Za-z0-9]+)/?$").expect("valid streamable pattern")
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoSource {
    pub fallback_url: String,
    pub hls_url: Option<String>,
    pub dash_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration: Option<u32>,
    pub is_gif: bool,
}

impl VideoSource {
    pub fn from_url(url: String) -> Self {
        Self {
            fallback_url: url,
            ..Self::default()
        }
    }

    /// Reddit-hosted video, only usable when it carries a fallback url.
    pub fn from_reddit_video(video: &RedditVideo) -> Option<Self> {
        let fallback_url = video.fallback_url.clone()?;
        Some(Self {
            fallback_url,
            hls_url: video.hls_url.clone(),
            dash_url: video.dash_url.clone(),
            width: video.width,
            height: video.height,
            duration: video.duration,
            is_gif: video.is_gif,
        })
    }
}

/// What a bare link points at, judged from the url alone.
#[derive(Debug, Clone, PartialEq)]
pub enum UrlMedia {
    Image(String),
    Video(VideoSource),
}

pub fn classify_url(url: &str) -> Option<UrlMedia> {
    if let Some(caps) = IMGUR_JPG.captures(url) {
        return Some(UrlMedia::Image(format!("{}.jpeg", &caps[1])));
    }
    if IMAGE_EXTENSIONS.iter().any(|ext| url.ends_with(ext)) {
        return Some(UrlMedia::Image(url.to_string()));
    }
    if IMGUR_GIFV.is_match(url) {
        let stem = &url[..url.len() - ".gifv".len()];
        return Some(UrlMedia::Video(VideoSource::from_url(format!("{stem}.mp4"))));
    }
    if is_reddit_video_link(url) {
        return Some(UrlMedia::Video(VideoSource::from_url(url.to_string())));
    }
    None
}

fn is_reddit_video_link(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    host == REDDIT_VIDEO_HOST
}

/// Turns a source url into embeddable HTML, or `None` if it cannot be embedded.
pub trait EmbedHtml {
    fn embed_html(&self, url: &str) -> Option<String>;
}

impl<F> EmbedHtml for F
where
    F: Fn(&str) -> Option<String>,
{
    fn embed_html(&self, url: &str) -> Option<String> {
        self(url)
    }
}

/// Iframe players for the hosts that allow embedding.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbedProviders;

impl EmbedHtml for EmbedProviders {
    fn embed_html(&self, url: &str) -> Option<String> {
        let src = if let Some(caps) = YOUTUBE.captures(url) {
            format!("https://www.youtube-nocookie.com/embed/{}", &caps[1])
        } else if let Some(caps) = STREAMABLE.captures(url) {
            format!("https://streamable.com/e/{}", &caps[1])
        } else {
            return None;
        };
        Some(format!(
            r#"<iframe src="{src}" width="100%" height="100%" frameborder="0" allowfullscreen></iframe>"#
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(url: &str) -> Option<String> {
        match classify_url(url) {
            Some(UrlMedia::Image(src)) => Some(src),
            _ => None,
        }
    }

    fn video(url: &str) -> Option<String> {
        match classify_url(url) {
            Some(UrlMedia::Video(src)) => Some(src.fallback_url),
            _ => None,
        }
    }

    #[test]
    fn test_plain_image_extensions() {
        for url in [
            "https://i.redd.it/abc.png",
            "https://i.redd.it/abc.jpg",
            "https://example.com/pic.jpeg",
            "https://example.com/anim.gif",
        ] {
            assert_eq!(image(url).as_deref(), Some(url));
        }
    }

    #[test]
    fn test_imgur_jpg_literal_rewrite() {
        assert_eq!(image("http://i.imgur.com/x.jpg").as_deref(), Some("http://i.imgur.com.jpeg"));
        let rewritten = image("https://imgur.com/a/b/cdef.jpg").unwrap();
        assert!(rewritten.starts_with("https://imgur.com"));
        assert!(rewritten.ends_with(".jpeg"));
    }

    #[test]
    fn test_imgur_png_untouched() {
        assert_eq!(image("https://i.imgur.com/x.png").as_deref(), Some("https://i.imgur.com/x.png"));
    }

    #[test]
    fn test_imgur_gifv_becomes_mp4() {
        assert_eq!(video("https://i.imgur.com/clip.gifv").as_deref(), Some("https://i.imgur.com/clip.mp4"));
        assert!(image("https://i.imgur.com/clip.gifv").is_none());
    }

    #[test]
    fn test_reddit_video_passthrough() {
        assert_eq!(video("https://v.redd.it/abc123").as_deref(), Some("https://v.redd.it/abc123"));
        assert!(classify_url("https://example.com/v.redd.it").is_none());
    }

    #[test]
    fn test_unrecognized_link() {
        assert!(classify_url("https://github.com/rust-lang/rust").is_none());
        assert!(classify_url("https://i.redd.it/abc.jpg?width=640").is_none());
    }

    #[test]
    fn test_embed_providers() {
        let html = EmbedProviders.embed_html("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
        assert!(html.contains("youtube-nocookie.com/embed/dQw4w9WgXcQ"));
        let html = EmbedProviders.embed_html("https://youtu.be/dQw4w9WgXcQ").unwrap();
        assert!(html.contains("dQw4w9WgXcQ"));
        let html = EmbedProviders.embed_html("https://streamable.com/moo42").unwrap();
        assert!(html.contains("streamable.com/e/moo42"));
        assert!(EmbedProviders.embed_html("https://i.redd.it/a.png").is_none());
    }

    #[test]
    fn test_closure_embed() {
        let embed = |url: &str| url.contains("vimeo").then(|| format!("<iframe src=\"{url}\"></iframe>"));
        assert!(embed.embed_html("https://vimeo.com/1").is_some());
        assert!(embed.embed_html("https://example.com").is_none());
    }
}
