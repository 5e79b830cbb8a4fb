use log::{debug, warn};

use crate::{
    model::media::{EmbedHtml, UrlMedia, VideoSource, classify_url},
    reddit_api::{Listing, MediaMetadata, PostData, Preview, RawPost},
};

const REDDIT_BASE: &str = "https://www.reddit.com";

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub subreddit: String,
    pub permalink: String,
    pub created: f64,
    pub author: String,
    pub num_comments: u64,
    pub upvotes: i64,
    pub is_upvoted: bool,
    pub self_text: Option<String>,
    pub self_text_html: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub iframe: Option<String>,
    pub image_list: Vec<String>,
    pub image_source: Option<String>,
    pub video_source: Option<VideoSource>,
    /// The original link target, kept whether or not any media was recognized.
    pub fallback_source: Option<String>,
    pub thumbnail: Option<String>,
}

/// The one media representation the UI should lead with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimaryMedia<'a> {
    Iframe(&'a str),
    Gallery(&'a [String]),
    Video(&'a VideoSource),
    Image(&'a str),
    Link(&'a str),
    None,
}

impl Post {
    pub fn fullname(&self) -> String {
        format!("t3_{}", self.id)
    }

    pub fn primary_media(&self) -> PrimaryMedia<'_> {
        if let Some(iframe) = &self.iframe {
            PrimaryMedia::Iframe(iframe)
        } else if !self.image_list.is_empty() {
            PrimaryMedia::Gallery(&self.image_list)
        } else if let Some(video) = &self.video_source {
            PrimaryMedia::Video(video)
        } else if let Some(image) = &self.image_source {
            PrimaryMedia::Image(image)
        } else if let Some(link) = &self.fallback_source {
            PrimaryMedia::Link(link)
        } else {
            PrimaryMedia::None
        }
    }

    /// Url opened by the link-out action.
    pub fn open_target(&self) -> String {
        if let Some(video) = &self.video_source {
            video.fallback_url.clone()
        } else if let Some(link) = &self.fallback_source {
            link.clone()
        } else {
            format!("{}{}", REDDIT_BASE, self.permalink)
        }
    }
}

#[derive(Debug, Default)]
struct Media {
    image_list: Vec<String>,
    image_source: Option<String>,
    video_source: Option<VideoSource>,
}

/// Map one raw listing entry to a [`Post`]. Only a record without an id is
/// rejected; every other gap leaves the matching field unset.
pub fn normalize_post(raw: &RawPost, embed: Option<&dyn EmbedHtml>) -> Option<Post> {
    let data = &raw.data;
    if data.id.is_empty() {
        debug!("Dropping post without id: {:?}", data.title);
        return None;
    }

    let (width, height) = preview_dimensions(&data.id, data.preview.as_ref());
    let media = classify_media(data);
    let fallback_source = data.url_overridden_by_dest.clone();
    let iframe = match (embed, fallback_source.as_deref()) {
        (Some(embed), Some(url)) => embed.embed_html(url),
        _ => None,
    };

    Some(Post {
        id: data.id.clone(),
        title: data.title.clone(),
        subreddit: data.subreddit.clone(),
        permalink: data.permalink.clone(),
        created: data.created,
        author: data.author.clone(),
        num_comments: data.num_comments,
        upvotes: data.score,
        is_upvoted: data.likes == Some(true),
        self_text: non_empty(data.selftext.as_deref()),
        self_text_html: non_empty(data.selftext_html.as_deref()),
        width,
        height,
        iframe,
        image_list: media.image_list,
        image_source: media.image_source,
        video_source: media.video_source,
        fallback_source,
        thumbnail: data
            .thumbnail
            .as_deref()
            .filter(|t| t.starts_with("http"))
            .map(str::to_string),
    })
}

/// Normalize a whole listing, newest first.
pub fn normalize_listing(listing: &Listing<RawPost>, embed: Option<&dyn EmbedHtml>) -> Vec<Post> {
    let mut posts: Vec<Post> = listing
        .data
        .children
        .iter()
        .filter_map(|raw| normalize_post(raw, embed))
        .collect();
    sort_by_created_desc(&mut posts);
    posts
}

/// Stable, so posts with equal timestamps keep their listing order.
pub fn sort_by_created_desc(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.created.total_cmp(&a.created));
}

/// Copy of `posts` with the vote applied to the post `id`.
pub fn patch_post_vote(posts: &[Post], id: &str, delta: i64, now_upvoted: bool) -> Vec<Post> {
    posts
        .iter()
        .map(|post| {
            if post.id == id {
                Post {
                    upvotes: post.upvotes + delta,
                    is_upvoted: now_upvoted,
                    ..post.clone()
                }
            } else {
                post.clone()
            }
        })
        .collect()
}

// First match wins: gallery, then hosted video, then the link itself.
fn classify_media(data: &PostData) -> Media {
    if let Some(metadata) = &data.media_metadata {
        return gallery_media(&data.id, metadata);
    }

    if let Some(video) = data
        .secure_media
        .as_ref()
        .and_then(|m| m.reddit_video.as_ref())
        .and_then(VideoSource::from_reddit_video)
    {
        return Media {
            video_source: Some(video),
            ..Media::default()
        };
    }

    match data.url_overridden_by_dest.as_deref().and_then(classify_url) {
        Some(UrlMedia::Image(src)) => Media {
            image_source: Some(src),
            ..Media::default()
        },
        Some(UrlMedia::Video(src)) => Media {
            video_source: Some(src),
            ..Media::default()
        },
        None => Media::default(),
    }
}

// Key order of the metadata map is the only ordering hint the payload gives.
fn gallery_media(id: &str, metadata: &MediaMetadata) -> Media {
    let urls: Option<Vec<String>> = metadata
        .0
        .iter()
        .map(|(_, item)| {
            item.as_ref()
                .and_then(|item| item.s.as_ref())
                .and_then(|s| s.u.as_deref())
                .map(|u| u.replace("&amp;", "&"))
        })
        .collect();

    match urls {
        Some(urls) => Media {
            image_source: urls.first().cloned(),
            image_list: urls,
            video_source: None,
        },
        None => {
            warn!("Post {}: unreadable gallery entry, skipping gallery", id);
            Media::default()
        }
    }
}

fn preview_dimensions(id: &str, preview: Option<&Preview>) -> (Option<u32>, Option<u32>) {
    let Some(preview) = preview else {
        return (None, None);
    };
    let source = preview.images.first().and_then(|image| image.source.as_ref());
    match source.map(|source| (source.width, source.height)) {
        Some((Some(width), Some(height))) => (Some(width), Some(height)),
        _ => {
            warn!("Post {}: preview without readable source size", id);
            (None, None)
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}
