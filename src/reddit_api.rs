use std::fmt;

use log::{debug, warn};
use reqwest::{Client, header::HeaderMap};
use serde::{
    Deserialize, Deserializer,
    de::{DeserializeOwned, MapAccess, Visitor},
};
use serde_json::Value;

use crate::snoobrowse_error::SnoobrowseError;

const WWW_BASE: &str = "https://www.reddit.com";
const OAUTH_BASE: &str = "https://oauth.reddit.com";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.6 Safari/605.1.15";

/// Where a post listing comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    Subreddit(String),
    User(String),
}

impl Feed {
    /// Accepts `r/name`, `/r/name`, `u/name`, `user/name` or a bare subreddit name.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().trim_start_matches('/').trim_end_matches('/');
        let (kind, name) = match value.split_once('/') {
            Some((kind, name)) => (kind, name),
            None => ("r", value),
        };
        if name.is_empty() || name.contains('/') {
            return None;
        }
        match kind {
            "r" => Some(Feed::Subreddit(name.to_string())),
            "u" | "user" => Some(Feed::User(name.to_string())),
            _ => None,
        }
    }

    fn listing_path(&self, sort: &str) -> String {
        match self {
            Feed::Subreddit(name) => format!("r/{}/{}.json", name, sort),
            Feed::User(name) => format!("user/{}/submitted.json", name),
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feed::Subreddit(name) => write!(f, "r/{name}"),
            Feed::User(name) => write!(f, "u/{name}"),
        }
    }
}

/// Snapshot of the `x-ratelimit-*` response headers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimit {
    pub used: f64,
    pub remaining: f64,
    pub reset_secs: f64,
}

impl RateLimit {
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let read = |name: &str| -> Option<f64> {
            headers.get(name)?.to_str().ok()?.trim().parse().ok()
        };
        Some(Self {
            used: read("x-ratelimit-used")?,
            remaining: read("x-ratelimit-remaining")?,
            reset_secs: read("x-ratelimit-reset")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RedditApi {
    pub client: Client,
    access_token: Option<String>,
}

impl RedditApi {
    pub fn new(user_agent: Option<&str>, access_token: Option<String>) -> Result<Self, SnoobrowseError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
            .build()?;

        Ok(Self {
            client,
            access_token,
        })
    }

    pub async fn get_posts(&self, feed: &Feed, sort: &str) -> Result<Listing<RawPost>, SnoobrowseError> {
        let url = format!("{}/{}", WWW_BASE, feed.listing_path(sort));
        let res = self
            .client
            .get(url)
            .query(&[("raw_json", "1")])
            .send()
            .await?
            .error_for_status()?;
        log_rate_limit(res.headers());
        Ok(res.json().await?)
    }

    /// The comments endpoint answers with `[post listing, comment listing]`.
    pub async fn get_post_comments(
        &self,
        sub: &str,
        post_id: &str,
    ) -> Result<(Option<RawPost>, Listing<RawComment>), SnoobrowseError> {
        let res = self
            .client
            .get(format!("{}/r/{}/comments/{}.json", WWW_BASE, sub, post_id))
            .query(&[("raw_json", "1")])
            .send()
            .await?
            .error_for_status()?;
        log_rate_limit(res.headers());
        let (post, comments): (Listing<RawPost>, Listing<RawComment>) = res.json().await?;
        Ok((post.data.children.into_iter().next(), comments))
    }

    /// `dir` is 1 (upvote), 0 (clear) or -1 (downvote). `fullname` is the
    /// prefixed thing id, e.g. `t3_abc` or `t1_def`.
    pub async fn vote(&self, fullname: &str, dir: i8) -> Result<(), SnoobrowseError> {
        let token = self
            .access_token
            .as_deref()
            .ok_or_else(|| SnoobrowseError::Auth("no access_token configured".to_string()))?;
        let dir = dir.to_string();
        let res = self
            .client
            .post(format!("{}/api/vote", OAUTH_BASE))
            .bearer_auth(token)
            .form(&[("id", fullname), ("dir", dir.as_str())])
            .send()
            .await?
            .error_for_status()?;
        log_rate_limit(res.headers());
        debug!("Voted {} on {}", dir, fullname);
        Ok(())
    }

    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, SnoobrowseError> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}

fn log_rate_limit(headers: &HeaderMap) {
    if let Some(limit) = RateLimit::from_headers(headers) {
        debug!(
            "Rate limit: used={} remaining={} reset={}s",
            limit.used, limit.remaining, limit.reset_secs
        );
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct Listing<T> {
    #[serde(default)]
    pub kind: Option<String>,
    pub data: ListingData<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
pub struct ListingData<T> {
    #[serde(deserialize_with = "deserialize_children")]
    pub children: Vec<T>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
}

/// One malformed child must not sink the whole listing.
fn deserialize_children<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let values: Vec<Value> = Deserialize::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(child) => Some(child),
            Err(e) => {
                warn!("Skipping listing child {}: {}", index, e);
                None
            }
        })
        .collect())
}

/// `null` or a value of the wrong shape reads as the default, so one bad field
/// does not cost the whole record.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(value).unwrap_or_else(|e| {
        warn!("Ignoring malformed field: {}", e);
        T::default()
    }))
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPost {
    #[serde(default)]
    pub kind: Option<String>,
    pub data: PostData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PostData {
    #[serde(deserialize_with = "lenient")]
    pub id: String,
    #[serde(deserialize_with = "lenient")]
    pub name: String,
    #[serde(deserialize_with = "lenient")]
    pub author: String,
    #[serde(deserialize_with = "lenient")]
    pub subreddit: String,
    #[serde(deserialize_with = "lenient")]
    pub permalink: String,
    #[serde(deserialize_with = "lenient")]
    pub created: f64,
    #[serde(deserialize_with = "lenient")]
    pub created_utc: f64,
    #[serde(deserialize_with = "lenient")]
    pub title: String,
    #[serde(deserialize_with = "lenient")]
    pub url_overridden_by_dest: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub preview: Option<Preview>,
    #[serde(deserialize_with = "lenient")]
    pub secure_media: Option<SecureMedia>,
    #[serde(deserialize_with = "lenient")]
    pub media_metadata: Option<MediaMetadata>,
    #[serde(deserialize_with = "lenient")]
    pub thumbnail: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub num_comments: u64,
    #[serde(deserialize_with = "lenient")]
    pub score: i64,
    #[serde(deserialize_with = "lenient")]
    pub likes: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub selftext: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub selftext_html: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Preview {
    #[serde(default, deserialize_with = "lenient")]
    pub images: Vec<PreviewImage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreviewImage {
    #[serde(default, deserialize_with = "lenient")]
    pub source: Option<ImageSize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImageSize {
    #[serde(deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub width: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecureMedia {
    #[serde(default, deserialize_with = "lenient")]
    pub reddit_video: Option<RedditVideo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RedditVideo {
    #[serde(deserialize_with = "lenient")]
    pub fallback_url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub hls_url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub dash_url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub width: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub height: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub duration: Option<u32>,
    #[serde(deserialize_with = "lenient")]
    pub is_gif: bool,
}

/// Gallery metadata in the order the keys appear in the payload. An entry that
/// does not have the expected shape is kept as `None`.
#[derive(Debug, Clone, Default)]
pub struct MediaMetadata(pub Vec<(String, Option<MediaItem>)>);

impl<'de> Deserialize<'de> for MediaMetadata {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedEntries;

        impl<'de> Visitor<'de> for OrderedEntries {
            type Value = MediaMetadata;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of media id to media item")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, Value>()? {
                    entries.push((key, serde_json::from_value(value).ok()));
                }
                Ok(MediaMetadata(entries))
            }
        }

        deserializer.deserialize_map(OrderedEntries)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MediaItem {
    pub id: Option<String>,
    pub status: Option<String>,
    /// "Image" or "AnimatedImage"
    pub e: Option<String>,
    /// MIME type
    pub m: Option<String>,
    pub s: Option<MediaSource>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MediaSource {
    pub u: Option<String>,
    pub gif: Option<String>,
    pub mp4: Option<String>,
    pub x: Option<u32>,
    pub y: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawComment {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: CommentData,
}

impl RawComment {
    /// `more` stubs only carry ids of unloaded replies.
    pub fn is_comment(&self) -> bool {
        self.kind.as_deref() != Some("more")
    }
}

fn deserialize_replies<'de, D>(deserializer: D) -> Result<Option<Box<Listing<RawComment>>>, D::Error>
where
    D: Deserializer<'de>,
{
    let val: Value = Deserialize::deserialize(deserializer)?;
    if val.is_object() {
        // replies == { kind: "Listing", data: ... }
        match serde_json::from_value(val) {
            Ok(replies) => Ok(Some(replies)),
            Err(e) => {
                warn!("Dropping unreadable replies: {}", e);
                Ok(None)
            }
        }
    } else {
        // replies == "" or null
        Ok(None)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentData {
    #[serde(deserialize_with = "lenient")]
    pub id: String,
    #[serde(deserialize_with = "lenient")]
    pub author: String,
    #[serde(deserialize_with = "lenient")]
    pub body: String,
    #[serde(deserialize_with = "lenient")]
    pub body_html: String,
    #[serde(deserialize_with = "lenient")]
    pub created_utc: f64,
    #[serde(deserialize_with = "lenient")]
    pub score: i64,
    #[serde(deserialize_with = "lenient")]
    pub likes: Option<bool>,
    #[serde(deserialize_with = "deserialize_replies")]
    pub replies: Option<Box<Listing<RawComment>>>,
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_feed_parse() {
        assert_eq!(Feed::parse("rust"), Some(Feed::Subreddit("rust".into())));
        assert_eq!(Feed::parse("/r/rust/"), Some(Feed::Subreddit("rust".into())));
        assert_eq!(Feed::parse("u/spez"), Some(Feed::User("spez".into())));
        assert_eq!(Feed::parse("user/spez"), Some(Feed::User("spez".into())));
        assert_eq!(Feed::parse(""), None);
        assert_eq!(Feed::parse("x/rust"), None);
        assert_eq!(Feed::User("spez".into()).to_string(), "u/spez");
    }

    #[test]
    fn test_feed_listing_path() {
        assert_eq!(Feed::Subreddit("rust".into()).listing_path("best"), "r/rust/best.json");
        assert_eq!(Feed::User("spez".into()).listing_path("best"), "user/spez/submitted.json");
    }

    #[test]
    fn test_rate_limit_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-used", HeaderValue::from_static("12"));
        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("88.0"));
        headers.insert("x-ratelimit-reset", HeaderValue::from_static("340"));
        let limit = RateLimit::from_headers(&headers).unwrap();
        assert_eq!(limit.used, 12.0);
        assert_eq!(limit.remaining, 88.0);
        assert_eq!(limit.reset_secs, 340.0);

        headers.remove("x-ratelimit-reset");
        assert!(RateLimit::from_headers(&headers).is_none());
    }

    #[test]
    fn test_listing_skips_malformed_child() {
        let listing: Listing<RawPost> = serde_json::from_value(json!({
            "kind": "Listing",
            "data": {
                "after": "t3_zzz",
                "children": [
                    {"kind": "t3", "data": {"id": "a", "title": "ok"}},
                    {"kind": "t3", "data": "not an object"},
                    {"kind": "t3"}
                ]
            }
        }))
        .unwrap();
        assert_eq!(listing.data.children.len(), 1);
        assert_eq!(listing.data.children[0].data.id, "a");
        assert_eq!(listing.data.after.as_deref(), Some("t3_zzz"));
    }

    #[test]
    fn test_listing_without_data_is_error() {
        let res: Result<Listing<RawPost>, _> = serde_json::from_value(json!({"kind": "Listing"}));
        assert!(res.is_err());
    }

    #[test]
    fn test_media_metadata_keeps_key_order() {
        let post: PostData = serde_json::from_value(json!({
            "id": "g",
            "media_metadata": {
                "zzz": {"status": "valid", "e": "Image", "s": {"u": "https://i.redd.it/zzz.jpg"}},
                "aaa": "not an object",
                "mmm": {"status": "valid", "e": "Image", "s": {"u": "https://i.redd.it/mmm.jpg"}}
            }
        }))
        .unwrap();
        let entries = post.media_metadata.unwrap().0;
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["zzz", "aaa", "mmm"]);
        assert!(entries[0].1.is_some());
        assert!(entries[1].1.is_none());
    }

    #[test]
    fn test_null_media_metadata() {
        let post: PostData = serde_json::from_value(json!({"id": "p", "media_metadata": null})).unwrap();
        assert!(post.media_metadata.is_none());
    }

    #[test]
    fn test_replies_shapes() {
        let comment: RawComment = serde_json::from_value(json!({
            "kind": "t1",
            "data": {"id": "a", "replies": ""}
        }))
        .unwrap();
        assert!(comment.data.replies.is_none());

        let comment: RawComment = serde_json::from_value(json!({
            "data": {"id": "a", "replies": null}
        }))
        .unwrap();
        assert!(comment.data.replies.is_none());

        let comment: RawComment = serde_json::from_value(json!({
            "data": {"id": "a", "replies": {"data": {"children": [
                {"kind": "t1", "data": {"id": "b"}},
                {"kind": "more", "data": {"count": 3, "children": ["c", "d"]}}
            ]}}}
        }))
        .unwrap();
        let children = &comment.data.replies.unwrap().data.children;
        assert_eq!(children.len(), 2);
        assert!(children[0].is_comment());
        assert!(!children[1].is_comment());
    }

    #[test]
    fn test_null_and_mistyped_fields_read_as_default() {
        let post: PostData = serde_json::from_value(json!({
            "id": "p",
            "author": null,
            "title": 42,
            "num_comments": -1,
            "preview": {"images": [{"source": {"url": "https://x", "width": "640", "height": 480}}]},
            "media_metadata": "none"
        }))
        .unwrap();
        assert_eq!(post.id, "p");
        assert_eq!(post.author, "");
        assert_eq!(post.title, "");
        assert_eq!(post.num_comments, 0);
        let source = post.preview.unwrap().images[0].source.clone().unwrap();
        assert_eq!((source.width, source.height), (None, Some(480)));
        assert!(post.media_metadata.is_none());

        let comment: CommentData = serde_json::from_value(json!({
            "id": "c",
            "author": null,
            "body": null,
            "body_html": null,
            "score": "hidden",
            "replies": {"data": "broken"}
        }))
        .unwrap();
        assert_eq!(comment.author, "");
        assert_eq!(comment.body, "");
        assert_eq!(comment.score, 0);
        assert!(comment.replies.is_none());
    }

    #[test]
    fn test_comment_endpoint_pair() {
        let (post, comments): (Listing<RawPost>, Listing<RawComment>) = serde_json::from_value(json!([
            {"kind": "Listing", "data": {"children": [{"kind": "t3", "data": {"id": "p1"}}]}},
            {"kind": "Listing", "data": {"children": [{"kind": "t1", "data": {"id": "c1", "author": "x"}}]}}
        ]))
        .unwrap();
        assert_eq!(post.data.children[0].data.id, "p1");
        assert_eq!(comments.data.children[0].data.author, "x");
    }
}
