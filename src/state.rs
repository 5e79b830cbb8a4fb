use std::sync::Arc;

use log::debug;
use tokio::sync::watch;

use crate::{
    model::{
        comment::{Comment, patch_comment_vote},
        post::{Post, patch_post_vote},
    },
    reddit_api::Feed,
};

/// Shared application state. Every [`Store::update`] notifies subscribers.
pub struct Store<S> {
    tx: Arc<watch::Sender<S>>,
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S> Store<S> {
    pub fn new(initial: S) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn update(&self, f: impl FnOnce(&mut S)) {
        self.tx.send_modify(f);
    }

    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.tx.subscribe()
    }
}

#[derive(Debug, Default, Clone)]
pub struct AppState {
    pub feed: Option<Feed>,
    pub posts: Vec<Post>,
    pub posts_loading: bool,
    pub post: Option<Post>,
    pub comments: Vec<Comment>,
    pub comments_loading: bool,
}

impl AppState {
    /// Starts loading `feed`. Returns false if it is already shown or loading.
    pub fn begin_feed(&mut self, feed: &Feed) -> bool {
        if self.feed.as_ref() == Some(feed) && (self.posts_loading || !self.posts.is_empty()) {
            return false;
        }
        self.feed = Some(feed.clone());
        self.posts.clear();
        self.posts_loading = true;
        true
    }

    /// Results for a feed the user already left are dropped.
    pub fn commit_posts(&mut self, feed: &Feed, posts: Vec<Post>) -> bool {
        if self.feed.as_ref() != Some(feed) {
            debug!("Discarding stale posts for {}", feed);
            return false;
        }
        self.posts = posts;
        self.posts_loading = false;
        true
    }

    pub fn begin_post(&mut self, post: Post) -> bool {
        if self.post.as_ref().is_some_and(|p| p.id == post.id) {
            return false;
        }
        self.post = Some(post);
        self.comments.clear();
        self.comments_loading = true;
        true
    }

    pub fn commit_comments(&mut self, post_id: &str, post: Option<Post>, comments: Vec<Comment>) -> bool {
        if self.post.as_ref().is_none_or(|p| p.id != post_id) {
            debug!("Discarding stale comments for {}", post_id);
            return false;
        }
        if let Some(post) = post {
            self.post = Some(post);
        }
        self.comments = comments;
        self.comments_loading = false;
        true
    }

    pub fn close_post(&mut self) {
        self.post = None;
        self.comments.clear();
        self.comments_loading = false;
    }

    pub fn apply_post_vote(&mut self, id: &str, delta: i64, now_upvoted: bool) {
        self.posts = patch_post_vote(&self.posts, id, delta, now_upvoted);
        if let Some(post) = self.post.take() {
            self.post = patch_post_vote(&[post], id, delta, now_upvoted).pop();
        }
    }

    pub fn apply_comment_vote(&mut self, id: &str, delta: i64, now_upvoted: bool) {
        self.comments = patch_comment_vote(&self.comments, id, delta, now_upvoted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, upvotes: i64) -> Post {
        Post {
            id: id.to_string(),
            upvotes,
            ..Post::default()
        }
    }

    #[tokio::test]
    async fn test_update_notifies_subscribers() {
        let store = Store::new(AppState::default());
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store.clone().update(|s| s.posts_loading = true);
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().posts_loading);
        assert!(store.read(|s| s.posts_loading));

        let handle = tokio::spawn(async move {
            rx.changed().await.unwrap();
            rx.borrow().posts.len()
        });
        store.update(|s| s.posts = vec![post("a", 1)]);
        assert_eq!(handle.await.unwrap(), 1);
    }

    #[test]
    fn test_stale_posts_are_dropped() {
        let rust = Feed::Subreddit("rust".into());
        let go = Feed::Subreddit("golang".into());
        let mut state = AppState::default();

        assert!(state.begin_feed(&rust));
        assert!(!state.begin_feed(&rust));
        assert!(state.begin_feed(&go));
        assert!(!state.commit_posts(&rust, vec![post("r", 0)]));
        assert!(state.posts_loading);
        assert!(state.commit_posts(&go, vec![post("g", 0)]));
        assert_eq!(state.posts[0].id, "g");
        assert!(!state.posts_loading);
    }

    #[test]
    fn test_stale_comments_are_dropped() {
        let mut state = AppState::default();
        assert!(state.begin_post(post("a", 0)));
        assert!(!state.begin_post(post("a", 0)));
        assert!(!state.commit_comments("b", None, vec![Comment::default()]));
        assert!(state.commit_comments("a", Some(post("a", 9)), vec![Comment::default()]));
        assert_eq!(state.comments.len(), 1);
        assert_eq!(state.post.as_ref().unwrap().upvotes, 9);

        state.close_post();
        assert!(state.post.is_none());
        assert!(state.comments.is_empty());
    }

    #[test]
    fn test_vote_patches_list_and_open_post() {
        let mut state = AppState {
            posts: vec![post("a", 1), post("b", 2)],
            post: Some(post("b", 2)),
            ..AppState::default()
        };
        state.apply_post_vote("b", 1, true);
        assert_eq!(state.posts[1].upvotes, 3);
        assert_eq!(state.post.as_ref().unwrap().upvotes, 3);
        assert!(state.post.as_ref().unwrap().is_upvoted);
        assert_eq!(state.posts[0].upvotes, 1);
    }
}
