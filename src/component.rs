use std::sync::Arc;

use crossterm::event::Event;
use log::warn;
use ratatui::Frame;

use crate::{
    model::{comment::Comment, post::Post},
    reddit_api::RedditApi,
    snoobrowse_error::SnoobrowseError,
    state::{AppState, Store},
};

#[cfg(debug_assertions)]
pub mod debug;

pub mod postdetail;
pub mod postlist;
pub mod sublist;

pub trait Component {
    async fn handle_event(&mut self, event: &Event) -> Result<(), SnoobrowseError> {
        let _ = event;
        Ok(())
    }

    fn draw(&mut self, frame: &mut Frame) {
        let _ = frame;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VoteTarget {
    Post,
    Comment,
}

/// An upvote toggle on one post or comment.
#[derive(Debug, Clone)]
pub struct Vote {
    target: VoteTarget,
    id: String,
    fullname: String,
    is_upvoted: bool,
}

impl Vote {
    pub fn post(post: &Post) -> Self {
        Self {
            target: VoteTarget::Post,
            id: post.id.clone(),
            fullname: post.fullname(),
            is_upvoted: post.is_upvoted,
        }
    }

    pub fn comment(comment: &Comment) -> Self {
        Self {
            target: VoteTarget::Comment,
            id: comment.id.clone(),
            fullname: comment.fullname(),
            is_upvoted: comment.is_upvoted,
        }
    }

    /// Sends the vote and patches the store once reddit accepts it.
    pub fn spawn(self, reddit_api: Arc<RedditApi>, store: Store<AppState>) {
        let (dir, delta, now_upvoted) = if self.is_upvoted { (0, -1, false) } else { (1, 1, true) };
        tokio::spawn(async move {
            match reddit_api.vote(&self.fullname, dir).await {
                Ok(()) => store.update(|state| match self.target {
                    VoteTarget::Post => state.apply_post_vote(&self.id, delta, now_upvoted),
                    VoteTarget::Comment => state.apply_comment_vote(&self.id, delta, now_upvoted),
                }),
                Err(e) => warn!("Vote on {} failed: {}", self.fullname, e),
            }
        });
    }
}
