use std::slice;

use chrono::{DateTime, Utc};

use crate::{
    model::datetime_from_secs,
    reddit_api::{Listing, RawComment},
};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    /// Empty for deleted or removed comments.
    pub author: String,
    pub body: String,
    pub body_html: String,
    pub created_utc: f64,
    pub upvotes: i64,
    pub is_upvoted: bool,
    pub replies: Vec<Comment>,
}

impl Comment {
    pub fn fullname(&self) -> String {
        format!("t1_{}", self.id)
    }

    pub fn is_deleted(&self) -> bool {
        self.author.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        datetime_from_secs(self.created_utc)
    }

    /// Pre-order walk of this comment tree as (depth, comment).
    pub fn flatten(&self) -> Vec<(usize, &Comment)> {
        let mut out = Vec::new();
        let mut stack = vec![(0, self)];
        while let Some((depth, comment)) = stack.pop() {
            out.push((depth, comment));
            stack.extend(comment.replies.iter().rev().map(|reply| (depth + 1, reply)));
        }
        out
    }
}

struct Frame<'a> {
    raw: &'a RawComment,
    pending: slice::Iter<'a, RawComment>,
    replies: Vec<Comment>,
}

impl<'a> Frame<'a> {
    fn new(raw: &'a RawComment) -> Self {
        let pending = raw
            .data
            .replies
            .as_deref()
            .map(|listing| listing.data.children.as_slice())
            .unwrap_or_default()
            .iter();
        Self {
            raw,
            pending,
            replies: Vec::new(),
        }
    }

    fn finish(self) -> Comment {
        let data = &self.raw.data;
        Comment {
            id: data.id.clone(),
            author: data.author.clone(),
            body: data.body.clone(),
            body_html: data.body_html.clone(),
            created_utc: data.created_utc,
            upvotes: data.score,
            is_upvoted: data.likes == Some(true),
            replies: self.replies,
        }
    }
}

/// Convert a raw comment and all of its nested replies. Uses an explicit stack
/// so reply depth is bounded by memory, not by the call stack.
pub fn convert_comment(raw: &RawComment) -> Comment {
    let mut stack = vec![Frame::new(raw)];
    while let Some(mut frame) = stack.pop() {
        if let Some(child) = frame.pending.find(|c| c.is_comment()) {
            stack.push(frame);
            stack.push(Frame::new(child));
            continue;
        }
        let comment = frame.finish();
        match stack.last_mut() {
            Some(parent) => parent.replies.push(comment),
            None => return comment,
        }
    }
    unreachable!("the root frame returns before the stack empties")
}

/// Top-level comments of a thread, skipping `more` stubs.
pub fn convert_listing(listing: &Listing<RawComment>) -> Vec<Comment> {
    listing
        .data
        .children
        .iter()
        .filter(|c| c.is_comment())
        .map(convert_comment)
        .collect()
}

/// Copy of `tree` with the vote applied to the comment `id`, wherever it nests.
pub fn patch_comment_vote(tree: &[Comment], id: &str, delta: i64, now_upvoted: bool) -> Vec<Comment> {
    let mut out = tree.to_vec();
    let mut stack: Vec<&mut Comment> = out.iter_mut().collect();
    while let Some(comment) = stack.pop() {
        if comment.id == id {
            comment.upvotes += delta;
            comment.is_upvoted = now_upvoted;
            break;
        }
        stack.extend(comment.replies.iter_mut());
    }
    out
}
