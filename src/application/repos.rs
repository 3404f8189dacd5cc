//! Repository trait describing the comment store collaborator.
//!
//! The store is authoritative: results come back already filtered and
//! ordered, and this layer performs no sorting of its own.

use async_trait::async_trait;
use thiserror::Error;
use time::{Duration, OffsetDateTime};

use crate::domain::comments::{Comment, CommentUser, Locator};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("comment not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("store timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Ordering applied by the store before returning post comments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first.
    #[default]
    TimeAsc,
    /// Newest first.
    TimeDesc,
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// All comments under a post, in the requested order.
    async fn find(
        &self,
        locator: &Locator,
        sort: SortOrder,
        user: &CommentUser,
    ) -> Result<Vec<Comment>, RepoError>;

    /// Latest comments across a site, newest first. `since` bounds the range;
    /// the Unix epoch means unbounded.
    async fn last(
        &self,
        site_id: &str,
        limit: usize,
        since: OffsetDateTime,
        user: &CommentUser,
    ) -> Result<Vec<Comment>, RepoError>;

    /// Single comment lookup, used for parent resolution.
    async fn get(
        &self,
        locator: &Locator,
        comment_id: &str,
        user: &CommentUser,
    ) -> Result<Comment, RepoError>;

    /// Replies to a user's comments within `max_age`, newest first, together
    /// with that user's display name.
    async fn user_replies(
        &self,
        site_id: &str,
        user_id: &str,
        limit: usize,
        max_age: Duration,
    ) -> Result<(Vec<Comment>, String), RepoError>;
}
