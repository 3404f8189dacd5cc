//! In-memory comment store, seedable from a JSON file.
//!
//! Stands in for the engine's real store behind `CommentsRepo`: the binary
//! uses it for development deployments, the test suites for fixtures. The
//! collection is read-only once constructed.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;
use time::{Duration, OffsetDateTime};

use crate::application::repos::{CommentsRepo, RepoError, SortOrder};
use crate::domain::comments::{Comment, CommentUser, Locator};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Fixed comment collection served through the repo trait.
#[derive(Debug, Default)]
pub struct MemoryComments {
    comments: Vec<Comment>,
}

impl MemoryComments {
    pub fn from_comments(comments: Vec<Comment>) -> Self {
        Self { comments }
    }

    /// Load a JSON array of comments from `path`.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let raw = tokio::fs::read(path).await?;
        let comments: Vec<Comment> = serde_json::from_slice(&raw)?;
        Ok(Self::from_comments(comments))
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }
}

fn sort_newest_first(comments: &mut [Comment]) {
    comments.sort_by(|left, right| right.timestamp.cmp(&left.timestamp));
}

#[async_trait]
impl CommentsRepo for MemoryComments {
    async fn find(
        &self,
        locator: &Locator,
        sort: SortOrder,
        _user: &CommentUser,
    ) -> Result<Vec<Comment>, RepoError> {
        let mut found: Vec<Comment> = self
            .comments
            .iter()
            .filter(|comment| comment.locator == *locator)
            .cloned()
            .collect();
        match sort {
            SortOrder::TimeAsc => {
                found.sort_by(|left, right| left.timestamp.cmp(&right.timestamp));
            }
            SortOrder::TimeDesc => sort_newest_first(&mut found),
        }
        Ok(found)
    }

    async fn last(
        &self,
        site_id: &str,
        limit: usize,
        since: OffsetDateTime,
        _user: &CommentUser,
    ) -> Result<Vec<Comment>, RepoError> {
        let mut found: Vec<Comment> = self
            .comments
            .iter()
            .filter(|comment| comment.locator.site_id == site_id && comment.timestamp > since)
            .cloned()
            .collect();
        sort_newest_first(&mut found);
        found.truncate(limit);
        Ok(found)
    }

    async fn get(
        &self,
        locator: &Locator,
        comment_id: &str,
        _user: &CommentUser,
    ) -> Result<Comment, RepoError> {
        self.comments
            .iter()
            .find(|comment| comment.locator == *locator && comment.id == comment_id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn user_replies(
        &self,
        site_id: &str,
        user_id: &str,
        limit: usize,
        max_age: Duration,
    ) -> Result<(Vec<Comment>, String), RepoError> {
        let authored: Vec<&Comment> = self
            .comments
            .iter()
            .filter(|comment| comment.locator.site_id == site_id && comment.user.id == user_id)
            .collect();
        let user_name = authored
            .first()
            .map(|comment| comment.user.name.clone())
            .unwrap_or_default();
        let authored_ids: HashSet<&str> = authored
            .iter()
            .map(|comment| comment.id.as_str())
            .collect();

        let oldest = OffsetDateTime::now_utc() - max_age;
        let mut replies: Vec<Comment> = self
            .comments
            .iter()
            .filter(|comment| {
                comment.locator.site_id == site_id
                    && comment.user.id != user_id
                    && comment.timestamp > oldest
                    && comment
                        .parent_id
                        .as_deref()
                        .is_some_and(|parent| authored_ids.contains(parent))
            })
            .cloned()
            .collect();
        sort_newest_first(&mut replies);
        replies.truncate(limit);
        Ok((replies, user_name))
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn comment(id: &str, parent: Option<&str>, user_id: &str, ts: OffsetDateTime) -> Comment {
        Comment {
            id: id.to_string(),
            parent_id: parent.map(str::to_string),
            text: format!("text of {id}"),
            timestamp: ts,
            user: CommentUser {
                id: user_id.to_string(),
                name: user_id.to_uppercase(),
                picture: String::new(),
            },
            post_title: None,
            locator: Locator::new("site-1", "https://example.com/p1"),
        }
    }

    fn repo() -> MemoryComments {
        MemoryComments::from_comments(vec![
            comment("c1", None, "ann", datetime!(2024-03-01 10:00 UTC)),
            comment("c2", Some("c1"), "bob", datetime!(2024-03-01 11:00 UTC)),
            comment("c3", Some("c1"), "cid", datetime!(2024-03-01 12:00 UTC)),
        ])
    }

    #[tokio::test]
    async fn find_orders_by_requested_sort() {
        let repo = repo();
        let locator = Locator::new("site-1", "https://example.com/p1");
        let newest_first = repo
            .find(&locator, SortOrder::TimeDesc, &CommentUser::empty())
            .await
            .unwrap();
        let ids: Vec<&str> = newest_first.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["c3", "c2", "c1"]);
    }

    #[tokio::test]
    async fn last_truncates_to_limit() {
        let repo = repo();
        let found = repo
            .last("site-1", 2, OffsetDateTime::UNIX_EPOCH, &CommentUser::empty())
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, "c3");
    }

    #[tokio::test]
    async fn get_missing_comment_is_not_found() {
        let repo = repo();
        let locator = Locator::new("site-1", "https://example.com/p1");
        let missing = repo
            .get(&locator, "nope", &CommentUser::empty())
            .await
            .unwrap_err();
        assert!(matches!(missing, RepoError::NotFound));
    }

    #[tokio::test]
    async fn user_replies_returns_replies_and_display_name() {
        let repo = repo();
        let (replies, name) = repo
            .user_replies("site-1", "ann", 10, Duration::days(365 * 100))
            .await
            .unwrap();
        let ids: Vec<&str> = replies.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["c3", "c2"]);
        assert_eq!(name, "ANN");
    }
}
