//! Comment records mirrored from the engine's data store.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Identifies a post uniquely within a site. Immutable, built per request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub site_id: String,
    pub url: String,
}

impl Locator {
    pub fn new(site_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            site_id: site_id.into(),
            url: url.into(),
        }
    }
}

/// Author identity attached to a comment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentUser {
    pub id: String,
    pub name: String,
    /// Avatar URL; empty when the author has none.
    #[serde(default)]
    pub picture: String,
}

impl CommentUser {
    /// Anonymous read context passed to store queries.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// A stored comment, consumed read-only by the syndication layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub user: CommentUser,
    #[serde(default)]
    pub post_title: Option<String>,
    pub locator: Locator,
}

impl Comment {
    /// Single-line preview of the comment text.
    ///
    /// Newlines are flattened to spaces. Text shorter than `limit` characters
    /// is returned whole; otherwise the preview is cut back to the last space
    /// before the limit and suffixed with `" ..."`.
    pub fn snippet(&self, limit: usize) -> String {
        let flat = self.text.replace('\n', " ");
        let chars: Vec<char> = flat.chars().collect();
        if chars.len() < limit {
            return flat;
        }

        let cut = chars[..limit]
            .iter()
            .rposition(|c| *c == ' ')
            .unwrap_or(limit);
        let mut preview: String = chars[..cut].iter().collect();
        preview.push_str(" ...");
        preview
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn comment_with_text(text: &str) -> Comment {
        Comment {
            id: "c1".to_string(),
            parent_id: None,
            text: text.to_string(),
            timestamp: datetime!(2024-03-01 12:00 UTC),
            user: CommentUser {
                id: "u1".to_string(),
                name: "ann".to_string(),
                picture: String::new(),
            },
            post_title: None,
            locator: Locator::new("site-1", "https://example.com/post/1"),
        }
    }

    #[test]
    fn snippet_returns_short_text_whole() {
        let comment = comment_with_text("short enough");
        assert_eq!(comment.snippet(300), "short enough");
    }

    #[test]
    fn snippet_flattens_newlines() {
        let comment = comment_with_text("line one\nline two");
        assert_eq!(comment.snippet(300), "line one line two");
    }

    #[test]
    fn snippet_cuts_back_to_last_space() {
        let comment = comment_with_text("aaaa bbbb cccc dddd");
        // limit lands inside "cccc"; the cut backs up to the space before it
        assert_eq!(comment.snippet(12), "aaaa bbbb ...");
    }

    #[test]
    fn snippet_without_spaces_cuts_at_limit() {
        let comment = comment_with_text("abcdefghij");
        assert_eq!(comment.snippet(5), "abcde ...");
    }

    #[test]
    fn comment_deserializes_rfc3339_timestamp() {
        let raw = r#"{
            "id": "c1",
            "text": "hello",
            "timestamp": "2024-03-01T12:00:00Z",
            "user": {"id": "u1", "name": "ann"},
            "locator": {"site_id": "site-1", "url": "https://example.com/post/1"}
        }"#;
        let comment: Comment = serde_json::from_str(raw).unwrap();
        assert_eq!(comment.timestamp, datetime!(2024-03-01 12:00 UTC));
        assert_eq!(comment.parent_id, None);
        assert!(comment.user.picture.is_empty());
    }
}
