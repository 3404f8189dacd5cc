//! Syndication service: assembles comment feeds and renders them as RSS,
//! memoized behind the scope-tagged feed cache.
//!
//! Three selectors exist: comments under one post, latest comments across a
//! site, and replies to one user. Each resolves a cache key, and on miss
//! fetches from the store, builds the feed, and renders the document. The
//! cache coalesces overlapping identical requests into one build.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::application::repos::{CommentsRepo, RepoError, SortOrder};
use crate::application::rss::{self, Feed, FeedItem, RssRenderError};
use crate::cache::{CacheKey, FeedCache};
use crate::domain::comments::{Comment, CommentUser, Locator};

/// Fallback channel description when the caller supplies none.
const DEFAULT_DESCRIPTION: &str = "comment updates";
/// Quoted parent text is previewed at most this many characters.
const PARENT_SNIPPET_LEN: usize = 300;

/// Named limits and tokens for feed assembly. Passed in, never global.
#[derive(Debug, Clone)]
pub struct FeedOptions {
    /// Channel title shared by every feed.
    pub title: String,
    /// Item cap. The historical bound check runs after the append and uses
    /// strict `>`, so up to two items past this value are emitted; see
    /// `build_feed`.
    pub max_items: usize,
    /// Maximum age of replies served by the reply feed.
    pub max_reply_age: time::Duration,
    /// Fragment the UI uses to address one comment inside a post page.
    pub navigation_anchor: String,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            title: "Colloquy comments".to_string(),
            max_items: 20,
            max_reply_age: time::Duration::days(31),
            navigation_anchor: "#colloquy__comment-".to_string(),
        }
    }
}

/// Sink for non-fatal events raised during feed assembly.
pub trait FeedObserver: Send + Sync {
    /// A parent comment could not be resolved; the item is rendered without
    /// the quote and the build proceeds.
    fn parent_lookup_failed(&self, comment_id: &str, parent_id: &str, error: &RepoError);
}

/// Default observer: reports through the tracing subscriber.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl FeedObserver for TracingObserver {
    fn parent_lookup_failed(&self, comment_id: &str, parent_id: &str, error: &RepoError) {
        warn!(
            comment_id,
            parent_id,
            error = %error,
            "failed to resolve parent comment, rendering item without quote"
        );
    }
}

#[derive(Debug, Error)]
pub enum SyndicationError {
    #[error("failed to load comments: {0}")]
    Store(#[from] RepoError),
    #[error(transparent)]
    Serialize(#[from] RssRenderError),
}

/// Service producing the three feed documents.
#[derive(Clone)]
pub struct SyndicationService {
    comments: Arc<dyn CommentsRepo>,
    cache: Option<Arc<FeedCache>>,
    observer: Arc<dyn FeedObserver>,
    options: FeedOptions,
}

impl SyndicationService {
    pub fn new(comments: Arc<dyn CommentsRepo>, options: FeedOptions) -> Self {
        Self {
            comments,
            cache: None,
            observer: Arc::new(TracingObserver),
            options,
        }
    }

    pub fn with_cache(mut self, cache: Arc<FeedCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn FeedObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn options(&self) -> &FeedOptions {
        &self.options
    }

    /// Feed of comments under a single post, newest first.
    ///
    /// `identity` is the normalized request string (see `cache::url_key`);
    /// the entry is scoped to the site and the post URL.
    pub async fn post_feed(
        &self,
        locator: &Locator,
        identity: &str,
        user: &CommentUser,
    ) -> Result<Bytes, SyndicationError> {
        debug!(site = %locator.site_id, url = %locator.url, "rss feed for post");
        let key = CacheKey::post_feed(&locator.site_id, identity, &locator.url);

        let service = self.clone();
        let locator = locator.clone();
        let user = user.clone();
        let compute = move || async move {
            let comments = service
                .comments
                .find(&locator, SortOrder::TimeDesc, &user)
                .await?;
            let description = format!("post comments for {}", locator.url);
            let document = service
                .render_feed(&locator.url, &comments, &description)
                .await?;
            Ok(Bytes::from(document))
        };

        match &self.cache {
            Some(cache) => cache.get_or_compute(&key, compute).await,
            None => compute().await,
        }
    }

    /// Feed of the latest comments across a site.
    pub async fn site_feed(
        &self,
        site_id: &str,
        identity: &str,
        user: &CommentUser,
    ) -> Result<Bytes, SyndicationError> {
        debug!(site = site_id, "rss feed for site");
        let key = CacheKey::last_comments(site_id, identity);

        let service = self.clone();
        let site_id = site_id.to_string();
        let user = user.clone();
        let compute = move || async move {
            let comments = service
                .comments
                .last(
                    &site_id,
                    service.options.max_items,
                    OffsetDateTime::UNIX_EPOCH,
                    &user,
                )
                .await?;
            let description = format!("site comment for {site_id}");
            let document = service
                .render_feed(&site_id, &comments, &description)
                .await?;
            Ok(Bytes::from(document))
        };

        match &self.cache {
            Some(cache) => cache.get_or_compute(&key, compute).await,
            None => compute().await,
        }
    }

    /// Feed of recent replies to one user's comments.
    pub async fn reply_feed(
        &self,
        site_id: &str,
        user_id: &str,
        identity: &str,
    ) -> Result<Bytes, SyndicationError> {
        debug!(site = site_id, user = user_id, "rss feed of replies to user");
        let key = CacheKey::last_comments(site_id, identity);

        let service = self.clone();
        let site_id = site_id.to_string();
        let user_id = user_id.to_string();
        let compute = move || async move {
            let (replies, user_name) = service
                .comments
                .user_replies(
                    &site_id,
                    &user_id,
                    service.options.max_items,
                    service.options.max_reply_age,
                )
                .await?;
            let description = format!("replies to {user_name}");
            let document = service
                .render_feed(&site_id, &replies, &description)
                .await?;
            Ok(Bytes::from(document))
        };

        match &self.cache {
            Some(cache) => cache.get_or_compute(&key, compute).await,
            None => compute().await,
        }
    }

    async fn render_feed(
        &self,
        link: &str,
        comments: &[Comment],
        description: &str,
    ) -> Result<String, SyndicationError> {
        let feed = self.build_feed(link, comments, description).await?;
        Ok(rss::render(&feed)?)
    }

    /// Assemble a bounded feed from an ordered comment list.
    ///
    /// Input ordering is preserved exactly; ordering is the store's
    /// responsibility. Parent-lookup failures degrade the affected item and
    /// never abort the build.
    pub async fn build_feed(
        &self,
        link: &str,
        comments: &[Comment],
        description: &str,
    ) -> Result<Feed, SyndicationError> {
        let description = if description.is_empty() {
            DEFAULT_DESCRIPTION
        } else {
            description
        };
        let first_ts = comments
            .first()
            .map(|comment| comment.timestamp)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);

        let mut feed = Feed {
            title: self.options.title.clone(),
            link: link.to_string(),
            description: description.to_string(),
            pub_date: rss::format_pub_date(first_ts)?,
            items: Vec::new(),
        };

        for (i, comment) in comments.iter().enumerate() {
            let mut title = comment.user.name.clone();
            let mut item_description = comment.text.clone();

            if let Some(parent_id) = &comment.parent_id {
                match self
                    .comments
                    .get(&comment.locator, parent_id, &CommentUser::empty())
                    .await
                {
                    Ok(parent) => {
                        title = format!("{} > {}", comment.user.name, parent.user.name);
                        item_description = format!(
                            "{item_description}<blockquote><p>{}</p></blockquote>",
                            parent.snippet(PARENT_SNIPPET_LEN)
                        );
                    }
                    Err(error) => {
                        self.observer
                            .parent_lookup_failed(&comment.id, parent_id, &error);
                    }
                }
            }

            if let Some(post_title) = &comment.post_title {
                title = format!("{title}, {post_title}");
            }

            feed.items.push(FeedItem {
                title,
                link: format!(
                    "{}{}{}",
                    comment.locator.url, self.options.navigation_anchor, comment.id
                ),
                description: item_description,
                author: comment.user.name.clone(),
                guid: comment.id.clone(),
                pub_date: rss::format_pub_date(comment.timestamp)?,
                author_avatar: comment.user.picture.clone(),
            });

            // Historical bound: checked after the append with strict `>`, so
            // up to two items past the cap land in the feed. Kept as-is.
            if i > self.options.max_items {
                break;
            }
        }

        Ok(feed)
    }
}
