//! Cache key and scope derivation for feed responses.

/// Scope tag shared by site-wide and reply feeds: any new comment on the
/// site invalidates them.
pub const LAST_COMMENTS_SCOPE: &str = "last comments";

/// Key for one cached feed document.
///
/// `id` is unique per distinct request; `scopes` are the invalidation
/// groups the entry belongs to. Pure value type with no lifecycle of its
/// own — the cached bytes outlive the request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    id: String,
    scopes: Vec<String>,
}

impl CacheKey {
    /// Key for a per-post feed; purged with the site or with the post.
    pub fn post_feed(site_id: &str, identity: &str, post_url: &str) -> Self {
        Self {
            id: format!("{site_id}@@{identity}"),
            scopes: vec![site_id.to_string(), post_url.to_string()],
        }
    }

    /// Key for site-wide and reply feeds; purged with the site or whenever
    /// any comment on it is written.
    pub fn last_comments(site_id: &str, identity: &str) -> Self {
        Self {
            id: format!("{site_id}@@{identity}"),
            scopes: vec![site_id.to_string(), LAST_COMMENTS_SCOPE.to_string()],
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }
}

/// Normalized request identity: the path, plus the query when present.
pub fn url_key(path: &str, query: Option<&str>) -> String {
    match query {
        Some(query) if !query.is_empty() => format!("{path}?{query}"),
        _ => path.to_string(),
    }
}
