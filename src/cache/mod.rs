//! Scope-tagged cache for rendered feed documents.
//!
//! Keys derive from request identity; scopes group keys so a write to a
//! site or post can purge every affected feed without enumerating keys.

mod keys;
mod lock;
mod store;

pub use keys::{CacheKey, LAST_COMMENTS_SCOPE, url_key};
pub use store::FeedCache;
