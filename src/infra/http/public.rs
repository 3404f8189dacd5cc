//! Public feed endpoints: three read-only selectors differentiated by
//! whether they target a single post, an entire site, or a user's reply
//! history.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::{Uri, header::CONTENT_TYPE},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use serde::Deserialize;

use crate::application::syndication::SyndicationService;
use crate::cache::url_key;
use crate::domain::comments::{CommentUser, Locator};

use super::middleware::{log_responses, set_request_context};
use super::syndication_error_response;

const FEED_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

#[derive(Clone)]
pub struct HttpState {
    pub syndication: Arc<SyndicationService>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/rss/post", get(post_feed))
        .route("/rss/site", get(site_feed))
        .route("/rss/reply", get(reply_feed))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct PostFeedQuery {
    site: String,
    url: String,
}

// GET /rss/post?site=siteID&url=post-url
async fn post_feed(
    State(state): State<HttpState>,
    uri: Uri,
    Query(query): Query<PostFeedQuery>,
) -> Response {
    let locator = Locator::new(query.site, query.url);
    let identity = url_key(uri.path(), uri.query());
    match state
        .syndication
        .post_feed(&locator, &identity, &CommentUser::empty())
        .await
    {
        Ok(document) => feed_response(document),
        Err(error) => {
            syndication_error_response("infra::http::post_feed", "can't find comments", error)
        }
    }
}

#[derive(Debug, Deserialize)]
struct SiteFeedQuery {
    site: String,
}

// GET /rss/site?site=siteID
async fn site_feed(
    State(state): State<HttpState>,
    uri: Uri,
    Query(query): Query<SiteFeedQuery>,
) -> Response {
    let identity = url_key(uri.path(), uri.query());
    match state
        .syndication
        .site_feed(&query.site, &identity, &CommentUser::empty())
        .await
    {
        Ok(document) => feed_response(document),
        Err(error) => {
            syndication_error_response("infra::http::site_feed", "can't get last comments", error)
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReplyFeedQuery {
    site: String,
    user: String,
}

// GET /rss/reply?site=siteID&user=userID
async fn reply_feed(
    State(state): State<HttpState>,
    uri: Uri,
    Query(query): Query<ReplyFeedQuery>,
) -> Response {
    let identity = url_key(uri.path(), uri.query());
    match state
        .syndication
        .reply_feed(&query.site, &query.user, &identity)
        .await
    {
        Ok(document) => feed_response(document),
        Err(error) => {
            syndication_error_response("infra::http::reply_feed", "can't get replies", error)
        }
    }
}

fn feed_response(document: Bytes) -> Response {
    ([(CONTENT_TYPE, FEED_CONTENT_TYPE)], document).into_response()
}
