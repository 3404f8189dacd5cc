//! Router tests for the public feed endpoints.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header::CONTENT_TYPE};
use tower::ServiceExt;

use async_trait::async_trait;
use time::{Duration, OffsetDateTime};

use colloquy::application::repos::{CommentsRepo, RepoError, SortOrder};
use colloquy::application::syndication::{FeedOptions, SyndicationService};
use colloquy::domain::comments::{Comment, CommentUser, Locator};
use colloquy::infra::http::{HttpState, build_router};
use colloquy::infra::memory::MemoryComments;

fn seeded_router() -> Router {
    // recent timestamps keep the reply feed's max-age window satisfied
    let now = OffsetDateTime::now_utc();
    let comments = vec![
        Comment {
            id: "c1".to_string(),
            parent_id: None,
            text: "first".to_string(),
            timestamp: now - Duration::hours(2),
            user: CommentUser {
                id: "ann".to_string(),
                name: "ann".to_string(),
                picture: String::new(),
            },
            post_title: None,
            locator: Locator::new("site-1", "https://example.com/post/1"),
        },
        Comment {
            id: "c2".to_string(),
            parent_id: Some("c1".to_string()),
            text: "second".to_string(),
            timestamp: now - Duration::hours(1),
            user: CommentUser {
                id: "bob".to_string(),
                name: "bob".to_string(),
                picture: String::new(),
            },
            post_title: None,
            locator: Locator::new("site-1", "https://example.com/post/1"),
        },
    ];
    let service = SyndicationService::new(
        Arc::new(MemoryComments::from_comments(comments)),
        FeedOptions::default(),
    );
    build_router(HttpState {
        syndication: Arc::new(service),
    })
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn post_feed_serves_xml_document() {
    let router = seeded_router();
    let response = router
        .oneshot(
            Request::builder()
                .uri("/rss/post?site=site-1&url=https%3A%2F%2Fexample.com%2Fpost%2F1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok()),
        Some("application/xml; charset=utf-8")
    );

    let body = body_string(response).await;
    assert!(body.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
    assert!(body.contains(r#"<rss version="2.0""#));
    assert!(body.contains("<guid>c1</guid>"));
    // newest first: the reply quotes its parent
    assert!(body.contains("bob &gt; ann"));
}

#[tokio::test]
async fn site_feed_serves_xml_document() {
    let router = seeded_router();
    let response = router
        .oneshot(
            Request::builder()
                .uri("/rss/site?site=site-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("<description>site comment for site-1</description>"));
}

#[tokio::test]
async fn reply_feed_serves_replies_to_user() {
    let router = seeded_router();
    let response = router
        .oneshot(
            Request::builder()
                .uri("/rss/reply?site=site-1&user=ann")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("<description>replies to ann</description>"));
    assert!(body.contains("<guid>c2</guid>"));
    assert!(!body.contains("<guid>c1</guid>"));
}

#[tokio::test]
async fn missing_query_parameters_are_rejected() {
    let router = seeded_router();
    let response = router
        .oneshot(
            Request::builder()
                .uri("/rss/post?site=site-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

struct BrokenRepo;

#[async_trait]
impl CommentsRepo for BrokenRepo {
    async fn find(
        &self,
        _locator: &Locator,
        _sort: SortOrder,
        _user: &CommentUser,
    ) -> Result<Vec<Comment>, RepoError> {
        Err(RepoError::from_persistence("store unavailable"))
    }

    async fn last(
        &self,
        _site_id: &str,
        _limit: usize,
        _since: time::OffsetDateTime,
        _user: &CommentUser,
    ) -> Result<Vec<Comment>, RepoError> {
        Err(RepoError::from_persistence("store unavailable"))
    }

    async fn get(
        &self,
        _locator: &Locator,
        _comment_id: &str,
        _user: &CommentUser,
    ) -> Result<Comment, RepoError> {
        Err(RepoError::from_persistence("store unavailable"))
    }

    async fn user_replies(
        &self,
        _site_id: &str,
        _user_id: &str,
        _limit: usize,
        _max_age: time::Duration,
    ) -> Result<(Vec<Comment>, String), RepoError> {
        Err(RepoError::from_persistence("store unavailable"))
    }
}

#[tokio::test]
async fn store_failure_maps_to_bad_request_with_public_message() {
    let service = SyndicationService::new(Arc::new(BrokenRepo), FeedOptions::default());
    let router = build_router(HttpState {
        syndication: Arc::new(service),
    });

    let response = router
        .oneshot(
            Request::builder()
                .uri("/rss/site?site=site-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_string(response).await;
    assert_eq!(body, r#"{"error":"can't get last comments"}"#);
}
