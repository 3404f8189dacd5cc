//! HTTP boundary for the syndication service.

mod middleware;
mod public;

pub use public::{HttpState, build_router};

use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::application::syndication::SyndicationError;

/// Diagnostic detail attached to failed responses, consumed by the logging
/// middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Map a syndication failure to a response: store failures are the caller's
/// problem (bad or unknown selector), encoder failures are ours. Neither
/// outcome was cached upstream.
pub(crate) fn syndication_error_response(
    source: &'static str,
    public_message: &'static str,
    error: SyndicationError,
) -> Response {
    let status = match &error {
        SyndicationError::Store(_) => StatusCode::BAD_REQUEST,
        SyndicationError::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let mut response = (status, Json(json!({ "error": public_message }))).into_response();
    ErrorReport::from_error(source, status, &error).attach(&mut response);
    response
}
