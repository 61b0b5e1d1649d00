use crate::routing_utils::UnauthorizedResponse;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use tracing::debug;

/// Name of the OpenAPI security scheme guarding mutating routes
pub const BEARER_SCHEME: &str = "bearer_token";

const BEARER_PREFIX: &str = "Bearer ";

/// The shared secret callers must present to change tasks
#[derive(Clone)]
pub struct ApiKey(Arc<str>);

impl ApiKey {
    pub fn new(secret: &str) -> Self {
        ApiKey(Arc::from(secret))
    }

    /// True if the Authorization header carries this key as a bearer token
    pub fn matches(&self, headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
            .is_some_and(|token| token.trim() == &*self.0)
    }
}

/// Middleware which rejects requests that don't present the API key before they reach a handler
pub async fn require_bearer_token(
    State(api_key): State<ApiKey>,
    request: Request,
    next: Next,
) -> Response {
    if !api_key.matches(request.headers()) {
        debug!(
            method = %request.method(),
            path = request.uri().path(),
            "Rejected request without a valid bearer token"
        );
        return UnauthorizedResponse.into_response();
    }

    next.run(request).await
}
