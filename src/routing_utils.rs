use axum::async_trait;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{FromRequestParts, Query};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum_macros::{FromRequest, FromRequestParts};
use serde::Serialize;
use std::convert::Infallible;
use tracing::debug;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// Error body shared by every failing API response
#[derive(Serialize, Debug, ToSchema)]
#[cfg_attr(test, derive(serde::Deserialize, PartialEq, Eq))]
pub struct BasicErrorResponse {
    #[schema(example = "Task not found")]
    pub error: String,
}

impl BasicErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        BasicErrorResponse {
            error: message.into(),
        }
    }
}

/// Builds a JSON error response with the given status
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(BasicErrorResponse::new(message))).into_response()
}

/// Response for a task ID that does not match any stored task
pub struct NotFoundResponse;

impl IntoResponse for NotFoundResponse {
    fn into_response(self) -> Response {
        error_response(StatusCode::NOT_FOUND, "Task not found")
    }
}

/// Response for a request without valid credentials
pub struct UnauthorizedResponse;

impl IntoResponse for UnauthorizedResponse {
    fn into_response(self) -> Response {
        error_response(StatusCode::UNAUTHORIZED, "Unauthorized")
    }
}

/// Response for an unexpected failure. Only the operation summary reaches the client,
/// the underlying error should already have been logged.
pub struct GenericErrorResponse(pub &'static str);

impl IntoResponse for GenericErrorResponse {
    fn into_response(self) -> Response {
        error_response(StatusCode::INTERNAL_SERVER_ERROR, self.0)
    }
}

/// Message used when a validation failure doesn't carry its own
const FALLBACK_VALIDATION_MESSAGE: &str = "Submitted data was invalid.";

/// Response type that wraps validation errors and reports the first failing rule
pub struct ValidationErrorResponse(ValidationErrors);

impl ValidationErrorResponse {
    fn message(&self) -> String {
        let field_errors = self.0.field_errors();
        let mut fields: Vec<_> = field_errors.keys().collect();
        fields.sort();

        fields
            .into_iter()
            .filter_map(|field| field_errors.get(field))
            .flat_map(|errors| errors.iter())
            .find_map(|error| error.message.as_ref().map(|msg| msg.to_string()))
            .unwrap_or_else(|| FALLBACK_VALIDATION_MESSAGE.to_owned())
    }
}

impl IntoResponse for ValidationErrorResponse {
    fn into_response(self) -> Response {
        error_response(StatusCode::BAD_REQUEST, &self.message())
    }
}

impl From<ValidationErrors> for ValidationErrorResponse {
    fn from(value: ValidationErrors) -> Self {
        Self(value)
    }
}

/// Wrapper for [axum::Json] which customizes the error response to use our
/// data structure for API errors
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(JsonErrorResponse))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Response type representing JSON parse errors
pub struct JsonErrorResponse {
    parse_problem: String,
}

impl From<JsonRejection> for JsonErrorResponse {
    fn from(value: JsonRejection) -> Self {
        JsonErrorResponse {
            parse_problem: value.body_text(),
        }
    }
}

impl IntoResponse for JsonErrorResponse {
    fn into_response(self) -> Response {
        debug!("Rejected request body: {}", self.parse_problem);
        error_response(StatusCode::BAD_REQUEST, "Request body must be valid JSON.")
    }
}

/// Wrapper for [axum::extract::Path] which answers with our error format when the
/// path parameters can't be parsed. The only path parameter in the API is a task ID.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(PathErrorResponse))]
pub struct Path<T>(pub T);

/// Response type for a path parameter which could not be parsed
pub struct PathErrorResponse {
    parse_problem: String,
}

impl From<PathRejection> for PathErrorResponse {
    fn from(value: PathRejection) -> Self {
        PathErrorResponse {
            parse_problem: value.body_text(),
        }
    }
}

impl IntoResponse for PathErrorResponse {
    fn into_response(self) -> Response {
        debug!("Rejected task ID: {}", self.parse_problem);
        error_response(StatusCode::BAD_REQUEST, "Task id must be an integer.")
    }
}

/// The request's query string as key/value pairs in the order they were sent, repeated keys
/// included. Never rejects a request: a query string which can't be decoded reads as empty.
pub struct QueryPairs(pub Vec<(String, String)>);

#[async_trait]
impl<S> FromRequestParts<S> for QueryPairs
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<Vec<(String, String)>>::from_request_parts(parts, state).await {
            Ok(Query(pairs)) => Ok(QueryPairs(pairs)),
            Err(rejection) => {
                debug!("Ignoring query string: {}", rejection.body_text());
                Ok(QueryPairs(Vec::new()))
            }
        }
    }
}
