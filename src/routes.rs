use crate::api::auth::ApiKey;
use crate::api::{swagger_main, task};
use crate::routing_utils::error_response;
use crate::{SharedData, logging};
use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use std::sync::Arc;

const WELCOME_MESSAGE: &str = "Welcome to Tasks API";

async fn route_not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Route not found")
}

/// Builds the application's full router: the welcome route, the task routes guarded by
/// [ApiKey], the OpenAPI docs and a JSON 404 for everything else
pub fn build_router(app_state: Arc<SharedData>) -> Router {
    let api_key: ApiKey = app_state.api_key.clone();
    let router = Router::new()
        .route("/", get(|| async { WELCOME_MESSAGE.into_response() }))
        .merge(task::task_routes(api_key))
        .merge(swagger_main::build_documentation())
        .fallback(route_not_found)
        .with_state(app_state);

    logging::attach_tracing_http(router)
}
