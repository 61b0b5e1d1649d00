use crate::routing_utils::BasicErrorResponse;
use utoipa::OpenApi;

pub mod task;

pub use task::*;

/// Schemas shared by every group of routes in the OpenAPI document
#[derive(OpenApi)]
#[openapi(components(schemas(Task, NewTask, UpdateTask, BasicErrorResponse)))]
pub struct OpenApiSchemas;
