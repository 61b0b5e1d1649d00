use crate::api::auth::BEARER_SCHEME;
use crate::dto;
use utoipa::openapi::OpenApi as OpenApiDocument;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

/// Path serving the raw OpenAPI document
pub const OPENAPI_JSON_PATH: &str = "/docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tasks API",
        description = "Create, list, update and delete tasks. Changes require a bearer token."
    ),
    modifiers(&BearerTokenAddon)
)]
struct TasksApiDoc;

/// Registers the bearer token scheme referenced by the mutating task routes
struct BearerTokenAddon;

impl Modify for BearerTokenAddon {
    fn modify(&self, openapi: &mut OpenApiDocument) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            BEARER_SCHEME,
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// Assembles the OpenAPI document from the [dto] schemas and the routes in [api][crate::api]
pub fn api_docs() -> OpenApiDocument {
    let mut api_docs = TasksApiDoc::openapi();
    api_docs.merge(dto::OpenApiSchemas::openapi());
    api_docs.merge(super::task::TaskApi::openapi());

    api_docs
}

/// Constructs the route on the API that renders the swagger UI and returns the OpenAPI schema.
pub fn build_documentation() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url(OPENAPI_JSON_PATH, api_docs())
}
