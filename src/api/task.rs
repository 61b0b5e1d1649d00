use crate::api::auth::{self, ApiKey};
use crate::domain::task::driven_ports::{TaskReader, TaskWriter};
use crate::domain::task::driving_ports::TaskPort;
use crate::domain::task::TaskService;
use crate::external_connections::ExternalConnectivity;
use crate::persistence::db_task_driven_ports::{DbTaskReader, DbTaskWriter};
use crate::routing_utils::{
    GenericErrorResponse, Json, NotFoundResponse, Path, QueryPairs, ValidationErrorResponse,
};
use crate::{AppState, SharedData, domain, dto};
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::ErrorResponse;
use axum::routing::{get, post, put};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::OpenApi;
use validator::Validate;

#[derive(OpenApi)]
#[openapi(paths(list_tasks, get_task, create_task, update_task, delete_task))]
/// Defines the OpenAPI documentation for the task API
pub struct TaskApi;
/// Constant used to group task endpoints in OpenAPI documentation
pub const TASK_API_GROUP: &str = "Tasks";

/// Builds the router for "/tasks". Reads are public, changes require [api_key] as a bearer token.
pub fn task_routes(api_key: ApiKey) -> Router<Arc<SharedData>> {
    let public = Router::new()
        .route(
            "/tasks",
            get(
                |State(app_state): AppState, QueryPairs(query): QueryPairs| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();

                    list_tasks(
                        dto::PageQuery::from_pairs(query).resolve(),
                        &mut ext_cxn,
                        &TaskService,
                        &DbTaskReader,
                    )
                    .await
                },
            ),
        )
        .route(
            "/tasks/:id",
            get(
                |State(app_state): AppState, Path(task_id): Path<i64>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();

                    get_task(task_id, &mut ext_cxn, &TaskService, &DbTaskReader).await
                },
            ),
        );

    let protected = Router::new()
        .route(
            "/tasks",
            post(
                |State(app_state): AppState, Json(new_task): Json<dto::NewTask>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();

                    create_task(new_task, &mut ext_cxn, &TaskService, &DbTaskWriter).await
                },
            ),
        )
        .route(
            "/tasks/:id",
            put(
                |State(app_state): AppState,
                 Path(task_id): Path<i64>,
                 Json(update): Json<dto::UpdateTask>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();

                    update_task(
                        task_id,
                        update,
                        &mut ext_cxn,
                        &TaskService,
                        &DbTaskReader,
                        &DbTaskWriter,
                    )
                    .await
                },
            )
            .delete(
                |State(app_state): AppState, Path(task_id): Path<i64>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();

                    delete_task(
                        task_id,
                        &mut ext_cxn,
                        &TaskService,
                        &DbTaskReader,
                        &DbTaskWriter,
                    )
                    .await
                },
            ),
        )
        .route_layer(middleware::from_fn_with_state(
            api_key,
            auth::require_bearer_token,
        ));

    public.merge(protected)
}

#[utoipa::path(
    get,
    path = "/tasks",
    tag = TASK_API_GROUP,
    params(dto::PageQuery),
    responses(
        (status = 200, description = "A page of tasks, newest first", body = [dto::Task]),
        (status = 500, description = "The task store failed", body = crate::routing_utils::BasicErrorResponse),
    ),
)]
/// Retrieves a page of tasks
async fn list_tasks(
    pagination: dto::Pagination,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
    task_read: &impl TaskReader,
) -> Result<Json<Vec<dto::Task>>, ErrorResponse> {
    let tasks = task_service
        .get_tasks(pagination.page, pagination.limit, &mut *ext_cxn, task_read)
        .await
        .map_err(|err| {
            error!("Failed to fetch tasks for {pagination}: {err}");
            GenericErrorResponse("Failed to fetch tasks")
        })?;

    info!("Fetched {} tasks for {pagination}", tasks.len());
    Ok(Json(tasks.into_iter().map(dto::Task::from).collect()))
}

#[utoipa::path(
    get,
    path = "/tasks/{id}",
    tag = TASK_API_GROUP,
    params(("id" = i64, Path, description = "ID of the task")),
    responses(
        (status = 200, description = "The requested task", body = dto::Task),
        (status = 400, description = "The ID was not an integer", body = crate::routing_utils::BasicErrorResponse),
        (status = 404, description = "No task has the given ID", body = crate::routing_utils::BasicErrorResponse),
        (status = 500, description = "The task store failed", body = crate::routing_utils::BasicErrorResponse),
    ),
)]
#[instrument(skip(ext_cxn, task_service, task_read))]
/// Retrieves a single task
async fn get_task(
    task_id: i64,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
    task_read: &impl TaskReader,
) -> Result<Json<dto::Task>, ErrorResponse> {
    let task = task_service
        .get_task_by_id(task_id, &mut *ext_cxn, task_read)
        .await
        .map_err(|err| {
            error!("Failed to fetch task {task_id}: {err}");
            GenericErrorResponse("Failed to fetch task")
        })?
        .ok_or(NotFoundResponse)?;

    Ok(Json(task.into()))
}

#[utoipa::path(
    post,
    path = "/tasks",
    tag = TASK_API_GROUP,
    request_body = dto::NewTask,
    security(("bearer_token" = [])),
    responses(
        (status = 201, description = "The task was created", body = dto::Task),
        (status = 400, description = "The title was missing or too short", body = crate::routing_utils::BasicErrorResponse),
        (status = 401, description = "Missing or wrong bearer token", body = crate::routing_utils::BasicErrorResponse),
        (status = 500, description = "The task store failed", body = crate::routing_utils::BasicErrorResponse),
    ),
)]
/// Creates a new task
async fn create_task(
    new_task: dto::NewTask,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
    task_write: &impl TaskWriter,
) -> Result<(StatusCode, Json<dto::Task>), ErrorResponse> {
    new_task.validate().map_err(ValidationErrorResponse::from)?;

    let domain_task = domain::task::NewTask::from(new_task);
    info!("Creating task \"{}\"", domain_task.title);
    let created = task_service
        .create_task(&domain_task, &mut *ext_cxn, task_write)
        .await
        .map_err(|err| {
            error!("Task create failure: {err}");
            GenericErrorResponse("Failed to create task")
        })?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

#[utoipa::path(
    put,
    path = "/tasks/{id}",
    tag = TASK_API_GROUP,
    params(("id" = i64, Path, description = "ID of the task")),
    request_body = dto::UpdateTask,
    security(("bearer_token" = [])),
    responses(
        (status = 204, description = "The task was updated"),
        (status = 400, description = "The ID or the new title was invalid", body = crate::routing_utils::BasicErrorResponse),
        (status = 401, description = "Missing or wrong bearer token", body = crate::routing_utils::BasicErrorResponse),
        (status = 404, description = "No task has the given ID", body = crate::routing_utils::BasicErrorResponse),
        (status = 500, description = "The task store failed", body = crate::routing_utils::BasicErrorResponse),
    ),
)]
#[instrument(skip(update, ext_cxn, task_service, task_read, task_write))]
/// Changes the supplied fields of a task
async fn update_task(
    task_id: i64,
    update: dto::UpdateTask,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
    task_read: &impl TaskReader,
    task_write: &impl TaskWriter,
) -> Result<StatusCode, ErrorResponse> {
    update.validate().map_err(ValidationErrorResponse::from)?;

    let existing = task_service
        .get_task_by_id(task_id, &mut *ext_cxn, task_read)
        .await
        .map_err(|err| {
            error!("Failed to look up task {task_id} for update: {err}");
            GenericErrorResponse("Failed to update task")
        })?
        .ok_or(NotFoundResponse)?;

    let patch = domain::task::TaskPatch::from(update);
    let updated = task_service
        .update_task(&existing, &patch, &mut *ext_cxn, task_write)
        .await
        .map_err(|err| {
            error!("Update task failure: {err}");
            GenericErrorResponse("Failed to update task")
        })?;

    match updated {
        Some(_) => {
            info!("Updated task");
            Ok(StatusCode::NO_CONTENT)
        }
        // Deleted between the lookup and the write
        None => Err(NotFoundResponse.into()),
    }
}

#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    tag = TASK_API_GROUP,
    params(("id" = i64, Path, description = "ID of the task")),
    security(("bearer_token" = [])),
    responses(
        (status = 204, description = "The task was deleted"),
        (status = 400, description = "The ID was not an integer", body = crate::routing_utils::BasicErrorResponse),
        (status = 401, description = "Missing or wrong bearer token", body = crate::routing_utils::BasicErrorResponse),
        (status = 404, description = "No task has the given ID", body = crate::routing_utils::BasicErrorResponse),
        (status = 500, description = "The task store failed", body = crate::routing_utils::BasicErrorResponse),
    ),
)]
#[instrument(skip(ext_cxn, task_service, task_read, task_write))]
/// Deletes a task
async fn delete_task(
    task_id: i64,
    ext_cxn: &mut impl ExternalConnectivity,
    task_service: &impl TaskPort,
    task_read: &impl TaskReader,
    task_write: &impl TaskWriter,
) -> Result<StatusCode, ErrorResponse> {
    let existing = task_service
        .get_task_by_id(task_id, &mut *ext_cxn, task_read)
        .await
        .map_err(|err| {
            error!("Failed to look up task {task_id} for deletion: {err}");
            GenericErrorResponse("Failed to delete task")
        })?
        .ok_or(NotFoundResponse)?;

    task_service
        .delete_task(&existing, &mut *ext_cxn, task_write)
        .await
        .map_err(|err| {
            error!("Failed to delete task: {err}");
            GenericErrorResponse("Failed to delete task")
        })?;

    info!("Deleted task");
    Ok(StatusCode::NO_CONTENT)
}
