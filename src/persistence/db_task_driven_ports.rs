use super::port_error;
use crate::domain;
use crate::domain::DrivenPortError;
use crate::domain::task::{Task, TaskCandidate, TaskPatch};
use crate::external_connections::{ConnectionHandle, ExternalConnectivity};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, query, query_as};

pub struct DbTaskReader;

#[derive(FromRow)]
struct TaskRow {
    id: i64,
    title: String,
    description: Option<String>,
    completed: bool,
    created_at: DateTime<Utc>,
}

impl From<TaskRow> for domain::task::Task {
    fn from(value: TaskRow) -> Self {
        Task {
            id: value.id,
            title: value.title,
            description: value.description.unwrap_or_default(),
            completed: value.completed,
            created_at: value.created_at,
        }
    }
}

impl domain::task::driven_ports::TaskReader for DbTaskReader {
    async fn list(
        &self,
        offset: i64,
        limit: i64,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<Task>, DrivenPortError> {
        let mut cxn = ext_cxn
            .database_cxn()
            .await
            .map_err(DrivenPortError::StoreUnavailable)?;

        let tasks: Vec<Task> = query_as::<_, TaskRow>(
            "SELECT t.id, t.title, t.description, t.completed, t.created_at FROM tasks t \
             ORDER BY t.id DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(cxn.borrow_connection())
        .await
        .map_err(|err| port_error(err, "trying to fetch a page of tasks"))?
        .into_iter()
        .map(Task::from)
        .collect();

        Ok(tasks)
    }

    async fn find_by_id(
        &self,
        task_id: i64,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<Task>, DrivenPortError> {
        let mut cxn = ext_cxn
            .database_cxn()
            .await
            .map_err(DrivenPortError::StoreUnavailable)?;

        let task = query_as::<_, TaskRow>(
            "SELECT t.id, t.title, t.description, t.completed, t.created_at FROM tasks t WHERE t.id = $1",
        )
        .bind(task_id)
        .fetch_optional(cxn.borrow_connection())
        .await
        .map_err(|err| port_error(err, "trying to fetch a task by ID"))?
        .map(Task::from);

        Ok(task)
    }
}

pub struct DbTaskWriter;

impl domain::task::driven_ports::TaskWriter for DbTaskWriter {
    async fn insert(
        &self,
        candidate: &TaskCandidate,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Task, DrivenPortError> {
        let mut cxn = ext_cxn
            .database_cxn()
            .await
            .map_err(DrivenPortError::StoreUnavailable)?;

        let inserted = query_as::<_, TaskRow>(
            "INSERT INTO tasks(title, description, completed, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4) \
             RETURNING id, title, description, completed, created_at",
        )
        .bind(&candidate.title)
        .bind(&candidate.description)
        .bind(candidate.completed)
        .bind(candidate.created_at)
        .fetch_one(cxn.borrow_connection())
        .await
        .map_err(|err| port_error(err, "trying to insert a new task into the database"))?;

        Ok(inserted.into())
    }

    async fn update(
        &self,
        task_id: i64,
        patch: &TaskPatch,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<Task>, DrivenPortError> {
        let mut cxn = ext_cxn
            .database_cxn()
            .await
            .map_err(DrivenPortError::StoreUnavailable)?;

        let updated = query_as::<_, TaskRow>(
            "UPDATE tasks SET \
                title = COALESCE($1, title), \
                description = COALESCE($2, description), \
                completed = COALESCE($3, completed), \
                updated_at = now() \
             WHERE id = $4 \
             RETURNING id, title, description, completed, created_at",
        )
        .bind(patch.title.as_deref())
        .bind(patch.description.as_deref())
        .bind(patch.completed)
        .bind(task_id)
        .fetch_optional(cxn.borrow_connection())
        .await
        .map_err(|err| port_error(err, "trying to update a task in the database"))?
        .map(Task::from);

        Ok(updated)
    }

    async fn delete(
        &self,
        task_id: i64,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<bool, DrivenPortError> {
        let mut cxn = ext_cxn
            .database_cxn()
            .await
            .map_err(DrivenPortError::StoreUnavailable)?;

        let outcome = query("DELETE FROM tasks WHERE id = $1")
            .bind(task_id)
            .execute(cxn.borrow_connection())
            .await
            .map_err(|err| port_error(err, "trying to remove a task from the database"))?;

        Ok(outcome.rows_affected() > 0)
    }
}
