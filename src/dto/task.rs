use crate::domain;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

/// Message returned whenever a title is missing or too short
pub const TITLE_RULE_MESSAGE: &str = "Title is required and must be at least 3 characters.";

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 10;

/// DTO for a task returned by the API
#[derive(Serialize, ToSchema)]
#[cfg_attr(test, derive(Deserialize, PartialEq, Eq, Debug))]
pub struct Task {
    #[schema(example = 4)]
    pub id: i64,
    #[schema(example = "Draft report")]
    pub title: String,
    #[schema(example = "")]
    pub description: String,
    #[schema(example = false)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl From<domain::task::Task> for Task {
    fn from(value: domain::task::Task) -> Self {
        Task {
            id: value.id,
            title: value.title,
            description: value.description,
            completed: value.completed,
            created_at: value.created_at,
        }
    }
}

/// DTO for creating a new task via the API
#[derive(Deserialize, Validate, ToSchema)]
#[cfg_attr(test, derive(Serialize))]
#[validate(schema(function = "title_present"))]
pub struct NewTask {
    #[validate(custom = "title_long_enough")]
    #[schema(value_type = String, example = "Draft report")]
    pub title: Option<String>,
    #[schema(example = "Draft the first version")]
    pub description: Option<String>,
    #[schema(example = false)]
    pub completed: Option<bool>,
}

fn title_rule_error(code: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(TITLE_RULE_MESSAGE));
    error
}

fn title_long_enough(title: &str) -> Result<(), ValidationError> {
    if title.chars().count() < 3 {
        return Err(title_rule_error("length"));
    }

    Ok(())
}

fn title_present(task: &NewTask) -> Result<(), ValidationError> {
    match task.title {
        Some(_) => Ok(()),
        None => Err(title_rule_error("required")),
    }
}

impl From<NewTask> for domain::task::NewTask {
    fn from(value: NewTask) -> Self {
        domain::task::NewTask {
            title: value.title.unwrap_or_default(),
            description: value.description,
            completed: value.completed,
        }
    }
}

/// DTO for changing some of a task's fields via the API. Absent fields are left alone.
#[derive(Deserialize, Validate, ToSchema)]
#[cfg_attr(test, derive(Serialize, Default))]
pub struct UpdateTask {
    #[validate(custom = "title_long_enough")]
    #[schema(example = "Draft the report")]
    pub title: Option<String>,
    pub description: Option<String>,
    #[schema(example = true)]
    pub completed: Option<bool>,
}

impl From<UpdateTask> for domain::task::TaskPatch {
    fn from(value: UpdateTask) -> Self {
        domain::task::TaskPatch {
            title: value.title,
            description: value.description,
            completed: value.completed,
        }
    }
}

/// Raw pagination parameters on the task listing. They stay strings so bad input can
/// fall back to the defaults instead of rejecting the request.
#[derive(IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number, defaults to 1
    #[param(value_type = Option<u32>, minimum = 1, example = 1)]
    pub page: Option<String>,
    /// Page size, defaults to 10
    #[param(value_type = Option<u32>, minimum = 1, example = 10)]
    pub limit: Option<String>,
}

/// Pagination parameters after defaults have been applied
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
#[display("page {page} (limit {limit})")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

fn positive_or(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

impl PageQuery {
    /// Picks `page` and `limit` out of query string pairs. The first value sent for a key wins.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut query = PageQuery::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "page" => &mut query.page,
                "limit" => &mut query.limit,
                _ => continue,
            };
            slot.get_or_insert(value);
        }

        query
    }

    pub fn resolve(&self) -> Pagination {
        Pagination {
            page: positive_or(self.page.as_deref(), DEFAULT_PAGE),
            limit: positive_or(self.limit.as_deref(), DEFAULT_LIMIT),
        }
    }
}
