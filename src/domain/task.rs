use crate::domain::Error;
use crate::domain::task::driven_ports::{TaskReader, TaskWriter};
use crate::external_connections::ExternalConnectivity;
use chrono::{DateTime, Utc};

/// A stored task
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Request to create a task. Optional fields fall back to defaults when absent.
#[derive(Debug)]
#[cfg_attr(test, derive(Clone, PartialEq, Eq))]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

/// A fully populated task which has not been assigned an ID yet
#[derive(PartialEq, Eq, Debug)]
#[cfg_attr(test, derive(Clone))]
pub struct TaskCandidate {
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// A set of field changes for a task. Fields left as `None` keep their current value.
#[derive(Debug, Default)]
#[cfg_attr(test, derive(Clone, PartialEq, Eq))]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl TaskPatch {
    /// Resolves this patch against the current state of a task, producing a patch
    /// where every field is populated
    fn merged_onto(&self, existing: &Task) -> TaskPatch {
        TaskPatch {
            title: Some(self.title.clone().unwrap_or_else(|| existing.title.clone())),
            description: Some(
                self.description
                    .clone()
                    .unwrap_or_else(|| existing.description.clone()),
            ),
            completed: Some(self.completed.unwrap_or(existing.completed)),
        }
    }
}

pub mod driven_ports {
    use super::*;
    use crate::domain::DrivenPortError;

    pub trait TaskReader {
        /// Fetches up to [limit] tasks after skipping [offset], newest ID first
        async fn list(
            &self,
            offset: i64,
            limit: i64,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<Task>, DrivenPortError>;

        async fn find_by_id(
            &self,
            task_id: i64,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<Task>, DrivenPortError>;
    }

    pub trait TaskWriter {
        /// Stores a new task, returning it with its generated ID
        async fn insert(
            &self,
            candidate: &TaskCandidate,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Task, DrivenPortError>;

        /// Writes the populated fields of [patch] to a task. Returns `None` if no task has the given ID.
        async fn update(
            &self,
            task_id: i64,
            patch: &TaskPatch,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<Task>, DrivenPortError>;

        /// Removes a task, reporting whether a row was actually deleted
        async fn delete(
            &self,
            task_id: i64,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, DrivenPortError>;
    }
}

pub mod driving_ports {
    use super::*;

    pub trait TaskPort {
        async fn get_tasks(
            &self,
            page: u32,
            limit: u32,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl TaskReader,
        ) -> Result<Vec<Task>, Error>;
        async fn get_task_by_id(
            &self,
            task_id: i64,
            ext_cxn: &mut impl ExternalConnectivity,
            task_read: &impl TaskReader,
        ) -> Result<Option<Task>, Error>;
        async fn create_task(
            &self,
            new_task: &NewTask,
            ext_cxn: &mut impl ExternalConnectivity,
            task_write: &impl TaskWriter,
        ) -> Result<Task, Error>;
        async fn update_task(
            &self,
            existing: &Task,
            patch: &TaskPatch,
            ext_cxn: &mut impl ExternalConnectivity,
            task_write: &impl TaskWriter,
        ) -> Result<Option<Task>, Error>;
        async fn delete_task(
            &self,
            existing: &Task,
            ext_cxn: &mut impl ExternalConnectivity,
            task_write: &impl TaskWriter,
        ) -> Result<(), Error>;
    }
}

pub struct TaskService;

/// Rows to skip before the given 1-based page. Saturates at [i64::MAX] for pages far past the end.
fn page_offset(page: u32, limit: u32) -> i64 {
    i64::from(page.saturating_sub(1))
        .checked_mul(i64::from(limit))
        .unwrap_or(i64::MAX)
}

impl driving_ports::TaskPort for TaskService {
    async fn get_tasks(
        &self,
        page: u32,
        limit: u32,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl TaskReader,
    ) -> Result<Vec<Task>, Error> {
        task_read
            .list(page_offset(page, limit), i64::from(limit), &mut *ext_cxn)
            .await
            .map_err(|err| err.into_error_trying_to("fetch a page of tasks"))
    }

    async fn get_task_by_id(
        &self,
        task_id: i64,
        ext_cxn: &mut impl ExternalConnectivity,
        task_read: &impl TaskReader,
    ) -> Result<Option<Task>, Error> {
        task_read
            .find_by_id(task_id, &mut *ext_cxn)
            .await
            .map_err(|err| err.into_error_trying_to("fetch a task by ID"))
    }

    async fn create_task(
        &self,
        new_task: &NewTask,
        ext_cxn: &mut impl ExternalConnectivity,
        task_write: &impl TaskWriter,
    ) -> Result<Task, Error> {
        let candidate = TaskCandidate {
            title: new_task.title.clone(),
            description: new_task.description.clone().unwrap_or_default(),
            completed: new_task.completed.unwrap_or(false),
            created_at: Utc::now(),
        };

        task_write
            .insert(&candidate, &mut *ext_cxn)
            .await
            .map_err(|err| err.into_error_trying_to("create a task"))
    }

    async fn update_task(
        &self,
        existing: &Task,
        patch: &TaskPatch,
        ext_cxn: &mut impl ExternalConnectivity,
        task_write: &impl TaskWriter,
    ) -> Result<Option<Task>, Error> {
        let merged = patch.merged_onto(existing);

        task_write
            .update(existing.id, &merged, &mut *ext_cxn)
            .await
            .map_err(|err| err.into_error_trying_to("update a task"))
    }

    async fn delete_task(
        &self,
        existing: &Task,
        ext_cxn: &mut impl ExternalConnectivity,
        task_write: &impl TaskWriter,
    ) -> Result<(), Error> {
        // The caller already looked the task up, so a missing row means someone else won the race
        task_write
            .delete(existing.id, &mut *ext_cxn)
            .await
            .map_err(|err| err.into_error_trying_to("delete a task"))?;

        Ok(())
    }
}


#[cfg(test)]
pub mod test_util {
    use super::*;
    use crate::domain::DrivenPortError;
    use crate::domain::test_util::{Connectivity, FakeImplementation};
    use anyhow::anyhow;
    use chrono::TimeZone;
    use std::sync::{Mutex, RwLock};

    /// Fixed creation time for tasks seeded into fakes
    pub fn seeded_created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 16, 9, 30, 0).unwrap()
    }

    pub fn task_from_new(task_id: i64, new_task: &NewTask) -> Task {
        Task {
            id: task_id,
            title: new_task.title.clone(),
            description: new_task.description.clone().unwrap_or_default(),
            completed: new_task.completed.unwrap_or(false),
            created_at: seeded_created_at(),
        }
    }

    pub struct InMemoryTaskPersistence {
        pub tasks: Vec<Task>,
        pub connected: Connectivity,
        pub rejecting_writes: bool,
        highest_task_id: i64,
        update_calls: Vec<(i64, TaskPatch)>,
    }

    impl InMemoryTaskPersistence {
        pub fn new() -> InMemoryTaskPersistence {
            InMemoryTaskPersistence {
                tasks: Vec::new(),
                connected: Connectivity::Connected,
                rejecting_writes: false,
                highest_task_id: 0,
                update_calls: Vec::new(),
            }
        }

        pub fn new_with_tasks(tasks: &[NewTask]) -> InMemoryTaskPersistence {
            InMemoryTaskPersistence {
                tasks: tasks
                    .iter()
                    .enumerate()
                    .map(|(index, task)| task_from_new(index as i64 + 1, task))
                    .collect(),
                highest_task_id: tasks.len() as i64,
                ..Self::new()
            }
        }

        pub fn new_locked() -> RwLock<InMemoryTaskPersistence> {
            RwLock::new(Self::new())
        }

        /// Patches received by [driven_ports::TaskWriter::update], in call order
        pub fn update_calls(&self) -> &[(i64, TaskPatch)] {
            self.update_calls.as_slice()
        }

        fn check_writable(&self) -> Result<(), DrivenPortError> {
            self.connected
                .blow_up_if_disconnected()
                .map_err(DrivenPortError::StoreUnavailable)?;
            if self.rejecting_writes {
                return Err(DrivenPortError::ConstraintViolation(anyhow!(
                    "the store rejected the row"
                )));
            }

            Ok(())
        }
    }

    impl driven_ports::TaskReader for RwLock<InMemoryTaskPersistence> {
        async fn list(
            &self,
            offset: i64,
            limit: i64,
            _ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Vec<Task>, DrivenPortError> {
            let persistence = self.read().expect("task persist rw lock poisoned");
            persistence
                .connected
                .blow_up_if_disconnected()
                .map_err(DrivenPortError::StoreUnavailable)?;

            let mut newest_first = persistence.tasks.clone();
            newest_first.sort_by(|a, b| b.id.cmp(&a.id));

            Ok(newest_first
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect())
        }

        async fn find_by_id(
            &self,
            task_id: i64,
            _ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<Task>, DrivenPortError> {
            let persistence = self.read().expect("task persist rw lock poisoned");
            persistence
                .connected
                .blow_up_if_disconnected()
                .map_err(DrivenPortError::StoreUnavailable)?;

            Ok(persistence
                .tasks
                .iter()
                .find(|task| task.id == task_id)
                .cloned())
        }
    }

    impl driven_ports::TaskWriter for RwLock<InMemoryTaskPersistence> {
        async fn insert(
            &self,
            candidate: &TaskCandidate,
            _ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Task, DrivenPortError> {
            let mut persistence = self.write().expect("task persist rw lock poisoned");
            persistence.check_writable()?;

            persistence.highest_task_id += 1;
            let task = Task {
                id: persistence.highest_task_id,
                title: candidate.title.clone(),
                description: candidate.description.clone(),
                completed: candidate.completed,
                created_at: candidate.created_at,
            };
            persistence.tasks.push(task.clone());

            Ok(task)
        }

        async fn update(
            &self,
            task_id: i64,
            patch: &TaskPatch,
            _ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<Option<Task>, DrivenPortError> {
            let mut persistence = self.write().expect("task persist rw lock poisoned");
            persistence.check_writable()?;
            persistence.update_calls.push((task_id, patch.clone()));

            let Some(task) = persistence.tasks.iter_mut().find(|task| task.id == task_id) else {
                return Ok(None);
            };
            if let Some(ref title) = patch.title {
                task.title = title.clone();
            }
            if let Some(ref description) = patch.description {
                task.description = description.clone();
            }
            if let Some(completed) = patch.completed {
                task.completed = completed;
            }

            Ok(Some(task.clone()))
        }

        async fn delete(
            &self,
            task_id: i64,
            _ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<bool, DrivenPortError> {
            let mut persistence = self.write().expect("task persist rw lock poisoned");
            persistence.check_writable()?;

            let starting_len = persistence.tasks.len();
            persistence.tasks.retain(|task| task.id != task_id);

            Ok(persistence.tasks.len() < starting_len)
        }
    }

    pub struct MockTaskService {
        pub get_tasks_result: FakeImplementation<(u32, u32), Result<Vec<Task>, Error>>,
        pub get_task_by_id_result: FakeImplementation<i64, Result<Option<Task>, Error>>,
        pub create_task_result: FakeImplementation<NewTask, Result<Task, Error>>,
        pub update_task_result: FakeImplementation<(i64, TaskPatch), Result<Option<Task>, Error>>,
        pub delete_task_result: FakeImplementation<i64, Result<(), Error>>,
    }

    impl MockTaskService {
        pub fn new() -> MockTaskService {
            MockTaskService {
                get_tasks_result: FakeImplementation::new(),
                get_task_by_id_result: FakeImplementation::new(),
                create_task_result: FakeImplementation::new(),
                update_task_result: FakeImplementation::new(),
                delete_task_result: FakeImplementation::new(),
            }
        }

        pub fn new_locked() -> Mutex<MockTaskService> {
            Mutex::new(Self::new())
        }
    }

    impl driving_ports::TaskPort for Mutex<MockTaskService> {
        async fn get_tasks(
            &self,
            page: u32,
            limit: u32,
            _ext_cxn: &mut impl ExternalConnectivity,
            _task_read: &impl TaskReader,
        ) -> Result<Vec<Task>, Error> {
            let mut locked_self = self.lock().expect("mock task service mutex poisoned");
            locked_self.get_tasks_result.save_arguments((page, limit));

            locked_self.get_tasks_result.return_value_result()
        }

        async fn get_task_by_id(
            &self,
            task_id: i64,
            _ext_cxn: &mut impl ExternalConnectivity,
            _task_read: &impl TaskReader,
        ) -> Result<Option<Task>, Error> {
            let mut locked_self = self.lock().expect("mock task service mutex poisoned");
            locked_self.get_task_by_id_result.save_arguments(task_id);

            locked_self.get_task_by_id_result.return_value_result()
        }

        async fn create_task(
            &self,
            new_task: &NewTask,
            _ext_cxn: &mut impl ExternalConnectivity,
            _task_write: &impl TaskWriter,
        ) -> Result<Task, Error> {
            let mut locked_self = self.lock().expect("mock task service mutex poisoned");
            locked_self.create_task_result.save_arguments(new_task.clone());

            locked_self.create_task_result.return_value_result()
        }

        async fn update_task(
            &self,
            existing: &Task,
            patch: &TaskPatch,
            _ext_cxn: &mut impl ExternalConnectivity,
            _task_write: &impl TaskWriter,
        ) -> Result<Option<Task>, Error> {
            let mut locked_self = self.lock().expect("mock task service mutex poisoned");
            locked_self
                .update_task_result
                .save_arguments((existing.id, patch.clone()));

            locked_self.update_task_result.return_value_result()
        }

        async fn delete_task(
            &self,
            existing: &Task,
            _ext_cxn: &mut impl ExternalConnectivity,
            _task_write: &impl TaskWriter,
        ) -> Result<(), Error> {
            let mut locked_self = self.lock().expect("mock task service mutex poisoned");
            locked_self.delete_task_result.save_arguments(existing.id);

            locked_self.delete_task_result.return_value_result()
        }
    }
}
