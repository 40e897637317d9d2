//! Tasks API endpoints
//!
//! Everything related to task management: the tasks themselves, their
//! substeps and their notes

use std::collections::HashMap;

use axum::Extension;
use chrono::naive::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;

use crate::calendar::CalendarSync;
use crate::calendar::sync_created_task;
use crate::config::Config;
use crate::folders::Folder;
use crate::storage::CreateNoteValues;
use crate::storage::CreateSubstepValues;
use crate::storage::CreateTaskValues;
use crate::storage::Storage;
use crate::storage::UpdateTaskValues;
use crate::tasks::Task;
use crate::tasks::TaskNote;
use crate::tasks::TaskSubstep;
use crate::users::User;

use super::CurrentUser;
use super::Error;
use super::Form;
use super::PathParameters;
use super::QueryParameters;
use super::Success;
use super::parse_title;
use super::patch_field;

/// Substep response going to the user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstepResponse {
    /// Substep ID
    pub id: i64,

    /// Title of the substep
    pub title: String,

    /// Optional longer description
    pub description: Option<String>,

    /// Whether the substep is done
    pub completed: bool,

    /// Position in the display order
    pub order_index: i32,

    /// Creation date
    pub created_at: NaiveDateTime,
}

impl SubstepResponse {
    /// Create a response from a [`TaskSubstep`](TaskSubstep)
    fn from_substep(substep: TaskSubstep) -> Self {
        Self {
            id: substep.id,
            title: substep.title,
            description: substep.description,
            completed: substep.completed,
            order_index: substep.order_index,
            created_at: substep.created_at,
        }
    }

    /// Create a response from multiple [`TaskSubstep`](TaskSubstep)s
    fn from_substep_multiple(mut substeps: Vec<TaskSubstep>) -> Vec<Self> {
        substeps
            .drain(..)
            .map(Self::from_substep)
            .collect::<Vec<Self>>()
    }
}

/// Note response going to the user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskNoteResponse {
    /// Note ID
    pub id: i64,

    /// Content of the note
    pub content: String,

    /// Creation date
    pub created_at: NaiveDateTime,
}

impl TaskNoteResponse {
    /// Create a response from a [`TaskNote`](TaskNote)
    fn from_note(note: TaskNote) -> Self {
        Self {
            id: note.id,
            content: note.content,
            created_at: note.created_at,
        }
    }

    /// Create a response from multiple [`TaskNote`](TaskNote)s
    fn from_note_multiple(mut notes: Vec<TaskNote>) -> Vec<Self> {
        notes.drain(..).map(Self::from_note).collect::<Vec<Self>>()
    }
}

/// Task response going to the user
///
/// Substeps and notes of the task ride along, so a listing needs no follow
/// up requests
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    /// Task ID
    pub id: i64,

    /// Folder the task lives in, if any
    pub folder_id: Option<i64>,

    /// Title of the task
    pub title: String,

    /// Optional longer description
    pub description: Option<String>,

    /// Priority of the task
    pub priority: i32,

    /// Status of the task
    pub status: String,

    /// Optional due timestamp
    pub due_date: Option<NaiveDateTime>,

    /// Whether the task shows up as a calendar event
    pub is_calendar_event: bool,

    /// ID of the mirrored calendar event, once synced
    pub calendar_event_id: Option<String>,

    /// Creation date
    pub created_at: NaiveDateTime,

    /// Last updated at
    pub updated_at: NaiveDateTime,

    /// The substeps of the task, in display order
    pub substeps: Vec<SubstepResponse>,

    /// The notes of the task, oldest first
    pub notes: Vec<TaskNoteResponse>,
}

impl TaskResponse {
    /// Create a response from a [`Task`](Task) with its substeps and notes
    fn from_task(task: Task, substeps: Vec<TaskSubstep>, notes: Vec<TaskNote>) -> Self {
        Self {
            id: task.id,
            folder_id: task.folder_id,
            title: task.title,
            description: task.description,
            priority: task.priority,
            status: task.status,
            due_date: task.due_date,
            is_calendar_event: task.is_calendar_event,
            calendar_event_id: task.calendar_event_id,
            created_at: task.created_at,
            updated_at: task.updated_at,
            substeps: SubstepResponse::from_substep_multiple(substeps),
            notes: TaskNoteResponse::from_note_multiple(notes),
        }
    }

    /// Create a response from multiple [`Task`](Task)s
    ///
    /// The substeps and notes are handed out to their tasks; both lists keep
    /// the order the storage returned them in
    fn from_task_multiple(
        mut tasks: Vec<Task>,
        substeps: Vec<TaskSubstep>,
        notes: Vec<TaskNote>,
    ) -> Vec<Self> {
        let mut substeps_by_task: HashMap<i64, Vec<TaskSubstep>> = HashMap::new();
        for substep in substeps {
            substeps_by_task
                .entry(substep.task_id)
                .or_default()
                .push(substep);
        }

        let mut notes_by_task: HashMap<i64, Vec<TaskNote>> = HashMap::new();
        for note in notes {
            notes_by_task.entry(note.task_id).or_default().push(note);
        }

        tasks
            .drain(..)
            .map(|task| {
                let substeps = substeps_by_task.remove(&task.id).unwrap_or_default();
                let notes = notes_by_task.remove(&task.id).unwrap_or_default();

                Self::from_task(task, substeps, notes)
            })
            .collect::<Vec<Self>>()
    }
}

/// Query parameters for listing tasks
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    /// Only tasks in this folder
    folder_id: Option<i64>,
}

/// List all tasks of the current user, newest first
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     'http://localhost:8000/api/tasks?folderId=1'
/// ```
///
/// Response:
/// ```json
/// { "data": [ { "id": 1, "title": "Buy milk", "substeps": [], "notes": [] } ] }
/// ```
pub async fn list<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    QueryParameters(query): QueryParameters<ListTasksQuery>,
) -> Result<Success<Vec<TaskResponse>>, Error> {
    let tasks = storage
        .find_all_tasks(&current_user, query.folder_id)
        .await
        .map_err(Error::storage)?;

    let substeps = storage
        .find_all_substeps_by_tasks(&tasks)
        .await
        .map_err(Error::storage)?;

    let notes = storage
        .find_all_notes_by_tasks(&tasks)
        .await
        .map_err(Error::storage)?;

    Ok(Success::ok(TaskResponse::from_task_multiple(
        tasks, substeps, notes,
    )))
}

/// Create task form
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskForm {
    /// Title of the task, can not be empty
    title: String,

    /// Optional longer description
    description: Option<String>,

    /// Optional folder, must already exist and belong to the current user
    folder_id: Option<i64>,

    /// Optional priority, defaults to [`Task::DEFAULT_PRIORITY`](Task::DEFAULT_PRIORITY)
    priority: Option<i32>,

    /// Optional due timestamp
    due_date: Option<NaiveDateTime>,

    /// Whether to mirror the task to the calendar of the current user
    is_calendar_event: Option<bool>,
}

/// Create a task based on the [`CreateTaskForm`](CreateTaskForm) form
///
/// Tasks marked as calendar event with a due date are mirrored to the
/// calendar of the current user after they are stored; a calendar failure
/// never fails the create itself
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "title": "Buy milk", "priority": 2 }' \
///     http://localhost:8000/api/tasks
/// ```
///
/// Response
/// ```json
/// { "data": { "id": 1, "title": "Buy milk" ... } }
/// ```
pub async fn create<S, C>(
    Extension(storage): Extension<S>,
    Extension(calendar): Extension<C>,
    Extension(config): Extension<Config>,
    current_user: CurrentUser<S>,
    Form(form): Form<CreateTaskForm>,
) -> Result<Success<TaskResponse>, Error>
where
    S: Storage,
    C: CalendarSync,
{
    let title = parse_title(&form.title)?;

    // A folder of another user is a folder that does not exist
    let folder_id = if let Some(folder_id) = form.folder_id {
        let folder = fetch_folder(&storage, &current_user, folder_id).await?;

        Some(folder.id)
    } else {
        None
    };

    let values = CreateTaskValues {
        user: &current_user,
        folder_id,
        title,
        description: form.description.as_deref(),
        priority: form.priority.unwrap_or(Task::DEFAULT_PRIORITY),
        due_date: form.due_date,
        is_calendar_event: form.is_calendar_event.unwrap_or(false),
    };

    let task = storage.create_task(&values).await.map_err(Error::storage)?;

    let task = sync_created_task(
        &storage,
        &calendar,
        &current_user,
        task,
        config.calendar_sync_timeout,
    )
    .await;

    Ok(Success::created(TaskResponse::from_task(
        task,
        Vec::new(),
        Vec::new(),
    )))
}

/// Update task form
///
/// Fields to update a task with, all fields are optional and are not touched
/// when not provided
///
/// For the nullable fields an explicit `null` clears the stored value, which
/// is not the same as leaving the field out
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskForm {
    /// New title, can not be empty
    title: Option<String>,

    /// New description, `null` clears it
    #[serde(default, deserialize_with = "patch_field")]
    description: Option<Option<String>>,

    /// New folder, `null` detaches the task from its folder
    #[serde(default, deserialize_with = "patch_field")]
    folder_id: Option<Option<i64>>,

    /// New priority
    priority: Option<i32>,

    /// New status
    status: Option<String>,

    /// New due timestamp, `null` clears it
    #[serde(default, deserialize_with = "patch_field")]
    due_date: Option<Option<NaiveDateTime>>,

    /// New calendar-event flag
    is_calendar_event: Option<bool>,
}

/// Update a task based on the [`UpdateTaskForm`](UpdateTaskForm) form
///
/// Only provided values are processed, unknown fields are ignored; the
/// update date is stamped even when nothing else changes
///
/// Request:
/// ```sh
/// curl -v -XPUT -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "status": "done", "dueDate": null }' \
///     http://localhost:8000/api/tasks/1
/// ```
///
/// Response
/// ```json
/// { "data": { "id": 1, "title": "Buy milk", "status": "done" ... } }
/// ```
pub async fn update<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters(task_id): PathParameters<i64>,
    Form(form): Form<UpdateTaskForm>,
) -> Result<Success<TaskResponse>, Error> {
    let task = fetch_task(&storage, &current_user, task_id).await?;

    let title = if let Some(ref title) = form.title {
        Some(parse_title(title)?)
    } else {
        None
    };

    // A new folder must exist and belong to the current user; an explicit
    // `null` detaches the task without a lookup
    let folder_id = match form.folder_id {
        Some(Some(folder_id)) => {
            let folder = fetch_folder(&storage, &current_user, folder_id).await?;

            Some(Some(folder.id))
        }
        Some(None) => Some(None),
        None => None,
    };

    let values = UpdateTaskValues {
        title,
        description: form
            .description
            .as_ref()
            .map(|description| description.as_deref()),
        folder_id,
        priority: form.priority,
        status: form.status.as_deref(),
        due_date: form.due_date,
        is_calendar_event: form.is_calendar_event,
    };

    let task = storage
        .update_task(&task, &values)
        .await
        .map_err(Error::storage)?;

    let substeps = storage
        .find_all_substeps_by_tasks(std::slice::from_ref(&task))
        .await
        .map_err(Error::storage)?;

    let notes = storage
        .find_all_notes_by_tasks(std::slice::from_ref(&task))
        .await
        .map_err(Error::storage)?;

    Ok(Success::ok(TaskResponse::from_task(task, substeps, notes)))
}

/// Create substep form
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubstepForm {
    /// Title of the substep
    title: String,

    /// Optional longer description
    description: Option<String>,

    /// Optional position in the display order
    order_index: Option<i32>,
}

/// Create a substep under a task
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "title": "Get a cart" }' \
///     http://localhost:8000/api/tasks/1/substeps
/// ```
///
/// Response
/// ```json
/// { "data": { "id": 1, "title": "Get a cart", "completed": false } }
/// ```
pub async fn create_substep<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters(task_id): PathParameters<i64>,
    Form(form): Form<CreateSubstepForm>,
) -> Result<Success<SubstepResponse>, Error> {
    let task = fetch_task(&storage, &current_user, task_id).await?;

    let values = CreateSubstepValues {
        title: &form.title,
        description: form.description.as_deref(),
        order_index: form.order_index.unwrap_or(0),
    };

    let substep = storage
        .create_substep(&task, &values)
        .await
        .map_err(Error::storage)?;

    Ok(Success::created(SubstepResponse::from_substep(substep)))
}

/// Create note form
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskNoteForm {
    /// Content of the note
    content: String,
}

/// Create a note under a task
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "content": "The corner store had none" }' \
///     http://localhost:8000/api/tasks/1/notes
/// ```
///
/// Response
/// ```json
/// { "data": { "id": 1, "content": "The corner store had none" } }
/// ```
pub async fn create_note<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    PathParameters(task_id): PathParameters<i64>,
    Form(form): Form<CreateTaskNoteForm>,
) -> Result<Success<TaskNoteResponse>, Error> {
    let task = fetch_task(&storage, &current_user, task_id).await?;

    let values = CreateNoteValues {
        content: &form.content,
    };

    let note = storage
        .create_note(&task, &values)
        .await
        .map_err(Error::storage)?;

    Ok(Success::created(TaskNoteResponse::from_note(note)))
}

/// Fetch a task from storage, scoped to its owner
///
/// A task of another user is a task that does not exist
async fn fetch_task<S: Storage>(storage: &S, user: &User, task_id: i64) -> Result<Task, Error> {
    storage
        .find_single_task_by_id(user, task_id)
        .await
        .map_err(Error::storage)?
        .map_or_else(|| Err(Error::not_found("Task not found")), Ok)
}

/// Fetch a folder from storage, scoped to its owner
async fn fetch_folder<S: Storage>(
    storage: &S,
    user: &User,
    folder_id: i64,
) -> Result<Folder, Error> {
    storage
        .find_single_folder_by_id(user, folder_id)
        .await
        .map_err(Error::storage)?
        .map_or_else(|| Err(Error::not_found("Folder not found")), Ok)
}
