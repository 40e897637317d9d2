//! All things related to the storage of users, folders, tasks and diary entries

use async_trait::async_trait;
use chrono::naive::NaiveDate;
use chrono::naive::NaiveDateTime;
use thiserror::Error;

use crate::diary::DiaryEntry;
use crate::folders::Folder;
use crate::tasks::Task;
use crate::tasks::TaskNote;
use crate::tasks::TaskSubstep;
use crate::users::User;

use memory::Memory;
#[cfg(feature = "postgres")]
use postgres::Postgres;

pub mod memory;
#[cfg(feature = "postgres")]
mod postgres;

/// Setup the storage
#[cfg(not(feature = "postgres"))]
#[allow(clippy::unused_async)]
pub async fn setup() -> Memory {
    Memory::new()
}

/// Setup the storage
#[cfg(feature = "postgres")]
pub async fn setup() -> Postgres {
    Postgres::new().await
}

/// Storage errors
#[derive(Debug, Error)]
pub enum Error {
    /// A connection error with the storage
    #[error("Connection error: {0}")]
    Connection(String),

    /// A uniqueness conflict, two writers raced for the same key
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Result type for all storage interactions
pub type Result<T> = core::result::Result<T, Error>;

/// Values to create a User
pub struct CreateUserValues<'a> {
    /// The email address, unique across all users
    pub email: &'a str,

    /// The display name
    pub name: &'a str,
}

/// Values to create a Folder
pub struct CreateFolderValues<'a> {
    /// The user creating the folder
    pub user: &'a User,

    /// The folder name
    pub name: &'a str,

    /// The display color
    pub color: &'a str,

    /// Optional parent folder, already checked against the user
    pub parent_folder_id: Option<i64>,
}

/// Values to create a Task
pub struct CreateTaskValues<'a> {
    /// The user creating the task
    pub user: &'a User,

    /// Optional folder, already checked against the user
    pub folder_id: Option<i64>,

    /// The task title
    pub title: &'a str,

    /// Optional longer description
    pub description: Option<&'a str>,

    /// The task priority
    pub priority: i32,

    /// Optional due timestamp
    pub due_date: Option<NaiveDateTime>,

    /// Whether the task should show up as a calendar event
    pub is_calendar_event: bool,
}

/// Values to update a Task
///
/// An outer `None` leaves the field untouched. For the nullable fields the
/// inner option distinguishes a new value from an explicit clear.
#[derive(Default)]
pub struct UpdateTaskValues<'a> {
    /// New title
    pub title: Option<&'a str>,

    /// New description, `Some(None)` clears it
    pub description: Option<Option<&'a str>>,

    /// New folder, `Some(None)` detaches the task from its folder
    pub folder_id: Option<Option<i64>>,

    /// New priority
    pub priority: Option<i32>,

    /// New status
    pub status: Option<&'a str>,

    /// New due timestamp, `Some(None)` clears it
    pub due_date: Option<Option<NaiveDateTime>>,

    /// New calendar-event flag
    pub is_calendar_event: Option<bool>,
}

/// Values to create a `TaskSubstep`
pub struct CreateSubstepValues<'a> {
    /// The substep title
    pub title: &'a str,

    /// Optional longer description
    pub description: Option<&'a str>,

    /// Position in the display order, advisory only
    pub order_index: i32,
}

/// Values to create a `TaskNote`
pub struct CreateNoteValues<'a> {
    /// Content of the note
    ///
    /// Can be anything
    pub content: &'a str,
}

/// Values to upsert a `DiaryEntry`
pub struct UpsertDiaryEntryValues<'a> {
    /// The user writing the entry
    pub user: &'a User,

    /// Optional folder, already checked against the user
    ///
    /// Part of the natural key: an absent folder only matches entries
    /// without one
    pub folder_id: Option<i64>,

    /// The date the entry is about, part of the natural key
    pub entry_date: NaiveDate,

    /// Optional title
    pub title: Option<&'a str>,

    /// Content of the entry
    pub content: &'a str,

    /// Optional mood, already validated at the boundary
    pub mood: Option<i32>,

    /// Optional weather description
    pub weather: Option<&'a str>,
}

/// Filters for listing diary entries
#[derive(Default)]
pub struct DiaryEntryFilter {
    /// Only entries for this date; `None` matches every date
    pub entry_date: Option<NaiveDate>,

    /// Only entries in this folder; `None` matches every folder,
    /// including entries without one
    pub folder_id: Option<i64>,
}

/// Result of a diary upsert
pub enum UpsertOutcome {
    /// No row matched the natural key, a fresh entry was inserted
    Created(DiaryEntry),

    /// An existing row matched and its mutable fields were overwritten
    Updated(DiaryEntry),
}

/// Storage with all supported operations
#[async_trait]
pub trait Storage: Clone + Send + Sync + 'static {
    /// Check whether the storage is reachable
    async fn ping(&self) -> Result<()>;

    /// Count all users
    async fn count_users(&self) -> Result<i64>;

    /// Find a single user by its ID
    async fn find_single_user_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Find a single user by its email address
    async fn find_single_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Create a single user
    ///
    /// Fails with [`Error::Conflict`] when the email address is taken
    async fn create_user(&self, values: &CreateUserValues) -> Result<User>;

    /// Delete a user and everything it owns
    ///
    /// Not exposed through the API
    #[allow(dead_code)]
    async fn delete_user(&self, user: &User) -> Result<()>;

    /// Find all folders of a user
    async fn find_all_folders(&self, user: &User) -> Result<Vec<Folder>>;

    /// Find a single folder by its ID, scoped to its owner
    ///
    /// Somebody else's folder comes back as `None`, same as a missing one
    async fn find_single_folder_by_id(&self, user: &User, id: i64) -> Result<Option<Folder>>;

    /// Create a folder
    async fn create_folder(&self, values: &CreateFolderValues) -> Result<Folder>;

    /// Delete a folder
    ///
    /// Child folders go with it; tasks and diary entries pointing at it
    /// stay behind with their folder reference cleared. Not exposed through
    /// the API
    #[allow(dead_code)]
    async fn delete_folder(&self, folder: &Folder) -> Result<()>;

    /// Find all tasks of a user, newest first, optionally limited to a folder
    async fn find_all_tasks(&self, user: &User, folder_id: Option<i64>) -> Result<Vec<Task>>;

    /// Find a single task by its ID, scoped to its owner
    ///
    /// Somebody else's task comes back as `None`, same as a missing one
    async fn find_single_task_by_id(&self, user: &User, id: i64) -> Result<Option<Task>>;

    /// Create a task
    async fn create_task(&self, values: &CreateTaskValues) -> Result<Task>;

    /// Apply a partial update to a task
    ///
    /// Stamps `updated_at`, even when all values are absent
    async fn update_task(&self, task: &Task, values: &UpdateTaskValues) -> Result<Task>;

    /// Store the external calendar event ID of a task
    async fn set_task_calendar_event_id(&self, task: &Task, event_id: &str) -> Result<Task>;

    /// Delete a task with its substeps and notes
    ///
    /// Not exposed through the API
    #[allow(dead_code)]
    async fn delete_task(&self, task: &Task) -> Result<()>;

    /// Find the substeps of the given tasks, ordered by their order index
    async fn find_all_substeps_by_tasks(&self, tasks: &[Task]) -> Result<Vec<TaskSubstep>>;

    /// Create a substep under a task
    async fn create_substep(
        &self,
        task: &Task,
        values: &CreateSubstepValues,
    ) -> Result<TaskSubstep>;

    /// Find the notes of the given tasks, oldest first
    async fn find_all_notes_by_tasks(&self, tasks: &[Task]) -> Result<Vec<TaskNote>>;

    /// Create a note under a task
    async fn create_note(&self, task: &Task, values: &CreateNoteValues) -> Result<TaskNote>;

    /// Find all diary entries of a user matching the filter, newest date first
    async fn find_all_diary_entries(
        &self,
        user: &User,
        filter: &DiaryEntryFilter,
    ) -> Result<Vec<DiaryEntry>>;

    /// Insert or update a diary entry by its natural key
    ///
    /// The key is (user, entry date, folder), where an absent folder only
    /// matches entries without one. An existing entry keeps its identifier
    /// and key; title, content, mood and weather are overwritten wholesale.
    async fn upsert_diary_entry(&self, values: &UpsertDiaryEntryValues) -> Result<UpsertOutcome>;
}
