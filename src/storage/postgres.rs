//! Postgres storage

use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use crate::diary::DiaryEntry;
use crate::folders::Folder;
use crate::tasks::Task;
use crate::tasks::TaskNote;
use crate::tasks::TaskSubstep;
use crate::users::User;

use super::CreateFolderValues;
use super::CreateNoteValues;
use super::CreateSubstepValues;
use super::CreateTaskValues;
use super::CreateUserValues;
use super::DiaryEntryFilter;
use super::Error;
use super::Result;
use super::Storage;
use super::UpdateTaskValues;
use super::UpsertDiaryEntryValues;
use super::UpsertOutcome;

/// Migrator to run migrations on startup
static MIGRATOR: Migrator = sqlx::migrate!();

/// Postgres storage
///
/// The schema carries the relational rules: cascading deletes for owned
/// entities, set-null for folder references, and the unique natural key of
/// diary entries (`NULLS NOT DISTINCT`, so PostgreSQL 15 or newer).
#[derive(Clone)]
pub struct Postgres {
    /// Pool of connections
    connection_pool: PgPool,
}

impl Postgres {
    /// Create Postgres storage
    ///
    /// Use the `DATABASE_URL` environment variable
    ///
    /// Migrations will be run
    pub async fn new() -> Self {
        let database_connection_string = std::env::var("DATABASE_URL").expect("Valid DATABASE_URL");

        let connection_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_connection_string)
            .await
            .expect("Valid connection");

        Self::new_with_pool(connection_pool).await
    }

    /// Create Postgres storage with existing pool
    ///
    /// Migrations will be run
    pub async fn new_with_pool(connection_pool: PgPool) -> Self {
        let migration_result = MIGRATOR.run(&connection_pool).await;

        if let Err(err) = migration_result {
            panic!("Migrations could not run: {err}");
        }

        Self { connection_pool }
    }
}

#[async_trait]
impl Storage for Postgres {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.connection_pool)
            .await
            .map_err(storage_error)?;

        Ok(())
    }

    async fn count_users(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.connection_pool)
            .await
            .map_err(storage_error)?;

        Ok(count)
    }

    async fn find_single_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "
            SELECT *
            FROM users
            WHERE id = $1
            LIMIT 1
            ",
        )
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(user)
    }

    async fn find_single_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "
            SELECT *
            FROM users
            WHERE email = $1
            LIMIT 1
            ",
        )
        .bind(email)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(user)
    }

    async fn create_user(&self, values: &CreateUserValues) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            "
            INSERT INTO users (email, name)
            VALUES ($1, $2)
            RETURNING *
            ",
        )
        .bind(values.email)
        .bind(values.name)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(user)
    }

    async fn delete_user(&self, user: &User) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user.id)
            .execute(&self.connection_pool)
            .await
            .map_err(storage_error)?;

        Ok(())
    }

    async fn find_all_folders(&self, user: &User) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(
            "
            SELECT *
            FROM folders
            WHERE user_id = $1
            ORDER BY id
            ",
        )
        .bind(user.id)
        .fetch_all(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(folders)
    }

    async fn find_single_folder_by_id(&self, user: &User, id: i64) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(
            "
            SELECT *
            FROM folders
            WHERE user_id = $1 AND id = $2
            LIMIT 1
            ",
        )
        .bind(user.id)
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(folder)
    }

    async fn create_folder(&self, values: &CreateFolderValues) -> Result<Folder> {
        let folder = sqlx::query_as::<_, Folder>(
            "
            INSERT INTO folders (user_id, name, color, parent_folder_id)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            ",
        )
        .bind(values.user.id)
        .bind(values.name)
        .bind(values.color)
        .bind(values.parent_folder_id)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(folder)
    }

    async fn delete_folder(&self, folder: &Folder) -> Result<()> {
        sqlx::query("DELETE FROM folders WHERE id = $1")
            .bind(folder.id)
            .execute(&self.connection_pool)
            .await
            .map_err(storage_error)?;

        Ok(())
    }

    async fn find_all_tasks(&self, user: &User, folder_id: Option<i64>) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            "
            SELECT *
            FROM tasks
            WHERE user_id = $1 AND ($2::BIGINT IS NULL OR folder_id = $2)
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user.id)
        .bind(folder_id)
        .fetch_all(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(tasks)
    }

    async fn find_single_task_by_id(&self, user: &User, id: i64) -> Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(
            "
            SELECT *
            FROM tasks
            WHERE user_id = $1 AND id = $2
            LIMIT 1
            ",
        )
        .bind(user.id)
        .bind(id)
        .fetch_optional(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(task)
    }

    async fn create_task(&self, values: &CreateTaskValues) -> Result<Task> {
        let task = sqlx::query_as::<_, Task>(
            "
            INSERT INTO tasks (user_id, folder_id, title, description, priority, due_date, is_calendar_event)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            ",
        )
        .bind(values.user.id)
        .bind(values.folder_id)
        .bind(values.title)
        .bind(values.description)
        .bind(values.priority)
        .bind(values.due_date)
        .bind(values.is_calendar_event)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(task)
    }

    async fn update_task(&self, task: &Task, values: &UpdateTaskValues) -> Result<Task> {
        let applied = task.with_update(values);

        let updated_task = sqlx::query_as::<_, Task>(
            "
            UPDATE tasks
            SET folder_id = $1, title = $2, description = $3, priority = $4, status = $5,
                due_date = $6, is_calendar_event = $7, updated_at = CURRENT_TIMESTAMP
            WHERE id = $8
            RETURNING *
            ",
        )
        .bind(applied.folder_id)
        .bind(&applied.title)
        .bind(&applied.description)
        .bind(applied.priority)
        .bind(&applied.status)
        .bind(applied.due_date)
        .bind(applied.is_calendar_event)
        .bind(task.id)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(updated_task)
    }

    async fn set_task_calendar_event_id(&self, task: &Task, event_id: &str) -> Result<Task> {
        let updated_task = sqlx::query_as::<_, Task>(
            "
            UPDATE tasks
            SET calendar_event_id = $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2
            RETURNING *
            ",
        )
        .bind(event_id)
        .bind(task.id)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(updated_task)
    }

    async fn delete_task(&self, task: &Task) -> Result<()> {
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task.id)
            .execute(&self.connection_pool)
            .await
            .map_err(storage_error)?;

        Ok(())
    }

    async fn find_all_substeps_by_tasks(&self, tasks: &[Task]) -> Result<Vec<TaskSubstep>> {
        let task_ids: Vec<i64> = tasks.iter().map(|task| task.id).collect();

        let substeps = sqlx::query_as::<_, TaskSubstep>(
            "
            SELECT *
            FROM task_substeps
            WHERE task_id = ANY($1)
            ORDER BY order_index, id
            ",
        )
        .bind(&task_ids)
        .fetch_all(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(substeps)
    }

    async fn create_substep(
        &self,
        task: &Task,
        values: &CreateSubstepValues,
    ) -> Result<TaskSubstep> {
        let substep = sqlx::query_as::<_, TaskSubstep>(
            "
            INSERT INTO task_substeps (task_id, title, description, order_index)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            ",
        )
        .bind(task.id)
        .bind(values.title)
        .bind(values.description)
        .bind(values.order_index)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(substep)
    }

    async fn find_all_notes_by_tasks(&self, tasks: &[Task]) -> Result<Vec<TaskNote>> {
        let task_ids: Vec<i64> = tasks.iter().map(|task| task.id).collect();

        let notes = sqlx::query_as::<_, TaskNote>(
            "
            SELECT *
            FROM task_notes
            WHERE task_id = ANY($1)
            ORDER BY id
            ",
        )
        .bind(&task_ids)
        .fetch_all(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(notes)
    }

    async fn create_note(&self, task: &Task, values: &CreateNoteValues) -> Result<TaskNote> {
        let note = sqlx::query_as::<_, TaskNote>(
            "
            INSERT INTO task_notes (task_id, content)
            VALUES ($1, $2)
            RETURNING *
            ",
        )
        .bind(task.id)
        .bind(values.content)
        .fetch_one(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(note)
    }

    async fn find_all_diary_entries(
        &self,
        user: &User,
        filter: &DiaryEntryFilter,
    ) -> Result<Vec<DiaryEntry>> {
        let entries = sqlx::query_as::<_, DiaryEntry>(
            "
            SELECT *
            FROM diary_entries
            WHERE user_id = $1
                AND ($2::DATE IS NULL OR entry_date = $2)
                AND ($3::BIGINT IS NULL OR folder_id = $3)
            ORDER BY entry_date DESC, id DESC
            ",
        )
        .bind(user.id)
        .bind(filter.entry_date)
        .bind(filter.folder_id)
        .fetch_all(&self.connection_pool)
        .await
        .map_err(storage_error)?;

        Ok(entries)
    }

    async fn upsert_diary_entry(&self, values: &UpsertDiaryEntryValues) -> Result<UpsertOutcome> {
        let mut transaction = self.connection_pool.begin().await.map_err(storage_error)?;

        let existing = sqlx::query_as::<_, DiaryEntry>(
            "
            SELECT *
            FROM diary_entries
            WHERE user_id = $1 AND entry_date = $2 AND folder_id IS NOT DISTINCT FROM $3
            FOR UPDATE
            ",
        )
        .bind(values.user.id)
        .bind(values.entry_date)
        .bind(values.folder_id)
        .fetch_optional(&mut *transaction)
        .await
        .map_err(storage_error)?;

        let outcome = if let Some(existing) = existing {
            let entry = sqlx::query_as::<_, DiaryEntry>(
                "
                UPDATE diary_entries
                SET title = $1, content = $2, mood = $3, weather = $4,
                    updated_at = CURRENT_TIMESTAMP
                WHERE id = $5
                RETURNING *
                ",
            )
            .bind(values.title)
            .bind(values.content)
            .bind(values.mood)
            .bind(values.weather)
            .bind(existing.id)
            .fetch_one(&mut *transaction)
            .await
            .map_err(storage_error)?;

            UpsertOutcome::Updated(entry)
        } else {
            // Two racing first writers both end up here; the unique natural
            // key turns the loser's insert into an update of the same row
            let entry = sqlx::query_as::<_, DiaryEntry>(
                "
                INSERT INTO diary_entries (user_id, folder_id, entry_date, title, content, mood, weather)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT ON CONSTRAINT diary_entries_natural_key DO UPDATE
                SET title = EXCLUDED.title, content = EXCLUDED.content, mood = EXCLUDED.mood,
                    weather = EXCLUDED.weather, updated_at = CURRENT_TIMESTAMP
                RETURNING *
                ",
            )
            .bind(values.user.id)
            .bind(values.folder_id)
            .bind(values.entry_date)
            .bind(values.title)
            .bind(values.content)
            .bind(values.mood)
            .bind(values.weather)
            .fetch_one(&mut *transaction)
            .await
            .map_err(storage_error)?;

            UpsertOutcome::Created(entry)
        };

        transaction.commit().await.map_err(storage_error)?;

        Ok(outcome)
    }
}

/// Convert a `SQLx` error to a storage error
///
/// Unique violations come back as [`Error::Conflict`], everything else as
/// [`Error::Connection`]
fn storage_error(err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(ref database_error) = err {
        if database_error.code().as_deref() == Some("23505") {
            return Error::Conflict(database_error.message().to_string());
        }
    }

    Error::Connection(err.to_string())
}
