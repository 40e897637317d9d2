//! Memory storage
//!
//! Will be destroyed on system shutdown

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

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

/// Everything in storage, behind a single lock
///
/// One lock keeps multi-entity operations (cascading deletes, the diary
/// upsert) atomic without any further coordination.
#[derive(Debug, Default)]
struct Inner {
    /// Last handed out identifier, shared by all entities
    last_id: i64,

    /// All users in storage
    users: HashMap<i64, User>,

    /// All folders in storage
    folders: HashMap<i64, Folder>,

    /// All tasks in storage
    tasks: HashMap<i64, Task>,

    /// All substeps in storage
    substeps: HashMap<i64, TaskSubstep>,

    /// All notes in storage
    notes: HashMap<i64, TaskNote>,

    /// All diary entries in storage
    diary_entries: HashMap<i64, DiaryEntry>,
}

impl Inner {
    /// Hand out a fresh identifier
    fn assign_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }
}

/// An in-memory storage
///
/// Will be destroyed on system shutdown
#[derive(Clone, Debug)]
pub struct Memory {
    inner: Arc<Mutex<Inner>>,
}

impl Memory {
    /// Create a new empty Memory storage
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for Memory {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn count_users(&self) -> Result<i64> {
        let inner = self.inner.lock().await;

        Ok(i64::try_from(inner.users.len()).expect("user count fits in i64"))
    }

    async fn find_single_user_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.inner.lock().await.users.get(&id).cloned())
    }

    async fn find_single_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .inner
            .lock()
            .await
            .users
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn create_user(&self, values: &CreateUserValues) -> Result<User> {
        let mut inner = self.inner.lock().await;

        if inner.users.values().any(|user| user.email == values.email) {
            return Err(Error::Conflict(format!(
                "email already taken: {}",
                values.email
            )));
        }

        let user = User {
            id: inner.assign_id(),
            email: values.email.to_string(),
            name: values.name.to_string(),
            calendar_token: None,
            calendar_refresh_token: None,
            created_at: Utc::now().naive_utc(),
        };

        inner.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn delete_user(&self, user: &User) -> Result<()> {
        let mut inner = self.inner.lock().await;

        let task_ids: Vec<i64> = inner
            .tasks
            .values()
            .filter(|task| task.user_id == user.id)
            .map(|task| task.id)
            .collect();

        inner
            .substeps
            .retain(|_, substep| !task_ids.contains(&substep.task_id));
        inner
            .notes
            .retain(|_, note| !task_ids.contains(&note.task_id));
        inner.tasks.retain(|_, task| task.user_id != user.id);
        inner
            .diary_entries
            .retain(|_, entry| entry.user_id != user.id);
        inner.folders.retain(|_, folder| folder.user_id != user.id);
        inner.users.remove(&user.id);

        Ok(())
    }

    async fn find_all_folders(&self, user: &User) -> Result<Vec<Folder>> {
        let inner = self.inner.lock().await;

        let mut folders: Vec<Folder> = inner
            .folders
            .values()
            .filter(|folder| folder.user_id == user.id)
            .cloned()
            .collect();

        folders.sort_by_key(|folder| folder.id);

        Ok(folders)
    }

    async fn find_single_folder_by_id(&self, user: &User, id: i64) -> Result<Option<Folder>> {
        Ok(self
            .inner
            .lock()
            .await
            .folders
            .get(&id)
            .filter(|folder| folder.user_id == user.id)
            .cloned())
    }

    async fn create_folder(&self, values: &CreateFolderValues) -> Result<Folder> {
        let mut inner = self.inner.lock().await;

        let folder = Folder {
            id: inner.assign_id(),
            user_id: values.user.id,
            name: values.name.to_string(),
            color: values.color.to_string(),
            parent_folder_id: values.parent_folder_id,
            created_at: Utc::now().naive_utc(),
        };

        inner.folders.insert(folder.id, folder.clone());

        Ok(folder)
    }

    async fn delete_folder(&self, folder: &Folder) -> Result<()> {
        let mut inner = self.inner.lock().await;

        // Worklist over the folder tree; the membership check keeps a
        // corrupted parent cycle from looping forever
        let mut doomed = vec![folder.id];
        let mut index = 0;
        while index < doomed.len() {
            let parent_id = doomed[index];
            index += 1;

            let children: Vec<i64> = inner
                .folders
                .values()
                .filter(|folder| {
                    folder.parent_folder_id == Some(parent_id) && !doomed.contains(&folder.id)
                })
                .map(|folder| folder.id)
                .collect();

            doomed.extend(children);
        }

        for task in inner.tasks.values_mut() {
            if task.folder_id.is_some_and(|id| doomed.contains(&id)) {
                task.folder_id = None;
            }
        }

        for entry in inner.diary_entries.values_mut() {
            if entry.folder_id.is_some_and(|id| doomed.contains(&id)) {
                entry.folder_id = None;
            }
        }

        for id in &doomed {
            inner.folders.remove(id);
        }

        Ok(())
    }

    async fn find_all_tasks(&self, user: &User, folder_id: Option<i64>) -> Result<Vec<Task>> {
        let inner = self.inner.lock().await;

        let mut tasks: Vec<Task> = inner
            .tasks
            .values()
            .filter(|task| {
                task.user_id == user.id && folder_id.is_none_or(|id| task.folder_id == Some(id))
            })
            .cloned()
            .collect();

        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(tasks)
    }

    async fn find_single_task_by_id(&self, user: &User, id: i64) -> Result<Option<Task>> {
        Ok(self
            .inner
            .lock()
            .await
            .tasks
            .get(&id)
            .filter(|task| task.user_id == user.id)
            .cloned())
    }

    async fn create_task(&self, values: &CreateTaskValues) -> Result<Task> {
        let mut inner = self.inner.lock().await;

        let task = Task {
            id: inner.assign_id(),
            user_id: values.user.id,
            folder_id: values.folder_id,
            title: values.title.to_string(),
            description: values.description.map(ToString::to_string),
            priority: values.priority,
            status: Task::DEFAULT_STATUS.to_string(),
            due_date: values.due_date,
            is_calendar_event: values.is_calendar_event,
            calendar_event_id: None,
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        };

        inner.tasks.insert(task.id, task.clone());

        Ok(task)
    }

    async fn update_task(&self, task: &Task, values: &UpdateTaskValues) -> Result<Task> {
        let mut inner = self.inner.lock().await;

        Ok(inner
            .tasks
            .get_mut(&task.id)
            .map(|task| {
                *task = task.with_update(values);
                task.updated_at = Utc::now().naive_utc();

                task.clone()
            })
            .expect("HashMap is the source of the task"))
    }

    async fn set_task_calendar_event_id(&self, task: &Task, event_id: &str) -> Result<Task> {
        let mut inner = self.inner.lock().await;

        Ok(inner
            .tasks
            .get_mut(&task.id)
            .map(|task| {
                task.calendar_event_id = Some(event_id.to_string());
                task.updated_at = Utc::now().naive_utc();

                task.clone()
            })
            .expect("HashMap is the source of the task"))
    }

    async fn delete_task(&self, task: &Task) -> Result<()> {
        let mut inner = self.inner.lock().await;

        inner.substeps.retain(|_, substep| substep.task_id != task.id);
        inner.notes.retain(|_, note| note.task_id != task.id);
        inner.tasks.remove(&task.id);

        Ok(())
    }

    async fn find_all_substeps_by_tasks(&self, tasks: &[Task]) -> Result<Vec<TaskSubstep>> {
        let inner = self.inner.lock().await;

        let task_ids: Vec<i64> = tasks.iter().map(|task| task.id).collect();

        let mut substeps: Vec<TaskSubstep> = inner
            .substeps
            .values()
            .filter(|substep| task_ids.contains(&substep.task_id))
            .cloned()
            .collect();

        substeps.sort_by(|a, b| a.order_index.cmp(&b.order_index).then(a.id.cmp(&b.id)));

        Ok(substeps)
    }

    async fn create_substep(
        &self,
        task: &Task,
        values: &CreateSubstepValues,
    ) -> Result<TaskSubstep> {
        let mut inner = self.inner.lock().await;

        let substep = TaskSubstep {
            id: inner.assign_id(),
            task_id: task.id,
            title: values.title.to_string(),
            description: values.description.map(ToString::to_string),
            completed: false,
            order_index: values.order_index,
            created_at: Utc::now().naive_utc(),
        };

        inner.substeps.insert(substep.id, substep.clone());

        Ok(substep)
    }

    async fn find_all_notes_by_tasks(&self, tasks: &[Task]) -> Result<Vec<TaskNote>> {
        let inner = self.inner.lock().await;

        let task_ids: Vec<i64> = tasks.iter().map(|task| task.id).collect();

        let mut notes: Vec<TaskNote> = inner
            .notes
            .values()
            .filter(|note| task_ids.contains(&note.task_id))
            .cloned()
            .collect();

        notes.sort_by_key(|note| note.id);

        Ok(notes)
    }

    async fn create_note(&self, task: &Task, values: &CreateNoteValues) -> Result<TaskNote> {
        let mut inner = self.inner.lock().await;

        let note = TaskNote {
            id: inner.assign_id(),
            task_id: task.id,
            content: values.content.to_string(),
            created_at: Utc::now().naive_utc(),
        };

        inner.notes.insert(note.id, note.clone());

        Ok(note)
    }

    async fn find_all_diary_entries(
        &self,
        user: &User,
        filter: &DiaryEntryFilter,
    ) -> Result<Vec<DiaryEntry>> {
        let inner = self.inner.lock().await;

        let mut entries: Vec<DiaryEntry> = inner
            .diary_entries
            .values()
            .filter(|entry| {
                entry.user_id == user.id
                    && filter.entry_date.is_none_or(|date| entry.entry_date == date)
                    && filter.folder_id.is_none_or(|id| entry.folder_id == Some(id))
            })
            .cloned()
            .collect();

        entries.sort_by(|a, b| b.entry_date.cmp(&a.entry_date).then(b.id.cmp(&a.id)));

        Ok(entries)
    }

    async fn upsert_diary_entry(&self, values: &UpsertDiaryEntryValues) -> Result<UpsertOutcome> {
        let mut inner = self.inner.lock().await;

        // Natural key match; `Option` equality makes an absent folder match
        // absent folders only
        let existing = inner.diary_entries.values_mut().find(|entry| {
            entry.user_id == values.user.id
                && entry.entry_date == values.entry_date
                && entry.folder_id == values.folder_id
        });

        if let Some(entry) = existing {
            entry.title = values.title.map(ToString::to_string);
            entry.content = values.content.to_string();
            entry.mood = values.mood;
            entry.weather = values.weather.map(ToString::to_string);
            entry.updated_at = Utc::now().naive_utc();

            return Ok(UpsertOutcome::Updated(entry.clone()));
        }

        let entry = DiaryEntry {
            id: inner.assign_id(),
            user_id: values.user.id,
            folder_id: values.folder_id,
            entry_date: values.entry_date,
            title: values.title.map(ToString::to_string),
            content: values.content.to_string(),
            mood: values.mood,
            weather: values.weather.map(ToString::to_string),
            created_at: Utc::now().naive_utc(),
            updated_at: Utc::now().naive_utc(),
        };

        inner.diary_entries.insert(entry.id, entry.clone());

        Ok(UpsertOutcome::Created(entry))
    }
}
