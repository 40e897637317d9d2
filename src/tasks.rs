use chrono::naive::NaiveDateTime;

use crate::storage::UpdateTaskValues;

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Task {
    pub id: i64,
    pub user_id: i64,
    pub folder_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub priority: i32,
    pub status: String,
    pub due_date: Option<NaiveDateTime>,
    pub is_calendar_event: bool,
    pub calendar_event_id: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Task {
    /// Status of a task that has not been touched yet
    pub const DEFAULT_STATUS: &'static str = "pending";

    /// Priority of a task created without one
    pub const DEFAULT_PRIORITY: i32 = 1;

    /// Apply a partial update on top of the current state
    ///
    /// Fields that are absent from the values stay untouched; nullable
    /// fields carry an explicit inner `None` to be cleared. Timestamps are
    /// left alone, stamping `updated_at` is up to the storage.
    pub fn with_update(&self, values: &UpdateTaskValues<'_>) -> Self {
        Self {
            id: self.id,
            user_id: self.user_id,
            folder_id: match values.folder_id {
                Some(folder_id) => folder_id,
                None => self.folder_id,
            },
            title: values
                .title
                .map_or_else(|| self.title.clone(), ToString::to_string),
            description: match &values.description {
                Some(description) => description.map(ToString::to_string),
                None => self.description.clone(),
            },
            priority: values.priority.unwrap_or(self.priority),
            status: values
                .status
                .map_or_else(|| self.status.clone(), ToString::to_string),
            due_date: match values.due_date {
                Some(due_date) => due_date,
                None => self.due_date,
            },
            is_calendar_event: values.is_calendar_event.unwrap_or(self.is_calendar_event),
            calendar_event_id: self.calendar_event_id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct TaskSubstep {
    pub id: i64,
    pub task_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub order_index: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Clone, Debug)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct TaskNote {
    pub id: i64,
    pub task_id: i64,
    pub content: String,
    pub created_at: NaiveDateTime,
}
