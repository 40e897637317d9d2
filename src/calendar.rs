//! Best effort calendar synchronization
//!
//! Tasks marked as calendar events are mirrored to an external calendar after
//! they are stored; a calendar being down never fails the task itself

use std::time::Duration;

use async_trait::async_trait;
use chrono::naive::NaiveDateTime;
use thiserror::Error;

use crate::storage::Storage;
use crate::tasks::Task;
use crate::users::User;

/// Details of the event to mirror
#[derive(Debug)]
pub struct EventDetails<'a> {
    /// Title of the event
    pub title: &'a str,

    /// Optional longer description
    pub description: Option<&'a str>,

    /// Start of the event
    pub starts_at: NaiveDateTime,

    /// End of the event
    pub ends_at: NaiveDateTime,
}

/// Calendar interaction failure
#[derive(Debug, Error)]
#[error("Calendar unreachable: {0}")]
pub struct Error(pub String);

/// All interaction with an external calendar
#[async_trait]
pub trait CalendarSync: Clone + Send + Sync + 'static {
    /// Create an event on the calendar of a user
    ///
    /// Returns `None` when the user has no calendar connected
    async fn create_event(
        &self,
        user: &User,
        details: &EventDetails<'_>,
    ) -> Result<Option<String>, Error>;
}

/// Calendar that never syncs anything
///
/// Stands in until a real calendar integration is configured
#[derive(Clone, Copy, Debug)]
pub struct Disabled;

#[async_trait]
impl CalendarSync for Disabled {
    async fn create_event(
        &self,
        _user: &User,
        _details: &EventDetails<'_>,
    ) -> Result<Option<String>, Error> {
        Ok(None)
    }
}

/// Mirror a freshly created task to the calendar of its owner
///
/// The task is already stored when this runs; failures and timeouts are
/// logged and the stored task is returned untouched
pub async fn sync_created_task<S, C>(
    storage: &S,
    calendar: &C,
    user: &User,
    task: Task,
    timeout: Duration,
) -> Task
where
    S: Storage,
    C: CalendarSync,
{
    if !task.is_calendar_event {
        return task;
    }

    let Some(due_date) = task.due_date else {
        return task;
    };

    let details = EventDetails {
        title: &task.title,
        description: task.description.as_deref(),
        starts_at: due_date,
        ends_at: due_date,
    };

    match tokio::time::timeout(timeout, calendar.create_event(user, &details)).await {
        Ok(Ok(Some(event_id))) => {
            match storage.set_task_calendar_event_id(&task, &event_id).await {
                Ok(task) => task,
                Err(err) => {
                    tracing::warn!(
                        "Could not store calendar event ID for task {}: {err}",
                        task.id
                    );

                    task
                }
            }
        }
        Ok(Ok(None)) => {
            tracing::debug!("No calendar connected for user {}", user.id);

            task
        }
        Ok(Err(err)) => {
            tracing::warn!("Calendar sync failed for task {}: {err}", task.id);

            task
        }
        Err(_) => {
            tracing::warn!("Calendar sync timed out for task {}", task.id);

            task
        }
    }
}
