//! Diary API endpoints
//!
//! Everything related to diary management; an entry is addressed by its
//! date and folder, not by its row ID

use axum::Extension;
use chrono::naive::NaiveDate;
use chrono::naive::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;

use crate::diary::DiaryEntry;
use crate::folders::Folder;
use crate::storage::DiaryEntryFilter;
use crate::storage::Storage;
use crate::storage::UpsertDiaryEntryValues;
use crate::storage::UpsertOutcome;
use crate::users::User;

use super::CurrentUser;
use super::Error;
use super::Form;
use super::QueryParameters;
use super::Success;
use super::parse_mood;

/// Diary entry response going to the user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiaryEntryResponse {
    /// Entry ID
    pub id: i64,

    /// Folder the entry lives in, if any
    pub folder_id: Option<i64>,

    /// The date the entry is about
    pub entry_date: NaiveDate,

    /// Optional title
    pub title: Option<String>,

    /// Content of the entry
    pub content: String,

    /// Optional mood, 1 through 5
    pub mood: Option<i32>,

    /// Optional weather description
    pub weather: Option<String>,

    /// Creation date
    pub created_at: NaiveDateTime,

    /// Last updated at
    pub updated_at: NaiveDateTime,
}

impl DiaryEntryResponse {
    /// Create a response from a [`DiaryEntry`](DiaryEntry)
    fn from_entry(entry: DiaryEntry) -> Self {
        Self {
            id: entry.id,
            folder_id: entry.folder_id,
            entry_date: entry.entry_date,
            title: entry.title,
            content: entry.content,
            mood: entry.mood,
            weather: entry.weather,
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }

    /// Create a response from multiple [`DiaryEntry`](DiaryEntry)s
    fn from_entry_multiple(mut entries: Vec<DiaryEntry>) -> Vec<Self> {
        entries
            .drain(..)
            .map(Self::from_entry)
            .collect::<Vec<Self>>()
    }
}

/// Query parameters for listing diary entries
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDiaryQuery {
    /// Only entries for this date
    entry_date: Option<NaiveDate>,

    /// Only entries in this folder
    folder_id: Option<i64>,
}

/// List all diary entries of the current user, newest date first
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     'http://localhost:8000/api/diary?entryDate=2024-05-17'
/// ```
///
/// Response:
/// ```json
/// { "data": [ { "id": 1, "entryDate": "2024-05-17", "content": "Long day" ... } ] }
/// ```
pub async fn list<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    QueryParameters(query): QueryParameters<ListDiaryQuery>,
) -> Result<Success<Vec<DiaryEntryResponse>>, Error> {
    let filter = DiaryEntryFilter {
        entry_date: query.entry_date,
        folder_id: query.folder_id,
    };

    let entries = storage
        .find_all_diary_entries(&current_user, &filter)
        .await
        .map_err(Error::storage)?;

    Ok(Success::ok(DiaryEntryResponse::from_entry_multiple(
        entries,
    )))
}

/// Upsert diary entry form
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertDiaryEntryForm {
    /// The date the entry is about, part of the natural key
    entry_date: NaiveDate,

    /// Optional folder, part of the natural key; must already exist and
    /// belong to the current user
    folder_id: Option<i64>,

    /// Optional title
    title: Option<String>,

    /// Content of the entry
    content: String,

    /// Optional mood, 1 through 5
    mood: Option<i32>,

    /// Optional weather description
    weather: Option<String>,
}

/// Upsert a diary entry based on the [`UpsertDiaryEntryForm`](UpsertDiaryEntryForm) form
///
/// One entry per date and folder: writing the same date and folder again
/// overwrites title, content, mood and weather of the existing entry instead
/// of growing a second one. A fresh entry answers with `201`, an overwrite
/// with `200`
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "entryDate": "2024-05-17", "content": "Long day", "mood": 2 }' \
///     http://localhost:8000/api/diary
/// ```
///
/// Response
/// ```json
/// { "data": { "id": 1, "entryDate": "2024-05-17", "content": "Long day" ... } }
/// ```
pub async fn upsert<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    Form(form): Form<UpsertDiaryEntryForm>,
) -> Result<Success<DiaryEntryResponse>, Error> {
    let mood = form.mood.map(parse_mood).transpose()?;

    // A folder of another user is a folder that does not exist
    let folder_id = if let Some(folder_id) = form.folder_id {
        let folder = fetch_folder(&storage, &current_user, folder_id).await?;

        Some(folder.id)
    } else {
        None
    };

    let values = UpsertDiaryEntryValues {
        user: &current_user,
        folder_id,
        entry_date: form.entry_date,
        title: form.title.as_deref(),
        content: &form.content,
        mood,
        weather: form.weather.as_deref(),
    };

    let outcome = storage
        .upsert_diary_entry(&values)
        .await
        .map_err(Error::storage)?;

    match outcome {
        UpsertOutcome::Created(entry) => {
            Ok(Success::created(DiaryEntryResponse::from_entry(entry)))
        }
        UpsertOutcome::Updated(entry) => Ok(Success::ok(DiaryEntryResponse::from_entry(entry))),
    }
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
