//! Folders API endpoints
//!
//! Everything related to folder management

use axum::Extension;
use chrono::naive::NaiveDateTime;
use serde::Deserialize;
use serde::Serialize;

use crate::folders::Folder;
use crate::storage::CreateFolderValues;
use crate::storage::Storage;
use crate::users::User;

use super::CurrentUser;
use super::Error;
use super::Form;
use super::Success;

/// Folder response going to the user
///
/// Basically filtering which fields are shown to the user
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderResponse {
    /// Folder ID
    pub id: i64,

    /// Name of the folder
    pub name: String,

    /// Display color
    pub color: String,

    /// Parent folder, if the folder is nested
    pub parent_folder_id: Option<i64>,

    /// Creation date
    pub created_at: NaiveDateTime,
}

impl FolderResponse {
    /// Create a response from a [`Folder`](Folder)
    fn from_folder(folder: Folder) -> Self {
        Self {
            id: folder.id,
            name: folder.name,
            color: folder.color,
            parent_folder_id: folder.parent_folder_id,
            created_at: folder.created_at,
        }
    }

    /// Create a response from multiple [`Folder`](Folder)s
    fn from_folder_multiple(mut folders: Vec<Folder>) -> Vec<Self> {
        folders
            .drain(..)
            .map(Self::from_folder)
            .collect::<Vec<Self>>()
    }
}

/// List all folders of the current user
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     http://localhost:8000/api/folders
/// ```
///
/// Response:
/// ```json
/// { "data": [ { "id": 1, "name": "Work" ... } ] }
/// ```
pub async fn list<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
) -> Result<Success<Vec<FolderResponse>>, Error> {
    let folders = storage
        .find_all_folders(&current_user)
        .await
        .map_err(Error::storage)?;

    Ok(Success::ok(FolderResponse::from_folder_multiple(folders)))
}

/// Create folder form
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderForm {
    /// Name of the folder
    name: String,

    /// Optional display color, defaults to [`Folder::DEFAULT_COLOR`](Folder::DEFAULT_COLOR)
    color: Option<String>,

    /// Optional parent folder, must already exist and belong to the current user
    parent_folder_id: Option<i64>,
}

/// Create a folder based on the [`CreateFolderForm`](CreateFolderForm) form
///
/// Request:
/// ```sh
/// curl -v -H 'Content-Type: application/json' \
///     -H 'Authorization: Bearer tokentokentoken' \
///     -d '{ "name": "Work" }' \
///     http://localhost:8000/api/folders
/// ```
///
/// Response
/// ```json
/// { "data": { "id": 1, "name": "Work" ... } }
/// ```
pub async fn create<S: Storage>(
    Extension(storage): Extension<S>,
    current_user: CurrentUser<S>,
    Form(form): Form<CreateFolderForm>,
) -> Result<Success<FolderResponse>, Error> {
    // A folder of another user is a folder that does not exist
    let parent_folder_id = if let Some(parent_folder_id) = form.parent_folder_id {
        let parent = fetch_folder(&storage, &current_user, parent_folder_id).await?;

        Some(parent.id)
    } else {
        None
    };

    let values = CreateFolderValues {
        user: &current_user,
        name: &form.name,
        color: form.color.as_deref().unwrap_or(Folder::DEFAULT_COLOR),
        parent_folder_id,
    };

    let folder = storage
        .create_folder(&values)
        .await
        .map_err(Error::storage)?;

    Ok(Success::created(FolderResponse::from_folder(folder)))
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
