use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::body::Bytes;
use axum::http::Method;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use http_body_util::BodyExt;
use serde_json::Map;
use serde_json::Value;
use tower::Service;

use crate::api::JwtKeys;
use crate::api::generate_token;
use crate::calendar::CalendarSync;
use crate::calendar::Disabled;
use crate::config::Config;
use crate::create_router;
use crate::storage::CreateUserValues;
use crate::storage::Storage;
use crate::storage::memory::Memory;
use crate::users::User;

/// Test helper version of an API error body
#[derive(Debug)]
pub struct Error {
    pub error: String,
    pub description: Option<String>,
}

/// Test helper version of the Folder struct
#[derive(Debug)]
pub struct Folder {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub parent_folder_id: Option<i64>,
}

/// Test helper version of the Task struct
#[derive(Debug)]
pub struct Task {
    pub id: i64,
    pub folder_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub priority: i64,
    pub status: String,
    pub due_date: Option<String>,
    pub is_calendar_event: bool,
    pub calendar_event_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub substeps: Vec<Substep>,
    pub notes: Vec<TaskNote>,
}

/// Test helper version of the TaskSubstep struct
#[derive(Debug, PartialEq, Eq)]
pub struct Substep {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub order_index: i64,
}

/// Test helper version of the TaskNote struct
#[derive(Debug, PartialEq, Eq)]
pub struct TaskNote {
    pub id: i64,
    pub content: String,
}

/// Test helper version of the DiaryEntry struct
#[derive(Debug)]
pub struct DiaryEntry {
    pub id: i64,
    pub folder_id: Option<i64>,
    pub entry_date: String,
    pub title: Option<String>,
    pub content: String,
    pub mood: Option<i64>,
    pub weather: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// The JWT keys all test apps are built with
pub fn test_jwt_keys() -> JwtKeys {
    JwtKeys::new(b"verysecret")
}

/// Default test configuration, default identity fallback enabled
pub fn test_config() -> Config {
    Config {
        default_identity_enabled: true,
        default_identity_email: "default@localhost".to_string(),
        default_identity_name: "Default".to_string(),
        calendar_sync_timeout: Duration::from_millis(250),
    }
}

/// Setup the app with a fresh in-memory storage
///
/// The storage rides along for direct inspection
pub fn setup_test_app() -> (Router, Memory) {
    setup_test_app_with(Disabled, test_config())
}

/// Setup the app with a specific calendar and configuration
pub fn setup_test_app_with<C: CalendarSync>(calendar: C, config: Config) -> (Router, Memory) {
    let storage = Memory::new();
    let app = create_router(storage.clone(), calendar, test_jwt_keys(), &config);

    (app, storage)
}

/// Get a token for the default identity through the API
pub async fn login(app: &mut Router) -> String {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/users/token")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    assert_eq!(StatusCode::OK, status_code);

    get_access_token(&body)
}

/// Get a token for a specific user, signed with the test keys
pub fn token_for(user: &User) -> String {
    let Ok(token) = generate_token(&test_jwt_keys(), user) else {
        panic!("Could not generate token");
    };

    let token = serde_json::to_value(&token).unwrap();

    format!("Bearer {}", token["access_token"].as_str().unwrap())
}

/// Create a second user directly in storage
pub async fn other_user(storage: &Memory) -> User {
    let values = CreateUserValues {
        email: "intruder@localhost",
        name: "Intruder",
    };

    storage.create_user(&values).await.unwrap()
}

pub async fn root(app: &mut Router) -> (StatusCode, String) {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body = String::from_utf8_lossy(&body[..]).to_string();

    (status_code, body)
}

pub async fn health(app: &mut Router) -> (StatusCode, String) {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body = String::from_utf8_lossy(&body[..]).to_string();

    (status_code, body)
}

pub async fn maybe_create_folder(
    app: &mut Router,
    access_token: &str,
    payload: Map<String, Value>,
) -> (StatusCode, Option<Folder>, Option<String>) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/folders")
        .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .header(AUTHORIZATION, access_token)
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code == StatusCode::CREATED {
            Some(get_folder(&body))
        } else {
            None
        },
        if status_code.is_client_error() {
            Some(get_error_message(&body))
        } else {
            None
        },
    )
}

pub async fn create_folder(app: &mut Router, access_token: &str, name: &str) -> Folder {
    let mut payload = Map::new();
    payload.insert("name".to_string(), Value::String(name.to_string()));

    let (status_code, folder, _) = maybe_create_folder(app, access_token, payload).await;

    assert_eq!(StatusCode::CREATED, status_code);

    folder.unwrap()
}

pub async fn list_folders(
    app: &mut Router,
    access_token: &str,
) -> (StatusCode, Option<Vec<Folder>>) {
    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/folders")
        .header(AUTHORIZATION, access_token)
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_folders(&body))
        } else {
            None
        },
    )
}

pub async fn maybe_create_task(
    app: &mut Router,
    access_token: &str,
    payload: Map<String, Value>,
) -> (StatusCode, Option<Task>, Option<String>) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/tasks")
        .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .header(AUTHORIZATION, access_token)
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code == StatusCode::CREATED {
            Some(get_task(&body))
        } else {
            None
        },
        if status_code.is_client_error() {
            Some(get_error_message(&body))
        } else {
            None
        },
    )
}

pub async fn maybe_create_task_with_raw_body(
    app: &mut Router,
    access_token: &str,
    body: &'static str,
    include_content_type: bool,
) -> (StatusCode, Option<Task>, Option<Error>) {
    let mut builder = Request::builder().method(Method::POST).uri("/api/tasks");

    if include_content_type {
        builder = builder.header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref());
    }

    let request = builder
        .header(AUTHORIZATION, access_token)
        .body(Body::from(body))
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code == StatusCode::CREATED {
            Some(get_task(&body))
        } else {
            None
        },
        if status_code.is_client_error() {
            Some(get_error(&body))
        } else {
            None
        },
    )
}

pub async fn create_task(app: &mut Router, access_token: &str, title: &str) -> Task {
    let mut payload = Map::new();
    payload.insert("title".to_string(), Value::String(title.to_string()));

    let (status_code, task, _) = maybe_create_task(app, access_token, payload).await;

    assert_eq!(StatusCode::CREATED, status_code);

    task.unwrap()
}

pub async fn list_tasks(
    app: &mut Router,
    access_token: &str,
    folder_id: Option<i64>,
) -> (StatusCode, Option<Vec<Task>>) {
    let uri = folder_id.map_or_else(
        || "/api/tasks".to_string(),
        |folder_id| format!("/api/tasks?folderId={folder_id}"),
    );

    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header(AUTHORIZATION, access_token)
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_tasks(&body))
        } else {
            None
        },
    )
}

pub async fn maybe_update_task(
    app: &mut Router,
    access_token: &str,
    task_id: i64,
    payload: Map<String, Value>,
) -> (StatusCode, Option<Task>, Option<String>) {
    let request = Request::builder()
        .method(Method::PUT)
        .uri(format!("/api/tasks/{task_id}"))
        .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .header(AUTHORIZATION, access_token)
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_task(&body))
        } else {
            None
        },
        if status_code.is_client_error() {
            Some(get_error_message(&body))
        } else {
            None
        },
    )
}

pub async fn maybe_create_substep(
    app: &mut Router,
    access_token: &str,
    task_id: i64,
    payload: Map<String, Value>,
) -> (StatusCode, Option<Substep>, Option<String>) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/tasks/{task_id}/substeps"))
        .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .header(AUTHORIZATION, access_token)
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code == StatusCode::CREATED {
            Some(get_substep(&body))
        } else {
            None
        },
        if status_code.is_client_error() {
            Some(get_error_message(&body))
        } else {
            None
        },
    )
}

pub async fn maybe_create_task_note(
    app: &mut Router,
    access_token: &str,
    task_id: i64,
    content: &str,
) -> (StatusCode, Option<TaskNote>, Option<String>) {
    let mut payload = Map::new();
    payload.insert("content".to_string(), Value::String(content.to_string()));

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/api/tasks/{task_id}/notes"))
        .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .header(AUTHORIZATION, access_token)
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code == StatusCode::CREATED {
            Some(get_task_note(&body))
        } else {
            None
        },
        if status_code.is_client_error() {
            Some(get_error_message(&body))
        } else {
            None
        },
    )
}

pub async fn maybe_upsert_diary(
    app: &mut Router,
    access_token: &str,
    payload: Map<String, Value>,
) -> (StatusCode, Option<DiaryEntry>, Option<String>) {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/diary")
        .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
        .header(AUTHORIZATION, access_token)
        .body(Body::from(serde_json::to_vec(&payload).unwrap()))
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code == StatusCode::CREATED || status_code == StatusCode::OK {
            Some(get_diary_entry(&body))
        } else {
            None
        },
        if status_code.is_client_error() {
            Some(get_error_message(&body))
        } else {
            None
        },
    )
}

pub async fn list_diary(
    app: &mut Router,
    access_token: &str,
    query: &str,
) -> (StatusCode, Option<Vec<DiaryEntry>>) {
    let request = Request::builder()
        .method(Method::GET)
        .uri(format!("/api/diary{query}"))
        .header(AUTHORIZATION, access_token)
        .body(Body::empty())
        .unwrap();

    let response = app.call(request).await.unwrap();
    let status_code = response.status();

    let body = response.into_body().collect().await.unwrap().to_bytes();

    (
        status_code,
        if status_code == StatusCode::OK {
            Some(get_diary_entries(&body))
        } else {
            None
        },
    )
}

fn value_to_folder(folder: &Map<String, Value>) -> Folder {
    Folder {
        id: folder["id"].as_i64().unwrap(),
        name: folder["name"].as_str().map(ToString::to_string).unwrap(),
        color: folder["color"].as_str().map(ToString::to_string).unwrap(),
        parent_folder_id: folder["parentFolderId"].as_i64(),
    }
}

fn get_folder(body: &Bytes) -> Folder {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]
        .as_object()
        .map(value_to_folder)
        .unwrap()
}

fn get_folders(body: &Bytes) -> Vec<Folder> {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|folder| folder.as_object().unwrap())
        .map(value_to_folder)
        .collect()
}

fn value_to_substep(substep: &Map<String, Value>) -> Substep {
    Substep {
        id: substep["id"].as_i64().unwrap(),
        title: substep["title"].as_str().map(ToString::to_string).unwrap(),
        description: substep["description"].as_str().map(ToString::to_string),
        completed: substep["completed"].as_bool().unwrap(),
        order_index: substep["orderIndex"].as_i64().unwrap(),
    }
}

fn get_substep(body: &Bytes) -> Substep {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]
        .as_object()
        .map(value_to_substep)
        .unwrap()
}

fn value_to_task_note(note: &Map<String, Value>) -> TaskNote {
    TaskNote {
        id: note["id"].as_i64().unwrap(),
        content: note["content"].as_str().map(ToString::to_string).unwrap(),
    }
}

fn get_task_note(body: &Bytes) -> TaskNote {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]
        .as_object()
        .map(value_to_task_note)
        .unwrap()
}

fn value_to_task(task: &Map<String, Value>) -> Task {
    Task {
        id: task["id"].as_i64().unwrap(),
        folder_id: task["folderId"].as_i64(),
        title: task["title"].as_str().map(ToString::to_string).unwrap(),
        description: task["description"].as_str().map(ToString::to_string),
        priority: task["priority"].as_i64().unwrap(),
        status: task["status"].as_str().map(ToString::to_string).unwrap(),
        due_date: task["dueDate"].as_str().map(ToString::to_string),
        is_calendar_event: task["isCalendarEvent"].as_bool().unwrap(),
        calendar_event_id: task["calendarEventId"].as_str().map(ToString::to_string),
        created_at: task["createdAt"].as_str().map(ToString::to_string).unwrap(),
        updated_at: task["updatedAt"].as_str().map(ToString::to_string).unwrap(),
        substeps: task["substeps"]
            .as_array()
            .unwrap()
            .iter()
            .map(|substep| substep.as_object().unwrap())
            .map(value_to_substep)
            .collect(),
        notes: task["notes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|note| note.as_object().unwrap())
            .map(value_to_task_note)
            .collect(),
    }
}

fn get_task(body: &Bytes) -> Task {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]
        .as_object()
        .map(value_to_task)
        .unwrap()
}

fn get_tasks(body: &Bytes) -> Vec<Task> {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|task| task.as_object().unwrap())
        .map(value_to_task)
        .collect()
}

fn value_to_diary_entry(entry: &Map<String, Value>) -> DiaryEntry {
    DiaryEntry {
        id: entry["id"].as_i64().unwrap(),
        folder_id: entry["folderId"].as_i64(),
        entry_date: entry["entryDate"].as_str().map(ToString::to_string).unwrap(),
        title: entry["title"].as_str().map(ToString::to_string),
        content: entry["content"].as_str().map(ToString::to_string).unwrap(),
        mood: entry["mood"].as_i64(),
        weather: entry["weather"].as_str().map(ToString::to_string),
        created_at: entry["createdAt"].as_str().map(ToString::to_string).unwrap(),
        updated_at: entry["updatedAt"].as_str().map(ToString::to_string).unwrap(),
    }
}

fn get_diary_entry(body: &Bytes) -> DiaryEntry {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]
        .as_object()
        .map(value_to_diary_entry)
        .unwrap()
}

fn get_diary_entries(body: &Bytes) -> Vec<DiaryEntry> {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry.as_object().unwrap())
        .map(value_to_diary_entry)
        .collect()
}

fn get_error_message(body: &Bytes) -> String {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["error"]
        .as_str()
        .map(ToString::to_string)
        .unwrap()
}

fn get_error(body: &Bytes) -> Error {
    let value = serde_json::from_slice::<Value>(&body[..]).unwrap();

    Error {
        error: value["error"].as_str().map(ToString::to_string).unwrap(),
        description: value["description"].as_str().map(ToString::to_string),
    }
}

fn get_access_token(body: &Bytes) -> String {
    serde_json::from_slice::<Value>(&body[..]).unwrap()["data"]["access_token"]
        .as_str()
        .map(|access_token| format!("Bearer {access_token}"))
        .unwrap()
}
