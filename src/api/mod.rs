//! All API endpoint setup

use axum::Router;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;

pub use current_user::CurrentUser;
pub use current_user::JwtKeys;
pub use current_user::generate_token;
pub use request::Form;
pub use request::PathParameters;
pub use request::QueryParameters;
pub use request::parse_mood;
pub use request::parse_title;
pub use request::patch_field;
pub use response::Error;
pub use response::Success;

use crate::calendar::CalendarSync;
use crate::storage::Storage;

mod current_user;
mod diary;
mod folders;
mod request;
mod response;
mod tasks;
mod users;

/// Get the Axum router for all API routes
pub fn router<S: Storage, C: CalendarSync>() -> Router {
    let users = Router::new().route("/token", post(users::token::<S>));

    let tasks = Router::new()
        .route("/", get(tasks::list::<S>))
        .route("/", post(tasks::create::<S, C>))
        .route("/{task}", put(tasks::update::<S>))
        .route("/{task}/substeps", post(tasks::create_substep::<S>))
        .route("/{task}/notes", post(tasks::create_note::<S>));

    let diary = Router::new()
        .route("/", get(diary::list::<S>))
        .route("/", post(diary::upsert::<S>));

    let folders = Router::new()
        .route("/", get(folders::list::<S>))
        .route("/", post(folders::create::<S>));

    Router::new()
        .nest("/users", users)
        .nest("/tasks", tasks)
        .nest("/diary", diary)
        .nest("/folders", folders)
}
