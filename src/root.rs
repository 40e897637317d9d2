//! The root!
//!
//! The service banner and the health probe

use axum::Extension;
use serde::Serialize;

use crate::api::Error;
use crate::api::Success;
use crate::storage::Storage;

/// Service banner
///
/// Request:
/// ```sh
/// curl -v http://localhost:8000/
/// ```
///
/// Response:
/// ```json
/// { "data": "daybook 0.1.0" }
/// ```
#[allow(clippy::unused_async)]
pub async fn root() -> Success<&'static str> {
    Success::ok(concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION")))
}

/// Health response information
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Overall status, always "ok" when this response is served
    pub status: &'static str,

    /// Number of registered users
    pub user_count: i64,
}

/// Health probe
///
/// Checks whether the storage is reachable, answers `503` when it is not
///
/// Request:
/// ```sh
/// curl -v http://localhost:8000/health
/// ```
///
/// Response:
/// ```json
/// { "data": { "status": "ok", "userCount": 1 } }
/// ```
pub async fn health<S: Storage>(
    Extension(storage): Extension<S>,
) -> Result<Success<HealthResponse>, Error> {
    storage
        .ping()
        .await
        .map_err(|err| Error::service_unavailable("Storage is unreachable").with_description(err))?;

    let user_count = storage
        .count_users()
        .await
        .map_err(|err| Error::service_unavailable("Storage is unreachable").with_description(err))?;

    Ok(Success::ok(HealthResponse {
        status: "ok",
        user_count,
    }))
}
