#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
// easier to use when using the functions as callback of foreign functions
#![allow(clippy::needless_pass_by_value)]

use std::net::SocketAddr;

use anyhow::Result;
use axum::Extension;
use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::prelude::*;
use uuid::Uuid;

use crate::api::JwtKeys;
use crate::api::router;
use crate::calendar::CalendarSync;
use crate::calendar::Disabled;
use crate::config::Config;
use crate::identity::IdentityResolver;
use crate::storage::Storage;
use crate::storage::setup;
use crate::utils::env_var_or_else;

mod api;
mod calendar;
mod config;
mod diary;
mod folders;
mod graceful_shutdown;
mod identity;
mod root;
mod storage;
mod tasks;
#[cfg(test)]
mod tests;
mod users;
mod utils;

const DEFAULT_RUST_LOG: &str = "daybook=debug,tower_http=debug";
const DEFAULT_ADDRESS: &str = "0.0.0.0:8000";

#[tokio::main]
async fn main() -> Result<()> {
    setup_environment();
    setup_tracing();

    let app = setup_app().await?;

    let address = setup_address()?;
    tracing::info!("Listening on {}", address);

    let listener = TcpListener::bind(address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(graceful_shutdown::handler())
        .await?;

    Ok(())
}

/// Create and setup the app with its dependencies
///
/// # Errors
///
/// Will return `Err` when the configuration can not be read from the
/// environment
pub async fn setup_app() -> Result<Router> {
    let config = Config::from_env()?;

    let storage = setup().await;

    let jwt_keys = setup_jwt_keys();

    if config.default_identity_enabled {
        tracing::warn!(
            "Default identity fallback is enabled, requests without credentials act as {}",
            config.default_identity_email
        );
    }

    Ok(create_router(storage, Disabled, jwt_keys, &config))
}

/// Create the router for Daybook
fn create_router<S: Storage, C: CalendarSync>(
    storage: S,
    calendar: C,
    jwt_keys: JwtKeys,
    config: &Config,
) -> Router {
    let identity_resolver = IdentityResolver::new(
        config.default_identity_enabled,
        config.default_identity_email.clone(),
        config.default_identity_name.clone(),
    );

    Router::new()
        .nest("/api", router::<S, C>())
        .route("/", get(root::root))
        .route("/health", get(root::health::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(storage))
        .layer(Extension(calendar))
        .layer(Extension(jwt_keys))
        .layer(Extension(identity_resolver))
        .layer(Extension(config.clone()))
}

fn setup_environment() {
    dotenvy::dotenv().ok();
}

fn setup_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::registry;

    registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_RUST_LOG.into()),
        ))
        .with(fmt::layer())
        .init();
}

fn setup_jwt_keys() -> JwtKeys {
    let jwt_secret = env_var_or_else("JWT_SECRET", || {
        let jwt_secret = Uuid::new_v4().to_string();
        tracing::info!("`JWT_SECRET` is not set, generating temporary one: {jwt_secret}");
        jwt_secret
    });

    JwtKeys::new(jwt_secret.as_bytes())
}

fn setup_address() -> Result<SocketAddr> {
    let mut address =
        env_var_or_else("ADDRESS", || String::from(DEFAULT_ADDRESS)).parse::<SocketAddr>()?;

    // optional override of just the port
    if let Ok(port) = std::env::var("PORT") {
        // only check non-empty strings
        if !port.is_empty() {
            let port = port.parse::<u16>()?;

            address.set_port(port);
        }
    }

    Ok(address)
}
