//! User API management

use axum::Extension;

use crate::identity::IdentityResolver;
use crate::storage::Storage;

use super::Error;
use super::JwtKeys;
use super::Success;
use super::current_user::Token;
use super::current_user::generate_token;

/// Get a token for the default identity
///
/// Development convenience: while the default identity fallback is enabled a
/// token can be issued without any credentials. The token can then be used to
/// access the rest of the API routes by using it in the `Authorization`
/// header
///
/// Request:
/// ```sh
/// curl -v -XPOST http://localhost:8000/api/users/token
/// ```
///
/// Response
/// ```json
/// { "data": { "token_type": "Bearer", "access_token": "some token" } }
/// ```
pub async fn token<S: Storage>(
    Extension(jwt_keys): Extension<JwtKeys>,
    Extension(storage): Extension<S>,
    Extension(identity_resolver): Extension<IdentityResolver>,
) -> Result<Success<Token>, Error> {
    if !identity_resolver.fallback_enabled() {
        return Err(Error::unauthorized("Default identity is disabled"));
    }

    let user = identity_resolver
        .resolve_default(&storage)
        .await
        .map_err(Error::storage)?;

    let token = generate_token(&jwt_keys, &user)?;

    Ok(Success::ok(token))
}
