//! Default identity resolution
//!
//! When a request carries no credentials the API can fall back to a single
//! shared identity, so a personal deployment works without any token setup

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::storage;
use crate::storage::CreateUserValues;
use crate::storage::Storage;
use crate::users::User;

/// Resolver for the default identity
#[derive(Clone)]
pub struct IdentityResolver {
    /// Whether requests without credentials may use the default identity
    fallback_enabled: bool,

    /// Email address the default identity is registered under
    email: String,

    /// Display name of the default identity
    name: String,

    /// The resolved default identity, cached for the lifetime of the process
    default_identity: Arc<OnceCell<User>>,
}

impl IdentityResolver {
    /// Create a new resolver
    pub fn new(fallback_enabled: bool, email: String, name: String) -> Self {
        Self {
            fallback_enabled,
            email,
            name,
            default_identity: Arc::new(OnceCell::new()),
        }
    }

    /// Whether requests without credentials may use the default identity
    pub fn fallback_enabled(&self) -> bool {
        self.fallback_enabled
    }

    /// Resolve the default identity, creating it on first use
    ///
    /// Concurrent callers share a single resolution; failures are not cached,
    /// the next request simply tries again
    pub async fn resolve_default<S: Storage>(&self, storage: &S) -> storage::Result<User> {
        let user = self
            .default_identity
            .get_or_try_init(|| self.find_or_create(storage))
            .await?;

        Ok(user.clone())
    }

    /// Find the default identity in storage, or create it
    ///
    /// Another instance may create the user between lookup and insert; a
    /// conflict on the email means somebody else won, fetch their row
    async fn find_or_create<S: Storage>(&self, storage: &S) -> storage::Result<User> {
        if let Some(user) = storage.find_single_user_by_email(&self.email).await? {
            return Ok(user);
        }

        let values = CreateUserValues {
            email: &self.email,
            name: &self.name,
        };

        match storage.create_user(&values).await {
            Ok(user) => Ok(user),
            Err(storage::Error::Conflict(_)) => storage
                .find_single_user_by_email(&self.email)
                .await?
                .map_or_else(
                    || {
                        Err(storage::Error::Connection(
                            "Default identity disappeared".to_string(),
                        ))
                    },
                    Ok,
                ),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::storage::memory::Memory;

    fn resolver() -> IdentityResolver {
        IdentityResolver::new(true, "default@localhost".to_string(), "Default".to_string())
    }

    #[tokio::test]
    async fn test_concurrent_requests_resolve_to_a_single_user() {
        let storage = Memory::new();
        let resolver = resolver();

        let (left, right) = tokio::join!(
            resolver.resolve_default(&storage),
            resolver.resolve_default(&storage),
        );

        assert_eq!(left.unwrap().id, right.unwrap().id);
        assert_eq!(1, storage.count_users().await.unwrap());
    }

    #[tokio::test]
    async fn test_separate_resolvers_share_the_stored_identity() {
        let storage = Memory::new();

        let first = resolver().resolve_default(&storage).await.unwrap();
        let second = resolver().resolve_default(&storage).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(1, storage.count_users().await.unwrap());
    }
}
