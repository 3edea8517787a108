use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::model::UserRecord;
use super::source::{UserSource, UserSourceError};
use crate::system::auth::password::Verifier;
use crate::system::auth::{AuthError, SessionContext};

type UserTable = Arc<HashMap<String, UserRecord>>;

struct CachedUsers {
    loaded_at: Instant,
    users: UserTable,
}

/// Resolved user list with a fixed time-to-live, plus credential checks
pub struct UserDirectory {
    source: UserSource,
    verifier: Verifier,
    ttl: Duration,
    cache: RwLock<Option<CachedUsers>>,
}

impl UserDirectory {
    pub fn new(source: UserSource, verifier: Verifier, ttl: Duration) -> Self {
        Self {
            source,
            verifier,
            ttl,
            cache: RwLock::new(None),
        }
    }

    /// Current user table; re-resolved from the source once the TTL has passed
    pub async fn users(&self) -> Result<UserTable, UserSourceError> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.loaded_at.elapsed() < self.ttl {
                    return Ok(cached.users.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;
        // Another request may have refreshed while we waited for the lock
        if let Some(cached) = cache.as_ref() {
            if cached.loaded_at.elapsed() < self.ttl {
                return Ok(cached.users.clone());
            }
        }

        let records = self.source.resolve_users().await?;
        let users: UserTable = Arc::new(
            records
                .into_iter()
                .map(|u| (u.username.clone(), u))
                .collect(),
        );
        *cache = Some(CachedUsers {
            loaded_at: Instant::now(),
            users: users.clone(),
        });

        Ok(users)
    }

    /// Single-attempt check of `(username, secret)` against the resolved table
    pub async fn authenticate(
        &self,
        username: &str,
        secret: &str,
    ) -> Result<SessionContext, AuthError> {
        let users = self.users().await?;

        let user = match users.get(username.trim()) {
            Some(u) => u,
            None => {
                tracing::info!("Login rejected: unknown user");
                return Err(AuthError::AuthFailed);
            }
        };

        if !self.verifier.verify(user, secret) {
            tracing::info!("Login rejected for {}: wrong secret", user.username);
            return Err(AuthError::AuthFailed);
        }

        tracing::info!("Login: {} ({})", user.username, user.role);
        Ok(SessionContext {
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            role: user.role.clone(),
        })
    }
}
