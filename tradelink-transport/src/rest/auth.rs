//! Credential and anti-forgery token collaborators.
//!
//! The transport depends on these contracts; implementations live with the
//! application that owns the session.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};
use tradelink_core::error::AuthError;
use tradelink_telemetry::masking::Sensitive;

/// Authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Stable user id.
    pub id: String,
    /// Login name.
    pub username: String,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Who logged in.
    pub user: UserIdentity,
    /// Session token presented during the duplex handshake.
    pub token: Option<Sensitive<String>>,
}

/// Supplies and refreshes session credentials.
#[async_trait]
pub trait CredentialCoordinator: Send + Sync + 'static {
    /// Whether local state believes a session exists.
    async fn is_authenticated(&self) -> bool;

    /// Revalidates or refreshes the session.
    ///
    /// Returns false on failure, after clearing local auth state.
    async fn ensure_session(&self) -> bool;

    /// Logs in.
    async fn login(&self, username: &str, password: &str) -> Result<Credentials, AuthError>;

    /// Logs out and clears local state.
    async fn logout(&self);

    /// The logged-in identity, if any.
    async fn current_user(&self) -> Option<UserIdentity>;

    /// Token for the duplex handshake; `None` sends an anonymous hello.
    async fn session_token(&self) -> Option<String> {
        None
    }
}

/// Supplies the anti-forgery token for mutating REST calls.
#[async_trait]
pub trait CsrfTokenSource: Send + Sync + 'static {
    /// Returns the cached token, fetching one if missing or expired.
    async fn get_token(&self) -> Result<String, AuthError>;

    /// Fetches a fresh token unconditionally.
    async fn refresh_token(&self) -> Result<String, AuthError>;
}

/// Fetch function behind a [`CachedCsrfToken`].
pub type TokenFetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<String, AuthError>> + Send + Sync>;

struct CachedToken {
    value: Sensitive<String>,
    fetched_at: Instant,
}

/// Anti-forgery token cached for a fixed lifetime.
///
/// Concurrent callers that find the cache empty wait for a single fetch.
pub struct CachedCsrfToken {
    fetch: TokenFetcher,
    ttl: Duration,
    cached: Mutex<Option<CachedToken>>,
}

impl CachedCsrfToken {
    /// Creates an empty cache around `fetch`.
    pub fn new<F>(ttl: Duration, fetch: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<String, AuthError>> + Send + Sync + 'static,
    {
        Self {
            fetch: Arc::new(fetch),
            ttl,
            cached: Mutex::new(None),
        }
    }

    /// Drops the cached token.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn fetch_into(&self, slot: &mut Option<CachedToken>) -> Result<String, AuthError> {
        match (self.fetch)().await {
            Ok(token) => {
                debug!("CSRF token fetched");
                *slot = Some(CachedToken {
                    value: Sensitive::new(token.clone()),
                    fetched_at: Instant::now(),
                });
                Ok(token)
            }
            Err(e) => {
                warn!(error = %e, "CSRF token fetch failed");
                *slot = None;
                Err(e)
            }
        }
    }
}

#[async_trait]
impl CsrfTokenSource for CachedCsrfToken {
    async fn get_token(&self) -> Result<String, AuthError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && token.fetched_at.elapsed() < self.ttl
        {
            return Ok(token.value.expose().clone());
        }
        self.fetch_into(&mut cached).await
    }

    async fn refresh_token(&self) -> Result<String, AuthError> {
        let mut cached = self.cached.lock().await;
        self.fetch_into(&mut cached).await
    }
}

impl std::fmt::Debug for CachedCsrfToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedCsrfToken")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// Coordinator for a pre-issued token, e.g. one passed on the command line.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<Sensitive<String>>,
}

impl StaticCredentials {
    /// Wraps an optional token.
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.map(Sensitive::new),
        }
    }
}

#[async_trait]
impl CredentialCoordinator for StaticCredentials {
    async fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    async fn ensure_session(&self) -> bool {
        true
    }

    async fn login(&self, _username: &str, _password: &str) -> Result<Credentials, AuthError> {
        Err(AuthError::LoginFailed {
            reason: "static credentials do not support login".to_string(),
        })
    }

    async fn logout(&self) {}

    async fn current_user(&self) -> Option<UserIdentity> {
        None
    }

    async fn session_token(&self) -> Option<String> {
        self.token.as_ref().map(|t| t.expose().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_cache(ttl: Duration) -> (Arc<AtomicUsize>, CachedCsrfToken) {
        let fetches = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fetches);
        let cache = CachedCsrfToken::new(ttl, move || {
            let n = f.fetch_add(1, Ordering::SeqCst) + 1;
            Box::pin(async move { Ok(format!("csrf-{n}")) })
        });
        (fetches, cache)
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_cached_until_expiry() {
        let (fetches, cache) = counting_cache(Duration::from_secs(60));

        assert_eq!(cache.get_token().await.unwrap(), "csrf-1");
        assert_eq!(cache.get_token().await.unwrap(), "csrf-1");
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get_token().await.unwrap(), "csrf-2");
    }

    #[tokio::test]
    async fn test_refresh_forces_fetch() {
        let (fetches, cache) = counting_cache(Duration::from_secs(60));
        cache.get_token().await.unwrap();
        assert_eq!(cache.refresh_token().await.unwrap(), "csrf-2");
        assert_eq!(cache.get_token().await.unwrap(), "csrf-2");
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&calls);
        let cache = CachedCsrfToken::new(Duration::from_secs(60), move || {
            let n = c.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if n == 0 {
                    Err(AuthError::CsrfUnavailable {
                        reason: "503".to_string(),
                    })
                } else {
                    Ok("late".to_string())
                }
            })
        });

        assert!(cache.get_token().await.is_err());
        assert_eq!(cache.get_token().await.unwrap(), "late");
    }

    #[tokio::test]
    async fn test_static_credentials() {
        let anonymous = StaticCredentials::default();
        assert!(anonymous.ensure_session().await);
        assert_eq!(anonymous.session_token().await, None);
        assert!(!anonymous.is_authenticated().await);

        let with_token = StaticCredentials::new(Some("abc".to_string()));
        assert_eq!(with_token.session_token().await.as_deref(), Some("abc"));
        assert!(with_token.login("u", "p").await.is_err());
    }
}
