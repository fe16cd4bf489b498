//! The access-token cookie.
//!
//! The cookie is the only place the token lives; every read goes to storage.

use crate::clock::Clock;
use crate::token::seconds_until_expire;
use crate::SessionResult;
use auth_api_client::BearerTokenSource;
use credential_storage::{CookieRecord, CredentialsManager, SameSite};
use std::sync::Arc;
use tracing::{debug, warn};

/// Reads and writes the access-token cookie.
#[derive(Clone)]
pub struct TokenStore {
    credentials: CredentialsManager,
    cookie_name: String,
    clock: Arc<dyn Clock>,
}

impl TokenStore {
    pub fn new(
        credentials: CredentialsManager,
        cookie_name: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            credentials,
            cookie_name: cookie_name.into(),
            clock,
        }
    }

    pub fn credentials(&self) -> &CredentialsManager {
        &self.credentials
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Write `token` with a max-age equal to its remaining validity.
    ///
    /// Returns the max-age written. Fails without writing if the token
    /// cannot be decoded.
    pub fn set_access_cookie(&self, token: &str) -> SessionResult<u64> {
        let now = self.clock.now();
        let max_age_secs = seconds_until_expire(token, 0, now)?;

        self.credentials.set_cookie(
            &self.cookie_name,
            &CookieRecord {
                value: token.to_string(),
                path: "/".to_string(),
                same_site: SameSite::Lax,
                max_age_secs,
                written_at: now,
            },
        )?;

        debug!(max_age_secs, "Access cookie written");
        Ok(max_age_secs)
    }

    /// Current token, if the cookie is present and unexpired.
    pub fn read(&self) -> SessionResult<Option<String>> {
        Ok(self.read_cookie()?.map(|record| record.value))
    }

    /// Full cookie record, if present and unexpired.
    pub fn read_cookie(&self) -> SessionResult<Option<CookieRecord>> {
        Ok(self
            .credentials
            .get_cookie(&self.cookie_name, self.clock.now())?)
    }

    /// Delete the cookie, returning whether it existed.
    pub fn delete(&self) -> SessionResult<bool> {
        Ok(self.credentials.delete_cookie(&self.cookie_name)?)
    }
}

impl BearerTokenSource for TokenStore {
    fn access_token(&self) -> Option<String> {
        match self.read() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to read access cookie");
                None
            }
        }
    }

    fn clear_access_token(&self) {
        match self.delete() {
            Ok(existed) => debug!(existed, "Access cookie deleted after 401"),
            Err(e) => warn!(error = %e, "Failed to delete access cookie"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::token::make_token;
    use crate::SessionError;
    use credential_storage::MemoryStorage;

    const NOW: i64 = 1_700_000_000;

    fn store() -> (TokenStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(NOW));
        let credentials = CredentialsManager::new(Arc::new(MemoryStorage::new()));
        (
            TokenStore::new(credentials, "access_token", clock.clone()),
            clock,
        )
    }

    #[tokio::test]
    async fn test_cookie_max_age_matches_remaining_validity() {
        let (store, _) = store();
        let token = make_token("ana", NOW + 300);

        assert_eq!(store.set_access_cookie(&token).unwrap(), 300);

        let cookie = store.read_cookie().unwrap().unwrap();
        assert_eq!(cookie.value, token);
        assert_eq!(cookie.path, "/");
        assert_eq!(cookie.same_site, SameSite::Lax);
        assert_eq!(cookie.max_age_secs, 300);
    }

    #[tokio::test]
    async fn test_cookie_disappears_when_token_expires() {
        let (store, clock) = store();
        store
            .set_access_cookie(&make_token("ana", NOW + 60))
            .unwrap();

        clock.jump(61);
        assert!(store.read().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_undecodable_token_is_not_written() {
        let (store, _) = store();
        assert!(matches!(
            store.set_access_cookie("not-a-jwt"),
            Err(SessionError::Decode(_))
        ));
        assert!(store.read().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_access_token_deletes_cookie() {
        let (store, _) = store();
        store
            .set_access_cookie(&make_token("ana", NOW + 600))
            .unwrap();
        assert!(store.access_token().is_some());

        store.clear_access_token();
        assert!(store.access_token().is_none());
        assert!(!store.delete().unwrap());
    }
}
