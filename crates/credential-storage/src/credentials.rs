//! High-level API for the access-token cookie and the username cache.
//!
//! Cookies follow browser semantics: a record whose `max_age_secs` has run
//! out reads as absent and is purged on the next read.

use crate::{CredentialStorage, StorageError, StorageKeys, StorageResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cookie `SameSite` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// A persisted cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieRecord {
    pub value: String,
    pub path: String,
    pub same_site: SameSite,
    /// Lifetime from `written_at`, in seconds.
    pub max_age_secs: u64,
    /// Unix seconds at which the cookie was written.
    pub written_at: i64,
}

impl CookieRecord {
    /// Unix second at which the cookie stops being readable.
    pub fn expires_at(&self) -> i64 {
        self.written_at
            .saturating_add(i64::try_from(self.max_age_secs).unwrap_or(i64::MAX))
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at()
    }
}

/// Cookie jar plus durable key-value cache over a [`CredentialStorage`].
#[derive(Clone)]
pub struct CredentialsManager {
    storage: Arc<dyn CredentialStorage>,
}

impl CredentialsManager {
    /// Create a new manager with the given storage backend.
    pub fn new(storage: Arc<dyn CredentialStorage>) -> Self {
        Self { storage }
    }

    // ==========================================
    // Cookies
    // ==========================================

    /// Write a cookie, replacing any previous value under the same name.
    pub fn set_cookie(&self, name: &str, record: &CookieRecord) -> StorageResult<()> {
        let json =
            serde_json::to_string(record).map_err(|e| StorageError::Encoding(e.to_string()))?;
        self.storage.set(&StorageKeys::cookie(name), &json)
    }

    /// Read a cookie as of `now`; expired cookies are purged and read as `None`.
    pub fn get_cookie(&self, name: &str, now: i64) -> StorageResult<Option<CookieRecord>> {
        let key = StorageKeys::cookie(name);
        let Some(json) = self.storage.get(&key)? else {
            return Ok(None);
        };

        let record: CookieRecord =
            serde_json::from_str(&json).map_err(|e| StorageError::Encoding(e.to_string()))?;

        if record.is_expired(now) {
            tracing::debug!(cookie = %name, "Cookie max-age elapsed, purging");
            self.storage.delete(&key)?;
            return Ok(None);
        }

        Ok(Some(record))
    }

    /// Delete a cookie, returning whether it existed.
    pub fn delete_cookie(&self, name: &str) -> StorageResult<bool> {
        self.storage.delete(&StorageKeys::cookie(name))
    }

    // ==========================================
    // Username cache
    // ==========================================

    pub fn set_username_cache(&self, username: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::USERNAME_CACHE, username)
    }

    pub fn get_username_cache(&self) -> StorageResult<Option<String>> {
        Ok(self
            .storage
            .get(StorageKeys::USERNAME_CACHE)?
            .filter(|username| !username.is_empty()))
    }

    pub fn clear_username_cache(&self) -> StorageResult<bool> {
        self.storage.delete(StorageKeys::USERNAME_CACHE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStorage;

    fn manager() -> CredentialsManager {
        CredentialsManager::new(Arc::new(MemoryStorage::new()))
    }

    fn record(max_age_secs: u64, written_at: i64) -> CookieRecord {
        CookieRecord {
            value: "header.payload.sig".to_string(),
            path: "/".to_string(),
            same_site: SameSite::Lax,
            max_age_secs,
            written_at,
        }
    }

    #[test]
    fn test_cookie_readable_until_max_age() {
        let manager = manager();
        manager
            .set_cookie("access_token", &record(300, 1_000))
            .unwrap();

        let read = manager.get_cookie("access_token", 1_299).unwrap().unwrap();
        assert_eq!(read.value, "header.payload.sig");
        assert_eq!(read.expires_at(), 1_300);

        assert!(manager.get_cookie("access_token", 1_300).unwrap().is_none());
        // Purged: a later read with an earlier clock still sees nothing.
        assert!(manager.get_cookie("access_token", 1_000).unwrap().is_none());
    }

    #[test]
    fn test_zero_max_age_cookie_is_never_readable() {
        let manager = manager();
        manager.set_cookie("access_token", &record(0, 50)).unwrap();
        assert!(manager.get_cookie("access_token", 50).unwrap().is_none());
    }

    #[test]
    fn test_delete_cookie() {
        let manager = manager();
        manager.set_cookie("access_token", &record(60, 0)).unwrap();
        assert!(manager.delete_cookie("access_token").unwrap());
        assert!(!manager.delete_cookie("access_token").unwrap());
        assert!(manager.get_cookie("access_token", 1).unwrap().is_none());
    }

    #[test]
    fn test_same_site_serializes_lowercase() {
        let json = serde_json::to_string(&record(1, 0)).unwrap();
        assert!(json.contains("\"same_site\":\"lax\""));
    }

    #[test]
    fn test_username_cache() {
        let manager = manager();
        assert!(manager.get_username_cache().unwrap().is_none());

        manager.set_username_cache("ana").unwrap();
        assert_eq!(manager.get_username_cache().unwrap(), Some("ana".to_string()));

        assert!(manager.clear_username_cache().unwrap());
        assert!(manager.get_username_cache().unwrap().is_none());
    }
}
