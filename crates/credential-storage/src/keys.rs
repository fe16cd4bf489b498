//! Storage key constants.

/// Storage keys used by the session client.
pub struct StorageKeys;

impl StorageKeys {
    /// Durable cache of the last known username.
    pub const USERNAME_CACHE: &'static str = "username_cache";

    /// Prefix for cookie records; the cookie name follows.
    pub const COOKIE_PREFIX: &'static str = "cookie:";

    /// Full storage key for a named cookie.
    pub fn cookie(name: &str) -> String {
        format!("{}{}", Self::COOKIE_PREFIX, name)
    }
}
