//! Process-level wiring of the session manager.
//!
//! Binaries build one `ClientRuntime` so every command shares the same
//! config, credential file and HTTP client.

use crate::{Clock, RefreshPolicy, SessionManager, SessionResult, SystemClock, TokenStore};
use auth_api_client::HttpAuthApi;
use client_config_and_utils::{Config, Paths};
use credential_storage::{CredentialsManager, FileStorage};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Shared client runtime.
#[derive(Clone)]
pub struct ClientRuntime {
    config: Config,
    paths: Paths,
    manager: SessionManager,
}

impl ClientRuntime {
    /// Load config from `paths` and build the runtime.
    pub fn from_paths(paths: Paths) -> SessionResult<Self> {
        let config = Config::load(&paths)?;
        Self::with_config(config, paths)
    }

    /// Build the runtime from an explicit config.
    pub fn with_config(config: Config, paths: Paths) -> SessionResult<Self> {
        paths.ensure_dirs()?;

        let storage = FileStorage::open(paths.credentials_file())?;
        let credentials = CredentialsManager::new(Arc::new(storage));
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let tokens = TokenStore::new(credentials, config.token_cookie_name.clone(), clock.clone());

        let api = HttpAuthApi::new(
            &config.api_base_url()?,
            Arc::new(tokens.clone()),
            Duration::from_secs(config.request_timeout_secs),
        )?;

        info!(
            api_base_url = %api.base_url(),
            credentials = %paths.credentials_file().display(),
            "Session runtime ready"
        );

        let manager = SessionManager::new(
            Arc::new(api),
            tokens,
            clock,
            RefreshPolicy::from(&config),
        );

        Ok(Self {
            config,
            paths,
            manager,
        })
    }

    pub fn manager(&self) -> &SessionManager {
        &self.manager
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::make_token;
    use crate::SessionState;
    use tempfile::tempdir;

    fn offline_config() -> Config {
        Config {
            // Nothing listens here; any request fails fast.
            api_base_url: "http://127.0.0.1:9/api".to_string(),
            request_timeout_secs: 2,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_bootstrap_without_credentials() {
        let dir = tempdir().unwrap();
        let runtime =
            ClientRuntime::with_config(offline_config(), Paths::with_base_dir(dir.path().into()))
                .unwrap();

        let status = runtime.manager().bootstrap().await;
        assert!(status.is_initialized);
        assert!(!status.is_logged_in);
        assert_eq!(status.state, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_cookie_survives_restart() {
        let dir = tempdir().unwrap();
        let token = make_token("ana", SystemClock.now() + 3_600);

        {
            let runtime = ClientRuntime::with_config(
                offline_config(),
                Paths::with_base_dir(dir.path().into()),
            )
            .unwrap();
            runtime
                .manager()
                .token_store()
                .set_access_cookie(&token)
                .unwrap();
        }

        let runtime =
            ClientRuntime::with_config(offline_config(), Paths::with_base_dir(dir.path().into()))
                .unwrap();
        let status = runtime.manager().bootstrap().await;

        assert_eq!(status.state, SessionState::Authenticated);
        assert!(status.is_logged_in);
        assert_eq!(status.username.as_deref(), Some("ana"));
        assert!(runtime.manager().has_armed_timer());
        assert!(dir.path().join("credentials.json").exists());
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let dir = tempdir().unwrap();
        let config = Config {
            api_base_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            ClientRuntime::with_config(config, Paths::with_base_dir(dir.path().into())),
            Err(crate::SessionError::Config(_))
        ));
    }
}
