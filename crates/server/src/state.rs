//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::Store;
use crate::services::{SessionAuthority, SessionError};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the storage backend, the session authority and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Arc<dyn Store>,
    sessions: SessionAuthority,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the session signing key cannot be used.
    pub fn new(config: ServerConfig, store: Arc<dyn Store>) -> Result<Self, SessionError> {
        let sessions = SessionAuthority::new(&config.session_secret, config.session_ttl)?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                sessions,
            }),
        })
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the storage backend.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        &*self.inner.store
    }

    /// Get a reference to the session token authority.
    #[must_use]
    pub fn sessions(&self) -> &SessionAuthority {
        &self.inner.sessions
    }
}
