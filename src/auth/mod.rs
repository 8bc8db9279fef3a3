//! Authentication capability consumed by the SDK context.
//!
//! Token exchange and request signing live outside this crate. The context only
//! needs to ask a provider to authenticate once and later query whether it is
//! still authenticated.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::SdkSettings;
use crate::error::ColloquyError;

/// Authenticates the SDK against the model service.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Authenticate for `settings.game_id`, optionally with a developer token.
    async fn authenticate(
        &self,
        settings: &SdkSettings,
        developer_token: Option<&str>,
    ) -> Result<(), ColloquyError>;

    /// Whether a previous `authenticate` call succeeded and is still valid.
    fn is_authenticated(&self) -> bool;
}

/// Development auth: accepts any non-empty developer token, no network involved.
#[derive(Debug, Default)]
pub struct DeveloperTokenAuth {
    authenticated: AtomicBool,
}

impl DeveloperTokenAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the current authentication.
    pub fn sign_out(&self) {
        self.authenticated.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuthProvider for DeveloperTokenAuth {
    async fn authenticate(
        &self,
        settings: &SdkSettings,
        developer_token: Option<&str>,
    ) -> Result<(), ColloquyError> {
        let Some(token) = developer_token.filter(|t| !t.trim().is_empty()) else {
            warn!("developer token auth requires a token");
            return Err(ColloquyError::Authentication(
                "no developer token available".into(),
            ));
        };
        info!(
            game_id = settings.game_id.as_deref().unwrap_or_default(),
            token_len = token.len(),
            "authenticated with developer token"
        );
        self.authenticated.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }
}
