//! SDK context: settings, authentication and the transport factory shared by
//! every client.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::auth::AuthProvider;
use crate::client::NpcClient;
use crate::config::{NpcConfig, SdkSettings};
use crate::error::ColloquyError;
use crate::transport::{ChatTransport, TransportFactory};

/// Lifecycle of an [`SdkContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdkState {
    /// [`SdkContext::init`] has not succeeded yet. Waiters keep waiting.
    Uninitialized,
    Ready,
    /// [`SdkContext::shutdown`] was called. Waiters fail until `init` runs again.
    ShutDown,
}

/// Shared SDK state.
///
/// Clients depend on a context rather than on global state: create one per
/// application (or per test), call [`init`](Self::init) once, and hand it to
/// [`create_npc`](Self::create_npc) or [`NpcClient::initialize`].
pub struct SdkContext {
    settings: SdkSettings,
    auth: Arc<dyn AuthProvider>,
    factory: Arc<dyn TransportFactory>,
    init_lock: Mutex<()>,
    state_tx: watch::Sender<SdkState>,
}

impl SdkContext {
    pub fn new(
        settings: SdkSettings,
        auth: Arc<dyn AuthProvider>,
        factory: Arc<dyn TransportFactory>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SdkState::Uninitialized);
        Self {
            settings,
            auth,
            factory,
            init_lock: Mutex::new(()),
            state_tx,
        }
    }

    pub fn settings(&self) -> &SdkSettings {
        &self.settings
    }

    /// Validate settings and authenticate. Calling it again while ready and
    /// authenticated is a no-op; after `shutdown` or a lapsed authentication it
    /// authenticates again.
    pub async fn init(&self, developer_token: Option<String>) -> Result<(), ColloquyError> {
        let _init = self.init_lock.lock().await;
        if self.is_ready() {
            debug!("sdk already initialized");
            return Ok(());
        }

        self.settings.validate()?;
        let token = self.settings.resolve_developer_token(developer_token);
        if token.is_some() {
            warn!("using a developer token; requests are heavily rate-limited, do not ship it");
        }

        self.auth
            .authenticate(&self.settings, token.as_deref())
            .await
            .inspect_err(|e| warn!(error = %e, "sdk authentication failed"))?;

        self.state_tx.send_replace(SdkState::Ready);
        info!(
            game_id = self.settings.game_id.as_deref().unwrap_or_default(),
            "sdk initialized"
        );
        Ok(())
    }

    /// Shut the SDK down. Existing transports keep working; new ones cannot
    /// be created and clients still waiting for readiness fail.
    pub fn shutdown(&self) {
        if self.state_tx.send_replace(SdkState::ShutDown) != SdkState::ShutDown {
            info!("sdk shut down");
        }
    }

    pub fn state(&self) -> SdkState {
        *self.state_tx.borrow()
    }

    /// Initialized, not shut down, and still authenticated.
    pub fn is_ready(&self) -> bool {
        self.state() == SdkState::Ready && self.auth.is_authenticated()
    }

    pub fn watch_state(&self) -> watch::Receiver<SdkState> {
        self.state_tx.subscribe()
    }

    /// Wait until [`init`](Self::init) succeeds.
    ///
    /// Fails with [`ColloquyError::NotReady`] once the context is shut down.
    pub async fn wait_until_ready(&self) -> Result<(), ColloquyError> {
        let mut rx = self.state_tx.subscribe();
        let state = rx
            .wait_for(|state| *state != SdkState::Uninitialized)
            .await
            .map(|state| *state)
            .map_err(|_| ColloquyError::NotReady("sdk context dropped".into()))?;
        self.check_ready(state)
    }

    fn check_ready(&self, state: SdkState) -> Result<(), ColloquyError> {
        match state {
            SdkState::Uninitialized => Err(ColloquyError::NotReady("sdk is not initialized".into())),
            SdkState::ShutDown => Err(ColloquyError::NotReady("sdk has been shut down".into())),
            SdkState::Ready if !self.auth.is_authenticated() => Err(ColloquyError::NotReady(
                "sdk authentication has lapsed; call init again".into(),
            )),
            SdkState::Ready => Ok(()),
        }
    }

    /// Create a chat transport for `model`, or for the default chat model.
    pub fn create_chat_transport(
        &self,
        model: Option<&str>,
    ) -> Result<Arc<dyn ChatTransport>, ColloquyError> {
        self.check_ready(self.state())?;
        let model = model.or(self.settings.default_chat_model.as_deref());
        self.factory.create_chat_transport(model)
    }

    /// Build a client and wire it to a transport once the SDK is ready.
    pub async fn create_npc(&self, config: NpcConfig) -> Result<NpcClient, ColloquyError> {
        let npc = NpcClient::new(config);
        npc.initialize(self).await?;
        Ok(npc)
    }
}

impl std::fmt::Debug for SdkContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkContext")
            .field("settings", &self.settings)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
