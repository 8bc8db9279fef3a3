//! Per-client concurrency guard: readiness gate, busy tracking, host liveness
//! and cancellation plumbing shared by every turn.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

use crate::config::TurnPolicy;
use crate::error::ColloquyError;
use crate::util::timeout::with_optional_timeout;

/// Whether a client can dispatch turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// No transport and no setup underway. Turns fail immediately.
    Unconfigured,
    /// Setup is underway (e.g. waiting on SDK initialization). Turns wait.
    Pending,
    /// A transport is wired.
    Ready,
}

/// Liveness of whatever hosts a client (a game object, a session, ...).
///
/// Turns refuse to start once the host reports inactive.
pub trait ActiveState: Send + Sync {
    fn is_active(&self) -> bool;
}

/// Shareable on/off liveness switch.
#[derive(Debug, Clone)]
pub struct ActiveFlag {
    active: Arc<AtomicBool>,
}

impl Default for ActiveFlag {
    fn default() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl ActiveFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }
}

impl ActiveState for ActiveFlag {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Cancellation for one turn: the client's lifetime token plus an optional
/// caller-supplied token. Either one firing cancels the turn.
#[derive(Debug, Clone)]
pub(crate) struct TurnCancel {
    lifetime: CancellationToken,
    external: Option<CancellationToken>,
}

impl TurnCancel {
    pub(crate) fn new(lifetime: CancellationToken, external: Option<&CancellationToken>) -> Self {
        Self {
            lifetime,
            external: external.cloned(),
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.lifetime.is_cancelled()
            || self
                .external
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
    }

    pub(crate) async fn cancelled(&self) {
        match &self.external {
            Some(external) => tokio::select! {
                _ = self.lifetime.cancelled() => {}
                _ = external.cancelled() => {}
            },
            None => self.lifetime.cancelled().await,
        }
    }
}

/// Marks a turn as in flight until dropped.
pub(crate) struct BusyGuard {
    in_flight: Arc<watch::Sender<usize>>,
    _exclusive: Option<OwnedMutexGuard<()>>,
}

impl BusyGuard {
    fn acquire(in_flight: Arc<watch::Sender<usize>>) -> Self {
        in_flight.send_modify(|n| *n += 1);
        Self {
            in_flight,
            _exclusive: None,
        }
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.in_flight.send_modify(|n| *n = n.saturating_sub(1));
    }
}

pub(crate) struct ConcurrencyGuard {
    policy: TurnPolicy,
    ready_timeout: Option<Duration>,
    readiness_tx: watch::Sender<Readiness>,
    in_flight: Arc<watch::Sender<usize>>,
    turn_lock: Arc<Mutex<()>>,
}

impl ConcurrencyGuard {
    pub(crate) fn new(policy: TurnPolicy, ready_timeout: Option<Duration>) -> Self {
        let (readiness_tx, _) = watch::channel(Readiness::Unconfigured);
        let (in_flight, _) = watch::channel(0usize);
        Self {
            policy,
            ready_timeout,
            readiness_tx,
            in_flight: Arc::new(in_flight),
            turn_lock: Arc::new(Mutex::new(())),
        }
    }

    pub(crate) fn readiness(&self) -> Readiness {
        *self.readiness_tx.borrow()
    }

    pub(crate) fn set_readiness(&self, readiness: Readiness) {
        self.readiness_tx.send_replace(readiness);
    }

    pub(crate) fn watch_readiness(&self) -> watch::Receiver<Readiness> {
        self.readiness_tx.subscribe()
    }

    pub(crate) fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    pub(crate) async fn wait_for_idle(&self) {
        let mut rx = self.in_flight.subscribe();
        // The sender lives as long as `self`, so this cannot fail while borrowed.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Enter a turn: mark busy, wait out any pending setup, then take the turn
    /// lock when turns are serialized.
    ///
    /// The returned guard clears the busy mark on every exit path, including
    /// the error paths of this function.
    pub(crate) async fn enter(&self, cancel: &TurnCancel) -> Result<BusyGuard, ColloquyError> {
        let mut guard = BusyGuard::acquire(self.in_flight.clone());
        self.await_ready(cancel).await?;

        if self.policy == TurnPolicy::Serialized {
            let lock = self.turn_lock.clone();
            let exclusive = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ColloquyError::Canceled),
                exclusive = lock.lock_owned() => exclusive,
            };
            guard._exclusive = Some(exclusive);
        }
        Ok(guard)
    }

    async fn await_ready(&self, cancel: &TurnCancel) -> Result<(), ColloquyError> {
        let mut rx = self.readiness_tx.subscribe();
        let settled = async {
            rx.wait_for(|r| *r != Readiness::Pending)
                .await
                .map(|r| *r)
                .map_err(|_| ColloquyError::NotReady("readiness signal closed".into()))
        };

        let readiness = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ColloquyError::Canceled),
            settled = with_optional_timeout(self.ready_timeout, settled) => settled,
        }
        .map_err(|e| match e {
            ColloquyError::Timeout(ms) => {
                ColloquyError::NotReady(format!("client setup still pending after {ms}ms"))
            }
            other => other,
        })?;

        match readiness {
            Readiness::Ready => Ok(()),
            _ => Err(ColloquyError::NotReady(
                "client has no transport; call setup() or initialize() first".into(),
            )),
        }
    }
}
