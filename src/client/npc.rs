//! NPC chat client: owns one conversation and coordinates turns against a
//! [`ChatTransport`].
//!
//! Every turn follows the same contract:
//! - the user message is recorded *before* dispatch, so failed turns still
//!   show what was asked;
//! - the assistant reply is recorded only when the transport produced a usable
//!   result;
//! - the busy mark is released on every exit path.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use futures::{FutureExt, StreamExt};
use serde::de::DeserializeOwned;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::guard::{ActiveFlag, ActiveState, BusyGuard, ConcurrencyGuard, Readiness, TurnCancel};
use super::stream::{TalkEvent, TalkStream};
use crate::config::NpcConfig;
use crate::context::SdkContext;
use crate::conversation::transcript::render_transcript;
use crate::conversation::{Conversation, ConversationSnapshot};
use crate::error::ColloquyError;
use crate::normalize;
use crate::transport::ChatTransport;
use crate::types::{ChatMessage, StreamEventType, StructuredResult};
use crate::util::timeout::with_optional_timeout;

/// How a structured turn hands the conversation to the transport.
#[derive(Debug, Clone, Copy)]
enum StructuredMode {
    /// One flattened transcript string plus the system prompt as an instruction.
    Flattened,
    /// The role-tagged message list itself.
    FullHistory,
}

/// A conversational agent with automatically managed history.
///
/// Cloning is cheap; clones share the same conversation and transport.
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use colloquy::prelude::*;
/// # async fn example(transport: Arc<dyn ChatTransport>) -> colloquy::error::Result<()> {
/// let npc = NpcClient::new(
///     NpcConfig::builder()
///         .character_design("You are the village elder.")
///         .build(),
/// );
/// npc.setup(transport);
///
/// let reply = npc.talk("What happened to the mill?", None).await?;
/// println!("{reply}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct NpcClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    id: Uuid,
    config: NpcConfig,
    conversation: Mutex<Conversation>,
    transport: RwLock<Option<Arc<dyn ChatTransport>>>,
    guard: ConcurrencyGuard,
    host: Arc<dyn ActiveState>,
    alive: ActiveFlag,
    lifetime: CancellationToken,
}

impl NpcClient {
    /// Create a client whose host is always considered active.
    pub fn new(config: NpcConfig) -> Self {
        Self::with_active_state(config, Arc::new(ActiveFlag::new()))
    }

    /// Create a client tied to a host liveness signal.
    pub fn with_active_state(config: NpcConfig, host: Arc<dyn ActiveState>) -> Self {
        let mut conversation = Conversation::new();
        if let Some(design) = config.character_design.as_deref() {
            conversation.set_system_prompt(design);
        }

        let inner = ClientInner {
            id: Uuid::new_v4(),
            guard: ConcurrencyGuard::new(config.turn_policy, config.ready_timeout),
            config,
            conversation: Mutex::new(conversation),
            transport: RwLock::new(None),
            host,
            alive: ActiveFlag::new(),
            lifetime: CancellationToken::new(),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Display name: the configured name, or one derived from the id.
    pub fn name(&self) -> String {
        self.inner.name()
    }

    pub fn config(&self) -> &NpcConfig {
        &self.inner.config
    }

    /// Model of the wired transport, if any.
    pub fn model_name(&self) -> Option<String> {
        self.inner
            .current_transport()
            .map(|t| t.model_name().to_string())
    }

    // -- Lifecycle --

    /// Wire a transport and open the readiness gate.
    pub fn setup(&self, transport: Arc<dyn ChatTransport>) {
        info!(
            client = %self.inner.id,
            model = transport.model_name(),
            "client wired to transport"
        );
        *self
            .inner
            .transport
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(transport);
        self.inner.guard.set_readiness(Readiness::Ready);
    }

    /// Deferred bootstrap: wait for the SDK, then obtain and wire a transport.
    ///
    /// Turns issued while this runs wait for it instead of failing.
    pub async fn initialize(&self, context: &SdkContext) -> Result<(), ColloquyError> {
        let previous = self.inner.guard.readiness();
        if previous != Readiness::Ready {
            self.inner.guard.set_readiness(Readiness::Pending);
        }

        let bootstrap = async {
            with_optional_timeout(self.inner.config.ready_timeout, context.wait_until_ready())
                .await?;
            context.create_chat_transport(self.inner.config.chat_model.as_deref())
        };

        match bootstrap.await {
            Ok(transport) => {
                self.setup(transport);
                Ok(())
            }
            Err(e) => {
                if self.inner.guard.readiness() == Readiness::Pending {
                    self.inner.guard.set_readiness(previous);
                }
                error!(client = %self.inner.id, error = %e, "client initialization failed");
                Err(e)
            }
        }
    }

    /// Tear the client down: in-flight turns are canceled and new ones fail
    /// with [`ColloquyError::InactiveCaller`]. History stays readable.
    pub fn teardown(&self) {
        self.inner.alive.deactivate();
        self.inner.lifetime.cancel();
        debug!(client = %self.inner.id, "client torn down");
    }

    /// Token canceled when the client is torn down.
    pub fn lifetime_token(&self) -> CancellationToken {
        self.inner.lifetime.clone()
    }

    pub fn readiness(&self) -> Readiness {
        self.inner.guard.readiness()
    }

    pub fn watch_readiness(&self) -> watch::Receiver<Readiness> {
        self.inner.guard.watch_readiness()
    }

    pub fn is_ready(&self) -> bool {
        self.readiness() == Readiness::Ready
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    /// Whether any turn is in flight.
    pub fn is_talking(&self) -> bool {
        self.inner.guard.in_flight() > 0
    }

    /// Wait until no turn is in flight.
    pub async fn wait_for_idle(&self) {
        self.inner.guard.wait_for_idle().await;
    }

    // -- Turns --

    /// Send a message and get the plain-text reply.
    pub async fn talk(
        &self,
        message: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, ColloquyError> {
        let cancel = self.inner.turn_cancel(cancel);
        self.inner
            .text_turn(message, &cancel)
            .await
            .inspect_err(|e| self.inner.log_failure("talk", e))
    }

    /// Send a message and get a structured reply.
    ///
    /// The transport receives the flattened history plus the message as one
    /// prompt, with the system prompt passed separately.
    pub async fn talk_structured(
        &self,
        message: &str,
        schema_id: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<StructuredResult, ColloquyError> {
        let cancel = self.inner.turn_cancel(cancel);
        self.inner
            .structured_turn(message, schema_id, StructuredMode::Flattened, &cancel, Ok)
            .await
            .inspect_err(|e| self.inner.log_failure("talk_structured", e))
    }

    /// Like [`talk_structured`](Self::talk_structured), decoded into `T`.
    pub async fn talk_structured_as<T: DeserializeOwned>(
        &self,
        message: &str,
        schema_id: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, ColloquyError> {
        let cancel = self.inner.turn_cancel(cancel);
        self.inner
            .structured_turn(
                message,
                schema_id,
                StructuredMode::Flattened,
                &cancel,
                decode_structured::<T>,
            )
            .await
            .inspect_err(|e| self.inner.log_failure("talk_structured_as", e))
    }

    /// Send a message and get a structured reply, giving the transport the
    /// full role-tagged history.
    pub async fn talk_structured_with_history(
        &self,
        message: &str,
        schema_id: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<StructuredResult, ColloquyError> {
        let cancel = self.inner.turn_cancel(cancel);
        self.inner
            .structured_turn(message, schema_id, StructuredMode::FullHistory, &cancel, Ok)
            .await
            .inspect_err(|e| self.inner.log_failure("talk_structured_with_history", e))
    }

    /// Like [`talk_structured_with_history`](Self::talk_structured_with_history), decoded into `T`.
    pub async fn talk_structured_with_history_as<T: DeserializeOwned>(
        &self,
        message: &str,
        schema_id: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<T, ColloquyError> {
        let cancel = self.inner.turn_cancel(cancel);
        self.inner
            .structured_turn(
                message,
                schema_id,
                StructuredMode::FullHistory,
                &cancel,
                decode_structured::<T>,
            )
            .await
            .inspect_err(|e| self.inner.log_failure("talk_structured_with_history_as", e))
    }

    /// Send a message and stream the reply.
    ///
    /// The returned stream yields every transport chunk as it arrives and ends
    /// with exactly one [`TalkEvent::Complete`]. Nothing is sent until the
    /// stream is first polled.
    pub fn talk_stream(&self, message: &str, cancel: Option<&CancellationToken>) -> TalkStream {
        let inner = self.inner.clone();
        let message = message.to_string();
        let cancel = inner.turn_cancel(cancel);

        let events = async_stream::stream! {
            let outcome: Result<String, ColloquyError> = 'turn: {
                if let Err(e) = require_non_empty(&message, "message") {
                    break 'turn Err(e);
                }
                let (busy, transport) = match inner.begin_turn(&cancel).await {
                    Ok(entered) => entered,
                    Err(e) => break 'turn Err(e),
                };
                let messages = match inner.record_user_turn(&message, &cancel).await {
                    Ok(messages) => messages,
                    Err(e) => break 'turn Err(e),
                };
                let mut deltas = match inner.dispatch(&cancel, transport.stream_text(&messages)).await {
                    Ok(deltas) => AssertUnwindSafe(deltas).catch_unwind(),
                    Err(e) => break 'turn Err(e),
                };

                let result = loop {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        item = deltas.next() => Some(item),
                    };
                    match next {
                        None => break Err(ColloquyError::Canceled),
                        Some(None) => {
                            break Err(ColloquyError::transport("stream ended without a completion"))
                        }
                        Some(Some(Err(panic))) => {
                            break Err(ColloquyError::transport(format!(
                                "transport panicked: {}",
                                panic_message(panic.as_ref())
                            )))
                        }
                        Some(Some(Ok(Err(e)))) => break Err(e),
                        Some(Some(Ok(Ok(delta)))) => match delta.event_type {
                            StreamEventType::TextDelta => yield TalkEvent::Chunk(delta.text),
                            StreamEventType::Done => break Ok(delta.text),
                            StreamEventType::Error => break Err(ColloquyError::transport(delta.text)),
                        },
                    }
                };

                if let Ok(text) = &result {
                    if !text.is_empty() {
                        inner.conversation.lock().await.add_assistant_message(text.clone());
                    }
                }
                drop(busy);
                result
            };

            if let Err(e) = &outcome {
                inner.log_failure("talk_stream", e);
            }
            yield TalkEvent::Complete(outcome);
        };

        TalkStream::new(events.boxed())
    }

    // -- History management --

    /// Copy of the full history, system message first when present.
    pub async fn history(&self) -> Vec<ChatMessage> {
        self.inner.conversation.lock().await.messages().to_vec()
    }

    pub async fn history_len(&self) -> usize {
        self.inner.conversation.lock().await.len()
    }

    pub async fn system_prompt(&self) -> Option<String> {
        self.inner
            .conversation
            .lock()
            .await
            .system_prompt()
            .map(str::to_owned)
    }

    /// Replace the system prompt; an empty prompt removes it.
    pub async fn set_system_prompt(&self, prompt: &str) {
        self.inner.conversation.lock().await.set_system_prompt(prompt);
    }

    /// Manually append a message.
    pub async fn append_message(&self, role: &str, content: &str) -> Result<(), ColloquyError> {
        self.inner
            .conversation
            .lock()
            .await
            .append(role, content)
            .inspect_err(|e| {
                warn!(client = %self.inner.id, error = %e, "rejected manual history append")
            })
    }

    /// Start over, keeping the character (system prompt).
    pub async fn clear_history(&self) {
        self.inner.conversation.lock().await.clear();
    }

    /// Undo the last user/assistant exchange.
    pub async fn revert_history(&self) -> bool {
        self.inner.conversation.lock().await.revert_last_exchange()
    }

    /// Remove up to `count` messages from the end; returns how many were removed.
    pub async fn revert_messages(&self, count: usize) -> usize {
        self.inner.conversation.lock().await.revert_last(count)
    }

    pub async fn snapshot(&self) -> ConversationSnapshot {
        self.inner.conversation.lock().await.snapshot()
    }

    /// Replace the conversation with a snapshot, e.g. one taken from another client.
    pub async fn restore(&self, snapshot: ConversationSnapshot) {
        self.inner.conversation.lock().await.restore(snapshot);
    }

    /// Serialize the conversation to a JSON string.
    pub async fn save_history(&self) -> Result<String, ColloquyError> {
        self.snapshot().await.to_json()
    }

    /// Load a conversation saved by [`save_history`](Self::save_history).
    ///
    /// Malformed input is rejected before anything is modified.
    pub async fn load_history(&self, json: &str) -> Result<(), ColloquyError> {
        self.inner
            .conversation
            .lock()
            .await
            .load_json(json)
            .inspect_err(|e| error!(client = %self.inner.id, error = %e, "failed to load history"))
    }

    pub async fn save_history_to(&self, path: impl AsRef<Path>) -> Result<(), ColloquyError> {
        let json = self.save_history().await?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    pub async fn load_history_from(&self, path: impl AsRef<Path>) -> Result<(), ColloquyError> {
        let json = tokio::fs::read_to_string(path).await?;
        self.load_history(&json).await
    }

    /// Pretty transcript of the history for debugging.
    pub async fn transcript(&self, title: Option<&str>) -> String {
        let title = title
            .map(str::to_owned)
            .unwrap_or_else(|| format!("{} conversation history", self.name()));
        let conversation = self.inner.conversation.lock().await;
        render_transcript(&title, conversation.messages())
    }

    /// Emit the transcript at `info` level.
    pub async fn log_history(&self, title: Option<&str>) {
        let transcript = self.transcript(title).await;
        info!(client = %self.inner.id, "\n{transcript}");
    }
}

impl std::fmt::Debug for NpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NpcClient")
            .field("id", &self.inner.id)
            .field("name", &self.inner.config.name)
            .field("readiness", &self.inner.guard.readiness())
            .field("in_flight", &self.inner.guard.in_flight())
            .finish_non_exhaustive()
    }
}

impl ClientInner {
    fn name(&self) -> String {
        self.config.name.clone().unwrap_or_else(|| {
            let id = self.id.simple().to_string();
            format!("npc-{}", &id[..8])
        })
    }

    fn is_active(&self) -> bool {
        self.alive.is_active() && self.host.is_active()
    }

    fn current_transport(&self) -> Option<Arc<dyn ChatTransport>> {
        self.transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn turn_cancel(&self, external: Option<&CancellationToken>) -> TurnCancel {
        TurnCancel::new(self.lifetime.clone(), external)
    }

    /// Enter the guard, then check the transport and host are usable.
    async fn begin_turn(
        &self,
        cancel: &TurnCancel,
    ) -> Result<(BusyGuard, Arc<dyn ChatTransport>), ColloquyError> {
        // Torn down clients also have their lifetime token canceled; report the teardown.
        if !self.alive.is_active() {
            return Err(self.inactive());
        }
        let busy = self.guard.enter(cancel).await?;
        let transport = self
            .current_transport()
            .ok_or_else(|| ColloquyError::NotReady("client has no transport".into()))?;
        if !self.is_active() {
            return Err(self.inactive());
        }
        Ok((busy, transport))
    }

    fn inactive(&self) -> ColloquyError {
        ColloquyError::InactiveCaller(format!("{} is not active", self.name()))
    }

    /// Record the user turn and return the history to send.
    async fn record_user_turn(
        &self,
        message: &str,
        cancel: &TurnCancel,
    ) -> Result<Vec<ChatMessage>, ColloquyError> {
        if cancel.is_cancelled() {
            return Err(ColloquyError::Canceled);
        }
        let mut conversation = self.conversation.lock().await;
        conversation.add_user_message(message);
        Ok(conversation.messages().to_vec())
    }

    /// Record the user turn and return `(prompt, system_prompt)`, where the
    /// prompt is the prior transcript followed by the new message.
    async fn record_flattened_turn(
        &self,
        message: &str,
        cancel: &TurnCancel,
    ) -> Result<(String, Option<String>), ColloquyError> {
        if cancel.is_cancelled() {
            return Err(ColloquyError::Canceled);
        }
        let mut conversation = self.conversation.lock().await;
        let context = conversation.build_context_text();
        let prompt = if context.is_empty() {
            message.to_string()
        } else {
            format!("{context}\n\nUser: {message}")
        };
        let system_prompt = conversation.system_prompt().map(str::to_owned);
        conversation.add_user_message(message);
        Ok((prompt, system_prompt))
    }

    /// Await a transport call, racing it against cancellation and converting
    /// a panic inside the transport into a transport failure. Streams returned
    /// by the call get the same panic handling in `talk_stream`.
    async fn dispatch<T>(
        &self,
        cancel: &TurnCancel,
        call: impl Future<Output = Result<T, ColloquyError>>,
    ) -> Result<T, ColloquyError> {
        let call = AssertUnwindSafe(call).catch_unwind();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ColloquyError::Canceled),
            outcome = call => match outcome {
                Ok(result) => result,
                Err(panic) => Err(ColloquyError::transport(format!(
                    "transport panicked: {}",
                    panic_message(panic.as_ref())
                ))),
            },
        }
    }

    async fn text_turn(&self, message: &str, cancel: &TurnCancel) -> Result<String, ColloquyError> {
        require_non_empty(message, "message")?;
        let (_busy, transport) = self.begin_turn(cancel).await?;

        let messages = self.record_user_turn(message, cancel).await?;
        let completion = self
            .dispatch(cancel, transport.complete_text(&messages))
            .await?;
        let text = completion.into_text().ok_or_else(|| {
            ColloquyError::transport("text completion was unsuccessful or empty")
        })?;

        let mut conversation = self.conversation.lock().await;
        conversation.add_assistant_message(text.clone());
        debug!(client = %self.id, history_len = conversation.len(), "talk completed");
        Ok(text)
    }

    async fn structured_turn<R>(
        &self,
        message: &str,
        schema_id: &str,
        mode: StructuredMode,
        cancel: &TurnCancel,
        decode: impl FnOnce(StructuredResult) -> Result<R, ColloquyError>,
    ) -> Result<R, ColloquyError> {
        require_non_empty(message, "message")?;
        require_non_empty(schema_id, "schema id")?;
        let (_busy, transport) = self.begin_turn(cancel).await?;

        let result = match mode {
            StructuredMode::Flattened => {
                let (prompt, system_prompt) = self.record_flattened_turn(message, cancel).await?;
                self.dispatch(
                    cancel,
                    transport.complete_structured(schema_id, &prompt, system_prompt.as_deref()),
                )
                .await?
            }
            StructuredMode::FullHistory => {
                let messages = self.record_user_turn(message, cancel).await?;
                self.dispatch(
                    cancel,
                    transport.complete_structured_messages(schema_id, &messages),
                )
                .await?
            }
        }
        .ok_or_else(|| {
            ColloquyError::transport(format!(
                "structured completion for '{schema_id}' returned no object"
            ))
        })?;

        let utterance = normalize::extract_utterance(&result, schema_id);
        let value = decode(result)?;

        let mut conversation = self.conversation.lock().await;
        conversation.add_assistant_message(utterance);
        debug!(
            client = %self.id,
            schema = schema_id,
            history_len = conversation.len(),
            "structured talk completed"
        );
        Ok(value)
    }

    fn log_failure(&self, op: &str, err: &ColloquyError) {
        match err {
            ColloquyError::Canceled => {
                debug!(client = %self.id, op, "turn canceled");
            }
            ColloquyError::InvalidArgument(_) => {
                warn!(client = %self.id, op, error = %err, "turn rejected");
            }
            _ => {
                error!(
                    client = %self.id,
                    op,
                    category = ?err.category(),
                    error = %err,
                    "turn failed"
                );
            }
        }
    }
}

fn require_non_empty(value: &str, what: &str) -> Result<(), ColloquyError> {
    if value.is_empty() {
        return Err(ColloquyError::InvalidArgument(format!("{what} cannot be empty")));
    }
    Ok(())
}

fn decode_structured<T: DeserializeOwned>(result: StructuredResult) -> Result<T, ColloquyError> {
    serde_json::from_value(serde_json::Value::Object(result)).map_err(|e| {
        ColloquyError::transport_with_source("structured result does not match the requested type", e)
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
