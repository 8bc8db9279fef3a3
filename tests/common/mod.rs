//! Shared test helpers and a scripted transport.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use colloquy::prelude::*;
use colloquy::transport::TextDeltaStream;

/// One scripted transport reaction, consumed in order by any transport call.
pub enum Scripted {
    Text(TextCompletion),
    Structured(Option<StructuredResult>),
    Stream(Vec<Result<TextStreamDelta, ColloquyError>>),
    /// Yield the items, then panic while the stream is being polled.
    StreamPanic(Vec<Result<TextStreamDelta, ColloquyError>>, String),
    Fail(String),
    Panic(String),
    /// Never resolves.
    Hang,
    /// Wait for the gate, then behave like the inner step.
    Gated(Arc<Notify>, Box<Scripted>),
}

/// What a transport call was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Text(Vec<ChatMessage>),
    Structured {
        schema_id: String,
        prompt: String,
        system_prompt: Option<String>,
    },
    StructuredMessages {
        schema_id: String,
        messages: Vec<ChatMessage>,
    },
    Stream(Vec<ChatMessage>),
}

/// A mock transport that replays scripted reactions and records requests.
pub struct ScriptedTransport {
    model: String,
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedTransport {
    pub fn new(model: &str) -> Arc<Self> {
        Arc::new(Self {
            model: model.to_string(),
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, step: Scripted) {
        self.script.lock().unwrap().push_back(step);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, request: Request) {
        self.requests.lock().unwrap().push(request);
    }

    async fn take(&self) -> Result<Scripted, ColloquyError> {
        let next = self.script.lock().unwrap().pop_front();
        let mut step = next.unwrap_or_else(|| Scripted::Fail("script exhausted".into()));
        loop {
            step = match step {
                Scripted::Gated(gate, inner) => {
                    gate.notified().await;
                    *inner
                }
                Scripted::Hang => futures::future::pending::<Scripted>().await,
                Scripted::Panic(message) => panic!("{message}"),
                Scripted::Fail(message) => return Err(ColloquyError::transport(message)),
                other => return Ok(other),
            }
        }
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete_text(&self, messages: &[ChatMessage]) -> Result<TextCompletion, ColloquyError> {
        self.record(Request::Text(messages.to_vec()));
        match self.take().await? {
            Scripted::Text(completion) => Ok(completion),
            _ => Err(ColloquyError::transport("script expected a text step")),
        }
    }

    async fn complete_structured(
        &self,
        schema_id: &str,
        prompt: &str,
        system_prompt: Option<&str>,
    ) -> Result<Option<StructuredResult>, ColloquyError> {
        self.record(Request::Structured {
            schema_id: schema_id.to_string(),
            prompt: prompt.to_string(),
            system_prompt: system_prompt.map(str::to_owned),
        });
        match self.take().await? {
            Scripted::Structured(result) => Ok(result),
            _ => Err(ColloquyError::transport("script expected a structured step")),
        }
    }

    async fn complete_structured_messages(
        &self,
        schema_id: &str,
        messages: &[ChatMessage],
    ) -> Result<Option<StructuredResult>, ColloquyError> {
        self.record(Request::StructuredMessages {
            schema_id: schema_id.to_string(),
            messages: messages.to_vec(),
        });
        match self.take().await? {
            Scripted::Structured(result) => Ok(result),
            _ => Err(ColloquyError::transport("script expected a structured step")),
        }
    }

    async fn stream_text(&self, messages: &[ChatMessage]) -> Result<TextDeltaStream, ColloquyError> {
        self.record(Request::Stream(messages.to_vec()));
        let (items, panic_after) = match self.take().await? {
            Scripted::Stream(items) => (items, None),
            Scripted::StreamPanic(items, message) => (items, Some(message)),
            _ => return Err(ColloquyError::transport("script expected a stream step")),
        };

        let stream = async_stream::stream! {
            for item in items {
                tokio::task::yield_now().await;
                yield item;
            }
            if let Some(message) = panic_after {
                panic!("{message}");
            }
        };
        Ok(Box::pin(stream))
    }
}

pub fn text(reply: &str) -> Scripted {
    Scripted::Text(TextCompletion::ok(reply))
}

/// A structured step from a JSON object literal.
pub fn structured(value: Value) -> Scripted {
    match value {
        Value::Object(map) => Scripted::Structured(Some(map)),
        other => panic!("structured steps need an object, got {other}"),
    }
}

/// A well-formed stream: one delta per chunk, then `Done` with the joined text.
pub fn stream(chunks: &[&str]) -> Scripted {
    let mut items: Vec<_> = chunks
        .iter()
        .map(|c| Ok(TextStreamDelta::delta(*c)))
        .collect();
    items.push(Ok(TextStreamDelta::done(chunks.concat())));
    Scripted::Stream(items)
}

pub fn gated(gate: &Arc<Notify>, step: Scripted) -> Scripted {
    Scripted::Gated(gate.clone(), Box::new(step))
}

/// A client already wired to `transport`.
pub fn ready_npc(transport: &Arc<ScriptedTransport>, config: NpcConfig) -> NpcClient {
    let npc = NpcClient::new(config);
    npc.setup(transport.clone());
    npc
}

pub fn with_prompt(prompt: &str) -> NpcConfig {
    NpcConfig::builder().character_design(prompt).build()
}

/// Let spawned tasks run until they block.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}
