//! Colloquy — conversation-state SDK for NPC chat
//!
//! Keeps an ordered, role-tagged history per NPC, turns user messages into
//! requests against a pluggable [`ChatTransport`](transport::ChatTransport),
//! records the replies, and reduces structured (schema-shaped) replies to a
//! single utterance so the history stays readable.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use colloquy::prelude::*;
//!
//! # async fn example(factory: Arc<dyn TransportFactory>) -> colloquy::error::Result<()> {
//! let ctx = SdkContext::new(SdkSettings::load()?, Arc::new(DeveloperTokenAuth::new()), factory);
//! ctx.init(None).await?;
//!
//! let npc = ctx
//!     .create_npc(NpcConfig::builder().character_design("You are a grumpy blacksmith.").build())
//!     .await?;
//! let reply = npc.talk("Can you fix my sword?", None).await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod context;
pub mod conversation;
pub mod error;
pub mod normalize;
pub mod prelude;
pub mod transport;
pub mod types;
pub mod util;
