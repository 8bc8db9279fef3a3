//! Per-client configuration.

use std::time::Duration;

use bon::Builder;

/// How overlapping turns on one client are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TurnPolicy {
    /// Overlapping turns run concurrently; the busy flag only reports them.
    /// Their history appends may interleave.
    #[default]
    Advisory,
    /// Turns queue on an async mutex and run one at a time.
    Serialized,
}

/// Configuration for creating an [`NpcClient`](crate::client::NpcClient).
///
/// ```
/// use colloquy::config::{NpcConfig, TurnPolicy};
///
/// let config = NpcConfig::builder()
///     .name("Blacksmith")
///     .character_design("You are a gruff dwarven blacksmith.")
///     .turn_policy(TurnPolicy::Serialized)
///     .build();
/// assert_eq!(config.chat_model, None);
/// ```
#[derive(Debug, Clone, Default, Builder)]
pub struct NpcConfig {
    /// Display name used in logs and transcripts.
    #[builder(into)]
    pub name: Option<String>,
    /// Character design, installed as the system prompt when the client is built.
    #[builder(into)]
    pub character_design: Option<String>,
    /// Chat model override; the SDK default is used when unset.
    #[builder(into)]
    pub chat_model: Option<String>,
    #[builder(default)]
    pub turn_policy: TurnPolicy,
    /// Upper bound on how long a turn waits for a pending setup to finish.
    /// `None` waits until setup completes or the turn is canceled.
    pub ready_timeout: Option<Duration>,
}
