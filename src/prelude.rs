//! Convenience re-exports for common use.

pub use crate::auth::{AuthProvider, DeveloperTokenAuth};
pub use crate::client::{ActiveFlag, ActiveState, NpcClient, Readiness, TalkEvent, TalkStream};
pub use crate::config::{NpcConfig, SdkSettings, TurnPolicy};
pub use crate::context::{SdkContext, SdkState};
pub use crate::conversation::{Conversation, ConversationSnapshot};
pub use crate::error::{ColloquyError, Result};
pub use crate::transport::{
    ChatTransport, SharedTransportFactory, TextCompletion, TextDeltaStream, TransportFactory,
};
pub use crate::types::{ChatMessage, Role, StreamEventType, StructuredResult, TextStreamDelta};
pub use tokio_util::sync::CancellationToken;
