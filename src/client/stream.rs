//! Streaming turn output.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{BoxStream, Stream, StreamExt};

use crate::error::ColloquyError;

/// One item of a streaming turn.
#[derive(Debug)]
pub enum TalkEvent {
    /// An incremental piece of the reply, forwarded exactly as the transport sent it.
    Chunk(String),
    /// The final reply, or why there is none. Always the last item, emitted once.
    Complete(Result<String, ColloquyError>),
}

impl TalkEvent {
    pub fn is_complete(&self) -> bool {
        matches!(self, TalkEvent::Complete(_))
    }
}

/// Lazy stream of [`TalkEvent`]s returned by
/// [`NpcClient::talk_stream`](super::NpcClient::talk_stream).
///
/// Nothing happens until the stream is polled. Dropping it before the
/// `Complete` event abandons the turn: the busy flag is released and no
/// assistant message is recorded.
pub struct TalkStream {
    inner: BoxStream<'static, TalkEvent>,
}

impl TalkStream {
    pub(crate) fn new(inner: BoxStream<'static, TalkEvent>) -> Self {
        Self { inner }
    }

    /// Drain the stream and return the completion result.
    pub async fn collect_text(self) -> Result<String, ColloquyError> {
        self.collect_text_with(|_| {}).await
    }

    /// Drain the stream, handing each chunk to `on_chunk`, and return the completion result.
    pub async fn collect_text_with(
        mut self,
        mut on_chunk: impl FnMut(&str),
    ) -> Result<String, ColloquyError> {
        while let Some(event) = self.inner.next().await {
            match event {
                TalkEvent::Chunk(chunk) => on_chunk(&chunk),
                TalkEvent::Complete(result) => return result,
            }
        }
        Err(ColloquyError::transport("stream ended without a completion"))
    }
}

impl Stream for TalkStream {
    type Item = TalkEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl std::fmt::Debug for TalkStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TalkStream").finish_non_exhaustive()
    }
}
