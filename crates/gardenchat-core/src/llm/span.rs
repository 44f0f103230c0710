//! Stream wrapper that enters a tracing span on every poll.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;

use gardenchat_types::llm::{LlmError, StreamEvent};

use super::provider::LlmEventStream;

/// Keeps a span alive (and entered while polling) for the whole lifetime of
/// a provider stream, so the span closes when the last event is consumed
/// rather than when the stream is created.
pub struct StreamInSpan {
    inner: LlmEventStream,
    span: tracing::Span,
}

impl StreamInSpan {
    pub fn new(inner: LlmEventStream, span: tracing::Span) -> Self {
        Self { inner, span }
    }
}

impl Stream for StreamInSpan {
    type Item = Result<StreamEvent, LlmError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        // Both fields are Unpin: `inner` is a Pin<Box<_>> and Span is Unpin.
        let this = self.get_mut();
        let _enter = this.span.enter();
        this.inner.as_mut().poll_next(cx)
    }
}
