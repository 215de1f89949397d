use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::event::GenerationEvent;
use crate::Result;

// ─── EventStream ──────────────────────────────────────────────────────────

/// An async stream of [`GenerationEvent`]s from a generation backend.
///
/// Backed by a Tokio mpsc channel. A background task owns the backend
/// connection and forwards events until it emits a terminal event or the
/// connection ends. Dropping `EventStream` closes the receiver, which
/// causes the background task to exit on the next send attempt.
pub struct EventStream {
    rx: mpsc::Receiver<Result<GenerationEvent>>,
}

impl EventStream {
    /// Channel capacity used by the built-in backends.
    pub(crate) const CAPACITY: usize = 32;

    pub(crate) fn channel() -> (mpsc::Sender<Result<GenerationEvent>>, Self) {
        let (tx, rx) = mpsc::channel(Self::CAPACITY);
        (tx, Self { rx })
    }

    /// Wrap a raw mpsc receiver as an `EventStream`.
    ///
    /// This is how custom backends and test doubles inject pre-built event
    /// sequences without a network round-trip.
    pub fn from_channel(rx: mpsc::Receiver<Result<GenerationEvent>>) -> Self {
        Self { rx }
    }

    /// Build a stream that yields a fixed sequence of items. Convenience
    /// wrapper over [`from_channel`](Self::from_channel) for tests.
    pub fn from_events(items: Vec<Result<GenerationEvent>>) -> Self {
        let (tx, stream) = Self::channel();
        tokio::spawn(async move {
            for item in items {
                if tx.send(item).await.is_err() {
                    break;
                }
            }
        });
        stream
    }
}

impl Stream for EventStream {
    type Item = Result<GenerationEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn yields_events_in_order() {
        let stream = EventStream::from_events(vec![
            Ok(GenerationEvent::Explanation { text: "a".into() }),
            Ok(GenerationEvent::Explanation { text: "b".into() }),
        ]);
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 2);
        match &items[0] {
            Ok(GenerationEvent::Explanation { text }) => assert_eq!(text, "a"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn ends_when_sender_dropped() {
        let (tx, mut stream) = EventStream::channel();
        drop(tx);
        assert!(stream.next().await.is_none());
    }
}
