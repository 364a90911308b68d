use std::convert::Infallible;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

/// Failure writing a frame to the client connection.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The consumer went away.
    #[error("event stream consumer closed")]
    Closed,
}

/// Destination of rendered frames. Only the stream writer task uses it.
#[async_trait]
pub trait EventSink: Send {
    /// Writes one complete frame.
    async fn write_frame(&mut self, frame: Bytes) -> Result<(), SinkError>;
}

/// Sink feeding an [`EventStream`].
#[derive(Debug)]
pub struct ChannelSink {
    sender: mpsc::Sender<Bytes>,
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn write_frame(&mut self, frame: Bytes) -> Result<(), SinkError> {
        self.sender.send(frame).await.map_err(|_| SinkError::Closed)
    }
}

/// Response body of an event stream.
///
/// Dropping it (the client disconnected) cancels the request token it was
/// created with.
#[derive(Debug)]
pub struct EventStream {
    receiver: mpsc::Receiver<Bytes>,
    _cancel_on_drop: DropGuard,
}

impl EventStream {
    /// Connected sink and body; `cancel` fires when the body is dropped.
    #[must_use]
    pub fn channel(capacity: usize, cancel: CancellationToken) -> (ChannelSink, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let stream = Self {
            receiver,
            _cancel_on_drop: cancel.drop_guard(),
        };
        (ChannelSink { sender }, stream)
    }

    /// Next frame, or `None` once the writer has finished.
    pub async fn next_frame(&mut self) -> Option<Bytes> {
        self.receiver.recv().await
    }

    /// Adapts the body for an HTTP response.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        futures::stream::unfold(self, |mut events| async move {
            events.next_frame().await.map(|frame| (Ok(frame), events))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dropping_the_body_cancels_the_request() {
        let token = CancellationToken::new();
        let (_sink, stream) = EventStream::channel(4, token.clone());
        assert!(!token.is_cancelled());
        drop(stream);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn frames_arrive_in_order() {
        let (mut sink, mut stream) = EventStream::channel(4, CancellationToken::new());
        sink.write_frame(Bytes::from_static(b"one")).await.expect("write");
        sink.write_frame(Bytes::from_static(b"two")).await.expect("write");
        drop(sink);
        assert_eq!(stream.next_frame().await, Some(Bytes::from_static(b"one")));
        assert_eq!(stream.next_frame().await, Some(Bytes::from_static(b"two")));
        assert_eq!(stream.next_frame().await, None);
    }
}
