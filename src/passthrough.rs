//! A bounded conduit of byte chunks: whatever goes into the [`Writer`] comes
//! out of the [`Sink`] in the same order.

use std::{
    fmt::Display,
    io,
    pin::Pin,
    sync::atomic::{AtomicU64, Ordering},
    task::{ready, Context, Poll},
};

use bytes::Bytes;
use futures::{stream::FusedStream, Stream};
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;

pub type Item = io::Result<Bytes>;

/// Identifies one sink for as long as the process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

impl SinkId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for SinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sink#{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("sink was dropped")]
pub struct Closed;

/// Why [`Writer::try_send`] could not queue an item.
#[derive(Debug)]
pub enum TrySend {
    /// The sink buffer is full; the item is handed back.
    Full(Item),
    Closed,
}

/// Creates a conduit buffering up to `capacity` items (at least one).
pub fn channel(capacity: usize) -> (Writer, Sink) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let id = SinkId::next();
    (
        Writer { tx, id },
        Sink {
            rx,
            id,
            done: false,
        },
    )
}

/// Writing half. Dropping it ends the sink.
#[derive(Debug)]
pub struct Writer {
    tx: mpsc::Sender<Item>,
    id: SinkId,
}

impl Writer {
    pub fn id(&self) -> SinkId {
        self.id
    }

    /// Waits for room in the sink buffer, then queues `item`.
    pub async fn send(&self, item: Item) -> Result<(), Closed> {
        self.tx.send(item).await.map_err(|_| Closed)
    }

    /// Queues `item` only if the sink buffer has room right now.
    pub fn try_send(&self, item: Item) -> Result<(), TrySend> {
        self.tx.try_send(item).map_err(|error| match error {
            mpsc::error::TrySendError::Full(item) => TrySend::Full(item),
            mpsc::error::TrySendError::Closed(_) => TrySend::Closed,
        })
    }

    pub async fn write(&self, chunk: impl Into<Bytes>) -> Result<(), Closed> {
        self.send(Ok(chunk.into())).await
    }

    pub async fn error(&self, error: io::Error) -> Result<(), Closed> {
        self.send(Err(error)).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Reading half, consumed as a [`Stream`] of chunks.
#[derive(Debug)]
pub struct Sink {
    rx: mpsc::Receiver<Item>,
    id: SinkId,
    done: bool,
}

impl Sink {
    pub fn id(&self) -> SinkId {
        self.id
    }

    /// Adapts the sink for consumers that expect an [`AsyncRead`](tokio::io::AsyncRead).
    /// An error item surfaces as a read error.
    pub fn into_async_read(self) -> StreamReader<Self, Bytes> {
        StreamReader::new(self)
    }
}

impl Stream for Sink {
    type Item = Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        let item = ready!(self.rx.poll_recv(cx));
        if item.is_none() {
            self.done = true;
        }
        Poll::Ready(item)
    }
}

impl FusedStream for Sink {
    fn is_terminated(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_items_come_out_in_order() {
        let (writer, mut sink) = channel(4);
        writer.write("ab").await.unwrap();
        writer.error(io::Error::other("boom")).await.unwrap();
        writer.write("cd").await.unwrap();
        drop(writer);

        assert_eq!(sink.next().await.unwrap().unwrap(), "ab");
        assert_eq!(sink.next().await.unwrap().unwrap_err().to_string(), "boom");
        assert_eq!(sink.next().await.unwrap().unwrap(), "cd");
        assert!(sink.next().await.is_none());
        assert!(sink.is_terminated());
        assert!(sink.next().await.is_none());
    }

    #[tokio::test]
    async fn test_write_fails_once_sink_is_dropped() {
        let (writer, sink) = channel(1);
        drop(sink);
        assert!(writer.is_closed());
        assert!(writer.write("x").await.is_err());
    }

    #[tokio::test]
    async fn test_try_send_hands_back_item_when_full() {
        let (writer, mut sink) = channel(1);
        writer.try_send(Ok(Bytes::from_static(b"a"))).unwrap();
        match writer.try_send(Ok(Bytes::from_static(b"b"))) {
            Err(TrySend::Full(item)) => assert_eq!(item.unwrap(), "b"),
            other => panic!("expected a full buffer, got {other:?}"),
        }
        assert_eq!(sink.next().await.unwrap().unwrap(), "a");
        drop(sink);
        assert!(matches!(
            writer.try_send(Ok(Bytes::from_static(b"c"))),
            Err(TrySend::Closed)
        ));
    }

    #[test]
    fn test_ids_are_unique() {
        let (writer, first) = channel(1);
        let (_, second) = channel(1);
        assert_eq!(writer.id(), first.id());
        assert_ne!(first.id(), second.id());
    }
}
