use std::collections::VecDeque;

use bytes::Bytes;
use futures::StreamExt;
use tokio::{runtime::Handle, sync::oneshot};

use crate::{
    error::SniffError,
    magic::{looks_like_gzip, SIGNATURE_LEN},
    passthrough::{self, Item, Sink, SinkId, TrySend, Writer},
    source::Readable,
};

/// Default number of items the sink buffers before the source is held back.
pub const DEFAULT_CAPACITY: usize = 16;

/// Outcome reported to the sniff callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Detection {
    pub gzip: bool,
    /// The sink handed back by the `sniff` call that produced this result.
    pub sink: SinkId,
}

#[derive(Debug)]
pub enum Sniffed<S> {
    /// The source was accepted; everything it yields flows into this sink.
    Sink(Sink),
    /// The source was not readable and is handed back untouched.
    Rejected(S),
}

impl<S> Sniffed<S> {
    pub fn into_sink(self) -> Option<Sink> {
        match self {
            Sniffed::Sink(sink) => Some(sink),
            Sniffed::Rejected(_) => None,
        }
    }

    pub fn into_rejected(self) -> Option<S> {
        match self {
            Sniffed::Sink(_) => None,
            Sniffed::Rejected(source) => Some(source),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Sniffer {
    capacity: usize,
}

impl Default for Sniffer {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl Sniffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many items the sink buffers before the source is held back.
    /// Until the result is known the source is read regardless.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Starts sniffing `source` and returns the sink carrying all of its data.
    ///
    /// `callback` runs exactly once, never inside this call: with
    /// [`SniffError::NotReadable`] if `source` is already finished, otherwise
    /// with the detection result as soon as three bytes have been seen or the
    /// source ended. Errors yielded by the source are relayed on the sink and
    /// never reach the callback.
    ///
    /// The source is driven on the current Tokio runtime. Without one the
    /// source is handed back and `callback` gets [`SniffError::NoRuntime`]
    /// from another thread.
    ///
    /// A source that neither ends nor reaches three bytes never resolves.
    pub fn sniff<S, F>(&self, source: S, callback: F) -> Sniffed<S>
    where
        S: Readable,
        F: FnOnce(Result<Detection, SniffError>) + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            log::warn!("No Tokio runtime to drive the source, rejecting it");
            std::thread::spawn(move || callback(Err(SniffError::NoRuntime)));
            return Sniffed::Rejected(source);
        };

        if !source.is_readable() {
            log::debug!("Rejecting source that is no longer readable");
            runtime.spawn(async move { callback(Err(SniffError::NotReadable)) });
            return Sniffed::Rejected(source);
        }

        let (writer, sink) = passthrough::channel(self.capacity);
        log::debug!("Sniffing source into {}", sink.id());
        runtime.spawn(forward(source, writer, callback));
        Sniffed::Sink(sink)
    }

    /// Like [`Sniffer::sniff`], but waits for the result and returns it with
    /// the sink, which still holds every byte read so far.
    pub async fn detect<S: Readable>(&self, source: S) -> Result<(bool, Sink), SniffError> {
        let (tx, rx) = oneshot::channel();
        let sniffed = self.sniff(source, move |result| {
            let _ = tx.send(result);
        });
        let detection = rx.await.map_err(|_| SniffError::Detached)??;
        match sniffed {
            Sniffed::Sink(sink) => Ok((detection.gzip, sink)),
            Sniffed::Rejected(_) => Err(SniffError::NotReadable),
        }
    }
}

/// Sniffs `source` with the default [`Sniffer`].
pub fn sniff<S, F>(source: S, callback: F) -> Sniffed<S>
where
    S: Readable,
    F: FnOnce(Result<Detection, SniffError>) + Send + 'static,
{
    Sniffer::default().sniff(source, callback)
}

/// Leading chunks seen before a decision could be made.
#[derive(Debug, Default)]
struct Prefix {
    chunks: Vec<Bytes>,
    len: usize,
}

impl Prefix {
    /// Records `chunk` and returns the verdict once enough bytes are in.
    /// The recorded chunks are released when that happens.
    fn observe(&mut self, chunk: &Bytes) -> Option<bool> {
        self.chunks.push(chunk.clone());
        self.len += chunk.len();
        if self.len < SIGNATURE_LEN {
            return None;
        }

        let mut head = [0u8; SIGNATURE_LEN];
        let mut filled = 0;
        for chunk in self.chunks.drain(..) {
            let take = (SIGNATURE_LEN - filled).min(chunk.len());
            head[filled..filled + take].copy_from_slice(&chunk[..take]);
            filled += take;
            if filled == SIGNATURE_LEN {
                break;
            }
        }
        self.len = 0;
        Some(looks_like_gzip(&head))
    }
}

/// Relays everything from `source` into `writer` and reports the verdict.
///
/// Until the verdict is known, items the sink has no room for are held here
/// instead of waiting on the sink, so the source keeps being read.
async fn forward<S, F>(mut source: S, writer: Writer, callback: F)
where
    S: Readable,
    F: FnOnce(Result<Detection, SniffError>) + Send + 'static,
{
    let id = writer.id();
    let mut pending = Some(callback);
    let mut prefix = Prefix::default();
    let mut held = VecDeque::new();
    let mut sink_alive = true;
    let mut seen = 0usize;

    while let Some(item) = source.next().await {
        match &item {
            Ok(chunk) => {
                seen += chunk.len();
                log::trace!("{id}: observed {} bytes", chunk.len());
                if pending.is_some() {
                    if let Some(gzip) = prefix.observe(chunk) {
                        log::debug!("{id}: gzip = {gzip} after {seen} bytes");
                        if let Some(callback) = pending.take() {
                            callback(Ok(Detection { gzip, sink: id }));
                        }
                    }
                }
                if chunk.is_empty() {
                    continue;
                }
            }
            Err(error) => log::debug!("{id}: relaying source error: {error}"),
        }

        if sink_alive {
            held.push_back(item);
            sink_alive = if pending.is_some() {
                offer(&writer, &mut held)
            } else {
                flush(&writer, &mut held).await
            };
            if !sink_alive {
                log::warn!("{id} was dropped, no longer forwarding");
                held.clear();
            }
        }

        if !sink_alive && pending.is_none() {
            return;
        }
    }

    if let Some(callback) = pending.take() {
        log::debug!("{id}: source ended after {seen} bytes, too short for gzip");
        callback(Ok(Detection {
            gzip: false,
            sink: id,
        }));
    }
    if sink_alive && !flush(&writer, &mut held).await {
        log::warn!("{id} was dropped before the end of the source");
    }
    log::trace!("{id}: source ended");
}

/// Moves held items into the sink as far as it has room, without waiting.
/// Returns `false` once the sink is gone.
fn offer(writer: &Writer, held: &mut VecDeque<Item>) -> bool {
    while let Some(item) = held.pop_front() {
        match writer.try_send(item) {
            Ok(()) => {}
            Err(TrySend::Full(item)) => {
                held.push_front(item);
                return true;
            }
            Err(TrySend::Closed) => return false,
        }
    }
    true
}

async fn flush(writer: &Writer, held: &mut VecDeque<Item>) -> bool {
    while let Some(item) = held.pop_front() {
        if writer.send(item).await.is_err() {
            return false;
        }
    }
    true
}
