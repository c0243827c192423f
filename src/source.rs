use std::io;

use bytes::Bytes;
use futures::{
    stream::{self, Fuse, FusedStream},
    Stream, StreamExt,
};
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::passthrough::Sink;

/// A byte stream that can be sniffed.
///
/// Data arrives as `Ok(chunk)`, failures as `Err(error)`, and the end of the
/// stream as `None`. `is_readable` reports whether the stream can still
/// produce anything; a finished stream is rejected.
pub trait Readable: Stream<Item = io::Result<Bytes>> + Send + Unpin + 'static {
    fn is_readable(&self) -> bool;
}

impl<S> Readable for Fuse<S>
where
    S: Stream<Item = io::Result<Bytes>> + Send + Unpin + 'static,
{
    fn is_readable(&self) -> bool {
        !self.is_terminated()
    }
}

impl Readable for Sink {
    fn is_readable(&self) -> bool {
        !self.is_terminated()
    }
}

pub type ChunkSource = Fuse<stream::Iter<std::vec::IntoIter<io::Result<Bytes>>>>;

/// Wraps an async reader as a readable source.
pub fn from_reader<R>(reader: R) -> Fuse<ReaderStream<R>>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    ReaderStream::new(reader).fuse()
}

/// Builds a readable source yielding `chunks` as they are split.
pub fn from_chunks<I, B>(chunks: I) -> ChunkSource
where
    I: IntoIterator<Item = B>,
    B: Into<Bytes>,
{
    let items: Vec<io::Result<Bytes>> = chunks.into_iter().map(|chunk| Ok(chunk.into())).collect();
    stream::iter(items).fuse()
}
