//! Tell whether a byte stream is gzip-compressed without losing any of it.
//!
//! [`sniff`] watches the first chunks of a [`Readable`] source until three
//! bytes are in, reports the verdict through a callback, and forwards every
//! chunk, the observed ones included, to the returned [`Sink`].
//!
//! ```no_run
//! use futures::StreamExt;
//! use gzsniff::{sniff, source, Sniffed};
//!
//! # async fn run() {
//! let input = source::from_reader(tokio::io::empty());
//! let Sniffed::Sink(mut sink) = sniff(input, |result| {
//!     if let Ok(detection) = result {
//!         log::info!("gzip: {}", detection.gzip);
//!     }
//! }) else {
//!     return;
//! };
//! while let Some(chunk) = sink.next().await {
//!     let _ = chunk;
//! }
//! # }
//! ```

mod error;
mod magic;
pub mod passthrough;
mod sniff;
pub mod source;

pub use error::SniffError;
pub use magic::{looks_like_gzip, SIGNATURE_LEN};
pub use passthrough::{Sink, SinkId};
pub use sniff::{sniff, Detection, Sniffed, Sniffer, DEFAULT_CAPACITY};
pub use source::Readable;
