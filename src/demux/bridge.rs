//! Async bridge for blocking chunk streams.
//!
//! The demultiplexers block on socket reads. Async callers run them on a
//! dedicated blocking thread and receive chunks over a bounded channel.
//!
//! # Architecture
//!
//! ```text
//! LiveDemux / RawChunks ─► spawn_blocking ─► mpsc::Sender ─► Receiver (caller)
//! ```
//!
//! The channel bound is the backpressure: a slow receiver stalls the
//! blocking thread, which stops reading the socket. Dropping the receiver
//! ends the thread at its next send and drops the connection with it.

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::Result;

/// Default channel capacity for bridged streams.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Drive `chunks` on a blocking thread and forward every item.
///
/// The receiver yields items in the order the iterator produced them and
/// returns `None` after the last one.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
pub fn spawn_live<I>(chunks: I, capacity: usize) -> mpsc::Receiver<Result<Bytes>>
where
    I: IntoIterator<Item = Result<Bytes>>,
    I::IntoIter: Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let chunks = chunks.into_iter();

    tokio::task::spawn_blocking(move || {
        let mut forwarded = 0u64;
        for item in chunks {
            if tx.blocking_send(item).is_err() {
                tracing::debug!(forwarded, "stream receiver dropped, closing connection");
                return;
            }
            forwarded += 1;
        }
        tracing::debug!(forwarded, "bridged stream finished");
    });

    rx
}
