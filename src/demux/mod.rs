//! Demux module - turns attach/logs/exec responses into payload bytes.
//!
//! Three strategies, picked by [`crate::version::select_strategy`]:
//!
//! - [`demultiplex_buffered`] - frames over a fully materialized body
//! - [`LiveDemux`] - frames pulled one at a time from an open connection
//! - [`RawChunks`] - pre-multiplexing daemons, raw transfer chunks
//!
//! Framing anomalies (short header, short payload) end the stream quietly
//! unless a stricter [`TruncationPolicy`] is chosen. Transport errors always
//! propagate.
//!
//! # Example
//!
//! ```
//! use dockwire_client::demux::demultiplex_buffered;
//! use dockwire_client::protocol::{build_frame, stream};
//!
//! let mut body = build_frame(stream::STDOUT, b"hello ");
//! body.extend(build_frame(stream::STDERR, b"world"));
//!
//! assert_eq!(demultiplex_buffered(&body), &b"hello world"[..]);
//! ```

mod bridge;
mod buffered;
mod live;
mod raw;

pub use bridge::{spawn_live, DEFAULT_CHANNEL_CAPACITY};
pub use buffered::{demultiplex_buffered, demultiplex_buffered_with, BufferedFrames};
pub use live::{demultiplex_live, LiveDemux};
pub use raw::{raw_chunked_iterate, RawChunks};

/// What to do with a frame whose payload ends before its declared length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TruncationPolicy {
    /// Emit the bytes that did arrive, then stop.
    #[default]
    Keep,
    /// Discard the partial payload and stop.
    Drop,
    /// Stop with [`crate::Error::Truncated`].
    Error,
}
