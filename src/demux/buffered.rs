//! Buffered demultiplexer.
//!
//! Walks a materialized body with [`decode_frame`] from cursor 0 until the
//! decoder reports there is no complete header left.

use bytes::{Bytes, BytesMut};

use super::TruncationPolicy;
use crate::error::{Error, Result};
use crate::protocol::{decode_frame, Frame, HEADER_SIZE};

/// Iterator over the frames of a materialized body.
///
/// A truncated final frame is yielded with its available bytes; check
/// [`Frame::is_truncated`] to tell it apart.
#[derive(Debug, Clone)]
pub struct BufferedFrames<'a> {
    buf: &'a [u8],
    cursor: usize,
}

impl<'a> BufferedFrames<'a> {
    /// Start at the beginning of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, cursor: 0 }
    }
}

impl Iterator for BufferedFrames<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        let decoded = decode_frame(self.buf, self.cursor)?;
        self.cursor = decoded.next;
        Some(decoded.frame)
    }
}

impl std::iter::FusedIterator for BufferedFrames<'_> {}

/// Concatenate every payload in `buf`, in order.
///
/// Trailing partial headers are dropped; a truncated final payload
/// contributes the bytes that are present.
pub fn demultiplex_buffered(buf: &[u8]) -> Bytes {
    let mut out = BytesMut::with_capacity(buf.len());
    for frame in BufferedFrames::new(buf) {
        out.extend_from_slice(frame.payload());
    }
    out.freeze()
}

/// [`demultiplex_buffered`] with an explicit truncation policy.
pub fn demultiplex_buffered_with(buf: &[u8], policy: TruncationPolicy) -> Result<Bytes> {
    let mut out = BytesMut::with_capacity(buf.len());
    let mut frames = BufferedFrames::new(buf);

    for frame in frames.by_ref() {
        if frame.is_truncated() {
            tracing::debug!(
                expected = frame.header.len(),
                actual = frame.payload.len(),
                "buffered body ends inside a frame payload"
            );
            match policy {
                TruncationPolicy::Keep => out.extend_from_slice(frame.payload()),
                TruncationPolicy::Drop => {}
                TruncationPolicy::Error => {
                    return Err(Error::Truncated {
                        expected: frame.header.len(),
                        actual: frame.payload.len(),
                    })
                }
            }
            break;
        }
        out.extend_from_slice(frame.payload());
    }

    let leftover = buf.len().saturating_sub(frames.cursor);
    if leftover > 0 {
        tracing::debug!(leftover, "buffered body ends inside a frame header");
        if policy == TruncationPolicy::Error {
            return Err(Error::Truncated {
                expected: HEADER_SIZE,
                actual: leftover,
            });
        }
    }

    Ok(out.freeze())
}
