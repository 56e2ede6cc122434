//! Frame struct and the stateless frame decoder.
//!
//! [`decode_frame`] parses one frame out of a materialized buffer at a given
//! cursor. It never fails: a short header stops the scan and a short payload
//! is returned as-is with [`Decoded::truncated`] set.
//!
//! # Example
//!
//! ```
//! use dockwire_client::protocol::decode_frame;
//!
//! let buf = [1, 0, 0, 0, 0, 0, 0, 5, b'a', b'b', b'c', b'd', b'e'];
//! let decoded = decode_frame(&buf, 0).unwrap();
//!
//! assert_eq!(decoded.frame.stream_type(), 1);
//! assert_eq!(decoded.frame.payload(), b"abcde");
//! assert_eq!(decoded.next, buf.len());
//! assert!(decode_frame(&buf, decoded.next).is_none());
//! ```

use bytes::Bytes;

use super::wire_format::{Header, HEADER_SIZE};

/// A demultiplexed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Decoded header (declared length, even if the payload was truncated).
    pub header: Header,
    /// Payload bytes.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame from header and payload.
    pub fn new(header: Header, payload: Bytes) -> Self {
        Self { header, payload }
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Get the channel tag.
    #[inline]
    pub fn stream_type(&self) -> u8 {
        self.header.stream_type
    }

    /// Check if fewer payload bytes are present than the header declared.
    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.payload.len() < self.header.len()
    }

    /// Consume the frame, returning only its payload.
    #[inline]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

/// Result of one [`decode_frame`] step.
#[derive(Debug, Clone)]
pub struct Decoded {
    /// The decoded frame.
    pub frame: Frame,
    /// Cursor to the end of the declared span (may exceed the buffer length).
    pub next: usize,
    /// The payload was cut short by the end of the buffer.
    pub truncated: bool,
}

/// Decode one frame starting at `cursor`.
///
/// Returns `None` when fewer than [`HEADER_SIZE`] bytes remain. A payload
/// running past the end of `buf` is returned with whatever bytes exist, and
/// `next` still points at the end of the declared span so the following call
/// returns `None`.
pub fn decode_frame(buf: &[u8], cursor: usize) -> Option<Decoded> {
    let rest = buf.get(cursor..)?;
    let header = Header::decode(rest)?;

    let start = cursor + HEADER_SIZE;
    let end = start.saturating_add(header.len());
    let available = end.min(buf.len());

    Some(Decoded {
        frame: Frame::new(header, Bytes::copy_from_slice(&buf[start..available])),
        next: end,
        truncated: available < end,
    })
}

/// Build a complete frame as a single byte vector.
///
/// # Example
///
/// ```
/// use dockwire_client::protocol::{build_frame, stream, HEADER_SIZE};
///
/// let bytes = build_frame(stream::STDOUT, b"hello");
/// assert_eq!(bytes.len(), HEADER_SIZE + 5);
/// ```
pub fn build_frame(stream_type: u8, payload: &[u8]) -> Vec<u8> {
    let header = Header::new(stream_type, payload.len() as u32);
    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(payload);
    buf
}
