//! Wire format encoding and decoding.
//!
//! Implements the 8-byte multiplexed stream header:
//! ```text
//! ┌──────────┬──────────┬──────────┐
//! │ Stream   │ Reserved │ Length   │
//! │ 1 byte   │ 3 bytes  │ 4 bytes  │
//! │          │ ignored  │ uint32 BE│
//! └──────────┴──────────┴──────────┘
//! ```
//!
//! The length is Big Endian. Reserved bytes are written as zero and never
//! interpreted on decode.

/// Header size in bytes (fixed, exactly 8).
pub const HEADER_SIZE: usize = 8;

/// Conventional channel tags used by the daemon.
///
/// The demultiplexer passes the tag through untouched; these are only
/// helpers for callers that want to route output.
pub mod stream {
    /// Standard input echo.
    pub const STDIN: u8 = 0;
    /// Standard output.
    pub const STDOUT: u8 = 1;
    /// Standard error.
    pub const STDERR: u8 = 2;
}

/// Decoded header from wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Channel tag (see the `stream` module).
    pub stream_type: u8,
    /// Payload length in bytes.
    pub payload_length: u32,
}

impl Header {
    /// Create a new header.
    pub fn new(stream_type: u8, payload_length: u32) -> Self {
        Self {
            stream_type,
            payload_length,
        }
    }

    /// Encode header to bytes (Big Endian length, zeroed reserved bytes).
    ///
    /// # Example
    ///
    /// ```
    /// use dockwire_client::protocol::{Header, stream};
    ///
    /// let bytes = Header::new(stream::STDOUT, 5).encode();
    /// assert_eq!(bytes, [1, 0, 0, 0, 0, 0, 0, 5]);
    /// ```
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        self.encode_into(&mut buf);
        buf
    }

    /// Encode header into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if buffer is smaller than `HEADER_SIZE` (8 bytes).
    pub fn encode_into(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= HEADER_SIZE);
        buf[0] = self.stream_type;
        buf[1..4].fill(0);
        buf[4..8].copy_from_slice(&self.payload_length.to_be_bytes());
    }

    /// Decode header from bytes.
    ///
    /// Returns `None` if buffer is too short. Bytes 1-3 are ignored.
    ///
    /// # Example
    ///
    /// ```
    /// use dockwire_client::protocol::Header;
    ///
    /// let header = Header::decode(&[2, 0xAA, 0xBB, 0xCC, 0, 0, 1, 0]).unwrap();
    /// assert_eq!(header.stream_type, 2);
    /// assert_eq!(header.payload_length, 256);
    /// ```
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            stream_type: buf[0],
            payload_length: u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]),
        })
    }

    /// Payload length as `usize`.
    #[inline]
    pub fn len(&self) -> usize {
        self.payload_length as usize
    }

    /// Check if the header declares an empty payload.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload_length == 0
    }

    /// Check if this frame carries stdout.
    #[inline]
    pub fn is_stdout(&self) -> bool {
        self.stream_type == stream::STDOUT
    }

    /// Check if this frame carries stderr.
    #[inline]
    pub fn is_stderr(&self) -> bool {
        self.stream_type == stream::STDERR
    }
}
