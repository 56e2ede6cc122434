//! Live demultiplexer.
//!
//! Pulls one frame at a time off an open connection. The connection's read
//! timeout is cleared before the first read: followed logs and long-running
//! exec sessions can sit idle for arbitrarily long between frames.
//!
//! The stream ends on:
//! - EOF before or inside a header
//! - a frame declaring length zero, even if more frames follow
//! - EOF inside a payload (partial bytes handled per [`TruncationPolicy`])
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use dockwire_client::demux::demultiplex_live;
//! use dockwire_client::protocol::{build_frame, stream};
//! use dockwire_client::transport::BufferedBody;
//!
//! let mut wire = build_frame(stream::STDOUT, b"tick ");
//! wire.extend(build_frame(stream::STDOUT, b"tock"));
//!
//! let chunks: Vec<Bytes> = demultiplex_live(BufferedBody::new(wire.into()))
//!     .unwrap()
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(chunks, vec![Bytes::from("tick "), Bytes::from("tock")]);
//! ```

use std::io::{self, Read};
use std::iter::FusedIterator;

use bytes::Bytes;

use super::TruncationPolicy;
use crate::error::{Error, Result};
use crate::protocol::{Frame, Header, HEADER_SIZE};
use crate::transport::StreamingBody;

/// Initial payload allocation cap; larger frames grow as bytes arrive.
const MAX_PREALLOC: usize = 64 * 1024;

/// Clear the read timeout on `body` and start demultiplexing it.
pub fn demultiplex_live<S: StreamingBody>(body: S) -> Result<LiveDemux<S>> {
    LiveDemux::with_policy(body, TruncationPolicy::default())
}

/// Lazy, single-consumer sequence of payloads read from a live connection.
pub struct LiveDemux<S> {
    body: S,
    policy: TruncationPolicy,
    done: bool,
    frames: u64,
}

impl<S: StreamingBody> LiveDemux<S> {
    /// Clear the read timeout and wrap `body`.
    pub fn with_policy(mut body: S, policy: TruncationPolicy) -> Result<Self> {
        body.set_read_timeout(None)?;
        tracing::debug!("read timeout disabled for live stream");

        Ok(Self {
            body,
            policy,
            done: false,
            frames: 0,
        })
    }

    /// Read the next frame, blocking until it is complete or the stream ends.
    ///
    /// Returns `Ok(None)` once the stream has ended.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.done {
            return Ok(None);
        }
        match self.read_frame() {
            Ok(Some(frame)) => {
                self.frames += 1;
                Ok(Some(frame))
            }
            Ok(None) => {
                self.finish();
                Ok(None)
            }
            Err(e) => {
                self.finish();
                Err(e)
            }
        }
    }

    /// Number of frames emitted so far.
    pub fn frames_read(&self) -> u64 {
        self.frames
    }

    /// Whether the stream has ended.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Give back the underlying connection.
    pub fn into_inner(self) -> S {
        self.body
    }

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut header_buf = [0u8; HEADER_SIZE];
        let n = read_full(&mut self.body, &mut header_buf)?;
        if n == 0 {
            tracing::debug!(frames = self.frames, "live stream reached EOF");
            return Ok(None);
        }
        if n < HEADER_SIZE {
            tracing::debug!(received = n, "live stream ended inside a frame header");
            return self.truncated(HEADER_SIZE, n).map(|_| None);
        }

        let Some(header) = Header::decode(&header_buf) else {
            return Ok(None);
        };

        if header.is_empty() {
            tracing::debug!(
                frames = self.frames,
                "zero-length frame, ending live stream"
            );
            return Ok(None);
        }

        let expected = header.len();
        let mut payload = Vec::with_capacity(expected.min(MAX_PREALLOC));
        let received = read_up_to(&mut self.body, &mut payload, expected)?;
        if received == 0 {
            tracing::debug!(expected, "live stream ended before frame payload");
            return Ok(None);
        }

        let frame = Frame::new(header, Bytes::from(payload));
        if received < expected {
            tracing::debug!(expected, received, "live stream ended inside a frame payload");
            self.done = true;
            return self.truncated(expected, received).map(|keep| keep.then_some(frame));
        }

        Ok(Some(frame))
    }

    /// Apply the truncation policy. `Ok(true)` means emit the partial frame.
    fn truncated(&self, expected: usize, actual: usize) -> Result<bool> {
        match self.policy {
            TruncationPolicy::Keep => Ok(true),
            TruncationPolicy::Drop => Ok(false),
            TruncationPolicy::Error => Err(Error::Truncated { expected, actual }),
        }
    }

    fn finish(&mut self) {
        self.done = true;
    }
}

impl<S: StreamingBody> Iterator for LiveDemux<S> {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame.into_payload())),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl<S: StreamingBody> FusedIterator for LiveDemux<S> {}

impl<S> std::fmt::Debug for LiveDemux<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveDemux")
            .field("policy", &self.policy)
            .field("done", &self.done)
            .field("frames", &self.frames)
            .finish()
    }
}

/// Fill `buf` unless EOF comes first. Returns the number of bytes read.
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Append up to `limit` bytes to `out`, stopping early at EOF.
pub(crate) fn read_up_to<R: Read + ?Sized>(
    reader: &mut R,
    out: &mut Vec<u8>,
    limit: usize,
) -> io::Result<usize> {
    reader.take(limit as u64).read_to_end(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demux::demultiplex_buffered;
    use crate::protocol::{build_frame, stream};
    use std::time::Duration;

    /// Connection double that hands out at most `step` bytes per read.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
        timeouts: Vec<Option<Duration>>,
        reads: usize,
    }

    impl Trickle {
        fn new(data: Vec<u8>, step: usize) -> Self {
            Self {
                data,
                pos: 0,
                step,
                timeouts: Vec::new(),
                reads: 0,
            }
        }
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads += 1;
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    impl StreamingBody for Trickle {
        fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
            assert_eq!(self.reads, 0, "timeout must be cleared before reading");
            self.timeouts.push(timeout);
            Ok(())
        }
    }

    /// Fails once with the given error kind on read number `fail_after`.
    struct Flaky {
        inner: Trickle,
        fail_after: usize,
        kind: io::ErrorKind,
    }

    impl Read for Flaky {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.inner.reads == self.fail_after {
                self.inner.reads += 1;
                return Err(io::Error::new(self.kind, "boom"));
            }
            self.inner.read(buf)
        }
    }

    impl StreamingBody for Flaky {
        fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
            self.inner.set_read_timeout(timeout)
        }
    }

    fn wire(frames: &[(u8, &[u8])]) -> Vec<u8> {
        frames
            .iter()
            .flat_map(|(tag, payload)| build_frame(*tag, payload))
            .collect()
    }

    fn collect<S: StreamingBody>(demux: LiveDemux<S>) -> Vec<Bytes> {
        demux.collect::<Result<Vec<_>>>().unwrap()
    }

    #[test]
    fn test_timeout_cleared_before_first_read() {
        let demux = demultiplex_live(Trickle::new(Vec::new(), 8)).unwrap();
        let body = demux.into_inner();
        assert_eq!(body.timeouts, vec![None]);
    }

    #[test]
    fn test_matches_buffered_for_any_chunking() {
        let data = wire(&[
            (stream::STDOUT, b"hello "),
            (stream::STDERR, b"oops "),
            (stream::STDOUT, &[0xAB; 300]),
            (stream::STDOUT, b"world"),
        ]);
        let expected: Vec<Bytes> = crate::demux::BufferedFrames::new(&data)
            .map(Frame::into_payload)
            .collect();

        for step in [1, 3, 7, 8, 9, 64, 4096] {
            let chunks = collect(demultiplex_live(Trickle::new(data.clone(), step)).unwrap());
            assert_eq!(chunks, expected, "step {}", step);
            assert_eq!(chunks.concat(), demultiplex_buffered(&data).to_vec());
        }
    }

    #[test]
    fn test_empty_connection_yields_nothing() {
        let mut demux = demultiplex_live(Trickle::new(Vec::new(), 4)).unwrap();
        assert!(demux.next().is_none());
        assert!(demux.is_done());
    }

    #[test]
    fn test_zero_length_frame_terminates_stream() {
        // Frames after the zero-length one are never delivered.
        let data = wire(&[
            (stream::STDOUT, b"before"),
            (stream::STDOUT, b""),
            (stream::STDOUT, b"after"),
        ]);

        let mut demux = demultiplex_live(Trickle::new(data, 5)).unwrap();
        assert_eq!(demux.next().unwrap().unwrap(), &b"before"[..]);
        assert!(demux.next().is_none());
        assert!(demux.next().is_none());
        assert_eq!(demux.frames_read(), 1);
    }

    #[test]
    fn test_partial_header_ends_cleanly() {
        let mut data = wire(&[(stream::STDOUT, b"one")]);
        data.extend_from_slice(&[1, 0, 0]);

        let chunks = collect(demultiplex_live(Trickle::new(data, 2)).unwrap());
        assert_eq!(chunks, vec![Bytes::from("one")]);
    }

    #[test]
    fn test_partial_payload_kept_by_default() {
        let mut data = wire(&[(stream::STDOUT, b"one")]);
        data.extend_from_slice(&Header::new(stream::STDERR, 100).encode());
        data.extend_from_slice(b"par");

        let chunks = collect(demultiplex_live(Trickle::new(data, 4)).unwrap());
        assert_eq!(chunks, vec![Bytes::from("one"), Bytes::from("par")]);
    }

    #[test]
    fn test_partial_payload_dropped() {
        let mut data = wire(&[(stream::STDOUT, b"one")]);
        data.extend_from_slice(&Header::new(stream::STDERR, 100).encode());
        data.extend_from_slice(b"par");

        let demux = LiveDemux::with_policy(Trickle::new(data, 4), TruncationPolicy::Drop).unwrap();
        assert_eq!(collect(demux), vec![Bytes::from("one")]);
    }

    #[test]
    fn test_partial_payload_strict() {
        let mut data = wire(&[(stream::STDOUT, b"one")]);
        data.extend_from_slice(&Header::new(stream::STDERR, 100).encode());
        data.extend_from_slice(b"par");

        let mut demux =
            LiveDemux::with_policy(Trickle::new(data, 4), TruncationPolicy::Error).unwrap();
        assert_eq!(demux.next().unwrap().unwrap(), &b"one"[..]);
        assert!(matches!(
            demux.next(),
            Some(Err(Error::Truncated {
                expected: 100,
                actual: 3
            }))
        ));
        assert!(demux.next().is_none());
    }

    #[test]
    fn test_header_without_payload_ends() {
        let data = Header::new(stream::STDOUT, 5).encode().to_vec();
        let chunks = collect(demultiplex_live(Trickle::new(data, 8)).unwrap());
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_io_error_propagates_then_fuses() {
        let data = wire(&[(stream::STDOUT, b"ok"), (stream::STDOUT, b"lost")]);
        let flaky = Flaky {
            inner: Trickle::new(data, 10),
            fail_after: 2,
            kind: io::ErrorKind::ConnectionReset,
        };

        let mut demux = demultiplex_live(flaky).unwrap();
        assert_eq!(demux.next().unwrap().unwrap(), &b"ok"[..]);
        assert!(matches!(demux.next(), Some(Err(Error::Io(_)))));
        assert!(demux.next().is_none());
    }

    #[test]
    fn test_interrupted_reads_retried() {
        let data = wire(&[(stream::STDOUT, b"ok")]);
        let flaky = Flaky {
            inner: Trickle::new(data, 3),
            fail_after: 1,
            kind: io::ErrorKind::Interrupted,
        };

        let chunks = collect(demultiplex_live(flaky).unwrap());
        assert_eq!(chunks, vec![Bytes::from("ok")]);
    }

    #[test]
    fn test_huge_declared_length_reads_what_arrives() {
        let mut data = Header::new(stream::STDOUT, u32::MAX).encode().to_vec();
        data.extend_from_slice(b"tiny");

        let chunks = collect(demultiplex_live(Trickle::new(data, 1024)).unwrap());
        assert_eq!(chunks, vec![Bytes::from("tiny")]);
    }
}
