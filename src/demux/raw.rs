//! Raw chunk reader for pre-multiplexing daemons and plain streamed
//! endpoints (`/events`, `/stats`).
//!
//! A chunked body is read one transfer chunk per item: a single blocking
//! byte read, then whatever the transport says is left of that chunk. A
//! body that is not chunked is usually an immediate error, so it is checked
//! and handed back whole as the only item.

use std::io;
use std::iter::FusedIterator;

use bytes::Bytes;

use super::live::read_up_to;
use crate::error::Result;
use crate::transport::{Response, StreamingBody};

/// Iterate over the raw chunks of `response`.
///
/// # Errors
///
/// For a non-chunked response, returns [`crate::Error::Api`] if the status is
/// not a success, or an I/O error if the body cannot be read.
pub fn raw_chunked_iterate(response: Response) -> Result<RawChunks> {
    if response.is_chunked() {
        return Ok(RawChunks {
            state: State::Chunked(response.into_streaming()),
        });
    }

    let body = response.error_for_status()?.into_bytes()?;
    Ok(RawChunks {
        state: State::Whole(body),
    })
}

enum State {
    Chunked(Box<dyn StreamingBody>),
    Whole(Bytes),
    Done,
}

/// Lazy sequence of raw body chunks.
pub struct RawChunks {
    state: State,
}

impl RawChunks {
    fn next_chunk(body: &mut dyn StreamingBody) -> io::Result<Option<Bytes>> {
        if body.is_closed() {
            return Ok(None);
        }

        let mut data = Vec::with_capacity(1);
        // Blocks until the next chunk starts.
        if read_up_to(body, &mut data, 1)? == 0 {
            return Ok(None);
        }
        if let Some(left) = body.chunk_remaining().filter(|&n| n > 0) {
            read_up_to(body, &mut data, left)?;
        }
        Ok(Some(Bytes::from(data)))
    }
}

impl Iterator for RawChunks {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        match std::mem::replace(&mut self.state, State::Done) {
            State::Whole(body) => Some(Ok(body)),
            State::Chunked(mut body) => match Self::next_chunk(body.as_mut()) {
                Ok(Some(chunk)) => {
                    self.state = State::Chunked(body);
                    Some(Ok(chunk))
                }
                Ok(None) => {
                    tracing::debug!("raw chunked stream closed");
                    None
                }
                Err(e) => Some(Err(e.into())),
            },
            State::Done => None,
        }
    }
}

impl FusedIterator for RawChunks {}

impl std::fmt::Debug for RawChunks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            State::Chunked(_) => "Chunked",
            State::Whole(_) => "Whole",
            State::Done => "Done",
        };
        f.debug_struct("RawChunks").field("state", &state).finish()
    }
}
