//! Protocol module - wire format and frame decoding.
//!
//! This module implements the multiplexed stream format used by attach,
//! logs and exec responses:
//! - 8-byte header encoding/decoding
//! - Stateless frame decoder over a materialized buffer
//! - Frame struct with typed accessors

mod frame;
mod wire_format;

pub use frame::{build_frame, decode_frame, Decoded, Frame};
pub use wire_format::{stream, Header, HEADER_SIZE};
