//! Transport module - the gateway contract the client talks through.
//!
//! Provides:
//! - [`Transport`] - issues a [`Request`] and returns a [`Response`]
//! - [`StreamingBody`] - incremental reader with read-timeout control
//! - `StreamingBody` impls for std TCP and Unix sockets

mod gateway;
mod socket;

pub use gateway::{
    BufferedBody, Method, Request, Response, ResponseBody, StreamingBody, Transport,
};
