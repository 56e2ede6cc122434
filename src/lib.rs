//! # dockwire-client
//!
//! Client for the container-engine remote API, centred on the stream layer
//! behind attach, logs, exec and stats.
//!
//! The daemon interleaves stdout and stderr onto one HTTP connection using
//! 8-byte frame headers. This crate turns such responses back into payload
//! bytes, either all at once or as a live stream that can stay open
//! indefinitely, and falls back to raw chunked reads for daemons that
//! predate multiplexing.
//!
//! ## Architecture
//!
//! - **Transport** ([`transport`]): HTTP is delegated to a [`Transport`]
//!   implementation supplied by the caller
//! - **Protocol** ([`protocol`]): frame header format and decoder
//! - **Demux** ([`demux`]): buffered, live and raw chunk strategies
//! - **Version** ([`version`]): capability table and strategy selection
//!
//! ## Example
//!
//! ```ignore
//! use dockwire_client::{Client, LogsOptions};
//!
//! let client = Client::builder().version("1.17").build(my_transport)?;
//!
//! let logs = client.logs("web", LogsOptions { follow: true, ..Default::default() })?;
//! for chunk in logs.into_stream() {
//!     print!("{}", String::from_utf8_lossy(&chunk?));
//! }
//! ```

pub mod demux;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod version;

mod client;

pub use client::{
    split_command, AttachOptions, ChunkStream, Client, ClientBuilder, ClientConfig, ContainerRef,
    ExecCommand, ExecOptions, LogsOptions, Output, RawStream, Tail, DEFAULT_API_VERSION,
    DEFAULT_TIMEOUT,
};
pub use error::{Error, Result};
pub use transport::{Request, Response, Transport};
