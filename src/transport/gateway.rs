//! Transport gateway contract.
//!
//! The client never opens connections itself. Every exchange goes through a
//! [`Transport`], which turns a [`Request`] into a [`Response`]. Streaming
//! responses expose a [`StreamingBody`]: an incremental reader that can also
//! drop its read timeout, which the live demultiplexer needs for
//! connections that stay open indefinitely (`logs --follow`, long `exec`).
//!
//! # Example
//!
//! ```
//! use dockwire_client::transport::{Request, Response, Transport};
//! use dockwire_client::Result;
//!
//! struct Canned;
//!
//! impl Transport for Canned {
//!     fn issue(&self, _request: Request) -> Result<Response> {
//!         Ok(Response::buffered(200, &b"OK"[..]))
//!     }
//! }
//!
//! let response = Canned.issue(Request::get("/_ping")).unwrap();
//! assert_eq!(response.into_bytes().unwrap(), &b"OK"[..]);
//! ```

use std::fmt;
use std::io::{self, Cursor, Read};
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Method name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

/// A request handed to the transport gateway.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Versioned path, e.g. `/v1.17/containers/abc/attach`.
    pub path: String,
    /// Query parameters in insertion order.
    pub params: Vec<(String, String)>,
    /// Extra request headers.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: Option<Bytes>,
    /// Ask for an incremental body instead of a materialized one.
    pub stream: bool,
    /// Per-request timeout (`None` = no timeout).
    pub timeout: Option<Duration>,
}

impl Request {
    /// Create a request with no params, headers or body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            headers: Vec::new(),
            body: None,
            stream: false,
            timeout: None,
        }
    }

    /// Create a `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Create a `POST` request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Append a query parameter.
    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// Append a `0`/`1` query parameter.
    pub fn flag(self, key: &str, value: bool) -> Self {
        self.param(key, u8::from(value))
    }

    /// Append a request header.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Set a JSON body and the matching content type.
    pub fn json<T: Serialize>(self, body: &T) -> Result<Self> {
        let encoded = serde_json::to_vec(body)?;
        let mut request = self.header("Content-Type", "application/json");
        request.body = Some(Bytes::from(encoded));
        Ok(request)
    }

    /// Request a streaming body.
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Look up a query parameter by key.
    pub fn get_param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Performs the actual HTTP exchange.
pub trait Transport {
    /// Issue a request and return the daemon's response.
    ///
    /// Connection failures surface as errors here; non-success statuses do
    /// not, callers check them with [`Response::error_for_status`].
    fn issue(&self, request: Request) -> Result<Response>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn issue(&self, request: Request) -> Result<Response> {
        (**self).issue(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn issue(&self, request: Request) -> Result<Response> {
        (**self).issue(request)
    }
}

/// An incremental response body backed by a live connection.
pub trait StreamingBody: Read + Send {
    /// Set the read timeout of the underlying socket; `None` means unbounded.
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()>;

    /// Whether the body uses chunked transfer encoding.
    fn is_chunked(&self) -> bool {
        false
    }

    /// Bytes left in the current transfer chunk, when known.
    fn chunk_remaining(&self) -> Option<usize> {
        None
    }

    /// Whether the reader has been closed by the transport.
    fn is_closed(&self) -> bool {
        false
    }
}

impl<S: StreamingBody + ?Sized> StreamingBody for Box<S> {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        (**self).set_read_timeout(timeout)
    }

    fn is_chunked(&self) -> bool {
        (**self).is_chunked()
    }

    fn chunk_remaining(&self) -> Option<usize> {
        (**self).chunk_remaining()
    }

    fn is_closed(&self) -> bool {
        (**self).is_closed()
    }
}

/// In-memory body presented through the streaming interface.
#[derive(Debug)]
pub struct BufferedBody {
    inner: Cursor<Bytes>,
}

impl BufferedBody {
    /// Wrap a materialized body.
    pub fn new(body: Bytes) -> Self {
        Self {
            inner: Cursor::new(body),
        }
    }
}

impl Read for BufferedBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl StreamingBody for BufferedBody {
    fn set_read_timeout(&mut self, _timeout: Option<Duration>) -> io::Result<()> {
        Ok(())
    }
}

/// Response body: already materialized, or still on the wire.
pub enum ResponseBody {
    /// Fully read body.
    Buffered(Bytes),
    /// Live body.
    Streaming(Box<dyn StreamingBody>),
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Buffered(b) => f.debug_tuple("Buffered").field(&b.len()).finish(),
            ResponseBody::Streaming(_) => f.write_str("Streaming(..)"),
        }
    }
}

/// A response returned by the transport gateway.
#[derive(Debug)]
pub struct Response {
    status: u16,
    body: ResponseBody,
}

impl Response {
    /// Create a response with a materialized body.
    pub fn buffered(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: ResponseBody::Buffered(body.into()),
        }
    }

    /// Create a response with a live body.
    pub fn streaming(status: u16, body: Box<dyn StreamingBody>) -> Self {
        Self {
            status,
            body: ResponseBody::Streaming(body),
        }
    }

    /// HTTP status code.
    #[inline]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Check for a 2xx status.
    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Whether the body is chunked-transfer-encoded.
    pub fn is_chunked(&self) -> bool {
        match &self.body {
            ResponseBody::Buffered(_) => false,
            ResponseBody::Streaming(body) => body.is_chunked(),
        }
    }

    /// Return the response unchanged on success, or an [`Error::Api`]
    /// carrying the body text.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let status = self.status;
        let body = self.into_bytes()?;
        let message = String::from_utf8_lossy(&body).trim().to_string();
        Err(Error::Api { status, message })
    }

    /// Materialize the whole body.
    pub fn into_bytes(self) -> Result<Bytes> {
        match self.body {
            ResponseBody::Buffered(bytes) => Ok(bytes),
            ResponseBody::Streaming(mut body) => {
                let mut buf = Vec::new();
                body.read_to_end(&mut buf)?;
                Ok(Bytes::from(buf))
            }
        }
    }

    /// Take the body as an incremental reader.
    pub fn into_streaming(self) -> Box<dyn StreamingBody> {
        match self.body {
            ResponseBody::Buffered(bytes) => Box::new(BufferedBody::new(bytes)),
            ResponseBody::Streaming(body) => body,
        }
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(self) -> Result<T> {
        let body = self.into_bytes()?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Borrow the body.
    pub fn body(&self) -> &ResponseBody {
        &self.body
    }
}
