//! Client builder and the attach/logs/exec/stats calls.
//!
//! The [`ClientBuilder`] provides a fluent API for configuring the client.
//! The [`Client`] builds versioned requests, hands them to a [`Transport`],
//! and routes the response through the demultiplexer the negotiated version
//! calls for.
//!
//! # Example
//!
//! ```ignore
//! use dockwire_client::{AttachOptions, Client, Output};
//!
//! let client = Client::builder()
//!     .version("1.17")
//!     .build(my_transport)?;
//!
//! match client.attach("web", AttachOptions::streaming())? {
//!     Output::Stream(chunks) => {
//!         for chunk in chunks {
//!             print!("{}", String::from_utf8_lossy(&chunk?));
//!         }
//!     }
//!     Output::Buffered(all) => print!("{}", String::from_utf8_lossy(&all)),
//! }
//! ```

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::demux::{
    demultiplex_buffered_with, raw_chunked_iterate, spawn_live, LiveDemux, TruncationPolicy,
    DEFAULT_CHANNEL_CAPACITY,
};
use crate::error::{Error, Result};
use crate::transport::{Request, Response, StreamingBody, Transport};
use crate::version::{select_strategy, ApiVersion, Capabilities, Capability, Strategy};

/// Default API version.
pub const DEFAULT_API_VERSION: &str = "1.17";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Lazy, single-consumer sequence of byte chunks.
pub type ChunkStream = Box<dyn Iterator<Item = Result<Bytes>> + Send>;

/// Output of an attach/logs/exec/stats call.
pub enum Output {
    /// Whole result, already concatenated.
    Buffered(Bytes),
    /// Chunks pulled on demand; blocks while the daemon is quiet.
    Stream(ChunkStream),
}

impl Output {
    /// Check if this is a streaming output.
    pub fn is_stream(&self) -> bool {
        matches!(self, Output::Stream(_))
    }

    /// Collect everything into one buffer. Blocks until a stream ends.
    pub fn into_bytes(self) -> Result<Bytes> {
        match self {
            Output::Buffered(bytes) => Ok(bytes),
            Output::Stream(chunks) => {
                let mut out = BytesMut::new();
                for chunk in chunks {
                    out.extend_from_slice(&chunk?);
                }
                Ok(out.freeze())
            }
        }
    }

    /// View the output as a chunk sequence (a buffered result is one chunk).
    pub fn into_stream(self) -> ChunkStream {
        match self {
            Output::Buffered(bytes) => Box::new(std::iter::once(Ok(bytes))),
            Output::Stream(chunks) => chunks,
        }
    }

    /// Forward the chunks to async code through a bounded channel.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn into_receiver(self, capacity: usize) -> mpsc::Receiver<Result<Bytes>> {
        spawn_live(self.into_stream(), capacity)
    }
}

impl std::fmt::Debug for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Output::Buffered(bytes) => f.debug_tuple("Buffered").field(bytes).finish(),
            Output::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// A container identifier, normalized once at the API boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRef(String);

impl ContainerRef {
    /// The identifier as used in URLs.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ContainerRef {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ContainerRef {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&String> for ContainerRef {
    fn from(id: &String) -> Self {
        Self(id.clone())
    }
}

impl TryFrom<&serde_json::Value> for ContainerRef {
    type Error = Error;

    /// Accept a bare string or a record with an `"Id"` field.
    fn try_from(value: &serde_json::Value) -> Result<Self> {
        let id = match value {
            serde_json::Value::String(id) => Some(id.as_str()),
            other => other.get("Id").and_then(serde_json::Value::as_str),
        };
        id.map(Self::from)
            .ok_or_else(|| Error::InvalidArgument("container record has no \"Id\"".to_string()))
    }
}

/// Options for [`Client::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachOptions {
    /// Include stdout.
    pub stdout: bool,
    /// Include stderr.
    pub stderr: bool,
    /// Stream live output instead of returning it all at once.
    pub stream: bool,
    /// Replay output produced before the attach.
    pub logs: bool,
}

impl Default for AttachOptions {
    fn default() -> Self {
        Self {
            stdout: true,
            stderr: true,
            stream: false,
            logs: false,
        }
    }
}

impl AttachOptions {
    /// Stdout and stderr, streamed.
    pub fn streaming() -> Self {
        Self {
            stream: true,
            ..Self::default()
        }
    }
}

/// How many log lines to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tail {
    /// Every line.
    #[default]
    All,
    /// The last `n` lines. Non-positive values mean all lines.
    Lines(i64),
}

impl Tail {
    fn as_param(&self) -> String {
        match self {
            Tail::Lines(n) if *n > 0 => n.to_string(),
            _ => "all".to_string(),
        }
    }
}

/// Options for [`Client::logs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogsOptions {
    /// Include stdout.
    pub stdout: bool,
    /// Include stderr.
    pub stderr: bool,
    /// Keep the connection open and stream new output.
    pub follow: bool,
    /// Prefix lines with timestamps.
    pub timestamps: bool,
    /// Number of trailing lines.
    pub tail: Tail,
}

impl Default for LogsOptions {
    fn default() -> Self {
        Self {
            stdout: true,
            stderr: true,
            follow: false,
            timestamps: false,
            tail: Tail::All,
        }
    }
}

/// Options for [`Client::exec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOptions {
    /// Start detached; no output is returned.
    pub detach: bool,
    /// Attach stdout.
    pub stdout: bool,
    /// Attach stderr.
    pub stderr: bool,
    /// Stream output as it is produced.
    pub stream: bool,
    /// Allocate a TTY.
    pub tty: bool,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self {
            detach: false,
            stdout: true,
            stderr: true,
            stream: false,
            tty: false,
        }
    }
}

/// Command for [`Client::exec`]: a shell-like string or an argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecCommand(Vec<String>);

impl ExecCommand {
    /// The argument vector.
    pub fn args(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for ExecCommand {
    fn from(cmd: &str) -> Self {
        Self(split_command(cmd))
    }
}

impl From<Vec<String>> for ExecCommand {
    fn from(args: Vec<String>) -> Self {
        Self(args)
    }
}

impl From<&[&str]> for ExecCommand {
    fn from(args: &[&str]) -> Self {
        Self(args.iter().map(|a| a.to_string()).collect())
    }
}

/// Split a command line on whitespace, honoring quotes and backslashes.
pub fn split_command(cmd: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = cmd.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some('"'), '\\') | (None, '\\') => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
                in_word = true;
            }
            (Some(_), c) => current.push(c),
            (None, '\'') | (None, '"') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        args.push(current);
    }
    args
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ExecConfig<'a> {
    container: &'a str,
    user: &'a str,
    privileged: bool,
    tty: bool,
    attach_stdin: bool,
    attach_stdout: bool,
    attach_stderr: bool,
    detach: bool,
    cmd: &'a [String],
}

#[derive(Deserialize)]
struct ExecCreated {
    #[serde(rename = "Id")]
    id: String,
}

/// Resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Negotiated API version.
    pub version: ApiVersion,
    /// Per-request timeout (`None` = no timeout). Live streams clear it
    /// once framing starts.
    pub timeout: Option<Duration>,
    /// Channel capacity for [`Output::into_receiver`] callers.
    pub stream_channel_capacity: usize,
    /// Handling of frames cut short by the connection.
    pub truncation: TruncationPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            version: ApiVersion::new(1, 17),
            timeout: Some(DEFAULT_TIMEOUT),
            stream_channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            truncation: TruncationPolicy::default(),
        }
    }
}

/// Builder for configuring and creating a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    version: String,
    config: ClientConfig,
}

impl ClientBuilder {
    /// Create a new client builder.
    pub fn new() -> Self {
        Self {
            version: DEFAULT_API_VERSION.to_string(),
            config: ClientConfig::default(),
        }
    }

    /// Set the API version, e.g. `"1.17"`.
    ///
    /// Validated in [`ClientBuilder::build`].
    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Set the per-request timeout.
    ///
    /// Default: 60 seconds
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Disable the per-request timeout.
    pub fn no_timeout(mut self) -> Self {
        self.config.timeout = None;
        self
    }

    /// Set the channel capacity used by [`Output::into_receiver`] callers.
    ///
    /// Default: 64
    pub fn stream_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.stream_channel_capacity = capacity;
        self
    }

    /// Set the truncation policy for multiplexed streams.
    ///
    /// Default: [`TruncationPolicy::Keep`]
    pub fn truncation(mut self, policy: TruncationPolicy) -> Self {
        self.config.truncation = policy;
        self
    }

    /// Validate the configuration and build the client.
    pub fn build<T: Transport>(mut self, transport: T) -> Result<Client<T>> {
        self.config.version = self.version.parse()?;
        Ok(Client::with_config(transport, self.config))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A container-engine API client.
pub struct Client<T> {
    transport: T,
    config: ClientConfig,
    capabilities: Capabilities,
}

impl<T: Transport> Client<T> {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client from an already resolved configuration.
    pub fn with_config(transport: T, config: ClientConfig) -> Self {
        let capabilities = Capabilities::resolve(config.version);
        Self {
            transport,
            config,
            capabilities,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Capabilities of the negotiated version.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Versioned path: `/v{version}{path}`.
    pub fn url(&self, path: &str) -> String {
        format!("/v{}{}", self.config.version, path)
    }

    fn send(&self, request: Request) -> Result<Response> {
        tracing::debug!(
            method = request.method.as_str(),
            path = %request.path,
            stream = request.stream,
            "issuing request"
        );
        self.transport.issue(request)
    }

    /// Send with the default timeout unless the request set one.
    fn send_timed(&self, request: Request) -> Result<Response> {
        let request = match request.timeout {
            Some(_) => request,
            None => request.timeout(self.config.timeout),
        };
        self.send(request)
    }

    /// Turn an attach/logs/exec response into output.
    fn demux(&self, response: Response, stream: bool) -> Result<Output> {
        let response = response.error_for_status()?;
        let policy = self.config.truncation;

        match select_strategy(&self.capabilities, stream) {
            Strategy::RawChunked if stream => {
                Ok(Output::Stream(Box::new(raw_chunked_iterate(response)?)))
            }
            Strategy::RawChunked => Ok(Output::Buffered(response.into_bytes()?)),
            Strategy::Buffered => {
                let body = response.into_bytes()?;
                Ok(Output::Buffered(demultiplex_buffered_with(&body, policy)?))
            }
            Strategy::Live => {
                let demux = LiveDemux::with_policy(response.into_streaming(), policy)?;
                Ok(Output::Stream(Box::new(demux)))
            }
        }
    }

    /// Attach to a container's output.
    pub fn attach(
        &self,
        container: impl Into<ContainerRef>,
        options: AttachOptions,
    ) -> Result<Output> {
        let container = container.into();
        let request = Request::post(self.url(&format!(
            "/containers/{}/attach",
            container.as_str()
        )))
        .flag("logs", options.logs)
        .flag("stdout", options.stdout)
        .flag("stderr", options.stderr)
        .flag("stream", options.stream)
        .stream(options.stream);

        let response = self.send_timed(request)?;
        self.demux(response, options.stream)
    }

    /// Open a raw attach connection and hand back the socket body.
    ///
    /// `None` attaches stdout and stderr in streaming mode.
    pub fn attach_socket(
        &self,
        container: impl Into<ContainerRef>,
        options: Option<AttachOptions>,
    ) -> Result<Box<dyn StreamingBody>> {
        let container = container.into();
        let mut request = Request::post(self.url(&format!(
            "/containers/{}/attach",
            container.as_str()
        )));
        request = match options {
            Some(options) => request
                .flag("logs", options.logs)
                .flag("stdout", options.stdout)
                .flag("stderr", options.stderr)
                .flag("stream", options.stream),
            None => request
                .flag("stdout", true)
                .flag("stderr", true)
                .flag("stream", true),
        };

        let response = self.send(request.stream(true))?.error_for_status()?;
        Ok(response.into_streaming())
    }

    /// Fetch container logs.
    ///
    /// Daemons older than the logs endpoint fall back to attach with
    /// `logs = true`.
    pub fn logs(&self, container: impl Into<ContainerRef>, options: LogsOptions) -> Result<Output> {
        let container = container.into();

        if !self.capabilities.supports(Capability::LogsEndpoint) {
            tracing::debug!("logs endpoint unavailable, falling back to attach");
            return self.attach(
                container,
                AttachOptions {
                    stdout: options.stdout,
                    stderr: options.stderr,
                    stream: options.follow,
                    logs: true,
                },
            );
        }

        let mut request = Request::get(self.url(&format!(
            "/containers/{}/logs",
            container.as_str()
        )))
        .flag("stderr", options.stderr)
        .flag("stdout", options.stdout)
        .flag("timestamps", options.timestamps)
        .flag("follow", options.follow);
        if self.capabilities.supports(Capability::LogsTail) {
            request = request.param("tail", options.tail.as_param());
        }

        let response = self.send_timed(request.stream(options.follow))?;
        self.demux(response, options.follow)
    }

    /// Create an exec instance in `container` and start it.
    pub fn exec(
        &self,
        container: impl Into<ContainerRef>,
        cmd: impl Into<ExecCommand>,
        options: ExecOptions,
    ) -> Result<Output> {
        self.capabilities.require(Capability::Exec)?;
        let container = container.into();
        let cmd = cmd.into();

        let config = ExecConfig {
            container: container.as_str(),
            user: "",
            privileged: false,
            tty: options.tty,
            attach_stdin: false,
            attach_stdout: options.stdout,
            attach_stderr: options.stderr,
            detach: options.detach,
            cmd: cmd.args(),
        };

        let create = Request::post(self.url(&format!("/containers/{}/exec", container.as_str())))
            .json(&config)?;
        let created: ExecCreated = self.send_timed(create)?.error_for_status()?.json()?;
        tracing::debug!(exec_id = %created.id, "exec instance created");

        let start = Request::post(self.url(&format!("/exec/{}/start", created.id)))
            .json(&config)?
            .stream(options.stream);
        let response = self.send_timed(start)?;
        self.demux(response, options.stream)
    }

    /// Stream resource usage statistics for `container`.
    pub fn stats(&self, container: impl Into<ContainerRef>) -> Result<RawStream> {
        self.capabilities.require(Capability::Stats)?;
        let container = container.into();
        let request =
            Request::get(self.url(&format!("/containers/{}/stats", container.as_str())))
                .stream(true);

        let response = self.send_timed(request)?;
        raw_chunked_iterate(response)
    }

    /// Stream daemon events. No timeout is applied.
    pub fn events(&self) -> Result<RawStream> {
        let response = self.send(Request::get(self.url("/events")).stream(true))?;
        raw_chunked_iterate(response)
    }

    /// Daemon version information.
    pub fn version_info(&self) -> Result<serde_json::Value> {
        self.send_timed(Request::get(self.url("/version")))?
            .error_for_status()?
            .json()
    }

    /// Ping the daemon.
    pub fn ping(&self) -> Result<String> {
        let body = self
            .send_timed(Request::get(self.url("/_ping")))?
            .error_for_status()?
            .into_bytes()?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Raw chunk stream returned by [`Client::stats`] and [`Client::events`].
pub type RawStream = crate::demux::RawChunks;
