//! Raw socket bodies.
//!
//! A hijacked attach connection is just a socket. Implementing
//! [`StreamingBody`] for the std socket types lets callers feed it straight
//! into the live demultiplexer.

use std::io;
use std::net::TcpStream;
use std::time::Duration;

use super::gateway::StreamingBody;

impl StreamingBody for TcpStream {
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }
}

#[cfg(unix)]
mod unix_impl {
    use super::*;
    use std::os::unix::net::UnixStream;

    impl StreamingBody for UnixStream {
        fn set_read_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
            UnixStream::set_read_timeout(self, timeout)
        }
    }
}
