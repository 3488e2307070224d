use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// A connected pipe stream: implements `AsyncRead + AsyncWrite`.
///
/// This is the handle a session owns for the lifetime of one exchange.
/// On Unix it wraps a Unix domain socket stream; on Windows it wraps the
/// client or server end of a named pipe. Dropping it closes the connection.
pub struct PipeStream {
    inner: PipeStreamInner,
}

enum PipeStreamInner {
    #[cfg(unix)]
    Unix(tokio::net::UnixStream),
    #[cfg(windows)]
    PipeClient(tokio::net::windows::named_pipe::NamedPipeClient),
    #[cfg(windows)]
    PipeServer(tokio::net::windows::named_pipe::NamedPipeServer),
}

impl PipeStream {
    #[cfg(unix)]
    pub(crate) fn from_unix(stream: tokio::net::UnixStream) -> Self {
        Self {
            inner: PipeStreamInner::Unix(stream),
        }
    }

    #[cfg(windows)]
    pub(crate) fn from_pipe_client(
        client: tokio::net::windows::named_pipe::NamedPipeClient,
    ) -> Self {
        Self {
            inner: PipeStreamInner::PipeClient(client),
        }
    }

    #[cfg(windows)]
    pub(crate) fn from_pipe_server(
        server: tokio::net::windows::named_pipe::NamedPipeServer,
    ) -> Self {
        Self {
            inner: PipeStreamInner::PipeServer(server),
        }
    }

    /// Process id of the connected peer, when the platform exposes it.
    pub fn peer_pid(&self) -> Option<u32> {
        match &self.inner {
            #[cfg(unix)]
            PipeStreamInner::Unix(stream) => stream
                .peer_cred()
                .ok()
                .and_then(|cred| cred.pid())
                .and_then(|pid| u32::try_from(pid).ok()),
            #[cfg(windows)]
            PipeStreamInner::PipeClient(_) | PipeStreamInner::PipeServer(_) => None,
        }
    }

    /// Transport name for diagnostics.
    pub fn transport_name(&self) -> &'static str {
        match &self.inner {
            #[cfg(unix)]
            PipeStreamInner::Unix(_) => "unix-domain-socket",
            #[cfg(windows)]
            PipeStreamInner::PipeClient(_) | PipeStreamInner::PipeServer(_) => "named-pipe",
        }
    }
}

impl AsyncRead for PipeStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            #[cfg(unix)]
            PipeStreamInner::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
            #[cfg(windows)]
            PipeStreamInner::PipeClient(pipe) => Pin::new(pipe).poll_read(cx, buf),
            #[cfg(windows)]
            PipeStreamInner::PipeServer(pipe) => Pin::new(pipe).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for PipeStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match &mut self.get_mut().inner {
            #[cfg(unix)]
            PipeStreamInner::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
            #[cfg(windows)]
            PipeStreamInner::PipeClient(pipe) => Pin::new(pipe).poll_write(cx, buf),
            #[cfg(windows)]
            PipeStreamInner::PipeServer(pipe) => Pin::new(pipe).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            #[cfg(unix)]
            PipeStreamInner::Unix(stream) => Pin::new(stream).poll_flush(cx),
            #[cfg(windows)]
            PipeStreamInner::PipeClient(pipe) => Pin::new(pipe).poll_flush(cx),
            #[cfg(windows)]
            PipeStreamInner::PipeServer(pipe) => Pin::new(pipe).poll_flush(cx),
        }
    }

    // Named pipes have no half-close; shutdown there only flushes.
    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match &mut self.get_mut().inner {
            #[cfg(unix)]
            PipeStreamInner::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
            #[cfg(windows)]
            PipeStreamInner::PipeClient(pipe) => Pin::new(pipe).poll_shutdown(cx),
            #[cfg(windows)]
            PipeStreamInner::PipeServer(pipe) => Pin::new(pipe).poll_shutdown(cx),
        }
    }
}

impl std::fmt::Debug for PipeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeStream")
            .field("type", &self.transport_name())
            .finish()
    }
}
