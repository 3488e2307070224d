//! Local endpoint transport for the pipe bridge.
//!
//! Provides one async stream type over the platform's local IPC mechanism:
//! - Unix domain sockets (Linux/macOS)
//! - Named pipes (Windows)
//!
//! This is the lowest layer. Sessions connect through [`connect`] and own
//! the returned [`PipeStream`] for exactly one exchange.

pub mod endpoint;
pub mod error;
pub mod stream;

#[cfg(windows)]
mod pipe;
#[cfg(unix)]
mod uds;

pub use endpoint::{PipeEndpoint, DEFAULT_ENDPOINT, DEFAULT_PIPE_NAME};
pub use error::{Result, TransportError};
pub use stream::PipeStream;

#[cfg(windows)]
pub use pipe::PipeListener;
#[cfg(unix)]
pub use uds::PipeListener;

/// Connect to the service listening at `endpoint`.
pub async fn connect(endpoint: &PipeEndpoint) -> Result<PipeStream> {
    #[cfg(unix)]
    {
        uds::connect(endpoint).await
    }

    #[cfg(windows)]
    {
        pipe::connect(endpoint).await
    }
}
