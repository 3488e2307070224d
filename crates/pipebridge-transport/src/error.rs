use std::io;
use std::path::PathBuf;

/// Errors that can occur while reaching or serving a local endpoint.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to bind the stub listener to the endpoint.
    #[error("failed to bind to {path}: {source}")]
    Bind { path: PathBuf, source: io::Error },

    /// Failed to connect to the endpoint.
    #[error("failed to connect to {path}: {source}")]
    Connect { path: PathBuf, source: io::Error },

    /// Failed to accept an incoming connection.
    #[error("failed to accept connection: {0}")]
    Accept(io::Error),

    /// An I/O error occurred on an established stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),

    /// The endpoint path is too long for the platform.
    #[error("endpoint path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },
}

impl TransportError {
    /// True when the error means nothing is listening at the endpoint.
    ///
    /// Used to tell "service not running" apart from permission or
    /// addressing problems when reporting a failed connect.
    pub fn is_endpoint_absent(&self) -> bool {
        match self {
            TransportError::Connect { source, .. } => io_means_absent(source),
            _ => false,
        }
    }

    /// The underlying I/O error, when there is one.
    pub fn io_source(&self) -> Option<&io::Error> {
        match self {
            TransportError::Bind { source, .. } | TransportError::Connect { source, .. } => {
                Some(source)
            }
            TransportError::Accept(source) | TransportError::Io(source) => Some(source),
            TransportError::PathTooLong { .. } => None,
        }
    }
}

#[cfg(not(windows))]
fn io_means_absent(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused
    )
}

#[cfg(windows)]
fn io_means_absent(err: &io::Error) -> bool {
    use windows_sys::Win32::Foundation::{ERROR_FILE_NOT_FOUND, ERROR_PIPE_BUSY};

    match err.raw_os_error() {
        Some(code) => code == ERROR_FILE_NOT_FOUND as i32 || code == ERROR_PIPE_BUSY as i32,
        None => err.kind() == io::ErrorKind::NotFound,
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
