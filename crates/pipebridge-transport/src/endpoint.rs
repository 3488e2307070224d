//! Local service addressing.

use std::fmt;
use std::path::{Path, PathBuf};

/// Pipe name the desktop service listens on.
pub const DEFAULT_PIPE_NAME: &str = "demo_pipe";

/// Platform address of [`DEFAULT_PIPE_NAME`].
#[cfg(windows)]
pub const DEFAULT_ENDPOINT: &str = r"\\.\pipe\demo_pipe";
/// Platform address of [`DEFAULT_PIPE_NAME`].
#[cfg(not(windows))]
pub const DEFAULT_ENDPOINT: &str = "/tmp/demo_pipe.sock";

/// Address of the local service a session connects to.
///
/// A Windows named pipe path (`\\.\pipe\<name>`) or a Unix domain socket
/// path. The value is immutable once built and cheap to clone, so one
/// endpoint can be shared by any number of concurrent sessions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PipeEndpoint {
    path: PathBuf,
}

impl PipeEndpoint {
    /// Use an explicit platform address.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Map a bare pipe name to the platform address.
    ///
    /// `demo_pipe` becomes `\\.\pipe\demo_pipe` on Windows and
    /// `/tmp/demo_pipe.sock` elsewhere.
    pub fn from_pipe_name(name: &str) -> Self {
        #[cfg(windows)]
        {
            Self::new(format!(r"\\.\pipe\{name}"))
        }

        #[cfg(not(windows))]
        {
            Self::new(format!("/tmp/{name}.sock"))
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for PipeEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

impl fmt::Display for PipeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

impl From<PathBuf> for PipeEndpoint {
    fn from(path: PathBuf) -> Self {
        Self::new(path)
    }
}

impl From<&Path> for PipeEndpoint {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl From<&str> for PipeEndpoint {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint_matches_pipe_name() {
        assert_eq!(
            PipeEndpoint::default(),
            PipeEndpoint::from_pipe_name(DEFAULT_PIPE_NAME)
        );
    }

    #[cfg(unix)]
    #[test]
    fn pipe_name_maps_to_socket_path() {
        let endpoint = PipeEndpoint::from_pipe_name("orders");
        assert_eq!(endpoint.path(), Path::new("/tmp/orders.sock"));
        assert_eq!(endpoint.to_string(), "/tmp/orders.sock");
    }

    #[cfg(windows)]
    #[test]
    fn pipe_name_maps_to_named_pipe_path() {
        let endpoint = PipeEndpoint::from_pipe_name("orders");
        assert_eq!(endpoint.to_string(), r"\\.\pipe\orders");
    }
}
