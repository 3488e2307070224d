use std::io;
use std::time::Duration;

use pipebridge_transport::TransportError;

use crate::state::SessionState;

/// Why a session ended in `Failed`.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The endpoint could not be reached (service absent, bad address,
    /// permission denied).
    #[error("connect failed: {0}")]
    Connect(#[source] TransportError),

    /// Writing the request failed after the connection was established.
    #[error("write failed: {0}")]
    Write(#[source] io::Error),

    /// Reading the reply failed.
    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    /// The service went away without a clean end of stream.
    #[error("peer disconnected abruptly: {0}")]
    Disconnected(#[source] io::Error),

    /// The reply grew past the configured limit.
    #[error("reply too large ({size} bytes, max {max})")]
    ReplyTooLarge { size: usize, max: usize },

    /// No progress within the configured bound.
    #[error("timed out after {after:?} while {phase}")]
    Timeout {
        phase: SessionState,
        after: Duration,
    },

    /// The caller aborted the session.
    #[error("cancelled while {phase}")]
    Cancelled { phase: SessionState },

    /// The session task ended without reporting; a bug, not an I/O failure.
    #[error("internal session error: {0}")]
    Internal(String),
}

/// Coarse failure class, for logging and caller retry policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Connect,
    Transport,
    Timeout,
    Cancelled,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Connect => "connect",
            ErrorKind::Transport => "transport",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Internal => "internal",
        }
    }
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Connect(_) => ErrorKind::Connect,
            SessionError::Write(_)
            | SessionError::Read(_)
            | SessionError::Disconnected(_)
            | SessionError::ReplyTooLarge { .. } => ErrorKind::Transport,
            SessionError::Timeout { .. } => ErrorKind::Timeout,
            SessionError::Cancelled { .. } => ErrorKind::Cancelled,
            SessionError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Classify a write error. A peer that closed its end surfaces here as
    /// a broken pipe or reset.
    pub(crate) fn from_write(err: io::Error) -> Self {
        if is_disconnect(&err) {
            SessionError::Disconnected(err)
        } else {
            SessionError::Write(err)
        }
    }

    /// Classify a read error.
    pub(crate) fn from_read(err: io::Error) -> Self {
        if is_disconnect(&err) {
            SessionError::Disconnected(err)
        } else {
            SessionError::Read(err)
        }
    }

    /// True for connect failures caused by nothing listening at the endpoint.
    pub fn is_endpoint_absent(&self) -> bool {
        matches!(self, SessionError::Connect(err) if err.is_endpoint_absent())
    }
}

fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
    )
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn io_failures_are_transport_kind() {
        let reset = SessionError::from_read(io::Error::from(io::ErrorKind::ConnectionReset));
        assert!(matches!(reset, SessionError::Disconnected(_)));
        assert_eq!(reset.kind(), ErrorKind::Transport);

        let other = SessionError::from_write(io::Error::other("disk on fire"));
        assert!(matches!(other, SessionError::Write(_)));
        assert_eq!(other.kind(), ErrorKind::Transport);
    }

    #[test]
    fn connect_kind_keeps_transport_detail() {
        let err = SessionError::Connect(TransportError::Connect {
            path: PathBuf::from("/tmp/demo_pipe.sock"),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        });
        assert_eq!(err.kind(), ErrorKind::Connect);
        assert!(err.is_endpoint_absent());
        assert!(err.to_string().contains("/tmp/demo_pipe.sock"));
    }

    #[test]
    fn timeout_message_names_phase() {
        let err = SessionError::Timeout {
            phase: SessionState::AwaitingReply,
            after: Duration::from_millis(250),
        };
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.to_string(), "timed out after 250ms while awaiting_reply");
    }
}
