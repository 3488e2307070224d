use std::fmt;
use std::io;

use pipebridge_codec::EncodeError;
use pipebridge_session::SessionError;
use pipebridge_transport::TransportError;

// Exit codes follow sysexits(3) and timeout(1) where those define one.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;
pub const CANCELLED: i32 = 130;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused | io::ErrorKind::NotFound => FAILURE,
        io::ErrorKind::InvalidData => DATA_INVALID,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::PathTooLong { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        TransportError::Bind { .. } | TransportError::Connect { .. } if err.is_endpoint_absent() => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        TransportError::Bind { source, .. }
        | TransportError::Connect { source, .. }
        | TransportError::Accept(source)
        | TransportError::Io(source) => io_error(context, source),
    }
}

pub fn encode_error(context: &str, err: EncodeError) -> CliError {
    CliError::new(DATA_INVALID, format!("{context}: {err}"))
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Connect(err) => transport_error(context, err),
        SessionError::Write(_)
        | SessionError::Read(_)
        | SessionError::Disconnected(_)
        | SessionError::ReplyTooLarge { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        SessionError::Timeout { .. } => CliError::new(TIMEOUT, format!("{context}: {err}")),
        SessionError::Cancelled { .. } => CliError::new(CANCELLED, format!("{context}: {err}")),
        SessionError::Internal(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use pipebridge_session::SessionState;

    use super::*;

    fn connect_failure(kind: io::ErrorKind) -> SessionError {
        SessionError::Connect(TransportError::Connect {
            path: PathBuf::from("/tmp/demo_pipe.sock"),
            source: io::Error::from(kind),
        })
    }

    #[test]
    fn absent_service_is_plain_failure() {
        let err = session_error("send failed", connect_failure(io::ErrorKind::ConnectionRefused));
        assert_eq!(err.code, FAILURE);
        assert!(err.message.starts_with("send failed: "));
    }

    #[test]
    fn permission_denied_keeps_its_code() {
        let err = session_error("send failed", connect_failure(io::ErrorKind::PermissionDenied));
        assert_eq!(err.code, PERMISSION_DENIED);
    }

    #[test]
    fn session_failures_map_by_kind() {
        let disconnected =
            SessionError::Disconnected(io::Error::from(io::ErrorKind::ConnectionReset));
        assert_eq!(session_error("x", disconnected).code, TRANSPORT_ERROR);

        let timeout = SessionError::Timeout {
            phase: SessionState::AwaitingReply,
            after: Duration::from_secs(1),
        };
        assert_eq!(session_error("x", timeout).code, TIMEOUT);

        let cancelled = SessionError::Cancelled {
            phase: SessionState::Writing,
        };
        assert_eq!(session_error("x", cancelled).code, CANCELLED);
    }

    #[test]
    fn encoding_failure_is_invalid_data() {
        let err = encode_error("encode failed", EncodeError::InvalidRequest("no action".into()));
        assert_eq!(err.code, DATA_INVALID);
    }

    #[test]
    fn overlong_endpoint_is_usage_error() {
        let err = transport_error(
            "bind failed",
            TransportError::PathTooLong {
                path: PathBuf::from("/tmp/x"),
                len: 200,
                max: 108,
            },
        );
        assert_eq!(err.code, USAGE);
    }
}
