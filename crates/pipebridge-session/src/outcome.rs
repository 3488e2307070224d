use bytes::Bytes;

use crate::error::SessionError;
use crate::state::SessionState;

/// The single terminal result of a session.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The service replied; chunks concatenated in arrival order.
    Delivered(Bytes),
    /// The service ended the stream cleanly without sending anything.
    DeliveredEmpty,
    /// The session failed; see [`SessionError::kind`].
    Failed(SessionError),
}

impl SessionOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, SessionOutcome::Failed(_))
    }

    /// Reply bytes, if any were delivered.
    pub fn reply(&self) -> Option<&Bytes> {
        match self {
            SessionOutcome::Delivered(reply) => Some(reply),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SessionError> {
        match self {
            SessionOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Terminal state this outcome corresponds to.
    pub fn state(&self) -> SessionState {
        match self {
            SessionOutcome::Delivered(_) => SessionState::Delivered,
            SessionOutcome::DeliveredEmpty => SessionState::DeliveredEmpty,
            SessionOutcome::Failed(_) => SessionState::Failed,
        }
    }

    /// Convert to a `Result`, mapping `DeliveredEmpty` to an empty reply.
    pub fn into_result(self) -> Result<Bytes, SessionError> {
        match self {
            SessionOutcome::Delivered(reply) => Ok(reply),
            SessionOutcome::DeliveredEmpty => Ok(Bytes::new()),
            SessionOutcome::Failed(err) => Err(err),
        }
    }
}
