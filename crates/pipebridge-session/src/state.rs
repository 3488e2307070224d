use std::fmt;

/// Lifecycle of one session.
///
/// ```text
/// Idle ─► Connecting ─► Writing ─► AwaitingReply ─┬─► Delivered
///              │            │            │        └─► DeliveredEmpty
///              └────────────┴────────────┴──────────► Failed
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Connecting,
    Writing,
    AwaitingReply,
    Delivered,
    DeliveredEmpty,
    Failed,
}

impl SessionState {
    /// Whether the edge `self -> next` exists in the state machine.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self, next),
            (Idle, Connecting)
                | (Connecting, Writing)
                | (Writing, AwaitingReply)
                | (AwaitingReply, Delivered)
                | (AwaitingReply, DeliveredEmpty)
                | (Connecting | Writing | AwaitingReply, Failed)
        )
    }

    /// Terminal states emit the outcome; nothing follows them.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Delivered | SessionState::DeliveredEmpty | SessionState::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Writing => "writing",
            SessionState::AwaitingReply => "awaiting_reply",
            SessionState::Delivered => "delivered",
            SessionState::DeliveredEmpty => "delivered_empty",
            SessionState::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
