use std::time::Duration;

use pipebridge_codec::Framing;
use pipebridge_transport::PipeEndpoint;

/// Default bound on reaching the endpoint: 5 seconds.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default bound on writing the request and receiving the reply: 30 seconds.
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(30);
/// Default maximum accumulated reply size: 16 MiB.
pub const DEFAULT_MAX_REPLY: usize = 16 * 1024 * 1024;

/// When a session stops reading the reply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReplyCompletion {
    /// Collect chunks until the service ends the stream.
    #[default]
    StreamEnd,
    /// Close as soon as the first non-empty chunk arrives.
    FirstChunk,
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Where the service listens.
    pub endpoint: PipeEndpoint,
    /// Bound on the Connecting phase. `None` waits indefinitely.
    pub connect_timeout: Option<Duration>,
    /// Bound on Writing and AwaitingReply together. `None` waits indefinitely.
    pub io_timeout: Option<Duration>,
    /// Wire framing for request and reply.
    pub framing: Framing,
    /// When to stop reading the reply.
    pub completion: ReplyCompletion,
    /// Half-close the write side once the request is written.
    pub shutdown_write: bool,
    /// Maximum accumulated reply size in bytes.
    pub max_reply_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: PipeEndpoint::default(),
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            io_timeout: Some(DEFAULT_IO_TIMEOUT),
            framing: Framing::default(),
            completion: ReplyCompletion::default(),
            shutdown_write: true,
            max_reply_size: DEFAULT_MAX_REPLY,
        }
    }
}

impl SessionConfig {
    /// Default configuration targeting `endpoint`.
    pub fn for_endpoint(endpoint: impl Into<PipeEndpoint>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    pub fn with_completion(mut self, completion: ReplyCompletion) -> Self {
        self.completion = completion;
        self
    }

    pub fn with_shutdown_write(mut self, shutdown_write: bool) -> Self {
        self.shutdown_write = shutdown_write;
        self
    }

    pub fn with_max_reply_size(mut self, max_reply_size: usize) -> Self {
        self.max_reply_size = max_reply_size;
        self
    }
}
