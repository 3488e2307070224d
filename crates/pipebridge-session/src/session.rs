use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use pipebridge_codec::EncodedPayload;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, trace, warn, Instrument};

use crate::config::{ReplyCompletion, SessionConfig};
use crate::connector::{Connector, EndpointConnector};
use crate::error::{Result, SessionError};
use crate::outcome::SessionOutcome;
use crate::state::SessionState;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// One connection, one request, one outcome.
///
/// A session connects to the configured endpoint, writes a single encoded
/// payload, collects the reply and reports exactly one [`SessionOutcome`].
/// The connection is closed before the outcome is handed out, on every
/// path. Sessions never retry; a failure is final.
pub struct PipeSession<C = EndpointConnector> {
    id: u64,
    config: SessionConfig,
    connector: C,
    state: SessionState,
}

impl PipeSession<EndpointConnector> {
    /// Session over the platform transport.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_connector(config, EndpointConnector)
    }
}

impl<C: Connector> PipeSession<C> {
    /// Session over a custom connector.
    pub fn with_connector(config: SessionConfig, connector: C) -> Self {
        Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            config,
            connector,
            state: SessionState::Idle,
        }
    }

    /// Process-unique session id, used in log spans.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Start the session on the current tokio runtime and return at once.
    ///
    /// The outcome arrives through the returned handle. Dropping the handle
    /// does not stop the session; it still runs to completion and closes
    /// its connection.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn open(self, payload: EncodedPayload) -> SessionHandle {
        let id = self.id;
        let cancel = CancellationToken::new();
        let (tx, rx) = oneshot::channel();

        let token = cancel.clone();
        tokio::spawn(async move {
            let outcome = self.run(payload, token).await;
            if tx.send(outcome).is_err() {
                debug!(session = id, "session handle dropped; outcome discarded");
            }
        });

        SessionHandle {
            id,
            cancel,
            outcome: rx,
        }
    }

    /// Drive the session to its outcome on the calling task.
    ///
    /// Cancelling `cancel` closes the connection and yields
    /// `Failed(Cancelled)`.
    pub async fn run(mut self, payload: EncodedPayload, cancel: CancellationToken) -> SessionOutcome {
        let span = info_span!(
            "pipe_session",
            id = self.id,
            endpoint = %self.config.endpoint,
        );

        async move {
            let result = self.exchange(&payload, &cancel).await;
            self.conclude(result)
        }
        .instrument(span)
        .await
    }

    async fn exchange(&mut self, payload: &EncodedPayload, cancel: &CancellationToken) -> Result<Reply> {
        self.transition(SessionState::Connecting)?;
        let deadline = Deadline::start(self.config.connect_timeout);
        let connecting = async {
            self.connector
                .connect(&self.config.endpoint)
                .await
                .map_err(SessionError::Connect)
        };
        let mut stream = guarded(self.state, cancel, deadline, connecting).await?;
        debug!("connected");

        let reply = self.converse(&mut stream, payload, cancel).await;
        drop(stream);
        trace!("connection closed");
        reply
    }

    async fn converse<S>(
        &mut self,
        stream: &mut S,
        payload: &EncodedPayload,
        cancel: &CancellationToken,
    ) -> Result<Reply>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.transition(SessionState::Writing)?;
        let deadline = Deadline::start(self.config.io_timeout);
        let wire = self
            .config
            .framing
            .encode_request(payload)
            .map_err(|err| SessionError::Write(io::Error::new(io::ErrorKind::InvalidInput, err)))?;

        let shutdown_write = self.config.shutdown_write;
        let writing = async {
            stream.write_all(&wire).await.map_err(SessionError::from_write)?;
            if shutdown_write {
                stream.shutdown().await.map_err(SessionError::from_write)?;
            } else {
                stream.flush().await.map_err(SessionError::from_write)?;
            }
            Ok(())
        };
        guarded(self.state, cancel, deadline, writing).await?;
        trace!(size = wire.len(), framing = self.config.framing.name(), "request written");

        self.transition(SessionState::AwaitingReply)?;
        let max = self.config.max_reply_size;
        let mut reader = FramedRead::new(stream, self.config.framing.reply_codec(max));
        let mut reply = BytesMut::new();
        let mut chunks = 0usize;

        loop {
            let reading = async { reader.next().await.transpose().map_err(SessionError::from_read) };
            let Some(chunk) = guarded(self.state, cancel, deadline, reading).await? else {
                break;
            };
            if chunk.is_empty() {
                continue;
            }

            chunks += 1;
            let size = reply.len() + chunk.len();
            if size > max {
                return Err(SessionError::ReplyTooLarge { size, max });
            }
            trace!(chunk = chunks, size = chunk.len(), "reply chunk received");
            reply.extend_from_slice(&chunk);

            if self.config.completion == ReplyCompletion::FirstChunk {
                break;
            }
        }

        Ok(Reply {
            bytes: reply.freeze(),
            chunks,
        })
    }

    fn conclude(&mut self, result: Result<Reply>) -> SessionOutcome {
        let reply = match result {
            Ok(reply) => reply,
            Err(err) => return self.fail(err),
        };

        let (next, outcome) = if reply.chunks == 0 {
            (SessionState::DeliveredEmpty, SessionOutcome::DeliveredEmpty)
        } else {
            (SessionState::Delivered, SessionOutcome::Delivered(reply.bytes))
        };
        match self.transition(next) {
            Ok(()) => {
                debug!(
                    outcome = %next,
                    size = outcome.reply().map_or(0, Bytes::len),
                    chunks = reply.chunks,
                    "session finished"
                );
                outcome
            }
            Err(err) => self.fail(err),
        }
    }

    fn fail(&mut self, err: SessionError) -> SessionOutcome {
        warn!(
            kind = err.kind().as_str(),
            phase = %self.state,
            error = %err,
            "session failed"
        );
        self.state = SessionState::Failed;
        SessionOutcome::Failed(err)
    }

    fn transition(&mut self, next: SessionState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(SessionError::Internal(format!(
                "illegal transition {} -> {}",
                self.state, next
            )));
        }
        trace!(from = %self.state, to = %next, "session state");
        self.state = next;
        Ok(())
    }
}

impl<C> std::fmt::Debug for PipeSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipeSession")
            .field("id", &self.id)
            .field("endpoint", &self.config.endpoint)
            .field("state", &self.state)
            .finish()
    }
}

/// Caller's side of a running session.
#[derive(Debug)]
pub struct SessionHandle {
    id: u64,
    cancel: CancellationToken,
    outcome: oneshot::Receiver<SessionOutcome>,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Abort the session. It closes its connection and reports
    /// `Failed(Cancelled)`, unless it already finished.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    /// A token that aborts this session when cancelled, for callers that
    /// hand the abort decision to another task.
    pub fn abort_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the session's outcome.
    pub async fn outcome(self) -> SessionOutcome {
        self.outcome.await.unwrap_or_else(|_| {
            SessionOutcome::Failed(SessionError::Internal(
                "session task ended without an outcome".to_string(),
            ))
        })
    }
}

struct Reply {
    bytes: Bytes,
    chunks: usize,
}

#[derive(Clone, Copy)]
struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// A budget too large to represent as an instant means no deadline.
    fn start(budget: Option<Duration>) -> Option<Self> {
        let budget = budget?;
        let at = Instant::now().checked_add(budget)?;
        Some(Self { at, budget })
    }
}

/// Run one suspension point of a session, bounded by the deadline and
/// interruptible by `cancel`.
async fn guarded<T, F>(
    phase: SessionState,
    cancel: &CancellationToken,
    deadline: Option<Deadline>,
    work: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let bounded = async move {
        match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline.at, work)
                .await
                .unwrap_or_else(|_| {
                    Err(SessionError::Timeout {
                        phase,
                        after: deadline.budget,
                    })
                }),
            None => work.await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SessionError::Cancelled { phase }),
        result = bounded => result,
    }
}
