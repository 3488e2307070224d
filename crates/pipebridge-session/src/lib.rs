//! One-shot request/reply sessions against a local pipe endpoint.
//!
//! A session owns exactly one connection for exactly one encoded request:
//! connect, write, collect the reply, close, report. The outcome is one of
//! [`SessionOutcome::Delivered`], [`SessionOutcome::DeliveredEmpty`] or
//! [`SessionOutcome::Failed`], produced once.
//!
//! Most callers want [`dispatch`] or [`request`], which encode the record
//! first so encoding errors never turn into session outcomes.

pub mod config;
pub mod connector;
pub mod dispatch;
pub mod error;
pub mod outcome;
pub mod session;
pub mod state;

pub use config::{
    ReplyCompletion, SessionConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_IO_TIMEOUT, DEFAULT_MAX_REPLY,
};
pub use connector::{Connector, EndpointConnector};
pub use dispatch::{dispatch, dispatch_with_config, request};
pub use error::{ErrorKind, Result, SessionError};
pub use outcome::SessionOutcome;
pub use session::{PipeSession, SessionHandle};
pub use state::SessionState;
