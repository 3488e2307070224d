//! Forward application actions to a local service over a named pipe.
//!
//! A caller hands over a structured action; pipebridge encodes it as JSON,
//! opens a short-lived connection to the service endpoint, writes the
//! request, collects the reply and closes the connection, reporting exactly
//! one outcome per action.
//!
//! # Crate Structure
//!
//! - [`transport`]: endpoints and async pipe streams (UDS, Windows named pipes)
//! - [`codec`]: action records, JSON encoding and wire framing
//! - [`session`]: the one-shot request/reply session and the `dispatch` facade
//!
//! ```no_run
//! use pipebridge::codec::ActionRequest;
//! use pipebridge::session::{dispatch, SessionOutcome};
//!
//! # async fn demo() -> Result<(), pipebridge::codec::EncodeError> {
//! let action = ActionRequest::new("update_user")
//!     .field("userId", 1001)
//!     .field("message", "Hello")
//!     .with_timestamp();
//!
//! match dispatch(&action)?.outcome().await {
//!     SessionOutcome::Delivered(reply) => println!("reply: {reply:?}"),
//!     SessionOutcome::DeliveredEmpty => println!("no reply"),
//!     SessionOutcome::Failed(err) => eprintln!("failed: {err}"),
//! }
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use pipebridge_transport::*;
}

/// Re-export codec types.
pub mod codec {
    pub use pipebridge_codec::*;
}

/// Re-export session types.
pub mod session {
    pub use pipebridge_session::*;
}
