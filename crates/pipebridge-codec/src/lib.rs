//! Request encoding and reply framing for the pipe bridge.
//!
//! A request is any serializable record, typically an [`ActionRequest`].
//! [`RequestEncoder`] turns it into an [`EncodedPayload`] of compact JSON;
//! [`Framing`] decides how those bytes go on the wire and how the reply
//! stream is cut into chunks.

pub mod encoder;
pub mod error;
pub mod framing;
pub mod request;

pub use encoder::{encode, EncodedPayload, RequestEncoder};
pub use error::{EncodeError, Result};
pub use framing::{encode_frame, Framing, ReplyCodec, LENGTH_PREFIX_SIZE, MAX_FRAME_PAYLOAD};
pub use request::{ActionRequest, ACTION_KEY, TIMESTAMP_KEY};
