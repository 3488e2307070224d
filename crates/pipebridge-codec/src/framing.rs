//! Request framing and reply chunking.
//!
//! The default is [`Framing::Raw`]: the JSON document goes out as a single
//! unframed write and the reply is whatever bytes arrive before the service
//! closes its end. [`Framing::LengthPrefixed`] speaks the native pipe
//! server's format, where every message carries a length header:
//!
//! ```text
//! ┌─────────────────┬──────────────────┐
//! │ Length (4B LE)  │ Payload          │
//! │                 │ (Length bytes)   │
//! └─────────────────┴──────────────────┘
//! ```

use std::io;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{BytesCodec, Decoder, LengthDelimitedCodec};

use crate::encoder::EncodedPayload;
use crate::error::{EncodeError, Result};

/// Size of the length header in [`Framing::LengthPrefixed`] mode.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Largest message the length-prefixed pipe server accepts: 10 MiB.
pub const MAX_FRAME_PAYLOAD: usize = 10 * 1024 * 1024;

/// How request and reply bytes are delimited on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Framing {
    /// One unframed JSON write; the reply runs until end of stream.
    #[default]
    Raw,
    /// 4-byte little-endian length header before every message.
    LengthPrefixed,
}

impl Framing {
    /// Bytes to write for `payload`.
    pub fn encode_request(self, payload: &EncodedPayload) -> Result<Bytes> {
        match self {
            Framing::Raw => Ok(payload.clone().into_bytes()),
            Framing::LengthPrefixed => {
                let mut dst = BytesMut::new();
                encode_frame(payload.as_bytes(), &mut dst)?;
                Ok(dst.freeze())
            }
        }
    }

    /// Decoder splitting the reply stream into chunks.
    ///
    /// `max_frame` bounds a single length-prefixed frame; raw chunks are
    /// bounded by the read buffer instead.
    pub fn reply_codec(self, max_frame: usize) -> ReplyCodec {
        let inner = match self {
            Framing::Raw => ReplyCodecInner::Raw(BytesCodec::new()),
            Framing::LengthPrefixed => ReplyCodecInner::LengthPrefixed(
                // The header stays buffered until its frame is complete, so
                // end of stream after a bare header is still mid-frame.
                LengthDelimitedCodec::builder()
                    .length_field_length(LENGTH_PREFIX_SIZE)
                    .little_endian()
                    .num_skip(0)
                    .length_adjustment(LENGTH_PREFIX_SIZE as isize)
                    .max_frame_length(max_frame)
                    .new_codec(),
            ),
        };
        ReplyCodec { inner }
    }

    pub fn name(self) -> &'static str {
        match self {
            Framing::Raw => "raw",
            Framing::LengthPrefixed => "length-prefixed",
        }
    }
}

/// Write one length-prefixed frame into `dst`.
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_FRAME_PAYLOAD {
        return Err(EncodeError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_FRAME_PAYLOAD,
        });
    }
    dst.reserve(LENGTH_PREFIX_SIZE + payload.len());
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Splits a reply stream into chunks according to the session's [`Framing`].
///
/// A stream that ends in the middle of a length-prefixed frame yields an
/// [`io::ErrorKind::UnexpectedEof`] error: the peer vanished, it did not
/// finish cleanly.
#[derive(Debug)]
pub struct ReplyCodec {
    inner: ReplyCodecInner,
}

#[derive(Debug)]
enum ReplyCodecInner {
    Raw(BytesCodec),
    LengthPrefixed(LengthDelimitedCodec),
}

impl Decoder for ReplyCodec {
    type Item = BytesMut;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> io::Result<Option<BytesMut>> {
        match &mut self.inner {
            ReplyCodecInner::Raw(codec) => codec.decode(src),
            ReplyCodecInner::LengthPrefixed(codec) => Ok(codec.decode(src)?.map(strip_header)),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> io::Result<Option<BytesMut>> {
        match &mut self.inner {
            ReplyCodecInner::Raw(codec) => codec.decode_eof(src),
            ReplyCodecInner::LengthPrefixed(codec) => match codec.decode(src)? {
                Some(frame) => Ok(Some(strip_header(frame))),
                None if src.is_empty() => Ok(None),
                None => Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("stream ended inside a frame ({} bytes buffered)", src.len()),
                )),
            },
        }
    }
}

fn strip_header(mut frame: BytesMut) -> BytesMut {
    frame.advance(LENGTH_PREFIX_SIZE);
    frame
}
