use bytes::{Buf, BytesMut};
use std::env;
use std::io::{self, Cursor};
use thiserror::Error as ThisError;
use tokio_util::codec::{Decoder, Encoder};

use crate::frame::{self, Frame};
use crate::request::Request;

const DEFAULT_MAX_FRAME_SIZE: usize = 512 * 1024 * 1024;

#[derive(Debug, ThisError)]
pub enum CodecError {
    #[error("protocol error; {0}")]
    Protocol(String),
    #[error("frame size exceeds limit of {0} bytes")]
    FrameTooLarge(usize),
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn max_frame_size() -> usize {
    env::var("MAX_FRAME_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_MAX_FRAME_SIZE)
}

/// Runs `parse` over the buffered bytes and, on success, removes the parsed item from the buffer.
fn decode_with<T>(
    src: &mut BytesMut,
    max_frame_size: usize,
    parse: impl FnOnce(&mut Cursor<&[u8]>) -> Result<T, frame::Error>,
) -> Result<Option<T>, CodecError> {
    let mut cursor = Cursor::new(&src[..]);
    let item = match parse(&mut cursor) {
        Ok(item) => item,
        // Not enough data to parse an item, unless the peer is sending more than we accept.
        Err(frame::Error::Incomplete) if src.len() > max_frame_size => {
            return Err(CodecError::FrameTooLarge(max_frame_size))
        }
        Err(frame::Error::Incomplete) => return Ok(None),
        Err(frame::Error::Protocol(msg)) => return Err(CodecError::Protocol(msg)),
    };

    let position = cursor.position() as usize;
    src.advance(position);

    Ok(Some(item))
}

/// Server side codec: decodes client requests and encodes replies.
pub struct RequestCodec {
    max_frame_size: usize,
}

impl RequestCodec {
    pub fn new() -> RequestCodec {
        RequestCodec {
            max_frame_size: max_frame_size(),
        }
    }
}

impl Default for RequestCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for RequestCodec {
    type Item = Request;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_with(src, self.max_frame_size, Request::parse)
    }
}

impl Encoder<Frame> for RequestCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes: Vec<u8> = item.into();
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

/// Client side codec: encodes requests and decodes replies.
pub struct ReplyCodec {
    max_frame_size: usize,
}

impl ReplyCodec {
    pub fn new() -> ReplyCodec {
        ReplyCodec {
            max_frame_size: max_frame_size(),
        }
    }
}

impl Default for ReplyCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ReplyCodec {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_with(src, self.max_frame_size, Frame::parse)
    }
}

impl Encoder<Request> for ReplyCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Request, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&item.serialize());
        Ok(())
    }
}
