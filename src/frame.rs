// https://redis.io/docs/reference/protocol-spec

use std::fmt;
use std::io::Cursor;

use bytes::{Buf, Bytes};
use thiserror::Error as ThisError;

pub(crate) static CRLF: &[u8; 2] = b"\r\n";

/// Deepest array nesting accepted by [`Frame::parse`].
pub const MAX_DEPTH: usize = 32;

#[derive(Debug, ThisError, PartialEq)]
pub enum Error {
    #[error("not enough data is available to parse an entire frame")]
    Incomplete,
    /// Invalid message encoding.
    #[error("protocol error; {0}")]
    Protocol(String),
}

/// A single reply value of the wire protocol.
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    NullBulkString,
    NullArray,
    Array(Vec<Frame>),
}

impl Frame {
    pub fn ok() -> Frame {
        Frame::Simple("OK".to_string())
    }

    /// Parses exactly one frame, leaving the cursor at the start of the next one.
    ///
    /// Arrays may nest at most [`MAX_DEPTH`] levels deep.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        Self::parse_nested(src, 0)
    }

    fn parse_nested(src: &mut Cursor<&[u8]>, depth: usize) -> Result<Self, Error> {
        // The first byte in an RESP-serialized payload always identifies its type.
        // Subsequent bytes constitute the type's contents.
        let first_byte = get_byte(src)?;
        let data_type = DataType::try_from(first_byte)?;

        match data_type {
            DataType::SimpleString => {
                let string = get_line_string(src)?;
                Ok(Frame::Simple(string))
            }
            DataType::SimpleError => {
                let string = get_line_string(src)?;
                Ok(Frame::Error(string))
            }
            DataType::Integer => {
                let integer = get_line_string(src)?
                    .parse::<i64>()
                    .map_err(|_| Error::Protocol("invalid integer".to_string()))?;

                Ok(Frame::Integer(integer))
            }
            // $<length>\r\n<data>\r\n
            DataType::BulkString => match get_length(src)? {
                Some(length) => get_payload(src, length).map(Frame::Bulk),
                None => Ok(Frame::NullBulkString),
            },
            // *<number-of-elements>\r\n<element-1>...<element-n>
            DataType::Array => {
                if depth >= MAX_DEPTH {
                    return Err(Error::Protocol("array nesting too deep".to_string()));
                }

                let length = match get_length(src)? {
                    Some(length) => length,
                    None => return Ok(Frame::NullArray),
                };

                // The declared length is untrusted until the elements actually arrive.
                let mut frames = Vec::with_capacity(length.min(64));
                for _ in 0..length {
                    frames.push(Self::parse_nested(src, depth + 1)?);
                }

                Ok(Frame::Array(frames))
            }
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes);
        bytes
    }

    fn write_to(&self, dst: &mut Vec<u8>) {
        match self {
            Frame::Simple(s) => write_line(dst, DataType::SimpleString, s),
            Frame::Error(s) => write_line(dst, DataType::SimpleError, s),
            Frame::Integer(i) => {
                dst.push(u8::from(DataType::Integer));
                dst.extend_from_slice(i.to_string().as_bytes());
                dst.extend_from_slice(CRLF);
            }
            Frame::Bulk(bytes) => write_bulk(dst, bytes),
            Frame::NullBulkString => dst.extend_from_slice(b"$-1\r\n"),
            Frame::NullArray => dst.extend_from_slice(b"*-1\r\n"),
            Frame::Array(arr) => {
                write_array_header(dst, arr.len());
                for frame in arr {
                    frame.write_to(dst);
                }
            }
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        match self {
            Frame::Simple(s) => write!(f, "{}", s),
            Frame::Error(s) => write!(f, "(error) {}", s),
            Frame::Integer(i) => write!(f, "(integer) {}", i),
            Frame::Bulk(bytes) => write!(f, "{:?}", String::from_utf8_lossy(bytes)),
            Frame::NullBulkString | Frame::NullArray => write!(f, "(nil)"),
            Frame::Array(arr) if arr.is_empty() => write!(f, "(empty array)"),
            Frame::Array(arr) => {
                let width = arr.len().to_string().len();
                for (i, frame) in arr.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                        write!(f, "{:indent$}", "")?;
                    }
                    write!(f, "{:>width$}) ", i + 1)?;
                    frame.fmt_indented(f, indent + width + 2)?;
                }
                Ok(())
            }
        }
    }
}

impl From<Frame> for Vec<u8> {
    fn from(frame: Frame) -> Self {
        frame.serialize()
    }
}

/// Renders a reply the way an interactive client prints it.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

/// Simple strings and errors cannot carry line breaks: any CR or LF is written as a space so the
/// value stays a single reply.
fn write_line(dst: &mut Vec<u8>, data_type: DataType, s: &str) {
    dst.push(u8::from(data_type));
    dst.extend(s.bytes().map(|b| match b {
        b'\r' | b'\n' => b' ',
        b => b,
    }));
    dst.extend_from_slice(CRLF);
}

pub(crate) fn write_array_header(dst: &mut Vec<u8>, len: usize) {
    dst.push(u8::from(DataType::Array));
    dst.extend_from_slice(len.to_string().as_bytes());
    dst.extend_from_slice(CRLF);
}

pub(crate) fn write_bulk(dst: &mut Vec<u8>, bytes: &[u8]) {
    dst.push(u8::from(DataType::BulkString));
    dst.extend_from_slice(bytes.len().to_string().as_bytes());
    dst.extend_from_slice(CRLF);
    dst.extend_from_slice(bytes);
    dst.extend_from_slice(CRLF);
}

/// Reads a `<length>\r\n` header. `-1` denotes a null value.
pub(crate) fn get_length(src: &mut Cursor<&[u8]>) -> Result<Option<usize>, Error> {
    let line = get_line(src)?;
    let length = std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| Error::Protocol("invalid length".to_string()))?;

    match length {
        -1 => Ok(None),
        length if length < 0 => Err(Error::Protocol("invalid length".to_string())),
        length => usize::try_from(length)
            .map(Some)
            .map_err(|_| Error::Protocol("invalid length".to_string())),
    }
}

/// Reads a binary-safe payload of `length` bytes followed by CRLF.
pub(crate) fn get_payload(src: &mut Cursor<&[u8]>, length: usize) -> Result<Bytes, Error> {
    if src.remaining() < length + CRLF.len() {
        return Err(Error::Incomplete);
    }

    let start = src.position() as usize;
    if &src.get_ref()[start + length..start + length + CRLF.len()] != CRLF {
        return Err(Error::Protocol(
            "expected CRLF after bulk payload".to_string(),
        ));
    }

    let data = src.copy_to_bytes(length);
    src.advance(CRLF.len());

    Ok(data)
}

pub(crate) fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], Error> {
    let start = src.position() as usize;
    let buf: &'a [u8] = *src.get_ref();

    let line_end = buf[start..]
        .windows(2)
        .position(|window| window == CRLF)
        .map(|index| start + index)
        .ok_or(Error::Incomplete)?;

    src.set_position((line_end + CRLF.len()) as u64);

    Ok(&buf[start..line_end])
}

fn get_line_string(src: &mut Cursor<&[u8]>) -> Result<String, Error> {
    let line = get_line(src)?;
    String::from_utf8(line.to_vec()).map_err(|_| Error::Protocol("invalid UTF-8".to_string()))
}

pub(crate) fn get_byte(src: &mut Cursor<&[u8]>) -> Result<u8, Error> {
    if !src.has_remaining() {
        return Err(Error::Incomplete);
    }
    Ok(src.get_u8())
}

#[derive(Debug, PartialEq)]
pub(crate) enum DataType {
    SimpleString, // '+'
    SimpleError,  // '-'
    Integer,      // ':'
    BulkString,   // '$'
    Array,        // '*'
}

impl TryFrom<u8> for DataType {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b'+' => Ok(Self::SimpleString),
            b'-' => Ok(Self::SimpleError),
            b':' => Ok(Self::Integer),
            b'$' => Ok(Self::BulkString),
            b'*' => Ok(Self::Array),
            _ => Err(Error::Protocol(format!(
                "invalid frame data type: {:?}",
                byte as char
            ))),
        }
    }
}

impl From<DataType> for u8 {
    fn from(value: DataType) -> Self {
        match value {
            DataType::SimpleString => b'+',
            DataType::SimpleError => b'-',
            DataType::Integer => b':',
            DataType::BulkString => b'$',
            DataType::Array => b'*',
        }
    }
}
