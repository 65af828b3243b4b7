use bytes::Bytes;
use std::io::Cursor;

use crate::frame::{get_byte, get_length, get_payload, write_array_header, write_bulk, Error};

/// A command as sent by clients: an array of bulk strings where the first element names the
/// command and the rest are its arguments.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub command: String,
    pub args: Vec<Bytes>,
}

impl Request {
    pub fn new(command: impl Into<String>, args: Vec<Bytes>) -> Request {
        Request {
            command: command.into(),
            args,
        }
    }

    /// Splits a line of user input on whitespace. Returns `None` for blank lines.
    pub fn from_line(line: &str) -> Option<Request> {
        let mut parts = line.split_whitespace();
        let command = parts.next()?;
        let args = parts.map(|part| Bytes::from(part.to_string())).collect();

        Some(Request::new(command, args))
    }

    /// Parses one request, leaving the cursor right after it.
    ///
    /// Unlike [`Frame::parse`](crate::frame::Frame::parse), only the request shape is accepted:
    /// an array header followed by bulk strings. A null bulk string is read as an empty argument.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Request, Error> {
        if get_byte(src)? != b'*' {
            return Err(Error::Protocol("expected array".to_string()));
        }

        let count = match get_length(src)? {
            Some(0) => return Err(Error::Protocol("empty command".to_string())),
            Some(count) => count,
            None => return Err(Error::Protocol("invalid array length".to_string())),
        };

        let mut parts = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            if get_byte(src)? != b'$' {
                return Err(Error::Protocol("expected bulk string".to_string()));
            }

            let part = match get_length(src)? {
                Some(length) => get_payload(src, length)?,
                None => Bytes::new(),
            };
            parts.push(part);
        }

        let mut parts = parts.into_iter();
        let command = parts
            .next()
            .map(|name| String::from_utf8(name.to_vec()))
            .transpose()
            .map_err(|_| Error::Protocol("invalid command name".to_string()))?
            .unwrap_or_default();

        Ok(Request {
            command,
            args: parts.collect(),
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        self.write_to(&mut bytes);
        bytes
    }

    fn write_to(&self, dst: &mut Vec<u8>) {
        write_array_header(dst, 1 + self.args.len());
        write_bulk(dst, self.command.as_bytes());
        for arg in &self.args {
            write_bulk(dst, arg);
        }
    }
}
