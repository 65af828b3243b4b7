pub mod del;
pub mod executable;
pub mod expire;
pub mod get;
pub mod keys;
pub mod set;
pub mod ttl;
pub mod zadd;
pub mod zrange;

use bytes::Bytes;
use std::{str, vec};
use strum_macros::IntoStaticStr;
use thiserror::Error as ThisError;
use tracing::debug;

use crate::commands::executable::Executable;
use crate::frame::Frame;
use crate::request::Request;
use crate::store::Store;
use crate::Error;

use del::Del;
use expire::Expire;
use get::Get;
use keys::Keys;
use set::Set;
use ttl::Ttl;
use zadd::Zadd;
use zrange::Zrange;

#[derive(Debug, PartialEq, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum Command {
    Del(Del),
    Expire(Expire),
    Get(Get),
    Keys(Keys),
    Set(Set),
    Ttl(Ttl),
    Zadd(Zadd),
    Zrange(Zrange),
}

impl Executable for Command {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        match self {
            Command::Del(cmd) => cmd.exec(store),
            Command::Expire(cmd) => cmd.exec(store),
            Command::Get(cmd) => cmd.exec(store),
            Command::Keys(cmd) => cmd.exec(store),
            Command::Set(cmd) => cmd.exec(store),
            Command::Ttl(cmd) => cmd.exec(store),
            Command::Zadd(cmd) => cmd.exec(store),
            Command::Zrange(cmd) => cmd.exec(store),
        }
    }
}

impl TryFrom<Request> for Command {
    type Error = Error;

    fn try_from(request: Request) -> Result<Self, Self::Error> {
        let command_name = request.command.to_lowercase();

        let parser = &mut CommandParser {
            command: command_name.clone(),
            parts: request.args.into_iter(),
        };

        match &command_name[..] {
            "del" => Del::try_from(parser).map(Command::Del),
            "expire" => Expire::try_from(parser).map(Command::Expire),
            "get" => Get::try_from(parser).map(Command::Get),
            "keys" => Keys::try_from(parser).map(Command::Keys),
            "set" => Set::try_from(parser).map(Command::Set),
            "ttl" => Ttl::try_from(parser).map(Command::Ttl),
            "zadd" => Zadd::try_from(parser).map(Command::Zadd),
            "zrange" => Zrange::try_from(parser).map(Command::Zrange),
            // The name is echoed back in a single line error reply.
            _ => Err(CommandParserError::UnknownCommand {
                command: request.command.replace(|c: char| c == '\r' || c == '\n', " "),
            }
            .into()),
        }
    }
}

/// Parses and executes a request against the store. Any command level failure, such as a
/// wrong number of arguments or an operation against the wrong type, is turned into an error
/// reply: it never ends the connection.
pub fn dispatch(request: Request, store: &Store) -> Frame {
    let res = Command::try_from(request).and_then(|cmd| {
        let name: &'static str = (&cmd).into();
        debug!(command = name, "Executing command");
        cmd.exec(store.clone())
    });

    res.unwrap_or_else(|err| Frame::Error(err.to_string()))
}

pub struct CommandParser {
    command: String,
    parts: vec::IntoIter<Bytes>,
}

impl CommandParser {
    fn wrong_number_of_arguments(&self) -> CommandParserError {
        CommandParserError::WrongNumberOfArguments {
            command: self.command.clone(),
        }
    }

    fn is_empty(&self) -> bool {
        self.parts.len() == 0
    }

    /// Checks the number of remaining arguments before any of them is parsed.
    fn expect_exactly(&self, count: usize) -> Result<(), CommandParserError> {
        if self.parts.len() != count {
            return Err(self.wrong_number_of_arguments());
        }
        Ok(())
    }

    fn expect_at_least(&self, count: usize) -> Result<(), CommandParserError> {
        if self.parts.len() < count {
            return Err(self.wrong_number_of_arguments());
        }
        Ok(())
    }

    fn next_bytes(&mut self) -> Result<Bytes, CommandParserError> {
        self.parts
            .next()
            .ok_or_else(|| self.wrong_number_of_arguments())
    }

    fn next_string(&mut self) -> Result<String, CommandParserError> {
        let bytes = self.next_bytes()?;
        str::from_utf8(&bytes[..])
            .map(|s| s.to_string())
            .map_err(CommandParserError::InvalidUTF8String)
    }

    fn next_integer(&mut self, argument: &str) -> Result<i64, CommandParserError> {
        let bytes = self.next_bytes()?;
        str::from_utf8(&bytes[..])
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| CommandParserError::InvalidInteger {
                argument: argument.to_string(),
            })
    }

    fn next_float(&mut self, argument: &str) -> Result<f64, CommandParserError> {
        let bytes = self.next_bytes()?;
        str::from_utf8(&bytes[..])
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .filter(|f| f.is_finite())
            .ok_or_else(|| CommandParserError::InvalidFloat {
                argument: argument.to_string(),
            })
    }
}

#[derive(Debug, Clone, ThisError, PartialEq)]
pub enum CommandParserError {
    #[error("ERR unknown command '{command}'")]
    UnknownCommand { command: String },
    #[error("ERR wrong number of arguments for '{command}' command")]
    WrongNumberOfArguments { command: String },
    #[error("ERR {argument} is not an integer or out of range")]
    InvalidInteger { argument: String },
    #[error("ERR {argument} is not a valid float")]
    InvalidFloat { argument: String },
    #[error("ERR invalid expire time in '{command}' command")]
    InvalidExpireTime { command: String },
    #[error("ERR syntax error")]
    SyntaxError,
    #[error("ERR invalid UTF-8 string")]
    InvalidUTF8String(#[from] str::Utf8Error),
}
