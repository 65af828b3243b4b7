use bytes::Bytes;
use tokio::time::Duration;

use crate::commands::executable::Executable;
use crate::commands::{CommandParser, CommandParserError};
use crate::frame::Frame;
use crate::store::{SetCondition, SetOptions, Store};
use crate::Error;

/// Set `key` to hold the string `value`. If key already holds a value, it is overwritten,
/// regardless of its type. Any previous time to live associated with the key is discarded.
///
/// Options:
///
/// * `NX` -- Only set the key if it does not already exist.
/// * `XX` -- Only set the key if it already exists.
/// * `EX seconds` -- Set the specified expire time, in seconds.
///
/// Replies `OK` when the key was set and `nil` when a condition prevented it.
///
/// Ref: <https://redis.io/docs/latest/commands/set/>
#[derive(Debug, PartialEq)]
pub struct Set {
    pub key: String,
    pub value: Bytes,
    pub options: SetOptions,
}

impl Executable for Set {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let applied = store.set(self.key, self.value, self.options);

        if applied {
            Ok(Frame::ok())
        } else {
            Ok(Frame::NullBulkString)
        }
    }
}

impl TryFrom<&mut CommandParser> for Set {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.expect_at_least(2)?;
        let key = parser.next_string()?;
        let value = parser.next_bytes()?;

        let mut options = SetOptions::default();

        while !parser.is_empty() {
            let option = parser.next_string()?;

            match option.to_uppercase().as_str() {
                "NX" if options.condition.is_none() => {
                    options.condition = Some(SetCondition::IfNotExists);
                }
                "XX" if options.condition.is_none() => {
                    options.condition = Some(SetCondition::IfExists);
                }
                "EX" if options.ttl.is_none() && !parser.is_empty() => {
                    let seconds = parser.next_integer("expire time")?;
                    if seconds <= 0 {
                        return Err(CommandParserError::InvalidExpireTime {
                            command: "set".to_string(),
                        }
                        .into());
                    }
                    options.ttl = Some(Duration::from_secs(seconds as u64));
                }
                _ => return Err(CommandParserError::SyntaxError.into()),
            }
        }

        Ok(Self {
            key,
            value,
            options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;
    use crate::request::Request;
    use tokio::time;

    fn parse(line: &str) -> Result<Command, Error> {
        Command::try_from(Request::from_line(line).unwrap())
    }

    fn parse_err(line: &str) -> CommandParserError {
        let err = parse(line).err().unwrap();
        err.downcast_ref::<CommandParserError>().unwrap().clone()
    }

    #[test]
    fn parse_set_command() {
        let cmd = parse("SET foo baz").unwrap();

        assert_eq!(
            cmd,
            Command::Set(Set {
                key: String::from("foo"),
                value: Bytes::from("baz"),
                options: SetOptions::default(),
            })
        );
    }

    #[test]
    fn parse_set_command_with_options() {
        let cmd = parse("SET foo baz ex 10 NX").unwrap();

        assert_eq!(
            cmd,
            Command::Set(Set {
                key: String::from("foo"),
                value: Bytes::from("baz"),
                options: SetOptions {
                    condition: Some(SetCondition::IfNotExists),
                    ttl: Some(Duration::from_secs(10)),
                },
            })
        );

        let cmd = parse("SET foo baz XX").unwrap();

        assert_eq!(
            cmd,
            Command::Set(Set {
                key: String::from("foo"),
                value: Bytes::from("baz"),
                options: SetOptions {
                    condition: Some(SetCondition::IfExists),
                    ttl: None,
                },
            })
        );
    }

    #[test]
    fn invalid_options() {
        assert_eq!(parse_err("SET foo baz NX XX"), CommandParserError::SyntaxError);
        assert_eq!(parse_err("SET foo baz EX 1 EX 2"), CommandParserError::SyntaxError);
        assert_eq!(parse_err("SET foo baz EX"), CommandParserError::SyntaxError);
        assert_eq!(parse_err("SET foo baz PX 10"), CommandParserError::SyntaxError);
        assert_eq!(
            parse_err("SET foo baz EX ten"),
            CommandParserError::InvalidInteger {
                argument: "expire time".to_string()
            }
        );
        assert_eq!(
            parse_err("SET foo baz EX 0"),
            CommandParserError::InvalidExpireTime {
                command: "set".to_string()
            }
        );
        assert_eq!(
            parse_err("SET foo"),
            CommandParserError::WrongNumberOfArguments {
                command: "set".to_string()
            }
        );
    }

    #[tokio::test]
    async fn set_with_conditions() {
        let store = Store::new();

        let res = parse("SET foo 1 XX").unwrap().exec(store.clone()).unwrap();
        assert_eq!(res, Frame::NullBulkString);

        let res = parse("SET foo 1 NX").unwrap().exec(store.clone()).unwrap();
        assert_eq!(res, Frame::ok());

        let res = parse("SET foo 2 NX").unwrap().exec(store.clone()).unwrap();
        assert_eq!(res, Frame::NullBulkString);

        assert_eq!(store.get("foo").unwrap(), Some(Bytes::from("1")));
    }

    #[tokio::test]
    async fn set_with_expiration() {
        time::pause();
        let store = Store::new();

        let res = parse("SET foo 1 EX 10").unwrap().exec(store.clone()).unwrap();
        assert_eq!(res, Frame::ok());
        assert_eq!(store.ttl("foo"), 10);

        time::advance(Duration::from_secs(10)).await;
        assert_eq!(store.get("foo").unwrap(), None);
    }
}
