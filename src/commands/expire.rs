use crate::commands::executable::Executable;
use crate::commands::CommandParser;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Set a timeout on `key`. After the timeout has expired, the key will automatically be deleted.
/// A non positive timeout deletes the key immediately.
///
/// Replies `1` if the timeout was set and `0` if the key does not exist.
///
/// Ref: <https://redis.io/docs/latest/commands/expire/>
#[derive(Debug, PartialEq)]
pub struct Expire {
    pub key: String,
    pub seconds: i64,
}

impl Executable for Expire {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let applied = store.expire(&self.key, self.seconds);
        Ok(Frame::Integer(applied as i64))
    }
}

impl TryFrom<&mut CommandParser> for Expire {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.expect_exactly(2)?;
        let key = parser.next_string()?;
        let seconds = parser.next_integer("seconds")?;

        Ok(Self { key, seconds })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::commands::{Command, CommandParserError};
    use crate::request::Request;
    use crate::store::SetOptions;

    #[tokio::test]
    async fn existing_key() {
        let store = Store::new();
        store.set("key1".to_string(), Bytes::from("1"), SetOptions::default());

        let cmd = Command::try_from(Request::from_line("EXPIRE key1 100").unwrap()).unwrap();
        assert_eq!(
            cmd,
            Command::Expire(Expire {
                key: String::from("key1"),
                seconds: 100,
            })
        );

        assert_eq!(cmd.exec(store.clone()).unwrap(), Frame::Integer(1));
        assert_eq!(store.ttl("key1"), 100);
    }

    #[tokio::test]
    async fn missing_key() {
        let store = Store::new();

        let cmd = Command::try_from(Request::from_line("EXPIRE key1 100").unwrap()).unwrap();

        assert_eq!(cmd.exec(store.clone()).unwrap(), Frame::Integer(0));
    }

    #[tokio::test]
    async fn zero_timeout() {
        let store = Store::new();
        store.set("key1".to_string(), Bytes::from("1"), SetOptions::default());

        let cmd = Command::try_from(Request::from_line("EXPIRE key1 0").unwrap()).unwrap();

        assert_eq!(cmd.exec(store.clone()).unwrap(), Frame::Integer(1));
        assert_eq!(store.ttl("key1"), -2);
    }

    #[test]
    fn invalid_seconds() {
        let err = Command::try_from(Request::from_line("EXPIRE key1 soon").unwrap())
            .err()
            .unwrap();
        let err = err.downcast_ref::<CommandParserError>().unwrap();

        assert_eq!(
            *err,
            CommandParserError::InvalidInteger {
                argument: "seconds".to_string()
            }
        );
    }
}
