use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::CommandParser;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Returns all keys matching a glob-style `pattern`: `*` matches any run of characters and `?`
/// a single one.
///
/// Ref: <https://redis.io/docs/latest/commands/keys/>
#[derive(Debug, PartialEq)]
pub struct Keys {
    pub pattern: String,
}

impl Executable for Keys {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let keys = store
            .keys(&self.pattern)
            .into_iter()
            .map(|key| Frame::Bulk(Bytes::from(key)))
            .collect();

        Ok(Frame::Array(keys))
    }
}

impl TryFrom<&mut CommandParser> for Keys {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.expect_exactly(1)?;
        let pattern = parser.next_string()?;
        Ok(Self { pattern })
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::{Command, CommandParserError};
    use crate::request::Request;
    use crate::store::SetOptions;

    use super::*;

    #[test]
    fn with_wildcard_pattern() {
        let cmd = Command::try_from(Request::from_line("KEYS *").unwrap()).unwrap();
        assert_eq!(
            cmd,
            Command::Keys(Keys {
                pattern: String::from("*")
            })
        );
    }

    #[test]
    fn zero_keys() {
        let err = Command::try_from(Request::from_line("KEYS").unwrap())
            .err()
            .unwrap();
        let err = err.downcast_ref::<CommandParserError>().unwrap();

        assert_eq!(
            *err,
            CommandParserError::WrongNumberOfArguments {
                command: "keys".to_string()
            }
        );
    }

    #[tokio::test]
    async fn matching_keys() {
        let store = Store::new();
        for key in ["user:1", "user:2", "order:1"] {
            store.set(key.to_string(), Bytes::from("v"), SetOptions::default());
        }

        let cmd = Command::try_from(Request::from_line("KEYS user:*").unwrap()).unwrap();
        let res = cmd.exec(store.clone()).unwrap();

        let Frame::Array(frames) = res else {
            panic!("expected an array, got {:?}", res);
        };
        let mut keys: Vec<Bytes> = frames
            .into_iter()
            .map(|frame| match frame {
                Frame::Bulk(key) => key,
                frame => panic!("expected a bulk string, got {:?}", frame),
            })
            .collect();
        keys.sort();

        assert_eq!(keys, vec![Bytes::from("user:1"), Bytes::from("user:2")]);
    }
}
