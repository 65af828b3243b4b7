use crate::commands::executable::Executable;
use crate::commands::CommandParser;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// TTL returns the remaining time to live of a key that has a timeout. This introspection
/// capability allows a Redis client to check how many seconds a given key will continue to be part
/// of the dataset.
///
/// Replies `-2` if the key does not exist and `-1` if the key exists but has no associated expire.
///
/// Ref: <https://redis.io/docs/latest/commands/ttl>
#[derive(Debug, PartialEq)]
pub struct Ttl {
    pub key: String,
}

impl Executable for Ttl {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        Ok(Frame::Integer(store.ttl(&self.key)))
    }
}

impl TryFrom<&mut CommandParser> for Ttl {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.expect_exactly(1)?;
        let key = parser.next_string()?;
        Ok(Self { key })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tokio::time::{self, Duration};

    use super::*;
    use crate::commands::Command;
    use crate::request::Request;
    use crate::store::SetOptions;

    fn ttl(store: &Store, key: &str) -> Frame {
        let line = format!("TTL {}", key);
        let cmd = Command::try_from(Request::from_line(&line).unwrap()).unwrap();
        cmd.exec(store.clone()).unwrap()
    }

    #[tokio::test]
    async fn ttl_states() {
        time::pause();
        let store = Store::new();

        store.set("plain".to_string(), Bytes::from("1"), SetOptions::default());
        store.set(
            "temp".to_string(),
            Bytes::from("1"),
            SetOptions {
                condition: None,
                ttl: Some(Duration::from_secs(30)),
            },
        );

        assert_eq!(ttl(&store, "missing"), Frame::Integer(-2));
        assert_eq!(ttl(&store, "plain"), Frame::Integer(-1));
        assert_eq!(ttl(&store, "temp"), Frame::Integer(30));

        time::advance(Duration::from_secs(30)).await;
        assert_eq!(ttl(&store, "temp"), Frame::Integer(-2));
    }
}
