use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::CommandParser;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Returns the members of the sorted set at `key` between the ranks `start` and `stop`, both
/// inclusive, ordered from the lowest to the highest score. Negative ranks count from the end of
/// the set, `-1` being the last member.
///
/// Ref: <https://redis.io/docs/latest/commands/zrange/>
#[derive(Debug, PartialEq)]
pub struct Zrange {
    pub key: String,
    pub start: i64,
    pub stop: i64,
}

impl Executable for Zrange {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let members = store
            .zrange(&self.key, self.start, self.stop)?
            .into_iter()
            .map(|member| Frame::Bulk(Bytes::from(member)))
            .collect();

        Ok(Frame::Array(members))
    }
}

impl TryFrom<&mut CommandParser> for Zrange {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.expect_exactly(3)?;
        let key = parser.next_string()?;
        let start = parser.next_integer("start")?;
        let stop = parser.next_integer("stop")?;

        Ok(Self { key, start, stop })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Command, CommandParserError};
    use crate::request::Request;

    fn run(store: &Store, line: &str) -> Frame {
        let cmd = Command::try_from(Request::from_line(line).unwrap()).unwrap();
        cmd.exec(store.clone()).unwrap()
    }

    fn bulks(members: &[&str]) -> Frame {
        Frame::Array(
            members
                .iter()
                .map(|member| Frame::Bulk(Bytes::from(member.to_string())))
                .collect(),
        )
    }

    #[tokio::test]
    async fn ranges() {
        let store = Store::new();
        run(&store, "ZADD z 10 ten");
        run(&store, "ZADD z 9 nine");
        run(&store, "ZADD z -1 minus");
        run(&store, "ZADD z 9 eight");

        assert_eq!(
            run(&store, "ZRANGE z 0 -1"),
            bulks(&["minus", "eight", "nine", "ten"])
        );
        assert_eq!(run(&store, "ZRANGE z 1 2"), bulks(&["eight", "nine"]));
        assert_eq!(run(&store, "ZRANGE z -2 99"), bulks(&["nine", "ten"]));
        assert_eq!(run(&store, "ZRANGE z 3 1"), bulks(&[]));
        assert_eq!(run(&store, "ZRANGE missing 0 -1"), bulks(&[]));
    }

    #[test]
    fn invalid_indices() {
        let err = Command::try_from(Request::from_line("ZRANGE z 0 last").unwrap())
            .err()
            .unwrap();
        let err = err.downcast_ref::<CommandParserError>().unwrap();

        assert_eq!(
            *err,
            CommandParserError::InvalidInteger {
                argument: "stop".to_string()
            }
        );
    }
}
