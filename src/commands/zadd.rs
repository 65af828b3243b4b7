use crate::commands::executable::Executable;
use crate::commands::CommandParser;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Adds `member` with the specified `score` to the sorted set stored at `key`. If the member is
/// already part of the set its score is updated.
///
/// Replies `1` when the member was added and `0` when only its score was updated.
///
/// Ref: <https://redis.io/docs/latest/commands/zadd/>
#[derive(Debug, PartialEq)]
pub struct Zadd {
    pub key: String,
    pub score: f64,
    pub member: String,
}

impl Executable for Zadd {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        let added = store.zadd(self.key, self.score, self.member)?;
        Ok(Frame::Integer(added as i64))
    }
}

impl TryFrom<&mut CommandParser> for Zadd {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        parser.expect_exactly(3)?;
        let key = parser.next_string()?;
        let score = parser.next_float("score")?;
        let member = parser.next_string()?;

        Ok(Self { key, score, member })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Command, CommandParserError};
    use crate::request::Request;

    fn parse(line: &str) -> Result<Command, Error> {
        Command::try_from(Request::from_line(line).unwrap())
    }

    #[tokio::test]
    async fn add_then_update() {
        let store = Store::new();

        let cmd = parse("ZADD board 1.5 alice").unwrap();
        assert_eq!(
            cmd,
            Command::Zadd(Zadd {
                key: String::from("board"),
                score: 1.5,
                member: String::from("alice"),
            })
        );
        assert_eq!(cmd.exec(store.clone()).unwrap(), Frame::Integer(1));

        let cmd = parse("ZADD board -3 alice").unwrap();
        assert_eq!(cmd.exec(store.clone()).unwrap(), Frame::Integer(0));

        assert_eq!(store.zrange("board", 0, -1).unwrap(), vec!["alice"]);
    }

    #[test]
    fn invalid_score() {
        for line in [
            "ZADD board high alice",
            "ZADD board nan alice",
            "ZADD board inf alice",
            "ZADD board -Infinity alice",
        ] {
            let err = parse(line).err().unwrap();
            let err = err.downcast_ref::<CommandParserError>().unwrap();

            assert_eq!(
                *err,
                CommandParserError::InvalidFloat {
                    argument: "score".to_string()
                }
            );
        }
    }

    #[test]
    fn wrong_number_of_arguments() {
        for line in ["ZADD board 1", "ZADD board 1 alice 2 bob"] {
            let err = parse(line).err().unwrap();
            let err = err.downcast_ref::<CommandParserError>().unwrap();

            assert_eq!(
                *err,
                CommandParserError::WrongNumberOfArguments {
                    command: "zadd".to_string()
                }
            );
        }
    }
}
