use futures::{SinkExt, StreamExt};
use std::io;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::Framed;

use crate::codec::ReplyCodec;
use crate::frame::Frame;
use crate::request::Request;
use crate::Result;

/// A minimal client: sends one request at a time and waits for its reply.
pub struct Client {
    framed: Framed<TcpStream, ReplyCodec>,
}

impl Client {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Client> {
        let stream = TcpStream::connect(addr).await?;

        Ok(Client {
            framed: Framed::new(stream, ReplyCodec::new()),
        })
    }

    pub async fn send(&mut self, request: Request) -> Result<Frame> {
        self.framed.send(request).await?;

        match self.framed.next().await {
            Some(reply) => Ok(reply?),
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            )
            .into()),
        }
    }

    /// Splits `line` on whitespace and sends it as a request.
    pub async fn send_line(&mut self, line: &str) -> Result<Frame> {
        let request = Request::from_line(line)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "empty command"))?;
        self.send(request).await
    }
}
