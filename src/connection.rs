use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use uuid::Uuid;

use crate::codec::{CodecError, RequestCodec};
use crate::frame::Frame;
use crate::request::Request;

/// Server side of a client connection.
///
/// Bytes read from the socket are buffered by the codec until a whole request is available, so a
/// request split across several TCP segments is only handed out once complete.
pub struct Connection {
    pub id: Uuid,
    pub client_address: SocketAddr,
    framed: Framed<TcpStream, RequestCodec>,
}

impl Connection {
    pub fn new(stream: TcpStream, client_address: SocketAddr) -> Connection {
        Connection {
            id: Uuid::new_v4(),
            client_address,
            framed: Framed::new(stream, RequestCodec::new()),
        }
    }

    /// Reads the next request. Returns `None` when the peer closed the connection cleanly, that
    /// is, with no partial request left in the buffer.
    pub async fn read_request(&mut self) -> Result<Option<Request>, CodecError> {
        self.framed.next().await.transpose()
    }

    pub async fn write_frame(&mut self, frame: Frame) -> Result<(), CodecError> {
        self.framed.send(frame).await
    }
}
