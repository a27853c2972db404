use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{Sink, SinkExt, StreamExt};
use std::pin::Pin;
use tokio_tungstenite::tungstenite::Message;

use crate::errors::ChannelError;

pub type Inbound = BoxStream<'static, Result<String, ChannelError>>;
pub type Outbound = Pin<Box<dyn Sink<String, Error = ChannelError> + Send>>;

/// One open connection: inbound text frames and an outbound text sink.
///
/// The inbound stream ending means the connection closed.
pub struct Connection {
    pub inbound: Inbound,
    pub outbound: Outbound,
}

/// Opens connections for the reconnecting channel.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, url: &str) -> Result<Connection, ChannelError>;
}

/// WebSocket transport over `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Connection, ChannelError> {
        let (socket, _response) =
            tokio_tungstenite::connect_async(url)
                .await
                .map_err(|e| ChannelError::Connect {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
        let (sink, stream) = socket.split();

        let inbound = stream
            .filter_map(|frame| async move {
                match frame {
                    Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                    Ok(Message::Binary(bytes)) => {
                        Some(Ok(String::from_utf8_lossy(&bytes).into_owned()))
                    }
                    // Ping/Pong are answered by tungstenite; Close ends the stream.
                    Ok(_) => None,
                    Err(e) => Some(Err(ChannelError::Transport(e.to_string()))),
                }
            })
            .boxed();

        let outbound = sink
            .with(|text: String| async move {
                Ok::<_, tokio_tungstenite::tungstenite::Error>(Message::text(text))
            })
            .sink_map_err(|e| ChannelError::Transport(e.to_string()));

        Ok(Connection {
            inbound,
            outbound: Box::pin(outbound),
        })
    }
}
