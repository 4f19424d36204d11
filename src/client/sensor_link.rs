//! WebSocket link to the relay's ingest endpoint.
//!
//! Used by the serial bridge on the sensor side and by the `send` command to
//! push raw codes by hand.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// An open ingest connection.
pub struct SensorLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    greeting: Option<String>,
}

impl SensorLink {
    /// Connect and wait for the relay's greeting frame.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let (mut stream, _) = tokio_tungstenite::connect_async(url).await?;
        tracing::info!("Connected to {}", url);

        let greeting = match stream.next().await {
            Some(Ok(msg)) => msg.to_text().ok().map(str::to_string),
            Some(Err(e)) => return Err(e.into()),
            None => None,
        };
        if let Some(greeting) = &greeting {
            tracing::debug!("Relay greeting: {}", greeting);
        }

        Ok(Self { stream, greeting })
    }

    /// The first frame the relay sent, if it was text.
    pub fn greeting(&self) -> Option<&str> {
        self.greeting.as_deref()
    }

    /// Send one raw payload as a text frame.
    pub async fn send_text(&mut self, payload: &str) -> anyhow::Result<()> {
        self.stream.send(Message::Text(payload.into())).await?;
        Ok(())
    }

    /// Send one raw payload as a binary frame.
    pub async fn send_binary(&mut self, payload: Vec<u8>) -> anyhow::Result<()> {
        self.stream.send(Message::Binary(payload.into())).await?;
        Ok(())
    }

    /// Close the connection, draining frames until the relay confirms.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.stream.close(None).await?;
        while let Some(msg) = self.stream.next().await {
            if msg.is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Connect, send each payload in order, then close.
///
/// Returns the relay's greeting.
pub async fn send_codes(url: &str, payloads: &[String]) -> anyhow::Result<Option<String>> {
    let mut link = SensorLink::connect(url).await?;
    for payload in payloads {
        link.send_text(payload).await?;
        tracing::info!("Sent {:?}", payload);
    }
    let greeting = link.greeting().map(str::to_string);
    link.close().await?;
    Ok(greeting)
}
