use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::types;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, WsMessage>;
type WsSource = SplitStream<WsStream>;

const MAILBOX_CAPACITY: usize = 10;
const PING_INTERVAL: Duration = Duration::from_secs(20);

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session is closed")]
    Closed,
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}

/// One bidirectional conversation bound to a single socket.
///
/// A session owns the socket exclusively. Two background workers run from
/// construction until [`Session::close`]: a reader that decodes inbound
/// frames into a bounded mailbox, and a keep-alive that pings the peer every
/// 20 seconds. Both exit when the shared cancellation token fires; either
/// worker failing fires the token, so neither can outlive the other for
/// long. Dropping the session without closing it also fires the token.
pub struct Session {
    stream_id: String,
    writer: Arc<Mutex<WsSink>>,
    cancel: CancellationToken,
    inbound: Option<mpsc::Receiver<types::Message>>,
    read_handle: Option<JoinHandle<()>>,
    ping_handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("stream_id", &self.stream_id)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Spins up the background workers around an established socket.
    ///
    /// Callers normally obtain a session through [`crate::Client::connect`],
    /// which performs the start/ack exchange on top of this.
    pub fn start(stream_id: impl Into<String>, socket: WsStream) -> Self {
        let (write, read) = socket.split();
        let writer = Arc::new(Mutex::new(write));
        let cancel = CancellationToken::new();
        let (mailbox_tx, mailbox_rx) = mpsc::channel(MAILBOX_CAPACITY);

        let read_handle = tokio::spawn(read_loop(read, mailbox_tx, cancel.clone()));
        let ping_handle = tokio::spawn(ping_loop(writer.clone(), cancel.clone()));

        Self {
            stream_id: stream_id.into(),
            writer,
            cancel,
            inbound: Some(mailbox_rx),
            read_handle: Some(read_handle),
            ping_handle: Some(ping_handle),
        }
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Encodes a message and writes it as a single text frame.
    ///
    /// Callers must not issue overlapping sends on the same session; the
    /// internal lock only keeps caller frames and keep-alive pings from
    /// interleaving.
    pub async fn send(&self, message: &types::Message) -> Result<(), SessionError> {
        if self.cancel.is_cancelled() {
            return Err(SessionError::Closed);
        }

        let payload = types::encode(message)?;
        tracing::debug!(
            "sending message - type: {}, len: {}",
            message.message_type(),
            payload.len()
        );

        let mut writer = self.writer.lock().await;
        writer.send(WsMessage::Text(payload)).await?;
        Ok(())
    }

    /// Hands out the inbound mailbox. Yields `Some` exactly once; the
    /// receiver closes without an error when the reader exits.
    pub fn messages(&mut self) -> Option<mpsc::Receiver<types::Message>> {
        self.inbound.take()
    }

    /// Receives the next inbound message without giving up the mailbox.
    pub(crate) async fn recv(&mut self) -> Option<types::Message> {
        match self.inbound.as_mut() {
            Some(mailbox) => mailbox.recv().await,
            None => None,
        }
    }

    /// Fires the cancellation token, waits for both background workers to
    /// exit, then closes the socket with a normal-closure code.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        self.cancel.cancel();

        if let Some(handle) = self.read_handle.take() {
            if handle.await.is_err() {
                tracing::warn!("read worker terminated abnormally");
            }
        }
        if let Some(handle) = self.ping_handle.take() {
            if handle.await.is_err() {
                tracing::warn!("ping worker terminated abnormally");
            }
        }

        let mut writer = self.writer.lock().await;
        writer
            .send(WsMessage::Close(Some(CloseFrame {
                code: CloseCode::Normal,
                reason: "".into(),
            })))
            .await?;
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Reads frames until cancellation or a transport error, pushing decoded
/// messages into the mailbox. Decode failures are skipped; transport
/// failures are terminal and fire the shared token.
async fn read_loop(
    mut read: WsSource,
    mailbox: mpsc::Sender<types::Message>,
    cancel: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("closing the read worker");
                break;
            }
            frame = read.next() => frame,
        };

        let frame = match frame {
            None => {
                tracing::info!("socket closed by peer");
                break;
            }
            Some(Err(e)) => {
                tracing::error!("error while reading message: {e}");
                break;
            }
            Some(Ok(frame)) => frame,
        };

        match frame {
            WsMessage::Text(text) => {
                let message = match types::decode(&text) {
                    Ok(message) => message,
                    Err(e) => {
                        tracing::warn!("error while decoding message: {e}");
                        continue;
                    }
                };

                tracing::debug!("received message - type: {}", message.message_type());

                // A push under backpressure must still honor cancellation.
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("closing the read worker");
                        break;
                    }
                    sent = mailbox.send(message) => {
                        if sent.is_err() {
                            tracing::debug!("mailbox receiver dropped");
                            break;
                        }
                    }
                }
            }
            WsMessage::Binary(payload) => {
                tracing::warn!("unexpected binary frame ({} bytes)", payload.len());
            }
            WsMessage::Close(reason) => {
                tracing::info!("connection closed: {:?}", reason);
                break;
            }
            // Ping/pong bookkeeping is handled by tungstenite itself.
            _ => {}
        }
    }

    cancel.cancel();
}

/// Pings the peer on a fixed cadence, independent of traffic. A failed ping
/// is logged and the loop carries on.
async fn ping_loop(writer: Arc<Mutex<WsSink>>, cancel: CancellationToken) {
    let start = tokio::time::Instant::now() + PING_INTERVAL;
    let mut ticker = tokio::time::interval_at(start, PING_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("closing the ping worker");
                break;
            }
            _ = ticker.tick() => {
                let ping = async {
                    let mut writer = writer.lock().await;
                    writer.send(WsMessage::Ping(Vec::new())).await
                };
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("closing the ping worker");
                        break;
                    }
                    result = ping => {
                        if let Err(e) = result {
                            tracing::warn!("error while sending ping: {e}");
                        }
                    }
                }
            }
        }
    }

    cancel.cancel();
}
