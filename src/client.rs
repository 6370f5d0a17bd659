use std::time::Duration;

use uuid::Uuid;

use crate::session::{Session, SessionError};
use crate::types;
use crate::types::{Message, StartMessage, StreamConfig};

mod config;
mod consts;
mod utils;

pub use config::{Config, ConfigBuilder};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("failed to connect: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("expected ack message, but got {0}")]
    UnexpectedMessage(types::MessageType),
    #[error("session closed before the handshake completed")]
    NoAck,
    #[error("handshake timed out")]
    HandshakeTimeout,
}

/// Connects to the agent stream endpoint and performs the start/ack
/// handshake, yielding a ready [`Session`].
pub struct Client {
    config: Config,
}

impl Client {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Establishes a session with the given agent.
    ///
    /// Opens the socket, sends a start descriptor with a fresh stream id,
    /// and waits up to `handshake_timeout` for the first inbound message,
    /// which must be an ack. On any failure the session is closed before
    /// the error is returned, so no background workers are left running.
    pub async fn connect(
        &self,
        agent_id: &str,
        metadata: types::Metadata,
        handshake_timeout: Duration,
    ) -> Result<Session, ClientError> {
        let request = utils::build_request(&self.config, agent_id)?;
        let (socket, _) = tokio_tungstenite::connect_async(request).await?;

        let stream_id = Uuid::new_v4().to_string();
        let mut session = Session::start(stream_id.clone(), socket);

        let start = Message::Start(StartMessage {
            stream_id: stream_id.clone(),
            config: StreamConfig {
                input_format: self.config.input_format(),
            },
            metadata,
        });

        if let Err(e) = session.send(&start).await {
            close_quietly(&mut session).await;
            return Err(e.into());
        }

        match tokio::time::timeout(handshake_timeout, session.recv()).await {
            Ok(Some(Message::Ack(ack))) => {
                // The server's echo is informational; a mismatch is logged
                // rather than treated as fatal.
                if ack.stream_id != stream_id || ack.config.input_format != self.config.input_format()
                {
                    tracing::warn!(
                        "ack does not echo the negotiated parameters - stream_id: {}, input_format: {}",
                        ack.stream_id,
                        ack.config.input_format
                    );
                }
                tracing::info!(
                    "handshake successful - stream_id: {}, input_format: {}",
                    ack.stream_id,
                    ack.config.input_format
                );
                Ok(session)
            }
            Ok(Some(other)) => {
                let got = other.message_type();
                close_quietly(&mut session).await;
                Err(ClientError::UnexpectedMessage(got))
            }
            Ok(None) => {
                close_quietly(&mut session).await;
                Err(ClientError::NoAck)
            }
            Err(_) => {
                close_quietly(&mut session).await;
                Err(ClientError::HandshakeTimeout)
            }
        }
    }
}

async fn close_quietly(session: &mut Session) {
    if let Err(e) = session.close().await {
        tracing::warn!("failed to close session: {e}");
    }
}
