use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use base64::Engine;

use crate::audio::DualChannelRecorder;
use crate::session::Session;
use crate::types::{Media, MediaInputMessage, Message};

/// Trailing silence sent after the question. The protocol has no explicit
/// end-of-turn message; a stretch of silence is the turn-boundary
/// convention.
const SILENCE_CHUNKS: usize = 10;

/// Streams a PCM buffer to the agent in fixed-size chunks, paced to
/// emulate real-time playback, recording each chunk on the user channel.
///
/// Chunks go out strictly in buffer order; the final chunk may be shorter.
/// After the buffer is exhausted, ten full-size silence chunks follow to
/// mark the end of the turn.
pub async fn stream_buffer(
    session: &Session,
    audio: &[u8],
    chunk_size: usize,
    recorder: &Arc<Mutex<DualChannelRecorder>>,
    pace: Duration,
) -> anyhow::Result<()> {
    anyhow::ensure!(chunk_size > 0, "chunk size must be positive");

    for chunk in audio.chunks(chunk_size) {
        send_chunk(session, chunk, recorder)
            .await
            .context("failed to send audio chunk")?;
        tokio::time::sleep(pace).await;
    }

    let silence = vec![0u8; chunk_size];
    for _ in 0..SILENCE_CHUNKS {
        send_chunk(session, &silence, recorder)
            .await
            .context("failed to send silence chunk")?;
        tokio::time::sleep(pace).await;
    }

    Ok(())
}

async fn send_chunk(
    session: &Session,
    chunk: &[u8],
    recorder: &Arc<Mutex<DualChannelRecorder>>,
) -> anyhow::Result<()> {
    match recorder.lock() {
        Ok(mut recorder) => recorder.write_left(chunk)?,
        Err(_) => tracing::error!("recorder lock poisoned"),
    }

    let message = Message::MediaInput(MediaInputMessage {
        stream_id: session.stream_id().to_string(),
        media: Media {
            payload: base64::engine::general_purpose::STANDARD.encode(chunk),
        },
    });
    session.send(&message).await?;
    Ok(())
}
