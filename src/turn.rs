use std::sync::{Arc, Mutex};

use base64::Engine;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant, MissedTickBehavior};

use crate::audio::DualChannelRecorder;
use crate::types::Message;

/// How a finished conversation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The agent answered the question and went quiet.
    Completed,
    /// The agent never resumed speaking after the question.
    TimedOut,
}

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("message channel closed")]
    InboundClosed,
    #[error("failed to record agent audio: {0}")]
    Record(#[from] hound::Error),
}

/// Timing knobs for the turn-taking policy.
#[derive(Debug, Clone, Copy)]
pub struct TurnConfig {
    /// Silence gap that ends a speaking turn.
    pub silence_threshold: Duration,
    /// How long to wait for the agent to start answering.
    pub response_timeout: Duration,
    /// Cadence at which elapsed-silence conditions are re-evaluated.
    pub poll_interval: Duration,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            silence_threshold: Duration::from_secs(2),
            response_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Infers conversational turn boundaries from silence gaps in the agent's
/// audio stream.
///
/// The watcher is the sole consumer of the session mailbox and the sole
/// owner of its turn state. It signals `send_question` exactly once, when
/// the agent's opening greeting has been followed by enough silence; the
/// caller streams the question, then fires `question_complete`, after which
/// the watcher waits for the agent's answer to arrive and trail off.
pub struct TurnWatcher {
    inbound: mpsc::Receiver<Message>,
    recorder: Arc<Mutex<DualChannelRecorder>>,
    send_question: Option<oneshot::Sender<()>>,
    question_complete: oneshot::Receiver<()>,
    config: TurnConfig,
}

impl TurnWatcher {
    pub fn new(
        inbound: mpsc::Receiver<Message>,
        recorder: Arc<Mutex<DualChannelRecorder>>,
        send_question: oneshot::Sender<()>,
        question_complete: oneshot::Receiver<()>,
        config: TurnConfig,
    ) -> Self {
        Self {
            inbound,
            recorder,
            send_question: Some(send_question),
            question_complete,
            config,
        }
    }

    /// Runs the event loop to one of its terminal outcomes.
    ///
    /// Callers that need an overall deadline should wrap this future in
    /// [`tokio::time::timeout`].
    pub async fn run(self) -> Result<TurnOutcome, TurnError> {
        let TurnWatcher {
            mut inbound,
            recorder,
            mut send_question,
            mut question_complete,
            config,
        } = self;

        let mut greeting_complete = false;
        let mut question_sent = false;
        let mut agent_speaking = false;
        let mut last_audio = Instant::now();

        let mut ticker = tokio::time::interval(config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                message = inbound.recv() => {
                    let Some(message) = message else {
                        return Err(TurnError::InboundClosed);
                    };
                    match message {
                        Message::MediaOutput(output) => {
                            let audio = match base64::engine::general_purpose::STANDARD
                                .decode(&output.media.payload)
                            {
                                Ok(audio) => audio,
                                Err(e) => {
                                    tracing::warn!("failed to decode agent audio: {e}");
                                    continue;
                                }
                            };
                            if !audio.is_empty() {
                                match recorder.lock() {
                                    Ok(mut recorder) => recorder.write_right(&audio)?,
                                    Err(_) => tracing::error!("recorder lock poisoned"),
                                }
                                agent_speaking = true;
                                last_audio = Instant::now();
                            }
                        }
                        // A clear only flushes the agent's buffer; the
                        // conversation continues.
                        Message::Clear(_) => {
                            tracing::info!("clear event received");
                        }
                        other => {
                            tracing::debug!("ignoring message - type: {}", other.message_type());
                        }
                    }
                }
                // Sender drop counts as the signal, matching a closed
                // channel's semantics.
                _ = &mut question_complete, if !question_sent => {
                    tracing::info!("question sent, waiting for response");
                    question_sent = true;
                    agent_speaking = false;
                    last_audio = Instant::now();
                }
                _ = ticker.tick() => {
                    let elapsed = last_audio.elapsed();

                    // Initial greeting complete: the agent spoke and has now
                    // been quiet past the threshold.
                    if agent_speaking && !greeting_complete && elapsed > config.silence_threshold {
                        tracing::info!("greeting complete");
                        greeting_complete = true;
                        if let Some(signal) = send_question.take() {
                            if signal.send(()).is_err() {
                                tracing::warn!("greeting listener dropped");
                            }
                        }
                        agent_speaking = false;
                    }

                    // Response complete: same silence rule, after the question.
                    if greeting_complete && question_sent && agent_speaking
                        && elapsed > config.silence_threshold
                    {
                        tracing::info!("response complete");
                        return Ok(TurnOutcome::Completed);
                    }

                    // The agent never started answering.
                    if greeting_complete && question_sent && !agent_speaking
                        && elapsed > config.response_timeout
                    {
                        tracing::warn!("no response after {:?}", config.response_timeout);
                        return Ok(TurnOutcome::TimedOut);
                    }
                }
            }
        }
    }
}
