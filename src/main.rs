use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::fmt::time::ChronoLocal;

use cartesia_agents::audio::{read_pcm, DualChannelRecorder};
use cartesia_agents::types::Metadata;
use cartesia_agents::{outbound, Client, Config, Session, TurnConfig, TurnOutcome, TurnWatcher};

/// 0.1 seconds of 16-bit audio at 44.1 kHz.
const DEFAULT_CHUNK_SIZE: usize = 8820;
/// Delay between chunk sends, emulating real-time playback.
const CHUNK_PACE: Duration = Duration::from_millis(10);
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const CONVERSATION_DEADLINE: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(about = "Ask a conversational agent a recorded question and capture the exchange")]
struct Cli {
    /// Agent to converse with.
    #[arg(long, env = "CARTESIA_AGENT_ID")]
    agent_id: String,

    /// API key for the agent service.
    #[arg(long, env = "CARTESIA_API_KEY", hide_env_values = true)]
    api_key: String,

    /// WAV file holding the question to ask.
    #[arg(long, default_value = "question.wav")]
    input: PathBuf,

    /// Where to write the two-channel conversation recording.
    #[arg(long, default_value = "conversation_output.wav")]
    output: PathBuf,

    /// Outbound chunk size in bytes.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    let args = Cli::parse();

    tracing::info!(
        "starting agent conversation - input: {}, output: {}",
        args.input.display(),
        args.output.display()
    );

    let config = Config::builder().with_api_key(&args.api_key).build();
    let client = Client::new(config);

    run_conversation(&client, &args).await?;

    tracing::info!("conversation finished - audio saved: {}", args.output.display());
    Ok(())
}

/// Establishes the session and recorder, runs the exchange under the
/// overall deadline, and hangs up and finalizes the recording no matter
/// how the exchange ended.
async fn run_conversation(client: &Client, args: &Cli) -> Result<()> {
    let mut session = client
        .connect(&args.agent_id, Metadata::new(), HANDSHAKE_TIMEOUT)
        .await
        .context("failed to establish session")?;

    let sample_rate = client.config().input_format().sample_rate();
    let recorder = match DualChannelRecorder::create(&args.output, sample_rate) {
        Ok(recorder) => Arc::new(Mutex::new(recorder)),
        Err(e) => {
            close_session(&mut session).await;
            return Err(e).context("failed to create recorder");
        }
    };

    let result = tokio::time::timeout(
        CONVERSATION_DEADLINE,
        drive_exchange(&mut session, &recorder, args),
    )
    .await
    .context("conversation deadline exceeded")
    .and_then(|result| result);

    close_session(&mut session).await;
    let finalized = finalize_recorder(&recorder);

    result.and(finalized)
}

/// Drives one full exchange: greeting, question, response.
async fn drive_exchange(
    session: &mut Session,
    recorder: &Arc<Mutex<DualChannelRecorder>>,
    args: &Cli,
) -> Result<()> {
    let inbound = session.messages().context("inbound stream already taken")?;
    let (send_question_tx, send_question_rx) = tokio::sync::oneshot::channel();
    let (question_complete_tx, question_complete_rx) = tokio::sync::oneshot::channel();

    let watcher = TurnWatcher::new(
        inbound,
        recorder.clone(),
        send_question_tx,
        question_complete_rx,
        TurnConfig::default(),
    );
    let mut watcher_handle = tokio::spawn(watcher.run());

    // Let the agent finish its greeting before speaking.
    let outcome = tokio::select! {
        ready = send_question_rx => {
            if ready.is_ok() {
                tracing::info!("sending question");
                let streamed = stream_question(session, recorder, args).await;
                if let Err(e) = streamed {
                    watcher_handle.abort();
                    let _ = watcher_handle.await;
                    return Err(e);
                }
                let _ = question_complete_tx.send(());
            }
            // On a dropped signal the watcher ended before the greeting
            // finished; its result carries the reason.
            watcher_handle.await.context("turn watcher panicked")??
        }
        result = &mut watcher_handle => result.context("turn watcher panicked")??,
    };

    match outcome {
        TurnOutcome::Completed => tracing::info!("conversation completed"),
        TurnOutcome::TimedOut => tracing::warn!("conversation ended without a response"),
    }

    Ok(())
}

async fn stream_question(
    session: &Session,
    recorder: &Arc<Mutex<DualChannelRecorder>>,
    args: &Cli,
) -> Result<()> {
    let audio = read_pcm(&args.input).context("failed to read question audio")?;
    outbound::stream_buffer(session, &audio, args.chunk_size, recorder, CHUNK_PACE)
        .await
        .context("failed to send audio")
}

async fn close_session(session: &mut Session) {
    if let Err(e) = session.close().await {
        tracing::warn!("failed to close session: {e}");
    }
}

fn finalize_recorder(recorder: &Arc<Mutex<DualChannelRecorder>>) -> Result<()> {
    recorder
        .lock()
        .map_err(|_| anyhow::anyhow!("recorder lock poisoned"))?
        .finalize()
        .context("failed to finalize recording")
}
