use std::sync::{Arc, Mutex};
use std::time::Duration;

use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;

use cartesia_agents::audio::DualChannelRecorder;
use cartesia_agents::types::{decode, ClearMessage, Message};
use cartesia_agents::{outbound, Session, SessionError};

async fn connect_pair() -> (Session, WebSocketStream<TcpStream>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accept = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio_tungstenite::accept_async(stream).await.unwrap()
    });
    let (socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .unwrap();
    (Session::start("stream-1", socket), accept.await.unwrap())
}

fn media_output_frame(payload: &str) -> WsMessage {
    WsMessage::Text(format!(
        r#"{{"event":"media_output","stream_id":"stream-1","media":{{"payload":"{payload}"}}}}"#
    ))
}

#[tokio::test]
async fn mailbox_preserves_wire_order_and_skips_unknown_frames() {
    let (mut session, mut server) = connect_pair().await;

    // More frames than the mailbox holds, so the reader also sees
    // backpressure; an unknown frame sits in the middle.
    for i in 0..8 {
        server.send(media_output_frame(&format!("p{i}"))).await.unwrap();
    }
    server
        .send(WsMessage::Text(
            r#"{"event":"transcript","stream_id":"stream-1"}"#.to_string(),
        ))
        .await
        .unwrap();
    for i in 8..15 {
        server.send(media_output_frame(&format!("p{i}"))).await.unwrap();
    }

    let mut inbound = session.messages().expect("mailbox already taken");
    for i in 0..15 {
        let message = inbound.recv().await.unwrap();
        let Message::MediaOutput(output) = message else {
            panic!("expected media_output, got {message:?}");
        };
        assert_eq!(output.media.payload, format!("p{i}"));
    }

    session.close().await.unwrap();
}

#[tokio::test]
async fn close_joins_background_loops_and_closes_the_socket() {
    let (mut session, mut server) = connect_pair().await;
    let mut inbound = session.messages().unwrap();

    session.close().await.unwrap();

    // The reader has exited, so the mailbox ends without an error.
    assert!(inbound.recv().await.is_none());

    // The server observes the close frame.
    loop {
        match server.next().await {
            Some(Ok(WsMessage::Close(_))) | None => break,
            Some(Ok(_)) => continue,
            Some(Err(_)) => break,
        }
    }

    // Sends after close fail.
    let message = Message::Clear(ClearMessage {
        stream_id: session.stream_id().to_string(),
    });
    assert!(matches!(
        session.send(&message).await,
        Err(SessionError::Closed)
    ));
}

#[tokio::test]
async fn peer_disconnect_shuts_down_the_session() {
    let (mut session, server) = connect_pair().await;
    let mut inbound = session.messages().unwrap();

    drop(server);

    // The reader exits on the transport error and fires the shared
    // cancellation, which the send path observes.
    assert!(inbound.recv().await.is_none());
    let message = Message::Clear(ClearMessage {
        stream_id: session.stream_id().to_string(),
    });
    assert!(matches!(
        session.send(&message).await,
        Err(SessionError::Closed)
    ));

    let _ = session.close().await;
}

#[tokio::test]
async fn streams_chunks_in_order_with_trailing_silence() {
    let (mut session, mut server) = connect_pair().await;

    let reader = tokio::spawn(async move {
        let mut received = Vec::new();
        while let Some(frame) = server.next().await {
            if let WsMessage::Text(text) = frame.unwrap() {
                let message = decode(&text).unwrap();
                let Message::MediaInput(input) = message else {
                    panic!("expected media_input, got {message:?}");
                };
                received.push(
                    base64::engine::general_purpose::STANDARD
                        .decode(input.media.payload)
                        .unwrap(),
                );
                if received.len() == 22 {
                    break;
                }
            }
        }
        received
    });

    let dir = tempfile::tempdir().unwrap();
    let recorder = Arc::new(Mutex::new(
        DualChannelRecorder::create(dir.path().join("conversation.wav"), 44_100).unwrap(),
    ));
    let audio: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();

    outbound::stream_buffer(&session, &audio, 8820, &recorder, Duration::ZERO)
        .await
        .unwrap();

    let received = reader.await.unwrap();
    assert_eq!(received.len(), 22);

    // 11 full chunks, one 1880-byte tail, in buffer order.
    assert!(received[..11].iter().all(|chunk| chunk.len() == 8820));
    assert_eq!(received[11].len(), 1880);
    assert_eq!(received[..12].concat(), audio);

    // Ten full-size silence chunks mark the end of the turn.
    assert!(received[12..]
        .iter()
        .all(|chunk| chunk.len() == 8820 && chunk.iter().all(|byte| *byte == 0)));

    // The user channel recorded the question and the silence tail.
    recorder.lock().unwrap().finalize().unwrap();
    let reader = hound::WavReader::open(dir.path().join("conversation.wav")).unwrap();
    assert_eq!(reader.len(), (50_000 + 44_100) * 2);

    // The server side already hung up; a close failure is acceptable here.
    let _ = session.close().await;
}
