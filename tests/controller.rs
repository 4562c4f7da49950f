mod support;

use std::path::Path;
use std::time::{Duration, Instant};

use agent_client::{
    BackoffPolicy, ConnectionState, ControllerConfig, ControllerError, ConversationController,
    SessionIdentity, SocketConfig, TranscriptEntry,
};
use agent_socket::{OutboundFrame, CLEAN_CLOSE_CODE};
use tokio::sync::mpsc::UnboundedReceiver;
use transcript_store::ToolStatus;

use support::{FakePeer, FakeTransport};

fn controller_at(dir: &Path) -> (ConversationController, UnboundedReceiver<FakePeer>) {
    let (transport, peers) = FakeTransport::channel();
    let socket = SocketConfig::new("https://agent.example.com")
        .with_token("tok")
        .with_backoff(BackoffPolicy::default().without_jitter());
    let config = ControllerConfig::new(
        socket,
        "https://agent.example.com/stream",
        SessionIdentity::new("local-1", "proj"),
        dir,
    );
    let controller = ConversationController::with_transport(config, transport)
        .expect("controller should initialize");
    (controller, peers)
}

/// Gives spawned tasks a chance to process pending channel traffic.
async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn stream_turn_folds_events_and_closes_on_eof() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let (mut controller, _peers) = controller_at(dir.path());

    let body = concat!(
        "data: {\"type\":\"content_delta\",\"text\":\"Sure, \"}\n\n",
        "data: {\"type\":\"content_delta\",\"text\":\"one moment.\"}\n\n",
        "data: {\"type\":\"tool_start\",\"name\":\"bash\"}\n\n",
        "data: {\"type\":\"tool_end\",\"name\":\"bash\",\"status\":\"success\"}\n\n",
    );
    let chunks = futures_util::stream::iter(vec![Ok::<_, String>(body.as_bytes())]);
    controller
        .stream_turn_from_chunks("run the build", chunks)
        .await
        .expect("stream turn should complete");

    let entries = controller.transcript().entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(
        entries[0],
        TranscriptEntry::User {
            text: "run the build".to_string()
        }
    );
    // No explicit terminal record: EOF still closes the streaming entry.
    assert_eq!(
        entries[1],
        TranscriptEntry::Assistant {
            text: "Sure, one moment.".to_string(),
            streaming: false,
        }
    );
    assert!(matches!(
        &entries[2],
        TranscriptEntry::Tool {
            name,
            status: ToolStatus::Success,
            ..
        } if name == "bash"
    ));
}

#[tokio::test(start_paused = true)]
async fn chunk_boundaries_do_not_change_the_transcript() {
    let body = concat!(
        "data: {\"type\":\"content_delta\",\"text\":\"alpha\"}\n\n",
        "data: {\"type\":\"tool_start\",\"name\":\"read\"}\n\n",
        "data: {\"type\":\"tool_end\",\"name\":\"read\",\"status\":\"failed\"}\n\n",
        "data: {\"type\":\"done\"}\n\n",
    );

    let whole_dir = tempfile::tempdir().expect("tempdir should be created");
    let (mut whole, _peers_a) = controller_at(whole_dir.path());
    whole
        .stream_turn_from_chunks(
            "turn",
            futures_util::stream::iter(vec![Ok::<_, String>(body.as_bytes())]),
        )
        .await
        .expect("single-chunk stream should complete");

    let split_dir = tempfile::tempdir().expect("tempdir should be created");
    let (mut split, _peers_b) = controller_at(split_dir.path());
    let byte_chunks: Vec<Result<&[u8], String>> = body.as_bytes().chunks(1).map(Ok).collect();
    split
        .stream_turn_from_chunks("turn", futures_util::stream::iter(byte_chunks))
        .await
        .expect("byte-by-byte stream should complete");

    assert_eq!(whole.transcript(), split.transcript());
}

#[tokio::test(start_paused = true)]
async fn socket_frames_fold_and_adopt_the_server_session_id() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let (mut controller, mut peers) = controller_at(dir.path());

    let peer = peers.recv().await.expect("socket should connect");
    peer.push_text(r#"{"type":"content_delta","sessionId":"srv-123","text":"hello"}"#);
    settle().await;

    controller
        .pump_socket(Instant::now())
        .expect("pump should fold the frame");

    assert_eq!(controller.connection_state(), ConnectionState::Connected);
    assert_eq!(controller.store().identity().durable_id(), "srv-123");
    // The identity handover persists under the new key while the legacy key
    // stays addressable.
    assert!(dir.path().join("srv-123.json").exists());
    assert!(dir.path().join("proj.json").exists());

    let entries = controller.transcript().entries();
    assert_eq!(
        entries,
        [TranscriptEntry::Assistant {
            text: "hello".to_string(),
            streaming: true,
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn send_turn_records_the_user_entry_and_sends_the_envelope() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let (mut controller, mut peers) = controller_at(dir.path());
    let mut peer = peers.recv().await.expect("socket should connect");

    controller
        .send_turn("hello there")
        .expect("send turn should be accepted");

    let raw = match peer.next_frame().await {
        OutboundFrame::Text(raw) => raw,
        other => panic!("expected the turn envelope, got {other:?}"),
    };
    let envelope: serde_json::Value =
        serde_json::from_str(&raw).expect("turn envelope should be valid json");
    assert_eq!(envelope["type"], "message");
    assert_eq!(envelope["text"], "hello there");
    assert_eq!(envelope["sessionId"], "local-1");

    assert_eq!(
        controller.transcript().entries(),
        [TranscriptEntry::User {
            text: "hello there".to_string()
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_persists_immediately_and_closes_the_socket() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let (mut controller, mut peers) = controller_at(dir.path());
    let mut peer = peers.recv().await.expect("socket should connect");

    controller
        .send_turn("note this")
        .expect("send turn should be accepted");
    controller.shutdown().expect("shutdown should persist");

    let raw = std::fs::read_to_string(dir.path().join("local-1.json"))
        .expect("shutdown should write the durable snapshot");
    let snapshot: serde_json::Value =
        serde_json::from_str(&raw).expect("snapshot should be valid json");
    assert_eq!(snapshot["session_id"], "local-1");
    assert_eq!(
        snapshot["entries"]
            .as_array()
            .expect("snapshot entries should be an array")
            .len(),
        1
    );
    assert!(dir.path().join("proj.json").exists());

    // First the turn envelope, then the clean close.
    assert!(matches!(peer.next_frame().await, OutboundFrame::Text(_)));
    assert_eq!(
        peer.next_frame().await,
        OutboundFrame::Close(CLEAN_CLOSE_CODE)
    );
}

#[tokio::test(start_paused = true)]
async fn persistence_waits_out_the_debounce_quiet_period() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let (mut controller, _peers) = controller_at(dir.path());

    let before = Instant::now();
    controller
        .send_turn("draft")
        .expect("send turn should be accepted");

    assert!(!controller
        .flush_due(before)
        .expect("early flush poll should succeed"));
    assert!(!dir.path().join("local-1.json").exists());

    let due = Instant::now() + Duration::from_millis(600);
    assert!(controller.flush_due(due).expect("due flush should write"));
    assert!(dir.path().join("local-1.json").exists());
    assert!(controller.next_flush().is_none());
}

#[tokio::test(start_paused = true)]
async fn mid_stream_failure_keeps_already_decoded_events() {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let (mut controller, _peers) = controller_at(dir.path());

    let chunks = futures_util::stream::iter(vec![
        Ok(b"data: {\"type\":\"content_delta\",\"text\":\"partial answer\"}\n\n" as &[u8]),
        Err("connection reset".to_string()),
    ]);
    let error = controller
        .stream_turn_from_chunks("hi", chunks)
        .await
        .expect_err("mid-stream failure should surface");
    assert!(matches!(error, ControllerError::Stream(_)));

    let entries = controller.transcript().entries();
    assert_eq!(
        entries,
        [
            TranscriptEntry::User {
                text: "hi".to_string()
            },
            TranscriptEntry::Assistant {
                text: "partial answer".to_string(),
                streaming: false,
            },
        ]
    );
}
