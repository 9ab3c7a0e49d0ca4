//! End-to-end tests: HTTP intake -> dispatch loop -> network session
//!
//! Run with: cargo test -p integration-tests --test informant_tests

use std::time::Duration;

use informant_common::AppError;
use informant_core::events::InviteEvent;
use informant_core::testing::{RecordingSession, SessionCall};
use informant_core::{MediaKind, RoomId, SessionEvent};
use integration_tests::*;
use reqwest::StatusCode;

fn send_text(room: &str, text: &str) -> SessionCall {
    SessionCall::SendText {
        room_id: room.to_string(),
        text: text.to_string(),
    }
}

// ============================================================================
// Relay
// ============================================================================

#[tokio::test]
async fn test_text_submission_is_relayed() {
    let informant = TestInformant::start().await.unwrap();

    let response = informant
        .post(&text_submission(TEST_ROOM, "hello", TEST_PSK))
        .await
        .unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    assert!(informant.session.wait_for_deliveries(1, WAIT).await);
    assert_eq!(
        informant.session.delivery_calls(),
        vec![send_text(TEST_ROOM, "hello")]
    );
}

#[tokio::test]
async fn test_wrong_psk_makes_no_network_call() {
    let informant = TestInformant::start().await.unwrap();

    informant
        .post(&text_submission(TEST_ROOM, "intruder", "not-the-secret"))
        .await
        .unwrap();
    // Processed strictly after the rejected one
    informant
        .post(&text_submission(TEST_ROOM, "marker", TEST_PSK))
        .await
        .unwrap();

    assert!(informant.session.wait_for_deliveries(1, WAIT).await);
    assert_eq!(
        informant.session.delivery_calls(),
        vec![send_text(TEST_ROOM, "marker")]
    );
}

#[tokio::test]
async fn test_media_submission_uploads_then_sends() {
    let informant = TestInformant::start().await.unwrap();
    let body = media_submission(
        TEST_ROOM,
        "build finished",
        &png_bytes(),
        "image/png",
        "coverage.png",
        TEST_PSK,
    );

    informant.post(&body).await.unwrap();

    assert!(informant.session.wait_for_deliveries(3, WAIT).await);
    let calls = informant.session.delivery_calls();
    assert_eq!(
        calls[0],
        SessionCall::Upload {
            content_type: "image/png".to_string(),
            len: png_bytes().len()
        }
    );
    match &calls[1] {
        SessionCall::SendMedia { room_id, media } => {
            assert_eq!(room_id, TEST_ROOM);
            assert_eq!(media.caption, "coverage.png");
            assert_eq!(media.kind, MediaKind::Image);
            assert_eq!(media.size, png_bytes().len());
        }
        other => panic!("expected media send, got {other:?}"),
    }
    assert_eq!(calls[2], send_text(TEST_ROOM, "build finished"));
}

#[tokio::test]
async fn test_upload_failure_still_sends_text() {
    let session = RecordingSession::shared(TEST_USER);
    session.fail_uploads(true);
    let informant = TestInformant::start_with(test_config().unwrap(), session)
        .await
        .unwrap();

    informant
        .post(&media_submission(
            TEST_ROOM,
            "text survives",
            &png_bytes(),
            "image/png",
            "",
            TEST_PSK,
        ))
        .await
        .unwrap();

    assert!(informant.session.wait_for_deliveries(2, WAIT).await);
    let calls = informant.session.delivery_calls();
    assert!(matches!(calls[0], SessionCall::Upload { .. }));
    assert_eq!(calls[1], send_text(TEST_ROOM, "text survives"));
}

#[tokio::test]
async fn test_malformed_json_is_ignored() {
    let informant = TestInformant::start().await.unwrap();

    let response = informant.post_raw("/", "{\"Channel\": ").await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    informant
        .post(&text_submission(TEST_ROOM, "after", TEST_PSK))
        .await
        .unwrap();

    assert!(informant.session.wait_for_deliveries(1, WAIT).await);
    assert_eq!(
        informant.session.delivery_calls(),
        vec![send_text(TEST_ROOM, "after")]
    );
}

#[tokio::test]
async fn test_submissions_are_fifo() {
    let informant = TestInformant::start().await.unwrap();

    for text in ["A", "B", "C"] {
        informant
            .post(&text_submission(TEST_ROOM, text, TEST_PSK))
            .await
            .unwrap();
    }

    assert!(informant.session.wait_for_deliveries(3, WAIT).await);
    assert_eq!(
        informant.session.delivery_calls(),
        vec![
            send_text(TEST_ROOM, "A"),
            send_text(TEST_ROOM, "B"),
            send_text(TEST_ROOM, "C"),
        ]
    );
}

// ============================================================================
// Session events and profile
// ============================================================================

#[tokio::test]
async fn test_invite_is_joined() {
    let informant = TestInformant::start().await.unwrap();

    informant
        .session
        .emit(SessionEvent::MemberInvited(InviteEvent {
            room_id: RoomId::from("!ops:example.org"),
            inviter: "@alice:example.org".to_string(),
            invitee: TEST_USER.to_string(),
        }))
        .await;

    let joins: Vec<_> = informant
        .session
        .calls()
        .into_iter()
        .filter(|c| matches!(c, SessionCall::JoinRoom { .. }))
        .collect();
    assert_eq!(
        joins,
        vec![SessionCall::JoinRoom {
            room_id: "!ops:example.org".to_string()
        }]
    );
}

#[tokio::test]
async fn test_display_name_is_applied() {
    let config = config_from_yaml(&format!(
        r"
homeserver: https://matrix.test
username: informant
password: password
display: Build Bot
psk: {TEST_PSK}
"
    ))
    .unwrap();
    let informant = TestInformant::start_with(config, RecordingSession::shared(TEST_USER))
        .await
        .unwrap();

    let applied = informant
        .session
        .wait_for(1, WAIT, |c| matches!(c, SessionCall::SetDisplayName { .. }))
        .await;
    assert!(applied);
    assert!(informant.session.calls().contains(&SessionCall::SetDisplayName {
        name: "Build Bot".to_string()
    }));
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_shutdown_while_idle() {
    let mut informant = TestInformant::start().await.unwrap();

    informant.shutdown().await.unwrap().unwrap();

    let calls = informant.session.calls();
    let stopped = calls.iter().position(|c| *c == SessionCall::SyncStopped);
    let closed = calls.iter().position(|c| *c == SessionCall::Close);
    assert!(stopped.is_some());
    assert!(stopped < closed);
    assert!(informant.session.is_closed());
    assert!(informant.session.delivery_calls().is_empty());

    // The intake is gone with the lifecycle
    assert!(informant
        .post(&text_submission(TEST_ROOM, "late", TEST_PSK))
        .await
        .is_err());
}

#[tokio::test]
async fn test_shutdown_mid_delivery_sends_before_sync_stops() {
    let session = RecordingSession::shared(TEST_USER);
    session.delay_uploads(Duration::from_millis(300));
    let mut informant = TestInformant::start_with(test_config().unwrap(), session)
        .await
        .unwrap();

    informant
        .post(&media_submission(
            TEST_ROOM,
            "in flight",
            &png_bytes(),
            "image/png",
            "",
            TEST_PSK,
        ))
        .await
        .unwrap();
    assert!(informant.session.wait_for_deliveries(1, WAIT).await);

    // Signal arrives while the upload is still running
    informant.shutdown().await.unwrap().unwrap();

    let calls = informant.session.calls();
    let stopped = calls
        .iter()
        .position(|c| *c == SessionCall::SyncStopped)
        .unwrap();
    let sends_after_stop = calls[stopped..]
        .iter()
        .filter(|c| c.is_delivery())
        .count();
    assert_eq!(sends_after_stop, 0);
    assert_eq!(informant.session.delivery_calls().len(), 3);
    assert_eq!(calls.last(), Some(&SessionCall::Close));
}

#[tokio::test]
async fn test_sync_failure_shuts_down() {
    let session = RecordingSession::shared(TEST_USER);
    session.fail_sync(true);
    let mut informant = TestInformant::start_with(test_config().unwrap(), session)
        .await
        .unwrap();

    let result = informant.finished().await.unwrap();

    assert!(matches!(result, Err(AppError::Sync(_))));
    assert!(informant.session.is_closed());
}

#[tokio::test]
async fn test_bind_failure_is_fatal() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = taken.local_addr().unwrap();
    let config = config_from_yaml(&format!(
        r"
bind: {addr}
homeserver: https://matrix.test
username: informant
password: password
"
    ))
    .unwrap();
    let session = RecordingSession::shared(TEST_USER);

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        informant_api::serve(&config, session.clone(), tokio_util::sync::CancellationToken::new()),
    )
    .await
    .unwrap();

    assert!(matches!(result, Err(AppError::Bind { .. })));
    assert!(session.calls().is_empty());
}

#[tokio::test]
async fn test_bind_accepts_hostname() {
    let config = config_from_yaml(
        r"
bind: localhost:0
homeserver: https://matrix.test
username: informant
password: password
",
    )
    .unwrap();
    let session = RecordingSession::shared(TEST_USER);
    let shutdown = tokio_util::sync::CancellationToken::new();
    shutdown.cancel();

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        informant_api::serve(&config, session.clone(), shutdown),
    )
    .await
    .unwrap();

    assert!(result.is_ok());
    assert!(session.is_closed());
}
