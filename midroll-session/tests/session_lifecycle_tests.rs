//! Session lifecycle integration tests
//!
//! Covers mount preconditions, the content load/play path, playback error
//! terminality, close-by-key, and teardown idempotency. Ad break behavior
//! has its own suite in ad_break_tests.rs.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::*;
use midroll_common::events::{CloseReason, PlaybackState, SessionEvent, SessionState};
use midroll_common::EventLog;
use midroll_session::engine::sim::SimSurface;
use midroll_session::engine::{ContentEngine, ContentEvent};
use midroll_session::session::SessionController;
use midroll_session::Error;

#[tokio::test]
async fn test_mount_starts_session_and_loads_content() {
    let mut session = mount_test_session().await;

    let started = wait_for_event(&mut session.events, |e| {
        matches!(e, SessionEvent::SessionStarted { .. })
    })
    .await;
    if let SessionEvent::SessionStarted { content_uri, .. } = started {
        assert_eq!(content_uri, TEST_URI);
    }
    wait_for_event(&mut session.events, |e| {
        matches!(e, SessionEvent::ContentLoadStarted { .. })
    })
    .await;

    assert_eq!(session.content.loads(), vec![TEST_URI.to_string()]);
    let status = session.controller.status().await;
    assert_eq!(status.playback_state, PlaybackState::Loading);
    assert_eq!(status.session_state, SessionState::ContentOnly);
    assert_eq!(status.duration_ms, None);
}

#[tokio::test]
async fn test_mount_fails_in_unsupported_environment() {
    let result = SessionController::mount(
        FakeContentEngine::unsupported(),
        None,
        Arc::new(SimSurface::default()),
        Arc::new(EventLog::new(16)),
        test_options(),
    )
    .await;
    assert!(matches!(result, Err(Error::UnsupportedEnvironment(_))));
}

#[tokio::test]
async fn test_mount_rejects_blank_content_uri() {
    let mut options = test_options();
    options.content_uri = "   ".to_string();
    let result = SessionController::mount(
        FakeContentEngine::new(),
        None,
        Arc::new(SimSurface::default()),
        Arc::new(EventLog::new(16)),
        options,
    )
    .await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

#[tokio::test]
async fn test_content_becomes_ready_then_plays() {
    let mut session = mount_test_session().await;

    session.content.emit(ContentEvent::Loaded {
        duration_ms: Some(600_000),
    });
    wait_for_event(&mut session.events, |e| {
        matches!(e, SessionEvent::ContentLoaded { .. })
    })
    .await;
    wait_for_event(&mut session.events, |e| {
        matches!(
            e,
            SessionEvent::PlaybackStateChanged {
                new_state: PlaybackState::Ready,
                ..
            }
        )
    })
    .await;

    session.controller.play().await.unwrap();
    wait_for_event(&mut session.events, |e| {
        matches!(
            e,
            SessionEvent::PlaybackStateChanged {
                new_state: PlaybackState::Playing,
                ..
            }
        )
    })
    .await;

    assert_eq!(session.content.play_count(), 1);
    let status = session.controller.status().await;
    assert_eq!(status.playback_state, PlaybackState::Playing);
    assert_eq!(status.duration_ms, Some(600_000));
    assert!(!status.muted);
}

#[tokio::test]
async fn test_transport_rejected_before_media_is_ready() {
    let session = mount_test_session().await;

    // Still loading: no media to act on
    assert!(matches!(
        session.controller.play().await,
        Err(Error::InvalidState(_))
    ));
    assert!(matches!(
        session.controller.toggle_play().await,
        Err(Error::InvalidState(_))
    ));
    assert_eq!(session.content.play_count(), 0);
}

#[tokio::test]
async fn test_playback_error_is_terminal_until_reload() {
    let mut session = mount_test_session().await;

    session.content.emit(ContentEvent::Error {
        code: 1002,
        message: "manifest parse failure".to_string(),
    });
    let error = wait_for_event(&mut session.events, |e| {
        matches!(e, SessionEvent::PlaybackError { .. })
    })
    .await;
    if let SessionEvent::PlaybackError { code, .. } = error {
        assert_eq!(code, 1002);
    }
    wait_for_event(&mut session.events, |e| {
        matches!(
            e,
            SessionEvent::SessionStateChanged {
                new_state: SessionState::Error,
                ..
            }
        )
    })
    .await;

    // Transport is refused while the load is failed
    assert!(matches!(
        session.controller.play().await,
        Err(Error::ContentLoad(_))
    ));
    assert!(matches!(
        session.controller.seek(1_000).await,
        Err(Error::ContentLoad(_))
    ));

    // Metadata arriving in the error state never reaches the ad gate
    session.content.emit(ContentEvent::Metadata {
        payload: serde_json::json!({"cue": 1}),
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(session.ads.request_count(), 0);

    // An explicit reload recovers
    session
        .controller
        .load("https://example.com/content/retry.m3u8")
        .await
        .unwrap();
    wait_for_event(&mut session.events, |e| {
        matches!(
            e,
            SessionEvent::PlaybackStateChanged {
                new_state: PlaybackState::Loading,
                ..
            }
        )
    })
    .await;
    session.content.emit(ContentEvent::Loaded {
        duration_ms: Some(300_000),
    });
    wait_for_event(&mut session.events, |e| {
        matches!(
            e,
            SessionEvent::PlaybackStateChanged {
                new_state: PlaybackState::Ready,
                ..
            }
        )
    })
    .await;

    assert_eq!(session.content.loads().len(), 2);
    session.controller.play().await.unwrap();
}

#[tokio::test]
async fn test_content_end_reports_ended_state() {
    let mut session = mount_test_session().await;

    session.content.emit(ContentEvent::Loaded {
        duration_ms: Some(10_000),
    });
    wait_for_event(&mut session.events, |e| {
        matches!(
            e,
            SessionEvent::PlaybackStateChanged {
                new_state: PlaybackState::Ready,
                ..
            }
        )
    })
    .await;
    session.controller.play().await.unwrap();

    session.content.emit(ContentEvent::Ended);
    wait_for_event(&mut session.events, |e| {
        matches!(e, SessionEvent::PlaybackEnded { .. })
    })
    .await;

    let status = session.controller.status().await;
    assert_eq!(status.playback_state, PlaybackState::Ended);
    // End of media is not an error condition
    assert_eq!(status.session_state, SessionState::ContentOnly);
}

#[tokio::test(start_paused = true)]
async fn test_progress_events_while_playing() {
    let mut session = mount_test_session().await;

    session.content.emit(ContentEvent::Loaded {
        duration_ms: Some(600_000),
    });
    wait_for_event(&mut session.events, |e| {
        matches!(
            e,
            SessionEvent::PlaybackStateChanged {
                new_state: PlaybackState::Ready,
                ..
            }
        )
    })
    .await;
    session.content.set_position(1_000);
    session.controller.play().await.unwrap();

    let progress = wait_for_event(&mut session.events, |e| {
        matches!(e, SessionEvent::PlaybackProgress { playing: true, .. })
    })
    .await;
    if let SessionEvent::PlaybackProgress {
        position_ms,
        duration_ms,
        ..
    } = progress
    {
        assert_eq!(position_ms, 1_000);
        assert_eq!(duration_ms, Some(600_000));
    }
}

#[tokio::test]
async fn test_close_from_designated_key() {
    let mut session = mount_test_session().await;

    session.content.emit(ContentEvent::Loaded {
        duration_ms: Some(600_000),
    });
    wait_for_event(&mut session.events, |e| {
        matches!(
            e,
            SessionEvent::PlaybackStateChanged {
                new_state: PlaybackState::Ready,
                ..
            }
        )
    })
    .await;
    session.controller.play().await.unwrap();
    wait_for_event(&mut session.events, |e| {
        matches!(
            e,
            SessionEvent::PlaybackStateChanged {
                new_state: PlaybackState::Playing,
                ..
            }
        )
    })
    .await;

    // Unrelated keys are ignored
    assert!(!session.controller.on_key_input("Enter").await);
    assert!(!session.controller.on_key_input("ArrowLeft").await);
    assert!(session.controller.closed().borrow().is_none());

    assert!(session.controller.on_key_input("Escape").await);
    let closed = wait_for_event(&mut session.events, |e| {
        matches!(e, SessionEvent::SessionClosed { .. })
    })
    .await;
    if let SessionEvent::SessionClosed { reason, .. } = closed {
        assert_eq!(reason, CloseReason::UserInput);
    }

    // Content was paused on the way out and the close watch resolved
    assert!(session.content.is_paused());
    assert_eq!(
        *session.controller.closed().borrow(),
        Some(CloseReason::UserInput)
    );

    // A second close key is a no-op
    assert!(session.controller.on_key_input("Back").await);
    assert_eq!(session.content.pause_count(), 1);
}

#[tokio::test]
async fn test_shutdown_is_idempotent_and_destroys_engines() {
    let session = mount_test_session().await;

    session.controller.shutdown().await;
    session.controller.shutdown().await;

    assert_eq!(session.content.destroy_count(), 1);
    assert_eq!(session.ads.loader_destroy_count(), 1);
    assert!(matches!(
        session.controller.play().await,
        Err(Error::InvalidState(_))
    ));
}
