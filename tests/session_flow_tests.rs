use courtside_live_lib::{
    BroadcastConfig, BroadcastError, BroadcastSession, DestinationInput, EngineCall, EngineOp,
    ExitAction, LifecycleEvent, NavigationTargets, SessionEvent, SessionMode, SimulatedEngine,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;

/// Scenario tests for the broadcast lifecycle, driven on paused time
#[cfg(test)]
mod session_flow_tests {
    use super::*;

    const URL: &str = "rtmps://x/y/KEY";

    fn create_test_session() -> (BroadcastSession, Arc<SimulatedEngine>) {
        let engine = Arc::new(SimulatedEngine::new());
        let session = BroadcastSession::builder(engine.clone())
            .config(BroadcastConfig::default())
            .navigation(NavigationTargets {
                tournament_id: Some("spring-open".into()),
                ..Default::default()
            })
            .build()
            .expect("Failed to create test session");
        (session, engine)
    }

    async fn mounted_session() -> (BroadcastSession, Arc<SimulatedEngine>) {
        let (session, engine) = create_test_session();
        session.handle_lifecycle(LifecycleEvent::Mount).await;
        engine.clear_calls();
        (session, engine)
    }

    async fn live_session() -> (BroadcastSession, Arc<SimulatedEngine>) {
        let (session, engine) = mounted_session().await;
        session
            .go_live(&DestinationInput::full_url(URL))
            .await
            .expect("go live should succeed");
        sleep(Duration::from_millis(3500)).await;
        assert_eq!(session.mode().await, SessionMode::Live);
        (session, engine)
    }

    fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn start_urls(engine: &SimulatedEngine) -> Vec<String> {
        engine
            .calls_of(EngineOp::Start)
            .into_iter()
            .filter_map(|call| match call {
                EngineCall::Start { url, .. } => Some(url),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_starts_preview() {
        let (session, engine) = create_test_session();
        session.handle_lifecycle(LifecycleEvent::Mount).await;

        assert!(session.preview().is_started());
        assert_eq!(
            engine.calls(),
            vec![
                EngineCall::EnableAutoRotate(true),
                EngineCall::StartPreview,
                EngineCall::SetZoom(1.0)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_destination_is_rejected() {
        let (session, engine) = mounted_session().await;
        let mut events = session.subscribe();

        let result = session.go_live(&DestinationInput::full_url("")).await;
        assert_eq!(result, Err(BroadcastError::EmptyDestination));
        assert_eq!(session.mode().await, SessionMode::Idle);

        let result = session.go_live(&DestinationInput::server_key("", "  ")).await;
        assert_eq!(result, Err(BroadcastError::EmptyDestination));

        sleep(Duration::from_secs(4)).await;
        assert_eq!(session.mode().await, SessionMode::Idle);
        assert_eq!(engine.count(EngineOp::Start), 0);

        let errors: Vec<_> = drain(&mut events)
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::Error { kind, .. } if kind == "empty_destination"))
            .collect();
        assert_eq!(errors.len(), 2);
        assert!(session.snapshot().await.last_error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_issues_native_start_once_at_two() {
        let (session, engine) = mounted_session().await;
        let mut events = session.subscribe();

        session
            .go_live(&DestinationInput::full_url(URL))
            .await
            .unwrap();
        assert_eq!(session.mode().await, SessionMode::Countdown);
        assert_eq!(engine.count(EngineOp::Start), 0);

        sleep(Duration::from_millis(1500)).await;
        assert_eq!(session.snapshot().await.countdown_remaining, Some(2));
        assert_eq!(start_urls(&engine), vec![URL.to_string()]);

        sleep(Duration::from_secs(1)).await;
        assert_eq!(session.snapshot().await.countdown_remaining, Some(1));
        assert_eq!(engine.count(EngineOp::Start), 1);

        sleep(Duration::from_secs(1)).await;
        assert_eq!(session.mode().await, SessionMode::Live);
        assert_eq!(session.elapsed_seconds().await, 0);
        assert_eq!(engine.count(EngineOp::Start), 1);

        let ticks: Vec<u32> = drain(&mut events)
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::CountdownTick { remaining } => Some(remaining),
                _ => None,
            })
            .collect();
        assert_eq!(ticks, vec![3, 2, 1, 0]);

        let Some(EngineCall::Start {
            bitrate_bps,
            width,
            height,
            fps,
            ..
        }) = engine.calls_of(EngineOp::Start).pop()
        else {
            panic!("start call missing");
        };
        let profile = BroadcastConfig::default().profile;
        assert_eq!((bitrate_bps, width, height, fps), (profile.bitrate_bps, profile.width, profile.height, profile.fps));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_key_destination() {
        let (session, engine) = mounted_session().await;
        session
            .go_live(&DestinationInput::server_key("rtmp://ingest.local/live", "abc"))
            .await
            .unwrap();
        sleep(Duration::from_millis(1500)).await;

        assert_eq!(start_urls(&engine), vec!["rtmp://ingest.local/live/abc".to_string()]);
        assert_eq!(
            session.snapshot().await.destination.as_deref(),
            Some("rtmp://ingest.local/live/***")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_clock_runs_while_live() {
        let (session, _engine) = live_session().await;

        sleep(Duration::from_secs(10)).await;
        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.elapsed_seconds, 10);
        assert_eq!(snapshot.elapsed_label, "00:10");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_countdown_then_go_live_again() {
        let (session, engine) = mounted_session().await;
        let destination = DestinationInput::full_url(URL);

        session.go_live(&destination).await.unwrap();
        sleep(Duration::from_millis(1500)).await;
        assert_eq!(engine.count(EngineOp::Start), 1);

        session.cancel_countdown().await.unwrap();
        assert_eq!(session.mode().await, SessionMode::Idle);
        assert_eq!(engine.count(EngineOp::Stop), 1);
        assert_eq!(engine.count(EngineOp::StopPreview), 1);
        assert_eq!(engine.count(EngineOp::StartPreview), 1);
        assert!(session.preview().is_started());

        // Nothing from the cancelled countdown fires later
        sleep(Duration::from_secs(5)).await;
        assert_eq!(session.mode().await, SessionMode::Idle);

        session.go_live(&destination).await.unwrap();
        sleep(Duration::from_millis(3500)).await;
        assert_eq!(session.mode().await, SessionMode::Live);
        assert_eq!(session.elapsed_seconds().await, 0);
        assert_eq!(start_urls(&engine), vec![URL.to_string(), URL.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_native_start_never_starts() {
        let (session, engine) = mounted_session().await;
        session
            .go_live(&DestinationInput::full_url(URL))
            .await
            .unwrap();
        sleep(Duration::from_millis(500)).await;

        session.cancel_countdown().await.unwrap();
        sleep(Duration::from_secs(5)).await;

        assert_eq!(engine.count(EngineOp::Start), 0);
        // Defensive stop still goes out
        assert_eq!(engine.count(EngineOp::Stop), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_outside_countdown_is_rejected() {
        let (session, _engine) = mounted_session().await;
        assert!(matches!(
            session.cancel_countdown().await,
            Err(BroadcastError::InvalidTransition { mode: SessionMode::Idle, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_failure_returns_to_idle_and_allows_retry() {
        let (session, engine) = mounted_session().await;
        let mut events = session.subscribe();
        engine.fail_next(EngineOp::Start, 1);
        let destination = DestinationInput::full_url(URL);

        session.go_live(&destination).await.unwrap();
        sleep(Duration::from_millis(1500)).await;

        assert_eq!(session.mode().await, SessionMode::Idle);
        let snapshot = session.snapshot().await;
        assert!(snapshot
            .last_error
            .as_deref()
            .unwrap_or_default()
            .contains("Stream failed to start"));
        assert!(!snapshot.torch_on);
        assert!(!snapshot.mic_muted);
        assert_eq!(snapshot.zoom_factor, 1.0);
        assert!(drain(&mut events)
            .iter()
            .any(|e| matches!(e, SessionEvent::Error { kind, .. } if kind == "stream_start")));

        // Countdown timer is gone
        sleep(Duration::from_secs(5)).await;
        assert_eq!(session.mode().await, SessionMode::Idle);

        session.dismiss_error().await;
        session.go_live(&destination).await.unwrap();
        sleep(Duration::from_millis(3500)).await;
        assert_eq!(session.mode().await, SessionMode::Live);
        assert_eq!(engine.count(EngineOp::Start), 2);
        assert_eq!(session.snapshot().await.last_error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_start_failure_after_live_reverts_to_idle() {
        let (session, engine) = mounted_session().await;
        engine.set_delay(EngineOp::Start, Duration::from_secs(5));
        engine.fail_next(EngineOp::Start, 1);

        session
            .go_live(&DestinationInput::full_url(URL))
            .await
            .unwrap();

        // Countdown does not wait for the native start
        sleep(Duration::from_millis(4000)).await;
        assert_eq!(session.mode().await, SessionMode::Live);

        sleep(Duration::from_millis(2500)).await;
        assert_eq!(session.mode().await, SessionMode::Idle);
        assert_eq!(session.elapsed_seconds().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_then_foreground_resumes_stream() {
        let (session, engine) = live_session().await;
        engine.clear_calls();

        session.handle_lifecycle(LifecycleEvent::Background).await;
        assert!(!session.preview().is_started());
        assert!(session.snapshot().await.resumption_pending);
        assert_eq!(session.mode().await, SessionMode::Live);

        session.handle_lifecycle(LifecycleEvent::Foreground).await;
        assert!(session.preview().is_started());
        assert_eq!(session.mode().await, SessionMode::Live);
        assert!(!session.snapshot().await.resumption_pending);

        assert_eq!(
            engine.calls(),
            vec![
                EngineCall::EnableAutoRotate(false),
                EngineCall::StopPreview,
                EngineCall::EnableAutoRotate(true),
                EngineCall::StartPreview,
                EngineCall::SetZoom(1.0),
                EngineCall::Start {
                    url: URL.to_string(),
                    bitrate_bps: 2_500_000,
                    width: 1280,
                    height: 720,
                    fps: 30
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_is_attempted_at_most_once() {
        let (session, engine) = live_session().await;
        engine.fail_always(EngineOp::Start);

        session.handle_lifecycle(LifecycleEvent::FocusLost).await;
        session.handle_lifecycle(LifecycleEvent::FocusGained).await;
        assert_eq!(session.mode().await, SessionMode::Live);
        assert_eq!(engine.count(EngineOp::Start), 2);

        // Flapping back to the foreground does not retry
        session.handle_lifecycle(LifecycleEvent::Foreground).await;
        assert_eq!(engine.count(EngineOp::Start), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_while_idle_records_nothing() {
        let (session, engine) = mounted_session().await;
        session.handle_lifecycle(LifecycleEvent::Background).await;
        assert!(!session.snapshot().await.resumption_pending);

        session.handle_lifecycle(LifecycleEvent::Foreground).await;
        assert_eq!(engine.count(EngineOp::Start), 0);
        assert!(session.preview().is_started());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stop_keeps_stream_and_clock() {
        let (session, engine) = live_session().await;

        session.request_finish().await.unwrap();
        assert_eq!(session.mode().await, SessionMode::Stopping);

        sleep(Duration::from_millis(2010)).await;
        let progress = session.snapshot().await.stop_progress.unwrap();
        assert!((0.39..=0.41).contains(&progress), "progress was {}", progress);

        let elapsed_before = session.elapsed_seconds().await;
        session.cancel_stop().await.unwrap();

        assert_eq!(session.mode().await, SessionMode::Live);
        assert_eq!(session.elapsed_seconds().await, elapsed_before);
        assert_eq!(session.snapshot().await.stop_progress, None);
        assert_eq!(engine.count(EngineOp::Stop), 0);

        // The cancelled grace period never completes
        sleep(Duration::from_secs(6)).await;
        assert_eq!(session.mode().await, SessionMode::Live);
        assert_eq!(engine.count(EngineOp::Stop), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_sequence_ends_broadcast() {
        let (session, engine) = live_session().await;
        session.toggle_torch().await;
        session.pinch_begin();
        session.pinch_update(1.8);
        session.pinch_end().await;

        let mut events = session.subscribe();
        session.request_finish().await.unwrap();
        sleep(Duration::from_millis(5200)).await;

        assert_eq!(session.mode().await, SessionMode::Ended);
        assert_eq!(engine.count(EngineOp::Stop), 1);
        assert!(!session.preview().is_started());

        let snapshot = session.snapshot().await;
        assert!(!snapshot.torch_on);
        assert_eq!(snapshot.zoom_factor, 1.0);
        assert_eq!(snapshot.stop_progress, None);
        let summary = snapshot.summary.expect("ended session keeps a summary");
        assert!(summary.elapsed_seconds >= 5);
        assert_eq!(summary.destination, "rtmps://x/y/***");

        let progress: Vec<f64> = drain(&mut events)
            .into_iter()
            .filter_map(|e| match e {
                SessionEvent::StopProgress { progress } => Some(progress),
                _ => None,
            })
            .collect();
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress.last().copied(), Some(1.0));

        assert_eq!(
            session.exit(ExitAction::Tournament).await.unwrap(),
            "/tournaments/spring-open"
        );
        assert_eq!(session.exit(ExitAction::Home).await.unwrap(), "/");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_failure_is_swallowed() {
        let (session, engine) = live_session().await;
        engine.fail_always(EngineOp::Stop);
        engine.fail_always(EngineOp::StopPreview);

        session.request_finish().await.unwrap();
        sleep(Duration::from_millis(5200)).await;

        assert_eq!(session.mode().await, SessionMode::Ended);
        assert!(!session.preview().is_started());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ended_is_terminal() {
        let (session, _engine) = live_session().await;
        session.request_finish().await.unwrap();
        sleep(Duration::from_millis(5200)).await;

        assert!(session.go_live(&DestinationInput::full_url(URL)).await.is_err());
        assert!(session.request_finish().await.is_err());
        session.handle_lifecycle(LifecycleEvent::Foreground).await;
        assert_eq!(session.mode().await, SessionMode::Ended);
        assert!(!session.preview().is_started());
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_during_stopping_returns_to_live() {
        let (session, engine) = live_session().await;
        session.request_finish().await.unwrap();
        sleep(Duration::from_secs(1)).await;

        session.handle_lifecycle(LifecycleEvent::Background).await;
        session.handle_lifecycle(LifecycleEvent::Foreground).await;
        assert_eq!(session.mode().await, SessionMode::Live);

        sleep(Duration::from_secs(6)).await;
        assert_eq!(session.mode().await, SessionMode::Live);
        assert_eq!(engine.count(EngineOp::Stop), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_tears_down_without_resume() {
        let (session, engine) = live_session().await;
        engine.clear_calls();
        let mut events = session.subscribe();

        session.handle_lifecycle(LifecycleEvent::Unmount).await;
        assert_eq!(session.mode().await, SessionMode::Idle);
        assert_eq!(
            engine.calls(),
            vec![
                EngineCall::Stop,
                EngineCall::EnableAutoRotate(false),
                EngineCall::StopPreview
            ]
        );
        assert!(!session.snapshot().await.resumption_pending);

        sleep(Duration::from_secs(3)).await;
        assert!(!drain(&mut events)
            .iter()
            .any(|e| matches!(e, SessionEvent::ElapsedTick { .. })));
        assert!(!session.preview().is_started());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_resolving_after_unmount_is_stopped() {
        let (session, engine) = mounted_session().await;
        engine.set_delay(EngineOp::Start, Duration::from_secs(2));

        session
            .go_live(&DestinationInput::full_url(URL))
            .await
            .unwrap();
        sleep(Duration::from_millis(1100)).await;
        assert_eq!(engine.count(EngineOp::Start), 1);

        session.handle_lifecycle(LifecycleEvent::Unmount).await;
        assert_eq!(session.mode().await, SessionMode::Idle);
        engine.clear_calls();

        // Start lands after the screen is gone
        sleep(Duration::from_secs(4)).await;
        assert_eq!(engine.calls(), vec![EngineCall::Stop]);
        assert_eq!(session.mode().await, SessionMode::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_from_cancelled_countdown_is_stopped_before_retry_starts() {
        let (session, engine) = mounted_session().await;
        engine.set_delay(EngineOp::Start, Duration::from_millis(1500));
        let destination = DestinationInput::full_url(URL);

        session.go_live(&destination).await.unwrap();
        sleep(Duration::from_millis(1100)).await;
        session.cancel_countdown().await.unwrap();

        sleep(Duration::from_millis(900)).await;
        engine.clear_calls();
        session.go_live(&destination).await.unwrap();

        // Old start resolves before the new countdown issues its own
        sleep(Duration::from_millis(700)).await;
        assert_eq!(session.mode().await, SessionMode::Countdown);
        assert_eq!(engine.count(EngineOp::Stop), 1);
        assert_eq!(engine.count(EngineOp::Start), 0);

        sleep(Duration::from_millis(2500)).await;
        assert_eq!(session.mode().await, SessionMode::Live);
        assert_eq!(engine.count(EngineOp::Start), 1);
        assert_eq!(engine.count(EngineOp::Stop), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_start_does_not_stop_newer_stream() {
        let (session, engine) = mounted_session().await;
        engine.set_delay(EngineOp::Start, Duration::from_secs(2));
        let destination = DestinationInput::full_url(URL);

        session.go_live(&destination).await.unwrap();
        sleep(Duration::from_millis(1100)).await;
        session.cancel_countdown().await.unwrap();
        engine.clear_calls();

        session.go_live(&destination).await.unwrap();
        sleep(Duration::from_millis(3400)).await;

        assert_eq!(session.mode().await, SessionMode::Live);
        assert_eq!(engine.count(EngineOp::Start), 1);
        assert_eq!(engine.count(EngineOp::Stop), 0);
    }
}
