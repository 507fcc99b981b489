use std::sync::{Arc, Weak};

use chrono::Utc;
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::destination::{redact_destination, DestinationInput};
use super::events::{emit, SessionEvent, EVENT_CAPACITY};
use super::lifecycle::{LifecycleEvent, ResumptionIntent};
use super::sequencer::{spawn_repeating, Countdown, StopSequence};
use super::types::{format_elapsed, Session, SessionMode, SessionSnapshot, SessionSummary};
use crate::camera::{PreviewLifecycle, ZoomController};
use crate::config::BroadcastConfig;
use crate::engine::{best_effort, guarded, SharedEngine};
use crate::error::BroadcastError;
use crate::hardware::{FeedbackSink, HardwareToggleController, LogFeedback, ToggleOutcome};
use crate::navigation::{ExitAction, NavigationTargets};
use crate::permissions::{permission_instructions, PermissionGate};

#[derive(Debug, Default)]
struct SessionTimers {
    countdown: Option<JoinHandle<()>>,
    clock: Option<JoinHandle<()>>,
    stop: Option<JoinHandle<()>>,
}

impl SessionTimers {
    fn abort(slot: &mut Option<JoinHandle<()>>) {
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }

    fn abort_all(&mut self) {
        Self::abort(&mut self.countdown);
        Self::abort(&mut self.clock);
        Self::abort(&mut self.stop);
    }
}

impl Drop for SessionTimers {
    fn drop(&mut self) {
        self.abort_all();
    }
}

#[derive(Debug, Default)]
struct SessionInner {
    session: Session,
    countdown: Option<Countdown>,
    stop_sequence: Option<StopSequence>,
    resumption: ResumptionIntent,
    /// Bumped whenever an attempt starts or is abandoned; stale timer and
    /// native callbacks compare against it and bail out
    attempt: u64,
    /// Attempt that most recently issued a native start
    last_start_attempt: u64,
    last_error: Option<String>,
    summary: Option<SessionSummary>,
    timers: SessionTimers,
}

struct SessionShared {
    engine: SharedEngine,
    config: BroadcastConfig,
    preview: PreviewLifecycle,
    zoom: ZoomController,
    hardware: HardwareToggleController,
    navigation: NavigationTargets,
    inner: Mutex<SessionInner>,
    events: broadcast::Sender<SessionEvent>,
}

/// Assembles a `BroadcastSession` from its collaborators
pub struct BroadcastSessionBuilder {
    engine: SharedEngine,
    config: BroadcastConfig,
    gate: PermissionGate,
    feedback: Arc<dyn FeedbackSink>,
    navigation: NavigationTargets,
}

impl BroadcastSessionBuilder {
    pub fn new(engine: SharedEngine) -> Self {
        Self {
            engine,
            config: BroadcastConfig::default(),
            gate: PermissionGate::always_granted(),
            feedback: Arc::new(LogFeedback),
            navigation: NavigationTargets::default(),
        }
    }

    pub fn config(mut self, config: BroadcastConfig) -> Self {
        self.config = config;
        self
    }

    pub fn permissions(mut self, gate: PermissionGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn feedback(mut self, feedback: Arc<dyn FeedbackSink>) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn navigation(mut self, navigation: NavigationTargets) -> Self {
        self.navigation = navigation;
        self
    }

    pub fn build(self) -> Result<BroadcastSession, BroadcastError> {
        self.config.validate()?;

        let zoom = ZoomController::new(
            self.engine.clone(),
            self.config.zoom,
            self.config.frame_interval(),
        );
        let preview = PreviewLifecycle::new(
            self.engine.clone(),
            self.gate,
            zoom.clone(),
            self.config.frame_interval(),
        );
        let hardware =
            HardwareToggleController::new(self.engine.clone(), self.feedback, preview.subscribe());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(BroadcastSession {
            shared: Arc::new(SessionShared {
                engine: self.engine,
                config: self.config,
                preview,
                zoom,
                hardware,
                navigation: self.navigation,
                inner: Mutex::new(SessionInner::default()),
                events,
            }),
        })
    }
}

/// Top-level broadcast orchestrator.
///
/// Sole owner of the `Session`, the countdown, the stop sequence and every
/// timer. Timer callbacks go through the same transition methods as user
/// actions. Cheap to clone; all clones drive the same session.
#[derive(Clone)]
pub struct BroadcastSession {
    shared: Arc<SessionShared>,
}

impl BroadcastSession {
    pub fn builder(engine: SharedEngine) -> BroadcastSessionBuilder {
        BroadcastSessionBuilder::new(engine)
    }

    pub fn new(engine: SharedEngine, config: BroadcastConfig) -> Result<Self, BroadcastError> {
        Self::builder(engine).config(config).build()
    }

    fn downgrade(&self) -> Weak<SessionShared> {
        Arc::downgrade(&self.shared)
    }

    fn from_weak(weak: &Weak<SessionShared>) -> Option<Self> {
        weak.upgrade().map(|shared| Self { shared })
    }

    async fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.shared.inner.lock().await
    }

    fn emit(&self, event: SessionEvent) {
        emit(&self.shared.events, event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    pub fn config(&self) -> &BroadcastConfig {
        &self.shared.config
    }

    pub fn zoom(&self) -> &ZoomController {
        &self.shared.zoom
    }

    pub fn hardware(&self) -> &HardwareToggleController {
        &self.shared.hardware
    }

    pub fn preview(&self) -> &PreviewLifecycle {
        &self.shared.preview
    }

    pub async fn mode(&self) -> SessionMode {
        self.lock().await.session.mode
    }

    pub async fn elapsed_seconds(&self) -> u64 {
        let inner = self.lock().await;
        inner.session.elapsed_at(Instant::now())
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let mut snapshot = {
            let inner = self.lock().await;
            let elapsed = inner.session.elapsed_at(Instant::now());
            let zoom = self.shared.zoom.state();
            SessionSnapshot {
                session_id: inner.session.id,
                mode: inner.session.mode,
                destination: inner.session.stream_url.as_deref().map(redact_destination),
                elapsed_seconds: elapsed,
                elapsed_label: format_elapsed(elapsed),
                countdown_remaining: inner.countdown.as_ref().map(Countdown::remaining),
                stop_progress: inner.stop_sequence.as_ref().map(|s| s.progress),
                preview_active: self.shared.preview.is_started(),
                torch_on: false,
                mic_muted: false,
                zoom_factor: zoom.ui_zoom_factor,
                is_front_camera: zoom.is_front_camera,
                resumption_pending: inner.resumption.is_pending(),
                last_error: inner.last_error.clone(),
                summary: inner.summary.clone(),
            }
        };

        let toggles = self.shared.hardware.toggles().await;
        snapshot.torch_on = toggles.torch_on;
        snapshot.mic_muted = toggles.mic_muted;
        snapshot
    }

    fn transition(&self, inner: &mut SessionInner, to: SessionMode) {
        let from = inner.session.mode;
        if from == to {
            return;
        }
        inner.session.mode = to;
        info!("🎬 Broadcast {} -> {}", from, to);
        self.emit(SessionEvent::ModeChanged { from, to });
    }

    /// Drop the current attempt and return to a fresh idle session
    fn reset_to_idle(&self, inner: &mut SessionInner) {
        let from = inner.session.mode;
        inner.session = Session::default();
        inner.countdown = None;
        inner.stop_sequence = None;
        if from != SessionMode::Idle {
            info!("🎬 Broadcast {} -> {}", from, SessionMode::Idle);
            self.emit(SessionEvent::ModeChanged {
                from,
                to: SessionMode::Idle,
            });
        }
    }

    fn report(&self, inner: &mut SessionInner, err: &BroadcastError) {
        error!("❌ {}", err);
        inner.last_error = Some(err.to_string());
        self.emit(SessionEvent::from(err));
        if *err == BroadcastError::PermissionDenied {
            self.emit(SessionEvent::Notice {
                message: permission_instructions(),
            });
        }
    }

    async fn report_unlocked(&self, err: &BroadcastError) {
        let mut inner = self.lock().await;
        self.report(&mut inner, err);
    }

    pub async fn dismiss_error(&self) {
        self.lock().await.last_error = None;
    }

    // ----- lifecycle -----

    pub async fn handle_lifecycle(&self, event: LifecycleEvent) {
        info!("📱 Lifecycle event: {:?}", event);
        if event.regains_control() {
            self.regain_control().await;
        } else if event.loses_control() {
            self.lose_control().await;
        } else {
            self.unmount().await;
        }
    }

    async fn regain_control(&self) {
        if self.mode().await == SessionMode::Ended {
            return;
        }

        if let Err(e) = self.shared.preview.start().await {
            self.report_unlocked(&e).await;
        }
        self.resume_if_pending().await;
    }

    async fn lose_control(&self) {
        {
            let mut inner = self.lock().await;
            if inner.session.mode.is_on_air() {
                if let Some(url) = inner.session.stream_url.clone() {
                    info!("💾 Remembering on-air session for resume: {}", redact_destination(&url));
                    inner.resumption.record(url);
                }
            }
        }
        self.shared.preview.stop().await;
    }

    async fn resume_if_pending(&self) {
        let url = {
            let mut inner = self.lock().await;
            let Some(url) = inner.resumption.take() else {
                return;
            };
            if !inner.session.mode.is_on_air() {
                warn!("⏭️ Dropping resume intent: session is {}", inner.session.mode);
                return;
            }
            if inner.session.mode == SessionMode::Stopping {
                SessionTimers::abort(&mut inner.timers.stop);
                inner.stop_sequence = None;
                self.transition(&mut inner, SessionMode::Live);
            }
            url
        };

        info!("🔁 Resuming stream to {}", redact_destination(&url));
        let profile = self.shared.config.profile;
        best_effort(
            "start",
            self.shared.engine.start(
                &url,
                profile.bitrate_bps,
                profile.width,
                profile.height,
                profile.fps,
            ),
        )
        .await;
    }

    async fn unmount(&self) {
        let was_on_air = {
            let mut inner = self.lock().await;
            inner.timers.abort_all();
            inner.attempt += 1;
            inner.resumption.clear();
            let was_on_air = matches!(
                inner.session.mode,
                SessionMode::Countdown | SessionMode::Live | SessionMode::Stopping
            );
            if was_on_air {
                self.reset_to_idle(&mut inner);
            }
            was_on_air
        };

        if was_on_air {
            best_effort("stop", self.shared.engine.stop()).await;
        }
        self.shared.preview.teardown().await;
    }

    // ----- idle -> countdown -> live -----

    pub async fn go_live(&self, destination: &DestinationInput) -> Result<(), BroadcastError> {
        {
            let mut inner = self.lock().await;
            let mode = inner.session.mode;
            if mode != SessionMode::Idle {
                let err = BroadcastError::InvalidTransition {
                    mode,
                    action: "go live",
                };
                self.report(&mut inner, &err);
                return Err(err);
            }
        }

        let Some(url) = destination.resolve(&self.shared.config.default_server) else {
            let err = BroadcastError::EmptyDestination;
            self.report_unlocked(&err).await;
            return Err(err);
        };

        if !self.shared.preview.is_started() {
            if let Err(e) = self.shared.preview.start().await {
                self.report_unlocked(&e).await;
                return Err(e);
            }
        }

        let mut inner = self.lock().await;
        let mode = inner.session.mode;
        if mode != SessionMode::Idle {
            return Err(BroadcastError::InvalidTransition {
                mode,
                action: "go live",
            });
        }

        inner.attempt += 1;
        let attempt = inner.attempt;
        let countdown = Countdown::new(
            self.shared.config.countdown_from,
            self.shared.config.native_start_at,
        );
        let remaining = countdown.remaining();

        info!("🎯 Going live to {}", redact_destination(&url));
        inner.session = Session::default();
        inner.session.stream_url = Some(url);
        inner.countdown = Some(countdown);
        inner.last_error = None;
        inner.summary = None;
        self.transition(&mut inner, SessionMode::Countdown);
        self.emit(SessionEvent::CountdownTick { remaining });
        inner.timers.countdown = Some(self.spawn_countdown(attempt));
        Ok(())
    }

    fn spawn_countdown(&self, attempt: u64) -> JoinHandle<()> {
        let weak = self.downgrade();
        spawn_repeating(self.shared.config.clock_tick(), move || {
            let weak = weak.clone();
            async move {
                match Self::from_weak(&weak) {
                    Some(session) => session.countdown_tick(attempt).await,
                    None => false,
                }
            }
        })
    }

    /// One countdown second. Returns whether the countdown keeps running.
    async fn countdown_tick(&self, attempt: u64) -> bool {
        let mut inner = self.lock().await;
        if inner.attempt != attempt || inner.session.mode != SessionMode::Countdown {
            return false;
        }
        let Some(countdown) = inner.countdown.as_mut() else {
            return false;
        };

        let tick = countdown.tick();
        debug!("⏱️ Countdown {}", tick.remaining);
        self.emit(SessionEvent::CountdownTick {
            remaining: tick.remaining,
        });

        if tick.issue_native_start {
            if let Some(url) = inner.session.stream_url.clone() {
                inner.last_start_attempt = attempt;
                self.spawn_native_start(attempt, url);
            }
        }

        if tick.finished {
            // Our own task: detach rather than abort it mid-transition
            inner.timers.countdown.take();
            self.enter_live(&mut inner, attempt);
            return false;
        }
        true
    }

    fn enter_live(&self, inner: &mut SessionInner, attempt: u64) {
        inner.countdown = None;
        inner.session.elapsed_seconds = 0;
        inner.session.clock_anchor = Some(Instant::now());
        inner.session.started_at = Some(Utc::now());
        self.transition(inner, SessionMode::Live);
        self.emit(SessionEvent::ElapsedTick { seconds: 0 });

        SessionTimers::abort(&mut inner.timers.clock);
        inner.timers.clock = Some(self.spawn_clock(attempt));
    }

    /// Native start runs alongside the countdown; the countdown does not wait.
    fn spawn_native_start(&self, attempt: u64, url: String) {
        let engine = self.shared.engine.clone();
        let profile = self.shared.config.profile;
        let weak = self.downgrade();

        info!("📡 Issuing native stream start");
        tokio::spawn(async move {
            let result = guarded(
                "start",
                engine.start(&url, profile.bitrate_bps, profile.width, profile.height, profile.fps),
            )
            .await;

            let Some(session) = Self::from_weak(&weak) else {
                return;
            };
            match result {
                Ok(()) => session.native_start_confirmed(attempt).await,
                Err(e) => session.native_start_failed(attempt, e).await,
            }
        });
    }

    async fn native_start_confirmed(&self, attempt: u64) {
        let abandoned = {
            let inner = self.lock().await;
            inner.attempt != attempt && inner.last_start_attempt == attempt
        };

        if abandoned {
            // Attempt was dropped while the start was in flight, and no newer
            // attempt has started a stream of its own
            warn!("🧹 Stream started after its attempt was abandoned, stopping it");
            best_effort("stop", self.shared.engine.stop()).await;
        } else {
            info!("✅ Native stream start confirmed");
        }
    }

    async fn native_start_failed(&self, attempt: u64, cause: anyhow::Error) {
        let mut inner = self.lock().await;
        if inner.attempt != attempt
            || !matches!(inner.session.mode, SessionMode::Countdown | SessionMode::Live)
        {
            warn!("⏭️ Ignoring start failure from a stale attempt: {:#}", cause);
            return;
        }

        inner.timers.abort_all();
        inner.attempt += 1;
        inner.resumption.clear();
        self.reset_to_idle(&mut inner);

        let err = BroadcastError::StreamStart(format!("{:#}", cause));
        self.report(&mut inner, &err);
    }

    pub async fn cancel_countdown(&self) -> Result<(), BroadcastError> {
        {
            let mut inner = self.lock().await;
            let mode = inner.session.mode;
            if mode != SessionMode::Countdown {
                return Err(BroadcastError::InvalidTransition {
                    mode,
                    action: "cancel the countdown",
                });
            }

            SessionTimers::abort(&mut inner.timers.countdown);
            inner.attempt += 1;
            inner.resumption.clear();
            self.reset_to_idle(&mut inner);
        }

        info!("🛑 Countdown cancelled");
        best_effort("stop", self.shared.engine.stop()).await;
        if let Err(e) = self.shared.preview.restart().await {
            self.report_unlocked(&e).await;
        }
        Ok(())
    }

    fn spawn_clock(&self, attempt: u64) -> JoinHandle<()> {
        let weak = self.downgrade();
        spawn_repeating(self.shared.config.clock_tick(), move || {
            let weak = weak.clone();
            async move {
                match Self::from_weak(&weak) {
                    Some(session) => session.clock_tick(attempt).await,
                    None => false,
                }
            }
        })
    }

    async fn clock_tick(&self, attempt: u64) -> bool {
        let mut inner = self.lock().await;
        if inner.attempt != attempt || !inner.session.mode.is_on_air() {
            return false;
        }

        let seconds = inner.session.elapsed_at(Instant::now());
        inner.session.elapsed_seconds = seconds;
        self.emit(SessionEvent::ElapsedTick { seconds });
        true
    }

    // ----- live -> stopping -> ended -----

    pub async fn request_finish(&self) -> Result<(), BroadcastError> {
        let mut inner = self.lock().await;
        let mode = inner.session.mode;
        if mode != SessionMode::Live {
            return Err(BroadcastError::InvalidTransition {
                mode,
                action: "finish the broadcast",
            });
        }

        inner.stop_sequence = Some(StopSequence::begin(
            Instant::now(),
            self.shared.config.stop_grace(),
        ));
        self.transition(&mut inner, SessionMode::Stopping);
        self.emit(SessionEvent::StopProgress { progress: 0.0 });

        let attempt = inner.attempt;
        inner.timers.stop = Some(self.spawn_stop_sequence(attempt));
        Ok(())
    }

    fn spawn_stop_sequence(&self, attempt: u64) -> JoinHandle<()> {
        let weak = self.downgrade();
        spawn_repeating(self.shared.config.stop_tick(), move || {
            let weak = weak.clone();
            async move {
                match Self::from_weak(&weak) {
                    Some(session) => session.stop_tick(attempt).await,
                    None => false,
                }
            }
        })
    }

    async fn stop_tick(&self, attempt: u64) -> bool {
        {
            let mut inner = self.lock().await;
            if inner.attempt != attempt || inner.session.mode != SessionMode::Stopping {
                return false;
            }
            let Some(sequence) = inner.stop_sequence.as_mut() else {
                return false;
            };

            let tick = sequence.advance(Instant::now());
            debug!("⏳ Stop progress {:.2}", tick.progress);
            self.emit(SessionEvent::StopProgress {
                progress: tick.progress,
            });
            if !tick.elapsed {
                return true;
            }

            // Our own task: detach rather than abort it mid-teardown
            inner.timers.stop.take();
            self.enter_ended(&mut inner);
        }

        self.teardown_after_stop().await;
        false
    }

    fn enter_ended(&self, inner: &mut SessionInner) {
        SessionTimers::abort(&mut inner.timers.clock);
        inner.attempt += 1;

        let elapsed_seconds = inner.session.elapsed_at(Instant::now());
        inner.summary = Some(SessionSummary {
            session_id: inner.session.id,
            destination: inner
                .session
                .stream_url
                .as_deref()
                .map(redact_destination)
                .unwrap_or_default(),
            started_at: inner.session.started_at,
            ended_at: Utc::now(),
            elapsed_seconds,
        });

        inner.stop_sequence = None;
        inner.resumption.clear();
        self.transition(inner, SessionMode::Ended);
        inner.session = Session {
            mode: SessionMode::Ended,
            ..Session::default()
        };
        info!(
            "🏁 Broadcast ended after {}",
            format_elapsed(elapsed_seconds)
        );
    }

    async fn teardown_after_stop(&self) {
        best_effort("stop", self.shared.engine.stop()).await;
        self.shared.preview.stop().await;
        self.shared.hardware.reset().await;
        self.shared.zoom.reset_local();
    }

    pub async fn cancel_stop(&self) -> Result<(), BroadcastError> {
        let mut inner = self.lock().await;
        let mode = inner.session.mode;
        if mode != SessionMode::Stopping {
            return Err(BroadcastError::InvalidTransition {
                mode,
                action: "cancel stopping",
            });
        }

        SessionTimers::abort(&mut inner.timers.stop);
        inner.stop_sequence = None;
        self.emit(SessionEvent::StopProgress { progress: 0.0 });
        self.transition(&mut inner, SessionMode::Live);
        info!("↩️ Stop cancelled, still live");
        Ok(())
    }

    /// Resolve an exit route from the ended screen
    pub async fn exit(&self, action: ExitAction) -> Result<String, BroadcastError> {
        let mode = self.mode().await;
        if mode != SessionMode::Ended {
            return Err(BroadcastError::NotEnded);
        }
        let route = self.shared.navigation.resolve(action);
        info!("🚪 Leaving broadcast screen via {:?}: {}", action, route);
        Ok(route)
    }

    // ----- hardware -----

    pub async fn toggle_torch(&self) -> ToggleOutcome {
        self.shared.hardware.toggle_torch().await
    }

    pub async fn toggle_mic(&self) -> ToggleOutcome {
        self.shared.hardware.toggle_mic().await
    }

    /// Flip between front and back camera. Returns whether the switch happened.
    pub async fn switch_camera(&self) -> bool {
        if !self.shared.preview.is_started() {
            return false;
        }
        if let Err(e) = guarded("switch_camera", self.shared.engine.switch_camera()).await {
            warn!("⚠️ Camera switch failed: {:#}", e);
            return false;
        }

        let to_front = !self.shared.zoom.state().is_front_camera;
        info!("🔄 Switched to {} camera", if to_front { "front" } else { "back" });
        if let Some(factor) = self.shared.zoom.set_front_camera(to_front).await {
            self.emit(SessionEvent::ZoomChanged { factor });
        }
        true
    }

    pub fn pinch_begin(&self) {
        self.shared.zoom.gesture_begin();
    }

    pub fn pinch_update(&self, scale: f64) {
        if let Some(factor) = self.shared.zoom.gesture_update(scale) {
            self.emit(SessionEvent::ZoomChanged { factor });
        }
    }

    pub async fn pinch_end(&self) {
        self.shared.zoom.gesture_end().await;
    }
}
