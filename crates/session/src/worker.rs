// Session worker: the single serialization context of a playback session
//
// Every operation that touches the engine (host commands, engine events, progress ticks,
// focus events) is a message handled here, one at a time. The engine reference is only
// read or cleared on this thread, so a snapshot can never observe a half-released engine.

use crate::dispatch::Dispatcher;
use crate::pending::Resolver;
use crate::poller::ProgressPoller;
use avplay_core::{
    clip_millis, AudioFocus, ControlFields, EngineError, EngineEvent, EngineEventSink,
    EngineFactory, ListenerRegistry, MediaEngine, MediaSource, PlaybackPhase, PlaybackStatus,
    RepeatMode, Result, SessionError, SessionId, SessionState, StatusSnapshot, StatusUpdate,
};
use crossbeam_channel::{select, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Messages processed by the worker, in arrival order
pub(crate) enum Command {
    Load {
        initial: StatusUpdate,
        reply: Resolver<StatusSnapshot>,
    },
    SetStatus {
        update: StatusUpdate,
        reply: Resolver<StatusSnapshot>,
    },
    GetStatus {
        reply: Sender<StatusSnapshot>,
    },
    GetState {
        reply: Sender<SessionState>,
    },
    Release {
        reply: Sender<()>,
    },
    BeginProgressUpdates,
    FocusLost,
    FocusGained,
    VolumePolicyChanged,
    HostPaused,
    HostResumed,
    Engine(EngineEvent),
    Shutdown,
}

struct PendingLoad {
    initial: StatusUpdate,
    reply: Resolver<StatusSnapshot>,
}

/// Collaborators and shared flags a worker is built with
pub(crate) struct WorkerLinks {
    pub(crate) id: SessionId,
    pub(crate) engines: Arc<dyn EngineFactory>,
    pub(crate) focus: Arc<dyn AudioFocus>,
    pub(crate) listeners: Arc<ListenerRegistry>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) commands: Sender<Command>,
    pub(crate) focus_required: Arc<AtomicBool>,
}

pub(crate) struct SessionWorker {
    id: SessionId,
    source: MediaSource,
    implementation: String,
    engines: Arc<dyn EngineFactory>,
    focus: Arc<dyn AudioFocus>,
    listeners: Arc<ListenerRegistry>,
    dispatcher: Dispatcher,
    commands: Sender<Command>,
    focus_required: Arc<AtomicBool>,
    listeners_detached: bool,

    engine: Option<Box<dyn MediaEngine>>,
    state: SessionState,
    controls: ControlFields,
    poller: ProgressPoller,
    pending_load: Option<PendingLoad>,
    last_phase: Option<PlaybackPhase>,
    is_loading: bool,
    has_started: bool,
}

impl SessionWorker {
    pub(crate) fn new(
        source: MediaSource,
        links: WorkerLinks,
        progress_update_interval_millis: u64,
    ) -> Self {
        Self {
            id: links.id,
            implementation: links.engines.implementation_name().to_string(),
            source,
            engines: links.engines,
            focus: links.focus,
            listeners: links.listeners,
            dispatcher: links.dispatcher,
            commands: links.commands,
            focus_required: links.focus_required,
            listeners_detached: false,
            engine: None,
            state: SessionState::Unloaded,
            controls: ControlFields::with_progress_interval(progress_update_interval_millis),
            poller: ProgressPoller::new(Duration::from_millis(progress_update_interval_millis)),
            pending_load: None,
            last_phase: None,
            is_loading: true,
            has_started: false,
        }
    }

    /// Worker main loop; returns after `Shutdown` or once every handle is gone
    pub(crate) fn run(mut self, commands: Receiver<Command>) {
        log::debug!("Session worker {} started for {}", self.id, self.source.uri());

        loop {
            let tick = self.poller.timer();
            select! {
                recv(commands) -> msg => {
                    let Ok(command) = msg else { break };
                    if !self.handle_command(command) {
                        break;
                    }
                }
                recv(tick) -> _ => self.on_progress_tick(),
            }
            self.detach_listeners_if_released();
        }

        self.release();
        self.dispatcher.detach();
        log::debug!("Session worker {} exited", self.id);
    }

    /// A released session never notifies again. Dropping the listeners also breaks cycles
    /// through listeners that hold a handle to this session.
    fn detach_listeners_if_released(&mut self) {
        if self.state == SessionState::Released && !self.listeners_detached {
            self.dispatcher.detach();
            self.listeners_detached = true;
        }
    }

    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Load { initial, reply } => self.load(initial, reply),
            Command::SetStatus { update, reply } => {
                let result = self.set_status(update).map(|()| self.snapshot());
                let _ = reply.send(result);
            }
            Command::GetStatus { reply } => {
                let _ = reply.send(self.snapshot());
            }
            Command::GetState { reply } => {
                let _ = reply.send(self.state);
            }
            Command::Release { reply } => {
                self.release();
                let _ = reply.send(());
            }
            Command::BeginProgressUpdates => self.begin_updating_progress_if_necessary(),
            Command::FocusLost => self.on_focus_lost(),
            Command::FocusGained => self.on_focus_gained(),
            Command::VolumePolicyChanged => self.on_volume_policy_changed(),
            Command::HostPaused => self.on_host_paused(),
            Command::HostResumed => self.on_host_resumed(),
            Command::Engine(event) => self.on_engine_event(event),
            Command::Shutdown => return false,
        }
        true
    }

    // Lifecycle

    fn load(&mut self, initial: StatusUpdate, reply: Resolver<StatusSnapshot>) {
        if self.state != SessionState::Unloaded || self.engine.is_some() {
            let _ = reply.send(Err(SessionError::InvalidState(format!(
                "Cannot load a session that is {:?}",
                self.state
            ))));
            return;
        }

        log::info!("Loading {} with {}", self.source.uri(), self.implementation);
        self.set_state(SessionState::Loading);
        self.pending_load = Some(PendingLoad { initial, reply });

        let commands = self.commands.clone();
        let sink = EngineEventSink::new(move |event| {
            // The worker may already be gone; late engine events are dropped.
            let _ = commands.send(Command::Engine(event));
        });

        match self.open_engine(sink) {
            Ok(engine) => {
                self.engine = Some(engine);
                self.is_loading = true;
            }
            Err(error) => self.on_fatal_error(error),
        }
    }

    fn open_engine(&self, sink: EngineEventSink) -> std::result::Result<Box<dyn MediaEngine>, EngineError> {
        let mut engine = self.engines.create_engine(&self.source)?;
        if let Err(error) = engine.open(&self.source, sink) {
            if let Err(release_error) = engine.release() {
                log::warn!("Failed to release engine after open error: {}", release_error);
            }
            return Err(error);
        }
        Ok(engine)
    }

    /// Stop the poller, tear down the engine, and become terminally unloaded
    ///
    /// A pending load is dropped without being resolved; its host side reads it as cancelled.
    /// Releasing a session that never loaded changes nothing.
    fn release(&mut self) {
        if self.state == SessionState::Released
            || (self.state == SessionState::Unloaded && self.engine.is_none())
        {
            return;
        }

        self.poller.stop();
        if self.pending_load.take().is_some() {
            log::debug!("Discarding pending load of {}", self.source.uri());
        }
        if let Some(mut engine) = self.engine.take() {
            log::info!("Releasing engine for {}", self.source.uri());
            if let Err(error) = engine.release() {
                log::warn!("Engine release failed: {}", error);
            }
        }
        self.set_state(SessionState::Released);
        self.focus_required.store(false, Ordering::SeqCst);
        self.focus.abandon_if_unused(self.id, false);
    }

    /// Fatal errors release first, then report to the load caller or the error listener
    fn on_fatal_error(&mut self, error: EngineError) {
        log::info!("Fatal error for {}: {}", self.source.uri(), error);

        let pending = self.pending_load.take();
        self.release();

        match pending {
            Some(pending) => {
                let _ = pending.reply.send(Err(SessionError::LoadFailure(error.to_string())));
            }
            None => {
                let error = SessionError::EngineRuntime(error.to_string());
                self.dispatcher.error(error.to_string());
            }
        }
    }

    // Engine events

    fn on_engine_event(&mut self, event: EngineEvent) {
        if self.engine.is_none() {
            log::debug!("Dropping engine event without an engine: {:?}", event);
            return;
        }

        match event {
            EngineEvent::LoadingChanged(is_loading) => {
                self.is_loading = is_loading;
                self.emit_status();
            }
            EngineEvent::PhaseChanged(phase) => self.on_phase_changed(phase),
            EngineEvent::Error(error) => self.on_fatal_error(error),
        }
    }

    fn on_phase_changed(&mut self, phase: PlaybackPhase) {
        if phase == PlaybackPhase::Ready {
            if let Some(pending) = self.pending_load.take() {
                if let Err(error) = self.set_status(pending.initial) {
                    log::warn!("Initial status of {} not fully applied: {}", self.source.uri(), error);
                }
                let _ = pending.reply.send(Ok(self.snapshot()));
            }
        }

        let finished = phase == PlaybackPhase::Ended
            && self.last_phase.is_some_and(|last| last != phase);
        self.last_phase = Some(phase);
        self.refresh_state();

        if finished {
            self.dispatcher.status(self.snapshot().with_did_just_finish());
        } else {
            self.emit_status();
        }
    }

    // Status mutation

    /// Apply a sparse update. Stored fields changed before a failure stay changed.
    fn set_status(&mut self, update: StatusUpdate) -> Result<()> {
        // Nothing is stored while there is no engine to apply it to
        if self.engine.is_none() {
            log::warn!("Set status on {} without a loaded engine", self.source.uri());
            return Err(SessionError::SetStatus(format!(
                "Cannot set status of a session that is {:?}",
                self.state
            )));
        }

        if let Some(interval) = update.progress_update_interval_millis {
            self.controls.progress_update_interval_millis = interval;
            self.poller.set_interval(Duration::from_millis(interval));
        }
        let new_position = update.position_millis;
        self.controls.merge_playback_intent(&update);

        let result = self.apply_new_status(new_position, update.is_looping);
        self.abandon_focus_if_unused();
        self.refresh_state();

        result.map_err(|error| {
            log::warn!("Set status failed for {}: {}", self.source.uri(), error);
            match error {
                SessionError::SetStatus(_) => error,
                other => SessionError::SetStatus(other.to_string()),
            }
        })
    }

    fn apply_new_status(&mut self, new_position: Option<u64>, new_is_looping: Option<bool>) -> Result<()> {
        if let Some(is_looping) = new_is_looping {
            self.controls.is_looping = is_looping;
            self.engine_mut()?
                .set_repeat_mode(RepeatMode::from_looping(is_looping))?;
        }

        // Pause first if necessary
        if !self.controls.should_player_play() {
            self.engine_mut()?.set_play_when_ready(false)?;
            self.poller.stop();
        }

        // Volume and mute never need focus
        self.update_volume()?;

        if let Some(position) = new_position {
            self.engine_mut()?.seek_to(position)?;
        }

        match self.play_if_necessary() {
            Err(SessionError::FocusNotAcquired) => {
                log::debug!("Audio focus denied; playback intent recorded but not enacted");
                Ok(())
            }
            other => other,
        }
    }

    fn play_if_necessary(&mut self) -> Result<()> {
        if self.engine.is_none() || !self.controls.should_player_play() {
            return Ok(());
        }

        if !self.controls.is_muted && !self.focus.request_focus(self.id) {
            return Err(SessionError::FocusNotAcquired);
        }

        self.update_volume()?;

        let (rate, pitch) = (self.controls.rate, self.controls.pitch());
        let engine = self.engine_mut()?;
        engine.set_playback_parameters(rate, pitch)?;
        engine.set_play_when_ready(true)?;
        self.has_started = true;

        self.begin_updating_progress_if_necessary();
        Ok(())
    }

    fn update_volume(&mut self) -> Result<()> {
        let volume = self
            .focus
            .volume_for(self.id, self.controls.is_muted, self.controls.volume);
        if let Some(engine) = self.engine.as_mut() {
            engine.set_volume(volume)?;
        }
        Ok(())
    }

    fn pause_immediately(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            if let Err(error) = engine.set_play_when_ready(false) {
                log::warn!("Failed to pause engine: {}", error);
            }
        }
        self.poller.stop();
    }

    fn engine_mut(&mut self) -> Result<&mut Box<dyn MediaEngine>> {
        self.engine
            .as_mut()
            .ok_or_else(|| SessionError::InvalidState("Media engine is not loaded".to_string()))
    }

    // Audio focus

    fn requires_audio_focus(&self) -> bool {
        self.engine.as_ref().is_some_and(|engine| {
            (engine.play_when_ready() || self.controls.should_player_play()) && !self.controls.is_muted
        })
    }

    fn abandon_focus_if_unused(&self) {
        let required = self.requires_audio_focus();
        self.focus_required.store(required, Ordering::SeqCst);
        self.focus.abandon_if_unused(self.id, required);
    }

    fn on_focus_lost(&mut self) {
        if self.controls.is_muted {
            return;
        }
        log::debug!("Audio focus lost; pausing {}", self.source.uri());
        self.pause_immediately();
        self.after_interruption_change();
    }

    fn on_focus_gained(&mut self) {
        self.resume_if_possible();
    }

    fn on_volume_policy_changed(&mut self) {
        if let Err(error) = self.update_volume() {
            log::warn!("Failed to re-apply volume for {}: {}", self.source.uri(), error);
        }
    }

    fn on_host_paused(&mut self) {
        self.pause_immediately();
        self.after_interruption_change();
    }

    fn on_host_resumed(&mut self) {
        self.resume_if_possible();
    }

    fn resume_if_possible(&mut self) {
        match self.play_if_necessary() {
            Ok(()) => {}
            Err(SessionError::FocusNotAcquired) => {
                log::debug!("Audio focus still unavailable; staying paused");
            }
            Err(error) => log::warn!("Failed to resume {}: {}", self.source.uri(), error),
        }
        self.after_interruption_change();
    }

    fn after_interruption_change(&mut self) {
        if self.engine.is_none() {
            return;
        }
        self.abandon_focus_if_unused();
        self.refresh_state();
        self.emit_status();
    }

    // Progress

    fn should_continue_updating_progress(&self) -> bool {
        self.engine
            .as_ref()
            .is_some_and(|engine| engine.play_when_ready())
    }

    fn begin_updating_progress_if_necessary(&mut self) {
        if self.should_continue_updating_progress() {
            self.poller.begin(Instant::now());
        } else {
            self.poller.stop();
        }
    }

    fn on_progress_tick(&mut self) {
        if !self.poller.is_due(Instant::now()) {
            return;
        }
        if !self.should_continue_updating_progress() {
            self.poller.stop();
            return;
        }

        self.emit_status();
        self.poller.reschedule(Instant::now());
    }

    // Snapshots

    fn emit_status(&self) {
        if self.listeners.has_status_listener() {
            self.dispatcher.status(self.snapshot());
        }
    }

    fn snapshot(&self) -> StatusSnapshot {
        let Some(engine) = self.engine.as_ref() else {
            return StatusSnapshot::unloaded(self.implementation.as_str());
        };

        let duration = engine.duration_ms();
        let phase = engine.playback_phase();
        let controls = &self.controls;

        StatusSnapshot::loaded(
            self.implementation.as_str(),
            PlaybackStatus {
                uri: self.source.uri().to_string(),
                progress_update_interval_millis: controls.progress_update_interval_millis,
                duration_millis: duration.max(0) as u64,
                position_millis: clip_millis(engine.position_ms(), duration),
                playable_duration_millis: clip_millis(engine.buffered_position_ms(), duration),
                should_play: controls.should_play,
                is_playing: engine.play_when_ready() && phase == PlaybackPhase::Ready,
                is_buffering: self.is_loading || phase == PlaybackPhase::Buffering,
                rate: controls.rate,
                should_correct_pitch: controls.should_correct_pitch,
                volume: controls.volume,
                is_muted: controls.is_muted,
                is_looping: controls.is_looping,
                did_just_finish: false,
            },
        )
    }

    // State

    fn refresh_state(&mut self) {
        let Some(engine) = self.engine.as_ref() else {
            return;
        };
        let next = SessionState::derive(
            engine.playback_phase(),
            engine.play_when_ready(),
            self.pending_load.is_some(),
            self.has_started,
        );
        self.set_state(next);
    }

    fn set_state(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            log::warn!("Ignoring session state change {:?} -> {:?}", self.state, next);
            return;
        }
        log::debug!("Session state changed: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
