//! The protocol engine: command surface, dispatch and the door state
//! machine.
//!
//! One `Engine` owns the transport, the preference store, the rolling-code
//! state and every piece of domain state. All of it is mutated from
//! [`Engine::tick`] only; the single cross-context input is the
//! obstruction [`PulseCounter`], drained here and incremented from the
//! host's edge interrupt.

use std::time::Instant;

use tracing::{debug, trace, warn};

use gdolink_core::constants::{
    DOOR_DELTA_UNKNOWN, DOOR_POSITION_CLOSED, DOOR_POSITION_OPEN, DOOR_POSITION_UNKNOWN, TTC_UNSET,
};
use gdolink_core::{
    ButtonState, ClientId, DoorState, Error, HoldState, LightState, LockState, MotionState,
    MotorState, Observable, ObstructionState, OnceCallbacks, Result,
};
use gdolink_hardware::{PreferenceStore, PulseCounter, SerialTransport, StoredState};
use gdolink_protocol::{
    Command, Decoded, FrameAccumulator, RollingCodeState, payload, wire,
};

use crate::config::EngineConfig;
use crate::motion::{DoorTravel, TravelDirection};
use crate::timers::{TimerId, Timers};
use crate::transmit::TransmitQueue;

// Follow-up queries chained behind a status exchange.
const QUERY_EXT_STATUS: u8 = 1 << 0;
const QUERY_TTC: u8 = 1 << 1;
const QUERY_OPENINGS: u8 = 1 << 2;
const QUERY_ALL: u8 = QUERY_EXT_STATUS | QUERY_TTC | QUERY_OPENINGS;

/// Door action awaiting a confirming status report.
#[derive(Debug, Clone, Copy)]
struct PendingDoorAction {
    action: u32,
    retries_left: u8,
}

/// Protocol engine over a serial transport and a preference store.
pub struct Engine<T, P> {
    transport: T,
    prefs: P,
    pulses: PulseCounter,
    config: EngineConfig,

    rolling: RollingCodeState,
    frames: FrameAccumulator,
    queue: TransmitQueue,
    timers: Timers,
    travel: DoorTravel,

    door_state: Observable<DoorState>,
    door_position: Observable<f32>,
    opening_duration: Observable<f32>,
    closing_duration: Observable<f32>,
    openings: Observable<u16>,
    light_state: Observable<LightState>,
    lock_state: Observable<LockState>,
    hold_state: Observable<HoldState>,
    ttc_time_seconds: Observable<u16>,
    obstruction_state: Observable<ObstructionState>,
    motor_state: Observable<MotorState>,
    button_state: Observable<ButtonState>,
    motion_state: Observable<MotionState>,
    sync_failed: Observable<bool>,
    rolling_counter: Observable<u32>,

    door_subscribers: Vec<Box<dyn FnMut(DoorState, f32)>>,
    door_state_received: OnceCallbacks<DoorState>,
    command_sent: OnceCallbacks<()>,

    pending_door_action: Option<PendingDoorAction>,
    door_move_delta: f32,
    sync_attempts_left: u8,
    query_flags: u8,
    silent_obstruction_cycles: u8,
    increments_since_save: u32,
    restore_ttc: bool,
    restore_hold: bool,
    restore_pending: bool,
}

impl<T, P> Engine<T, P>
where
    T: SerialTransport,
    P: PreferenceStore,
{
    pub fn new(transport: T, prefs: P, pulses: PulseCounter, config: EngineConfig) -> Self {
        Self {
            transport,
            prefs,
            pulses,
            config,
            rolling: RollingCodeState::new(),
            frames: FrameAccumulator::new(),
            queue: TransmitQueue::new(),
            timers: Timers::new(),
            travel: DoorTravel::new(),
            door_state: Observable::new(DoorState::Unknown),
            door_position: Observable::new(DOOR_POSITION_UNKNOWN),
            opening_duration: Observable::new(0.0),
            closing_duration: Observable::new(0.0),
            openings: Observable::new(0),
            light_state: Observable::new(LightState::Unknown),
            lock_state: Observable::new(LockState::Unknown),
            hold_state: Observable::new(HoldState::Unknown),
            ttc_time_seconds: Observable::new(TTC_UNSET),
            obstruction_state: Observable::new(ObstructionState::Unknown),
            motor_state: Observable::new(MotorState::Unknown),
            button_state: Observable::new(ButtonState::Unknown),
            motion_state: Observable::new(MotionState::Unknown),
            sync_failed: Observable::new(false),
            rolling_counter: Observable::new(0),
            door_subscribers: Vec::new(),
            door_state_received: OnceCallbacks::new(),
            command_sent: OnceCallbacks::new(),
            pending_door_action: None,
            door_move_delta: DOOR_DELTA_UNKNOWN,
            sync_attempts_left: 0,
            query_flags: 0,
            silent_obstruction_cycles: 0,
            increments_since_save: 0,
            restore_ttc: false,
            restore_hold: false,
            restore_pending: false,
        }
    }

    /// Restore persisted state, arm the periodic samplers and start a
    /// full sync. Call once before ticking.
    pub fn setup(&mut self) {
        match self.prefs.load() {
            Ok(Some(state)) => self.restore(state),
            Ok(None) => debug!("no stored preferences, starting from defaults"),
            Err(err) => {
                // Degraded mode: zero rolling state, the sync below will
                // have to re-establish trust with the motor unit.
                warn!(%err, "preference store unavailable, starting from defaults");
            }
        }
        self.rolling_counter.set(self.rolling.counter());
        self.timers
            .schedule(TimerId::ObstructionSample, self.config.obstruction_poll_period);
        self.sync();
    }

    fn restore(&mut self, state: StoredState) {
        // The counter may have advanced past the last save before the
        // restart; jump ahead by one persist interval so we never repeat
        // a code the motor unit has already seen.
        self.rolling.set(state.rolling_counter);
        self.rolling.increment_by(self.config.persist_interval as i32);

        if let Some(raw) = state.client_id {
            match ClientId::new(raw) {
                Ok(id) => self.config.client_id = id,
                Err(err) => warn!(%err, "ignoring stored client id"),
            }
        }
        self.restore_ttc = state.restore_ttc;
        self.restore_hold = state.restore_hold;
        self.restore_pending = state.restore_ttc || state.restore_hold;
        if self.restore_pending {
            debug!(
                restore_ttc = state.restore_ttc,
                restore_hold = state.restore_hold,
                "deferred state restore armed"
            );
        }
        if let Some(secs) = state.ttc_seconds {
            self.ttc_time_seconds.set(secs);
        }
        debug!(counter = self.rolling.counter(), "rolling code restored");
    }

    /// One cooperative poll step.
    pub fn tick(&mut self) {
        self.read_serial();
        for id in self.timers.due(Instant::now()) {
            self.on_timer(id);
        }
        self.flush_transmit();
    }

    // ------------------------------------------------------------------
    // Receive path
    // ------------------------------------------------------------------

    fn read_serial(&mut self) {
        loop {
            match self.transport.read_byte() {
                Ok(Some(byte)) => self.frames.feed(&[byte]),
                Ok(None) => break,
                Err(err) => {
                    warn!(%err, "serial read failed");
                    break;
                }
            }
        }

        while let Some(frame) = self.frames.next_frame() {
            match wire::decode(&frame) {
                Ok(decoded) => self.handle_frame(decoded),
                Err(err) => warn!(%err, frame = %frame, "dropping malformed frame"),
            }
        }
    }

    fn handle_frame(&mut self, decoded: Decoded) {
        if decoded.client_id == self.config.client_id {
            trace!(command = %decoded.command, "ignoring own echo");
            return;
        }
        if !self.rolling.observe(decoded.rolling) {
            debug!(
                command = %decoded.command,
                rolling = decoded.rolling,
                last_seen = ?self.rolling.last_seen(),
                "ignoring stale rolling code"
            );
            return;
        }

        trace!(command = %decoded.command, data = decoded.data, "frame received");
        match decoded.command {
            Command::Status => self.handle_status(decoded.data),
            Command::ExtStatus => self.handle_ext_status(decoded.data),
            Command::TtcDuration => self.handle_ttc_duration(decoded.data),
            Command::TtcCountdown => {
                self.ttc_time_seconds.set(payload::parse_u16_pair(decoded.data));
            }
            Command::Openings => {
                self.openings.set(payload::parse_u16_pair(decoded.data));
            }
            Command::DoorAction => self.handle_door_action_echo(decoded.data),
            Command::Light => self.handle_light(decoded.data),
            Command::Lock => self.handle_lock(decoded.data),
            Command::MotorOn => self.handle_motor_on(),
            Command::Motion => self.handle_motion(),
            Command::Obstruction1 | Command::Obstruction2 => {
                debug!(command = %decoded.command, "obstruction event report");
            }
            Command::Unknown => {
                debug!(data = decoded.data, "ignoring unrecognized command");
            }
            other => {
                // Queries and pairing traffic from other bus participants.
                trace!(command = %other, "ignoring");
            }
        }
    }

    fn handle_status(&mut self, data: u32) {
        let door_code = payload::byte1(data);
        let flags = payload::byte2(data);

        match DoorState::from_u8(door_code) {
            Ok(door) => self.apply_door_state(door),
            Err(err) => warn!(%err, "status report with bad door code"),
        }

        self.light_state.set(if flags & 0x01 != 0 {
            LightState::On
        } else {
            LightState::Off
        });
        self.lock_state.set(if flags & 0x02 != 0 {
            LockState::Locked
        } else {
            LockState::Unlocked
        });
        if self.config.obstruction_from_status {
            self.obstruction_state.set(if flags & 0x04 != 0 {
                ObstructionState::Clear
            } else {
                ObstructionState::Obstructed
            });
        }

        // A status report settles both the sync window and any door
        // action waiting for confirmation.
        self.timers.cancel(TimerId::SyncStatus);
        self.sync_attempts_left = 0;
        self.sync_failed.set(false);
        if self.pending_door_action.take().is_some() {
            self.timers.cancel(TimerId::DoorCommandRetry);
            debug!("door action confirmed by status report");
        }

        let door = self.door_state.get();
        self.door_state_received.trigger(&door);

        self.apply_deferred_restore();

        if self.query_flags & QUERY_EXT_STATUS != 0 {
            self.query_flags &= !QUERY_EXT_STATUS;
            self.send_command(Command::GetExtStatus, payload::GET_EXT_STATUS);
        }
    }

    fn handle_ext_status(&mut self, data: u32) {
        let mode = payload::byte1(data) & 0x07;
        // Modes: 0 = countdown off, 1 = countdown armed, 2 = hold-open.
        self.hold_state.set(if mode == 2 {
            HoldState::Enabled
        } else {
            HoldState::Disabled
        });

        if self.query_flags & QUERY_TTC != 0 {
            self.query_flags &= !QUERY_TTC;
            self.send_command(Command::TtcGetDuration, payload::TTC_GET_DURATION);
        }
    }

    fn handle_ttc_duration(&mut self, data: u32) {
        self.ttc_time_seconds.set(payload::parse_u16_pair(data));

        if self.query_flags & QUERY_OPENINGS != 0 {
            self.query_flags &= !QUERY_OPENINGS;
            self.send_command(Command::GetOpenings, 0);
        }
    }

    fn handle_door_action_echo(&mut self, data: u32) {
        // Wall buttons broadcast their presses; byte1 bit 0 carries the
        // press/release edge.
        self.button_state.set(if payload::byte1(data) & 0x01 != 0 {
            ButtonState::Pressed
        } else {
            ButtonState::Released
        });
    }

    fn handle_light(&mut self, data: u32) {
        match payload::nibble(data) as u32 {
            payload::LIGHT_OFF => {
                self.light_state.set(LightState::Off);
            }
            payload::LIGHT_ON => {
                self.light_state.set(LightState::On);
            }
            payload::LIGHT_TOGGLE => {
                let toggled = self.light_state.get().toggled();
                self.light_state.set(toggled);
            }
            other => debug!(action = other, "unrecognized light action"),
        }
    }

    fn handle_lock(&mut self, data: u32) {
        match payload::nibble(data) as u32 {
            payload::LOCK_OFF => {
                self.lock_state.set(LockState::Unlocked);
            }
            payload::LOCK_ON => {
                self.lock_state.set(LockState::Locked);
            }
            payload::LOCK_TOGGLE => {
                let toggled = self.lock_state.get().toggled();
                self.lock_state.set(toggled);
            }
            other => debug!(action = other, "unrecognized lock action"),
        }
    }

    fn handle_motor_on(&mut self) {
        self.motor_state.set(MotorState::On);

        let door = self.door_state.get();
        if !door.is_transient() {
            // The motor report can beat the opening/closing status; enter
            // the transient state early when the target direction is known
            // from the action we issued.
            if let Some(direction) = self.pending_travel_direction() {
                self.apply_door_state(match direction {
                    TravelDirection::Opening => DoorState::Opening,
                    TravelDirection::Closing => DoorState::Closing,
                });
            }
        } else if !self.timers.is_scheduled(TimerId::PositionSample) {
            self.timers
                .schedule(TimerId::PositionSample, self.config.position_update_period);
        }
    }

    /// Direction implied by the door action currently awaiting
    /// confirmation, if it is unambiguous.
    fn pending_travel_direction(&self) -> Option<TravelDirection> {
        let pending = self.pending_door_action?;
        match pending.action {
            payload::DOOR_OPEN => Some(TravelDirection::Opening),
            payload::DOOR_CLOSE => Some(TravelDirection::Closing),
            payload::DOOR_TOGGLE => match self.door_state.get() {
                DoorState::Open => Some(TravelDirection::Closing),
                DoorState::Closed => Some(TravelDirection::Opening),
                _ => None,
            },
            _ => None,
        }
    }

    fn handle_motion(&mut self) {
        self.motion_state.set(MotionState::Detected);
        self.timers
            .schedule(TimerId::MotionClear, self.config.motion_clear_delay);
    }

    // ------------------------------------------------------------------
    // Door state machine
    // ------------------------------------------------------------------

    fn apply_door_state(&mut self, new: DoorState) {
        let old = self.door_state.get();
        if new == old {
            return;
        }
        let now = Instant::now();

        match new {
            DoorState::Opening => {
                let start = match old {
                    DoorState::Closed => DOOR_POSITION_CLOSED,
                    DoorState::Open => DOOR_POSITION_OPEN,
                    _ => self.door_position.get(),
                };
                self.travel.begin(TravelDirection::Opening, now, start);
                self.motor_state.set(MotorState::On);
                self.timers
                    .schedule(TimerId::PositionSample, self.config.position_update_period);
            }
            DoorState::Closing => {
                let start = match old {
                    DoorState::Open => DOOR_POSITION_OPEN,
                    DoorState::Closed => DOOR_POSITION_CLOSED,
                    _ => self.door_position.get(),
                };
                self.travel.begin(TravelDirection::Closing, now, start);
                self.motor_state.set(MotorState::On);
                self.timers
                    .schedule(TimerId::PositionSample, self.config.position_update_period);
            }
            DoorState::Open => {
                if let Some(elapsed) = self.travel.finish(TravelDirection::Opening, now) {
                    debug!(seconds = elapsed, "opening duration calibrated");
                    self.opening_duration.set(elapsed);
                }
                self.settle(DOOR_POSITION_OPEN);
            }
            DoorState::Closed => {
                if let Some(elapsed) = self.travel.finish(TravelDirection::Closing, now) {
                    debug!(seconds = elapsed, "closing duration calibrated");
                    self.closing_duration.set(elapsed);
                }
                self.settle(DOOR_POSITION_CLOSED);
            }
            DoorState::Stopped => {
                if old.is_transient() {
                    self.travel.abort();
                } else {
                    debug!(%old, "stop reported outside of travel");
                }
                self.cancel_position_sync_callbacks();
                self.motor_state.set(MotorState::Off);
            }
            DoorState::Unknown => {}
        }

        self.door_state.set(new);
        debug!(from = %old, to = %new, "door state transition");
        self.notify_door_subscribers();
    }

    /// The door came to rest at a terminal position.
    ///
    /// The position resolves to the terminal value only once a traversal
    /// duration is calibrated; before that the estimate stays unknown, the
    /// same as during travel.
    fn settle(&mut self, position: f32) {
        if self.opening_duration.get() > 0.0 || self.closing_duration.get() > 0.0 {
            self.door_position.set(position);
        }
        self.cancel_position_sync_callbacks();
        self.motor_state.set(MotorState::Off);
        self.door_move_delta = DOOR_DELTA_UNKNOWN;
        self.timers.cancel(TimerId::MoveStop);
    }

    fn notify_door_subscribers(&mut self) {
        let state = self.door_state.get();
        let position = self.door_position.get();
        let mut subscribers = std::mem::take(&mut self.door_subscribers);
        for subscriber in &mut subscribers {
            subscriber(state, position);
        }
        self.door_subscribers = subscribers;
    }

    // ------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------

    fn on_timer(&mut self, id: TimerId) {
        match id {
            TimerId::ObstructionSample => {
                self.obstruction_loop();
                self.timers
                    .schedule(TimerId::ObstructionSample, self.config.obstruction_poll_period);
            }
            TimerId::PositionSample => {
                self.door_position_update();
                if self.door_state.get().is_transient() {
                    self.timers
                        .schedule(TimerId::PositionSample, self.config.position_update_period);
                }
            }
            TimerId::DoorCommandRetry => self.retry_door_command(),
            TimerId::SyncStatus => self.retry_sync(),
            TimerId::MotionClear => {
                self.motion_state.set(MotionState::Clear);
            }
            TimerId::MoveStop => {
                self.door_move_delta = DOOR_DELTA_UNKNOWN;
                self.stop_door();
            }
            TimerId::AlertClose => {
                self.send_command(Command::Light, payload::LIGHT_TOGGLE);
                self.ensure_door_command(payload::DOOR_CLOSE);
            }
        }
    }

    /// Drain the pulse counter for the elapsed cycle and classify.
    ///
    /// The beam pulses while the path is clear; a beam that has gone
    /// silent for several consecutive cycles is blocked.
    fn obstruction_loop(&mut self) {
        let pulses = self.pulses.drain();
        if pulses > 0 {
            self.silent_obstruction_cycles = 0;
            self.obstruction_state.set(ObstructionState::Clear);
        } else {
            if self.silent_obstruction_cycles < self.config.obstruction_silent_cycles {
                self.silent_obstruction_cycles += 1;
            }
            if self.silent_obstruction_cycles >= self.config.obstruction_silent_cycles {
                self.obstruction_state.set(ObstructionState::Obstructed);
            }
        }
    }

    /// Refresh the position estimate from the in-progress traversal.
    fn door_position_update(&mut self) {
        let estimate = self.travel.estimate(
            Instant::now(),
            self.opening_duration.get(),
            self.closing_duration.get(),
        );
        if let Some(position) = estimate {
            if self.door_position.set(position) {
                self.notify_door_subscribers();
            }
        }
    }

    /// Stop the periodic position sampling.
    fn cancel_position_sync_callbacks(&mut self) {
        self.timers.cancel(TimerId::PositionSample);
    }

    fn retry_door_command(&mut self) {
        let Some(mut pending) = self.pending_door_action else {
            return;
        };
        if pending.retries_left > 0 {
            pending.retries_left -= 1;
            warn!(action = pending.action, "door action unconfirmed, resending");
            // The resend does not consume a rolling code of its own.
            self.queue
                .push(Command::DoorAction, door_action_data(pending.action), false, None);
            self.timers
                .schedule(TimerId::DoorCommandRetry, self.config.command_retry_delay);
            self.pending_door_action = Some(pending);
        } else {
            warn!(
                action = pending.action,
                "door action unconfirmed after retries, giving up"
            );
            self.pending_door_action = None;
        }
    }

    fn retry_sync(&mut self) {
        if self.sync_attempts_left > 0 {
            self.sync_attempts_left -= 1;
            debug!(remaining = self.sync_attempts_left, "no status response, querying again");
            self.send_command(Command::GetStatus, 0);
            self.timers
                .schedule(TimerId::SyncStatus, self.config.sync_retry_delay);
        } else {
            warn!("sync timed out without a status response");
            self.sync_failed.set(true);
        }
    }

    fn apply_deferred_restore(&mut self) {
        if !self.restore_pending {
            return;
        }
        self.restore_pending = false;
        if self.restore_ttc {
            let secs = self.ttc_time_seconds.get();
            if secs != TTC_UNSET {
                debug!(secs, "restoring time-to-close");
                self.set_ttc_sec(secs);
            }
        }
        if self.restore_hold {
            debug!("restoring hold-open");
            self.hold_enable();
        }
    }

    // ------------------------------------------------------------------
    // Transmit path
    // ------------------------------------------------------------------

    fn send_command(&mut self, command: Command, data: u32) {
        self.queue.push(command, data, true, None);
    }

    fn flush_transmit(&mut self) {
        let Some(entry) = self.queue.begin_transmit() else {
            return;
        };

        let rolling = self.rolling.next(entry.increment);
        let packet = wire::encode(entry.command, entry.data, rolling, self.config.client_id);
        match self.transport.write_frame(packet.as_bytes()) {
            Ok(()) => {
                trace!(command = %entry.command, rolling, "frame transmitted");
                if entry.increment {
                    self.rolling_counter.set(self.rolling.counter());
                    self.increments_since_save += 1;
                    if self.increments_since_save >= self.config.persist_interval {
                        self.persist_now();
                    }
                }
                if let Some(on_sent) = entry.on_sent {
                    on_sent();
                }
                self.command_sent.trigger(&());
            }
            Err(err) => warn!(%err, command = %entry.command, "frame transmit failed"),
        }
        self.queue.complete_transmit();
    }

    fn persist_now(&mut self) {
        let mut state = StoredState::new(self.rolling.counter());
        state.client_id = Some(self.config.client_id.as_u32());
        state.restore_ttc = self.restore_ttc;
        state.restore_hold = self.restore_hold;
        state.ttc_seconds = match self.ttc_time_seconds.get() {
            TTC_UNSET => None,
            secs => Some(secs),
        };
        if let Err(err) = self.prefs.save(&state) {
            warn!(%err, "failed to persist rolling code counter");
        }
        self.increments_since_save = 0;
    }

    // ------------------------------------------------------------------
    // Door commands
    // ------------------------------------------------------------------

    /// Issue a door action and resend it once if no status report
    /// confirms it within the retry window.
    fn ensure_door_command(&mut self, action: u32) {
        self.pending_door_action = Some(PendingDoorAction {
            action,
            retries_left: self.config.command_retry_limit,
        });
        self.send_command(Command::DoorAction, door_action_data(action));
        self.timers
            .schedule(TimerId::DoorCommandRetry, self.config.command_retry_delay);
    }

    pub fn open_door(&mut self) {
        if matches!(self.door_state.get(), DoorState::Open | DoorState::Opening) {
            debug!("door already open(ing), not sending");
            return;
        }
        self.ensure_door_command(payload::DOOR_OPEN);
    }

    pub fn close_door(&mut self) {
        if matches!(self.door_state.get(), DoorState::Closed | DoorState::Closing) {
            debug!("door already closed/closing, not sending");
            return;
        }
        self.ensure_door_command(payload::DOOR_CLOSE);
    }

    pub fn toggle_door(&mut self) {
        self.ensure_door_command(payload::DOOR_TOGGLE);
    }

    /// Stop the door mid-travel. No-op when the door is not moving.
    pub fn stop_door(&mut self) {
        if !self.door_state.get().is_transient() {
            debug!(state = %self.door_state.get(), "stop requested while not moving");
            return;
        }
        // A stop supersedes whatever action was being ensured.
        self.pending_door_action = None;
        self.timers.cancel(TimerId::DoorCommandRetry);
        self.send_command(Command::DoorAction, door_action_data(payload::DOOR_STOP));
    }

    /// Drive the door to an explicit position using the calibrated
    /// traversal durations.
    ///
    /// # Errors
    /// Returns `Error::InvalidPosition` for targets outside [0, 1] and
    /// `Error::NotCalibrated` when the current position or the required
    /// traversal duration is unknown.
    pub fn door_move_to_position(&mut self, target: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&target) {
            return Err(Error::InvalidPosition(target));
        }
        let current = self.door_position.get();
        if current < 0.0 {
            return Err(Error::NotCalibrated);
        }

        let delta = target - current;
        if delta.abs() < 0.01 {
            debug!(position = target, "door already at requested position");
            return Ok(());
        }

        let duration = if delta > 0.0 {
            self.opening_duration.get()
        } else {
            self.closing_duration.get()
        };
        if duration <= 0.0 {
            return Err(Error::NotCalibrated);
        }

        self.door_move_delta = delta;
        let travel_time = std::time::Duration::from_secs_f32(delta.abs() * duration);
        // Only a mid-range target needs a timed stop; the terminals stop
        // on their own.
        if target > DOOR_POSITION_CLOSED && target < DOOR_POSITION_OPEN {
            self.timers.schedule(TimerId::MoveStop, travel_time);
        }
        if delta > 0.0 {
            self.open_door();
        } else {
            self.close_door();
        }
        Ok(())
    }

    /// Close preceded by a light-flash warning, for jurisdictions that
    /// require an alert before an unattended close.
    pub fn close_with_alert(&mut self) {
        if matches!(self.door_state.get(), DoorState::Closed | DoorState::Closing) {
            debug!("door already closed/closing, no alert needed");
            return;
        }
        self.send_command(Command::Light, payload::LIGHT_TOGGLE);
        self.timers
            .schedule(TimerId::AlertClose, self.config.close_alert_lead);
    }

    // ------------------------------------------------------------------
    // Light, lock, hold
    // ------------------------------------------------------------------

    pub fn light_on(&mut self) {
        self.send_command(Command::Light, payload::LIGHT_ON);
        self.light_state.set(LightState::On);
    }

    pub fn light_off(&mut self) {
        self.send_command(Command::Light, payload::LIGHT_OFF);
        self.light_state.set(LightState::Off);
    }

    pub fn toggle_light(&mut self) {
        self.send_command(Command::Light, payload::LIGHT_TOGGLE);
        let toggled = self.light_state.get().toggled();
        self.light_state.set(toggled);
    }

    pub fn get_light_state(&self) -> LightState {
        self.light_state.get()
    }

    pub fn lock(&mut self) {
        self.send_command(Command::Lock, payload::LOCK_ON);
        self.lock_state.set(LockState::Locked);
    }

    pub fn unlock(&mut self) {
        self.send_command(Command::Lock, payload::LOCK_OFF);
        self.lock_state.set(LockState::Unlocked);
    }

    pub fn toggle_lock(&mut self) {
        self.send_command(Command::Lock, payload::LOCK_TOGGLE);
        let toggled = self.lock_state.get().toggled();
        self.lock_state.set(toggled);
    }

    pub fn hold_enable(&mut self) {
        if self.hold_state.get() != HoldState::Enabled {
            self.ttc_toggle_hold();
        }
        self.hold_state.set(HoldState::Enabled);
    }

    pub fn hold_disable(&mut self) {
        if self.hold_state.get() == HoldState::Enabled {
            self.ttc_toggle_hold();
        }
        self.hold_state.set(HoldState::Disabled);
    }

    pub fn toggle_hold(&mut self) {
        self.ttc_toggle_hold();
        let toggled = self.hold_state.get().toggled();
        self.hold_state.set(toggled);
    }

    // ------------------------------------------------------------------
    // Time-to-close
    // ------------------------------------------------------------------

    /// Program the auto-close delay.
    pub fn set_ttc_sec(&mut self, duration: u16) {
        self.send_command(Command::TtcSetDuration, payload::u16_pair(duration));
    }

    /// Cancel the countdown entirely.
    pub fn turn_ttc_off(&mut self) {
        self.send_command(Command::TtcCancel, payload::TTC_CANCEL_OFF);
    }

    /// Cancel the countdown by toggling hold-open, the way wall pads do.
    pub fn ttc_toggle_hold(&mut self) {
        self.send_command(Command::TtcCancel, payload::TTC_CANCEL_TOGGLE_HOLD);
    }

    // ------------------------------------------------------------------
    // Status queries and sync
    // ------------------------------------------------------------------

    /// Query the full state: status, extended status, TTC duration and
    /// the openings counter (chained behind each response).
    pub fn query_status(&mut self) {
        self.query_flags = QUERY_ALL;
        self.send_command(Command::GetStatus, 0);
    }

    /// Recover full state after a restart or counter desynchronization.
    ///
    /// Queries status up to the configured number of attempts; if none is
    /// answered, the `sync_failed` observable flips true (exactly once).
    pub fn sync(&mut self) {
        self.sync_attempts_left = self.config.sync_attempts.saturating_sub(1);
        self.query_flags = QUERY_ALL;
        self.send_command(Command::GetStatus, 0);
        self.timers
            .schedule(TimerId::SyncStatus, self.config.sync_retry_delay);
    }

    // ------------------------------------------------------------------
    // Rolling code management
    // ------------------------------------------------------------------

    /// Advance the transmit counter by `delta` (resynchronization).
    pub fn increment_rolling_code_counter(&mut self, delta: i32) {
        self.rolling.increment_by(delta);
        self.rolling_counter.set(self.rolling.counter());
        self.persist_now();
    }

    /// Force-set the transmit counter.
    pub fn set_rolling_code_counter(&mut self, code: u32) {
        self.rolling.set(code);
        self.rolling_counter.set(self.rolling.counter());
        self.persist_now();
    }

    // ------------------------------------------------------------------
    // Accessors and subscriptions
    // ------------------------------------------------------------------

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Counter handle to register with the obstruction-pin interrupt.
    pub fn pulse_counter(&self) -> PulseCounter {
        self.pulses.clone()
    }

    pub fn door_state(&self) -> DoorState {
        self.door_state.get()
    }

    pub fn door_position(&self) -> f32 {
        self.door_position.get()
    }

    pub fn door_move_delta(&self) -> f32 {
        self.door_move_delta
    }

    pub fn opening_duration(&self) -> f32 {
        self.opening_duration.get()
    }

    pub fn closing_duration(&self) -> f32 {
        self.closing_duration.get()
    }

    /// Seed the opening calibration, e.g. restored by the host from its
    /// own storage. Overwritten by the next measured full traversal.
    pub fn set_opening_duration(&mut self, seconds: f32) {
        self.opening_duration.set(seconds);
    }

    /// Seed the closing calibration.
    pub fn set_closing_duration(&mut self, seconds: f32) {
        self.closing_duration.set(seconds);
    }

    /// Seed the position estimate.
    pub fn set_door_position(&mut self, position: f32) {
        if self.door_position.set(position) {
            self.notify_door_subscribers();
        }
    }

    pub fn openings(&self) -> u16 {
        self.openings.get()
    }

    pub fn lock_state(&self) -> LockState {
        self.lock_state.get()
    }

    pub fn hold_state(&self) -> HoldState {
        self.hold_state.get()
    }

    pub fn ttc_time_seconds(&self) -> u16 {
        self.ttc_time_seconds.get()
    }

    pub fn obstruction_state(&self) -> ObstructionState {
        self.obstruction_state.get()
    }

    pub fn motor_state(&self) -> MotorState {
        self.motor_state.get()
    }

    pub fn button_state(&self) -> ButtonState {
        self.button_state.get()
    }

    pub fn motion_state(&self) -> MotionState {
        self.motion_state.get()
    }

    pub fn sync_failed(&self) -> bool {
        self.sync_failed.get()
    }

    pub fn rolling_code_counter(&self) -> u32 {
        self.rolling_counter.get()
    }

    /// Persist the restore-on-restart flags.
    pub fn set_restore_flags(&mut self, restore_ttc: bool, restore_hold: bool) {
        self.restore_ttc = restore_ttc;
        self.restore_hold = restore_hold;
        self.persist_now();
    }

    pub fn subscribe_door_state(&mut self, f: impl FnMut(DoorState, f32) + 'static) {
        self.door_subscribers.push(Box::new(f));
    }

    pub fn subscribe_rolling_code_counter(&mut self, mut f: impl FnMut(u32) + 'static) {
        self.rolling_counter.subscribe(move |v| f(*v));
    }

    pub fn subscribe_opening_duration(&mut self, mut f: impl FnMut(f32) + 'static) {
        self.opening_duration.subscribe(move |v| f(*v));
    }

    pub fn subscribe_closing_duration(&mut self, mut f: impl FnMut(f32) + 'static) {
        self.closing_duration.subscribe(move |v| f(*v));
    }

    pub fn subscribe_openings(&mut self, mut f: impl FnMut(u16) + 'static) {
        self.openings.subscribe(move |v| f(*v));
    }

    pub fn subscribe_light_state(&mut self, mut f: impl FnMut(LightState) + 'static) {
        self.light_state.subscribe(move |v| f(*v));
    }

    pub fn subscribe_lock_state(&mut self, mut f: impl FnMut(LockState) + 'static) {
        self.lock_state.subscribe(move |v| f(*v));
    }

    pub fn subscribe_hold_state(&mut self, mut f: impl FnMut(HoldState) + 'static) {
        self.hold_state.subscribe(move |v| f(*v));
    }

    pub fn subscribe_ttc_seconds(&mut self, mut f: impl FnMut(u16) + 'static) {
        self.ttc_time_seconds.subscribe(move |v| f(*v));
    }

    pub fn subscribe_obstruction_state(&mut self, mut f: impl FnMut(ObstructionState) + 'static) {
        self.obstruction_state.subscribe(move |v| f(*v));
    }

    pub fn subscribe_motor_state(&mut self, mut f: impl FnMut(MotorState) + 'static) {
        self.motor_state.subscribe(move |v| f(*v));
    }

    pub fn subscribe_button_state(&mut self, mut f: impl FnMut(ButtonState) + 'static) {
        self.button_state.subscribe(move |v| f(*v));
    }

    pub fn subscribe_motion_state(&mut self, mut f: impl FnMut(MotionState) + 'static) {
        self.motion_state.subscribe(move |v| f(*v));
    }

    pub fn subscribe_sync_failed(&mut self, mut f: impl FnMut(bool) + 'static) {
        self.sync_failed.subscribe(move |v| f(*v));
    }

    /// Run `f` once, on the next door status report.
    pub fn on_next_door_state(&mut self, f: impl FnOnce(&DoorState) + 'static) {
        self.door_state_received.push(f);
    }

    /// Run `f` once, after the next frame leaves the wire.
    pub fn on_next_command_sent(&mut self, f: impl FnOnce(&()) + 'static) {
        self.command_sent.push(f);
    }
}

/// Door actions carry the action nibble plus the press edge in byte1.
fn door_action_data(action: u32) -> u32 {
    action | (1 << 8)
}
