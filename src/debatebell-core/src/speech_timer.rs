//! Timing for a single speech.
//!
//! [`SpeechTimer`] counts whole seconds for the loaded speech, rings the
//! speech's bells as their times are reached, rings overtime bells once the
//! speech runs over, and answers questions about where the speech is up to.
//! One timer is reused for every speech of a debate.
//!
//! Every mutation, including the once-a-second tick, happens under one lock
//! per timer. The tick task is tagged with a run id that `stop()` bumps
//! under that lock, so a stopped timer never ticks again.

use parking_lot::Mutex;
use std::fmt;
use std::ops::ControlFlow;
use std::str::FromStr;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::alert::AlertSink;
use crate::debate_format::SpeechFormat;
use crate::error::DebateError;
use crate::period::PeriodInfo;
use crate::state_store::StateBundle;

const TICK_PERIOD: Duration = Duration::from_secs(1);

const SUFFIX_TIME: &str = ".time";
const SUFFIX_STATE: &str = ".state";
const SUFFIX_PERIOD: &str = ".period";

/// Called once per tick and on every state change so a display can redraw.
pub type UpdateCallback = Box<dyn Fn() + Send + Sync>;

/// Where the timer is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    NotStarted,
    Running,
    StoppedByUser,
    StoppedByBell,
}

impl TimerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerState::NotStarted => "NOT_STARTED",
            TimerState::Running => "RUNNING",
            TimerState::StoppedByUser => "STOPPED_BY_USER",
            TimerState::StoppedByBell => "STOPPED_BY_BELL",
        }
    }

    /// The state a timer that is not running should have at `seconds`.
    pub fn resting_at(seconds: u64) -> Self {
        if seconds == 0 {
            TimerState::NotStarted
        } else {
            TimerState::StoppedByUser
        }
    }
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimerState {
    type Err = DebateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NOT_STARTED" => Ok(TimerState::NotStarted),
            "RUNNING" => Ok(TimerState::Running),
            "STOPPED_BY_USER" => Ok(TimerState::StoppedByUser),
            "STOPPED_BY_BELL" => Ok(TimerState::StoppedByBell),
            other => Err(DebateError::UnknownTimerState(other.to_string())),
        }
    }
}

/// Rule for bells rung after a speech runs over.
///
/// The first overtime bell rings `first_bell` seconds after the speech
/// length, then every `period` seconds. `first_bell == 0` turns overtime
/// bells off; `period == 0` rings only the first one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OvertimeBells {
    pub first_bell: u64,
    pub period: u64,
}

impl Default for OvertimeBells {
    fn default() -> Self {
        Self {
            first_bell: 30,
            period: 20,
        }
    }
}

impl OvertimeBells {
    pub const DISABLED: OvertimeBells = OvertimeBells {
        first_bell: 0,
        period: 0,
    };

    pub fn new(first_bell: u64, period: u64) -> Self {
        Self { first_bell, period }
    }

    pub fn is_enabled(&self) -> bool {
        self.first_bell > 0
    }

    /// Whether an overtime bell rings at `time` in a speech of `speech_length`.
    pub fn rings_at(&self, time: u64, speech_length: u64) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let Some(overtime) = time.checked_sub(speech_length) else {
            return false;
        };
        if overtime < self.first_bell {
            return false;
        }
        if overtime == self.first_bell {
            return true;
        }
        self.period > 0 && (overtime - self.first_bell) % self.period == 0
    }

    /// The first overtime bell strictly after `time`.
    pub fn next_after(&self, time: u64, speech_length: u64) -> Option<u64> {
        if !self.is_enabled() {
            return None;
        }
        let first = speech_length.saturating_add(self.first_bell);
        if time < first {
            return Some(first);
        }
        if self.period == 0 {
            return None;
        }
        let periods_elapsed = (time - first) / self.period + 1;
        periods_elapsed
            .checked_mul(self.period)
            .and_then(|offset| first.checked_add(offset))
    }
}

struct TimerCore {
    alerts: Arc<dyn AlertSink>,
    on_update: Option<UpdateCallback>,
    speech_format: Option<Arc<SpeechFormat>>,
    period: PeriodInfo,
    state: TimerState,
    current_time: u64,
    overtime_bells: OvertimeBells,
    ticker: Option<JoinHandle<()>>,
    run_id: u64,
}

impl TimerCore {
    fn notify_update(&self) {
        if let Some(ref callback) = self.on_update {
            callback();
        }
    }

    fn first_period(&self) -> PeriodInfo {
        self.speech_format
            .as_ref()
            .map(|f| f.first_period().clone())
            .unwrap_or_default()
    }

    fn period_at(&self, seconds: u64) -> PeriodInfo {
        self.speech_format
            .as_ref()
            .map(|f| f.period_at(seconds))
            .unwrap_or_default()
    }

    /// Invalidate the current run and abort its task.
    fn cancel_ticker(&mut self) {
        self.run_id = self.run_id.wrapping_add(1);
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    fn stop(&mut self) {
        self.cancel_ticker();
        self.state = TimerState::StoppedByUser;
        self.alerts.make_inactive();
        self.notify_update();
    }

    fn pause_for_bell(&mut self) {
        // the tick loop sees the new run id and exits after this tick
        self.run_id = self.run_id.wrapping_add(1);
        self.ticker = None;
        self.state = TimerState::StoppedByBell;
        self.alerts.wake_for_pause();
        self.notify_update();
    }

    /// Advance one second. Breaks when the loop should stop ticking.
    fn tick(&mut self) -> ControlFlow<()> {
        let Some(format) = self.speech_format.clone() else {
            return ControlFlow::Break(());
        };

        self.current_time += 1;
        self.notify_update();

        let mut flow = ControlFlow::Continue(());

        if let Some(bell) = format.bell_at(self.current_time) {
            debug!(
                time = self.current_time,
                pause = bell.is_pause_on_bell(),
                "bell"
            );
            self.period = self
                .period
                .followed_by(bell.next_period(), bell.is_pause_on_bell());
            if bell.is_pause_on_bell() {
                self.pause_for_bell();
                flow = ControlFlow::Break(());
            }
            self.alerts.bell_triggered(bell, &self.period);
        }

        // Can coincide with an ordinary bell; both are raised.
        if self
            .overtime_bells
            .rings_at(self.current_time, format.length())
        {
            debug!(time = self.current_time, "overtime bell");
            self.alerts.overtime_bell(self.current_time);
        }

        flow
    }
}

/// The clock for whichever speech is currently loaded.
pub struct SpeechTimer {
    core: Arc<Mutex<TimerCore>>,
}

impl SpeechTimer {
    pub fn new(alerts: Arc<dyn AlertSink>) -> Self {
        Self {
            core: Arc::new(Mutex::new(TimerCore {
                alerts,
                on_update: None,
                speech_format: None,
                period: PeriodInfo::default(),
                state: TimerState::NotStarted,
                current_time: 0,
                overtime_bells: OvertimeBells::default(),
                ticker: None,
                run_id: 0,
            })),
        }
    }

    /// Register the observer told about every tick and state change.
    pub fn set_update_callback(&self, callback: UpdateCallback) {
        self.core.lock().on_update = Some(callback);
    }

    pub fn clear_update_callback(&self) {
        self.core.lock().on_update = None;
    }

    /// Load a speech with `start_seconds` already elapsed.
    ///
    /// Fails without changing anything if the timer is running.
    pub fn load_speech(
        &self,
        format: Arc<SpeechFormat>,
        start_seconds: u64,
    ) -> Result<(), DebateError> {
        let mut core = self.core.lock();
        if core.state == TimerState::Running {
            return Err(DebateError::TimerRunning);
        }

        if start_seconds == 0 {
            core.period = format.first_period().clone();
            core.state = TimerState::NotStarted;
        } else {
            core.period = format.period_at(start_seconds);
            core.state = TimerState::StoppedByUser;
        }
        core.speech_format = Some(format);
        core.current_time = start_seconds;
        core.notify_update();
        Ok(())
    }

    /// Start ticking. The first tick comes one second from now.
    ///
    /// Does nothing if no speech is loaded or the timer is already running.
    pub fn start(&self) -> Result<(), DebateError> {
        let mut core = self.core.lock();
        if core.speech_format.is_none() || core.state == TimerState::Running {
            return Ok(());
        }
        let runtime = Handle::try_current().map_err(|_| DebateError::NoRuntime)?;

        core.cancel_ticker();
        let run_id = core.run_id;
        core.ticker = Some(spawn_ticker(Arc::downgrade(&self.core), run_id, &runtime));
        core.state = TimerState::Running;
        core.alerts.make_active(&core.period);
        core.notify_update();
        Ok(())
    }

    /// Stop ticking. Once this returns no further tick will happen.
    pub fn stop(&self) {
        self.core.lock().stop();
    }

    /// Stop and rewind to the start of the speech.
    pub fn reset(&self) {
        let mut core = self.core.lock();
        core.stop();
        core.current_time = 0;
        core.period = core.first_period();
        core.state = TimerState::NotStarted;
        core.notify_update();
    }

    /// Overwrite the elapsed time, even while running.
    ///
    /// A stopped timer ends up `NotStarted` or `StoppedByUser`; a pause
    /// caused by a bell no longer applies once the user edits the time.
    pub fn set_current_time(&self, seconds: u64) {
        let mut core = self.core.lock();
        core.current_time = seconds;
        if core.state != TimerState::Running {
            core.state = TimerState::resting_at(seconds);
        }
        core.period = core.period_at(seconds);
        core.notify_update();
    }

    pub fn set_overtime_bells(&self, first_bell: u64, period: u64) {
        self.core.lock().overtime_bells = OvertimeBells::new(first_bell, period);
    }

    pub fn overtime_bells(&self) -> OvertimeBells {
        self.core.lock().overtime_bells
    }

    pub fn status(&self) -> TimerState {
        self.core.lock().state
    }

    pub fn is_running(&self) -> bool {
        self.status() == TimerState::Running
    }

    /// Elapsed seconds, always counted up from zero.
    pub fn current_time(&self) -> u64 {
        self.core.lock().current_time
    }

    pub fn speech_format(&self) -> Option<Arc<SpeechFormat>> {
        self.core.lock().speech_format.clone()
    }

    pub fn current_period_info(&self) -> PeriodInfo {
        self.core.lock().period.clone()
    }

    /// True once the elapsed time is strictly past the speech length.
    pub fn is_overtime(&self) -> bool {
        let core = self.core.lock();
        core.speech_format
            .as_ref()
            .is_some_and(|f| core.current_time > f.length())
    }

    /// Time of the next bell, ordinary bells first, then overtime bells.
    pub fn next_bell_time(&self) -> Option<u64> {
        let core = self.core.lock();
        let format = core.speech_format.as_ref()?;
        if let Some(bell) = format.first_bell_after(core.current_time) {
            return Some(bell.time());
        }
        core.overtime_bells
            .next_after(core.current_time, format.length())
    }

    /// Whether the next ordinary bell will pause the timer.
    pub fn is_next_bell_pause(&self) -> bool {
        let core = self.core.lock();
        core.speech_format
            .as_ref()
            .and_then(|f| f.first_bell_after(core.current_time))
            .is_some_and(|b| b.is_pause_on_bell())
    }

    pub fn save_state(&self, key: &str, bundle: &mut StateBundle) {
        let core = self.core.lock();
        bundle.put_u64(format!("{key}{SUFFIX_TIME}"), core.current_time);
        bundle.put_str(format!("{key}{SUFFIX_STATE}"), core.state.as_str());
        core.period
            .save_state(&format!("{key}{SUFFIX_PERIOD}"), bundle);
    }

    /// Restore saved state on top of the loaded speech.
    ///
    /// Call after [`load_speech`](Self::load_speech). Missing or
    /// unrecognised entries fall back to defaults derived from the time.
    pub fn restore_state(&self, key: &str, bundle: &StateBundle) {
        let mut core = self.core.lock();
        if core.state == TimerState::Running {
            core.stop();
        }

        let time = bundle
            .get_u64(&format!("{key}{SUFFIX_TIME}"))
            .unwrap_or(0);
        let saved_state = bundle.get_str(&format!("{key}{SUFFIX_STATE}"));

        core.current_time = time;
        core.state = restored_state(saved_state, time);
        core.period
            .restore_state(&format!("{key}{SUFFIX_PERIOD}"), bundle);
        core.notify_update();
    }
}

impl Drop for SpeechTimer {
    fn drop(&mut self) {
        self.core.lock().cancel_ticker();
    }
}

/// Pick the state to resume in from a saved state name.
///
/// A saved `RUNNING` has no live tick task behind it after a restore, so it
/// resumes stopped like a missing or unreadable entry.
pub fn restored_state(saved: Option<&str>, time: u64) -> TimerState {
    match saved.map(str::parse::<TimerState>) {
        Some(Ok(TimerState::Running)) => TimerState::resting_at(time),
        Some(Ok(state)) => state,
        Some(Err(e)) => {
            warn!(error = %e, time, "ignoring saved timer state");
            TimerState::resting_at(time)
        }
        None => TimerState::resting_at(time),
    }
}

fn spawn_ticker(core: Weak<Mutex<TimerCore>>, run_id: u64, runtime: &Handle) -> JoinHandle<()> {
    let mut interval = tokio::time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);

    runtime.spawn(async move {
        loop {
            interval.tick().await;
            if tick_once(&core, run_id).is_break() {
                break;
            }
        }
    })
}

fn tick_once(core: &Weak<Mutex<TimerCore>>, run_id: u64) -> ControlFlow<()> {
    let Some(core) = core.upgrade() else {
        return ControlFlow::Break(());
    };
    let mut core = core.lock();
    if core.run_id != run_id || core.state != TimerState::Running {
        return ControlFlow::Break(());
    }
    core.tick()
}
