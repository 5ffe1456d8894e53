//! Debate sequencing.
//!
//! Walks a debate speech by speech, driving one [`SpeechTimer`] and
//! remembering how far each speech had got so the user can move back and
//! forth between speakers.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::alert::AlertSink;
use crate::debate_format::{DebateFormat, SpeechFormat};
use crate::error::DebateError;
use crate::period::PeriodInfo;
use crate::speech_timer::{OvertimeBells, SpeechTimer, TimerState, UpdateCallback};
use crate::state_store::StateBundle;

const SUFFIX_INDEX: &str = ".index";
const SUFFIX_SPEECH: &str = ".speech";
const SUFFIX_SPEECH_TIMES: &str = ".speech_times";

/// Runs the speeches of a debate in order.
pub struct DebateSequencer {
    format: DebateFormat,
    timer: SpeechTimer,
    /// Elapsed seconds per speech, written when leaving a speech.
    speech_times: Vec<u64>,
    current_index: usize,
}

impl DebateSequencer {
    /// Create a sequencer positioned at the start of the first speech.
    pub fn new(format: DebateFormat, alerts: Arc<dyn AlertSink>) -> Result<Self, DebateError> {
        let first = format
            .speech(0)
            .map(|s| s.format.clone())
            .ok_or(DebateError::EmptyDebate)?;

        let timer = SpeechTimer::new(alerts);
        timer.load_speech(first, 0)?;

        Ok(Self {
            speech_times: vec![0; format.number_of_speeches()],
            format,
            timer,
            current_index: 0,
        })
    }

    pub fn set_update_callback(&self, callback: UpdateCallback) {
        self.timer.set_update_callback(callback);
    }

    pub fn start_timer(&self) -> Result<(), DebateError> {
        self.timer.start()
    }

    pub fn stop_timer(&self) {
        self.timer.stop();
    }

    pub fn reset_current_speaker(&self) {
        self.timer.reset();
    }

    /// Move to the next speech. On the last speech this reloads it.
    pub fn go_to_next(&mut self) -> Result<(), DebateError> {
        self.timer.stop();
        self.save_current_speech();
        if !self.is_last() {
            self.current_index += 1;
        }
        self.load_current_speech()
    }

    /// Move to the previous speech. On the first speech this reloads it.
    pub fn go_to_previous(&mut self) -> Result<(), DebateError> {
        self.timer.stop();
        self.save_current_speech();
        if !self.is_first() {
            self.current_index -= 1;
        }
        self.load_current_speech()
    }

    pub fn is_first(&self) -> bool {
        self.current_index == 0
    }

    pub fn is_last(&self) -> bool {
        self.current_index + 1 == self.format.number_of_speeches()
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn status(&self) -> TimerState {
        self.timer.status()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn speech_count(&self) -> usize {
        self.format.number_of_speeches()
    }

    pub fn debate_format_name(&self) -> &str {
        self.format.name()
    }

    pub fn current_speech_name(&self) -> &str {
        self.format
            .speech(self.current_index)
            .map(|s| s.name.as_str())
            .unwrap_or_default()
    }

    pub fn current_speech_format(&self) -> Option<Arc<SpeechFormat>> {
        self.timer.speech_format()
    }

    pub fn current_speech_time(&self) -> u64 {
        self.timer.current_time()
    }

    pub fn next_bell_time(&self) -> Option<u64> {
        self.timer.next_bell_time()
    }

    pub fn is_next_bell_pause(&self) -> bool {
        self.timer.is_next_bell_pause()
    }

    pub fn is_overtime(&self) -> bool {
        self.timer.is_overtime()
    }

    pub fn current_period_info(&self) -> PeriodInfo {
        self.timer.current_period_info()
    }

    pub fn speech_names(&self) -> impl Iterator<Item = &str> {
        self.format.speeches().iter().map(|s| s.name.as_str())
    }

    /// Cached elapsed time of every speech, as of when each was last left.
    pub fn speech_times(&self) -> &[u64] {
        &self.speech_times
    }

    /// Set the current speech's time. Only navigation updates the cache.
    pub fn set_current_speech_time(&self, seconds: u64) {
        self.timer.set_current_time(seconds);
    }

    pub fn set_overtime_bells(&self, first_bell: u64, period: u64) {
        self.timer.set_overtime_bells(first_bell, period);
    }

    pub fn overtime_bells(&self) -> OvertimeBells {
        self.timer.overtime_bells()
    }

    pub fn save_state(&self, key: &str, bundle: &mut StateBundle) {
        bundle.put_u64(format!("{key}{SUFFIX_INDEX}"), self.current_index as u64);
        bundle.put_u64_list(format!("{key}{SUFFIX_SPEECH_TIMES}"), &self.speech_times);
        self.timer
            .save_state(&format!("{key}{SUFFIX_SPEECH}"), bundle);
    }

    /// Restore a saved debate. The matching speech is loaded before the
    /// timer's own state is applied on top of it.
    pub fn restore_state(&mut self, key: &str, bundle: &StateBundle) -> Result<(), DebateError> {
        self.timer.stop();

        if let Some(times) = bundle.get_u64_list(&format!("{key}{SUFFIX_SPEECH_TIMES}")) {
            if times.len() != self.speech_times.len() {
                warn!(
                    saved = times.len(),
                    speeches = self.speech_times.len(),
                    "saved speech times don't match this debate"
                );
            }
            for (slot, time) in self.speech_times.iter_mut().zip(times) {
                *slot = *time;
            }
        }

        self.current_index = restored_index(
            bundle.get_u64(&format!("{key}{SUFFIX_INDEX}")),
            self.format.number_of_speeches(),
        );
        self.load_current_speech()?;
        self.timer
            .restore_state(&format!("{key}{SUFFIX_SPEECH}"), bundle);
        Ok(())
    }

    /// Start the whole debate again from the first speech with every
    /// speech's time cleared. Overtime settings and observers are kept.
    pub fn reset_debate(&mut self) -> Result<(), DebateError> {
        self.timer.stop();
        self.speech_times.fill(0);
        self.current_index = 0;
        debug!("resetting debate");
        self.load_current_speech()
    }

    /// Stop the timer and give up the sequencer.
    pub fn release(self) {
        self.timer.stop();
    }

    fn save_current_speech(&mut self) {
        self.speech_times[self.current_index] = self.timer.current_time();
    }

    fn load_current_speech(&self) -> Result<(), DebateError> {
        let speech = self
            .format
            .speech(self.current_index)
            .ok_or(DebateError::EmptyDebate)?;
        debug!(index = self.current_index, speech = %speech.name, "loading speech");
        self.timer
            .load_speech(speech.format.clone(), self.speech_times[self.current_index])
    }
}

/// Saved speech index, or the first speech if it is missing or out of range.
fn restored_index(saved: Option<u64>, speech_count: usize) -> usize {
    match saved.and_then(|i| usize::try_from(i).ok()) {
        Some(index) if index < speech_count => index,
        Some(index) => {
            warn!(index, speech_count, "saved speech index out of range");
            0
        }
        None => 0,
    }
}
