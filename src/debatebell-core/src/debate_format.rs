//! Debate format definitions.
//!
//! A [`DebateFormat`] is the immutable description of a debate: an ordered
//! list of speeches, each bound to a [`SpeechFormat`] that says how long the
//! speech is and when its bells ring. Formats are built in code, loaded
//! from TOML (see [`crate::config`]), or taken from the built-in default.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::DebateError;
use crate::period::PeriodInfo;

/// Which way a speech format prefers its clock to be displayed.
///
/// This is only a display hint; elapsed time is always counted up from zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountDirection {
    Up,
    Down,
    #[default]
    Unspecified,
}

/// A bell scheduled at a fixed offset into a speech.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BellInfo {
    time: u64,
    pause_on_bell: bool,
    next_period: PeriodInfo,
}

impl BellInfo {
    pub fn new(time: u64, pause_on_bell: bool, next_period: PeriodInfo) -> Self {
        Self {
            time,
            pause_on_bell,
            next_period,
        }
    }

    /// Seconds from the start of the speech.
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn is_pause_on_bell(&self) -> bool {
        self.pause_on_bell
    }

    /// The period that begins once this bell rings.
    pub fn next_period(&self) -> &PeriodInfo {
        &self.next_period
    }
}

/// Length, bells and first period of one kind of speech.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechFormat {
    length: u64,
    count_direction: CountDirection,
    first_period: PeriodInfo,
    bells: Vec<BellInfo>,
}

impl SpeechFormat {
    pub fn new(length: u64) -> Self {
        Self {
            length,
            count_direction: CountDirection::Unspecified,
            first_period: PeriodInfo::default(),
            bells: Vec::new(),
        }
    }

    pub fn with_count_direction(mut self, direction: CountDirection) -> Self {
        self.count_direction = direction;
        self
    }

    pub fn with_first_period(mut self, period: PeriodInfo) -> Self {
        self.first_period = period;
        self
    }

    /// Add a bell, keeping the list ordered by time. Bells sharing a time
    /// keep their insertion order.
    pub fn with_bell(mut self, bell: BellInfo) -> Self {
        let index = self.bells.partition_point(|b| b.time <= bell.time);
        self.bells.insert(index, bell);
        self
    }

    /// Add the bell that marks the end of the speech.
    pub fn with_finish_bell(self, pause_on_bell: bool, next_period: PeriodInfo) -> Self {
        let length = self.length;
        self.with_bell(BellInfo::new(length, pause_on_bell, next_period))
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn count_direction(&self) -> CountDirection {
        self.count_direction
    }

    pub fn first_period(&self) -> &PeriodInfo {
        &self.first_period
    }

    pub fn bells(&self) -> &[BellInfo] {
        &self.bells
    }

    /// The bell that rings at exactly `seconds`, if any.
    pub fn bell_at(&self, seconds: u64) -> Option<&BellInfo> {
        self.bells.iter().find(|b| b.time == seconds)
    }

    /// The first bell that has not yet rung by `seconds`.
    pub fn first_bell_after(&self, seconds: u64) -> Option<&BellInfo> {
        self.bells.iter().find(|b| b.time > seconds)
    }

    /// The period in effect at `seconds`: the first period with every bell
    /// at or before `seconds` applied in order.
    pub fn period_at(&self, seconds: u64) -> PeriodInfo {
        self.bells
            .iter()
            .take_while(|b| b.time <= seconds)
            .fold(self.first_period.clone(), |period, bell| {
                period.followed_by(&bell.next_period, bell.pause_on_bell)
            })
    }
}

/// A single speech in a debate.
#[derive(Debug, Clone)]
pub struct Speech {
    /// Name announced for this speech, e.g. "1st Affirmative".
    pub name: String,
    pub format: Arc<SpeechFormat>,
}

impl Speech {
    pub fn new(name: impl Into<String>, format: Arc<SpeechFormat>) -> Self {
        Self {
            name: name.into(),
            format,
        }
    }
}

/// An ordered, named list of speeches.
#[derive(Debug, Clone)]
pub struct DebateFormat {
    name: String,
    speeches: Vec<Speech>,
}

impl DebateFormat {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            speeches: Vec::new(),
        }
    }

    pub fn with_speech(mut self, name: impl Into<String>, format: Arc<SpeechFormat>) -> Self {
        self.speeches.push(Speech::new(name, format));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn speeches(&self) -> &[Speech] {
        &self.speeches
    }

    pub fn speech(&self, index: usize) -> Option<&Speech> {
        self.speeches.get(index)
    }

    pub fn number_of_speeches(&self) -> usize {
        self.speeches.len()
    }
}

/// Parse `"m:ss"` or plain `"ss"` into seconds.
pub fn parse_time(value: &str) -> Result<u64, DebateError> {
    let invalid = || DebateError::InvalidTime {
        value: value.to_string(),
    };
    let parse = |part: &str| part.trim().parse::<u64>().map_err(|_| invalid());

    match value.split_once(':') {
        Some((minutes, seconds)) => {
            let minutes = parse(minutes)?;
            let seconds = parse(seconds)?;
            minutes
                .checked_mul(60)
                .and_then(|m| m.checked_add(seconds))
                .ok_or_else(invalid)
        }
        None => parse(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bell(time: u64, pause: bool, description: &str) -> BellInfo {
        BellInfo::new(time, pause, PeriodInfo::new(description))
    }

    fn sample_format() -> SpeechFormat {
        SpeechFormat::new(420)
            .with_first_period(PeriodInfo::new("Initial"))
            .with_finish_bell(false, PeriodInfo::new("Overtime"))
            .with_bell(bell(60, false, "POIs allowed"))
            .with_bell(bell(360, false, "Warning"))
    }

    #[test]
    fn test_bells_are_kept_sorted() {
        let format = sample_format();
        let times: Vec<u64> = format.bells().iter().map(BellInfo::time).collect();
        assert_eq!(times, vec![60, 360, 420]);
    }

    #[test]
    fn test_equal_times_keep_insertion_order() {
        let format = SpeechFormat::new(60)
            .with_bell(bell(30, false, "first"))
            .with_bell(bell(30, true, "second"));

        assert_eq!(
            format.bell_at(30).unwrap().next_period().description.as_deref(),
            Some("first")
        );
        assert_eq!(format.bells()[1].next_period().description.as_deref(), Some("second"));
    }

    #[test]
    fn test_bell_at_exact_time_only() {
        let format = sample_format();
        assert!(format.bell_at(60).is_some());
        assert!(format.bell_at(59).is_none());
        assert!(format.bell_at(420).is_some());
        assert!(format.bell_at(421).is_none());
    }

    #[test]
    fn test_first_bell_after_skips_rung_bells() {
        let format = sample_format();
        assert_eq!(format.first_bell_after(0).map(BellInfo::time), Some(60));
        assert_eq!(format.first_bell_after(60).map(BellInfo::time), Some(360));
        assert_eq!(format.first_bell_after(400).map(BellInfo::time), Some(420));
        assert!(format.first_bell_after(420).is_none());
    }

    #[test]
    fn test_period_at() {
        let format = sample_format();
        assert_eq!(format.period_at(0).description.as_deref(), Some("Initial"));
        assert_eq!(format.period_at(59).description.as_deref(), Some("Initial"));
        assert_eq!(format.period_at(60).description.as_deref(), Some("POIs allowed"));
        assert_eq!(format.period_at(419).description.as_deref(), Some("Warning"));
        assert_eq!(format.period_at(1000).description.as_deref(), Some("Overtime"));
    }

    #[test]
    fn test_period_at_adopts_last_pause_flag() {
        let format = SpeechFormat::new(60)
            .with_bell(bell(30, true, "Paused"))
            .with_bell(bell(45, false, "Resumed"));

        assert!(format.period_at(30).pause_on_bell);
        assert!(!format.period_at(45).pause_on_bell);
    }

    #[test]
    fn test_debate_format_speeches() {
        let speech = Arc::new(sample_format());
        let debate = DebateFormat::new("Test")
            .with_speech("1st Affirmative", speech.clone())
            .with_speech("1st Negative", speech);

        assert_eq!(debate.name(), "Test");
        assert_eq!(debate.number_of_speeches(), 2);
        assert_eq!(debate.speech(1).unwrap().name, "1st Negative");
        assert!(debate.speech(2).is_none());
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("7:00").unwrap(), 420);
        assert_eq!(parse_time("0:30").unwrap(), 30);
        assert_eq!(parse_time("90").unwrap(), 90);
        assert_eq!(parse_time("1:5").unwrap(), 65);
    }

    #[test]
    fn test_parse_time_rejects_garbage() {
        assert!(parse_time("").is_err());
        assert!(parse_time("abc").is_err());
        assert!(parse_time("1:xx").is_err());
        assert!(parse_time("-5").is_err());
        assert!(parse_time("1:2:3").is_err());
    }
}
