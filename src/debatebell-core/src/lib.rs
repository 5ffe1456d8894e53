//! debatebell Core Library
//!
//! Provides the speech timer, bell scheduling, debate sequencing and
//! persistence used to keep time in a debate.

pub mod alert;
pub mod config;
pub mod debate_format;
pub mod display;
pub mod error;
pub mod period;
pub mod sequencer;
pub mod speech_timer;
pub mod state_store;

pub use alert::{AlertEvent, AlertSink, NoAlerts};
pub use config::{Config, default_debate_format};
pub use debate_format::{BellInfo, CountDirection, DebateFormat, Speech, SpeechFormat, parse_time};
pub use error::DebateError;
pub use period::PeriodInfo;
pub use sequencer::DebateSequencer;
pub use speech_timer::{OvertimeBells, SpeechTimer, TimerState, UpdateCallback};
pub use state_store::StateBundle;
