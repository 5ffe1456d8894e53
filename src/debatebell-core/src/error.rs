//! Error types for the debate timer.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DebateError {
    #[error("Can't load a speech while the timer is running")]
    TimerRunning,

    #[error("A debate needs at least one speech")]
    EmptyDebate,

    #[error("The timer can only be started inside a tokio runtime")]
    NoRuntime,

    #[error("Unknown timer state '{0}'")]
    UnknownTimerState(String),

    #[error("Invalid time '{value}': expected seconds or minutes:seconds")]
    InvalidTime { value: String },

    #[error("Unknown period '{period}' referenced by {context}")]
    UnknownPeriod { period: String, context: String },

    #[error("Unknown speech type '{speech_type}' for speech '{speech}'")]
    UnknownSpeechType { speech_type: String, speech: String },

    #[error("Unknown resource '{resource}' included by speech type '{speech_type}'")]
    UnknownResource {
        resource: String,
        speech_type: String,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("State file error: {0}")]
    StateFile(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
