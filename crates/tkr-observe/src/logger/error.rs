use thiserror::Error;

/// Failure while parsing logger settings or installing the subscriber.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format {0:?}, expected one of text, json, journald")]
    InvalidFormat(String),

    #[error("invalid log filter {0}")]
    InvalidLevel(String),

    #[error("journald output is only available on linux")]
    JournaldNotSupported,

    #[error("cannot connect to journald: {0}")]
    JournaldInitFailed(String),

    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,
}

pub type LoggerResult<T> = Result<T, LoggerError>;
