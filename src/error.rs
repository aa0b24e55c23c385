// src/error.rs

use thiserror::Error;

/// Errors raised while building gait cycles or processing trial signals.
///
/// Every variant describes bad or incomplete input data. None of them are
/// transient, so callers decide whether to skip the trial, abort, or ask for
/// corrected events; the library never retries or patches data silently.
#[derive(Debug, Error)]
pub enum GaitDataError {
    #[error("insufficient events: need at least 2 foot strikes, found {found}")]
    InsufficientEvents { found: usize },

    #[error("ambiguous toe-off: expected exactly 1 foot-off inside frames {start}..{end}, found {found}")]
    AmbiguousToeOff { start: i64, end: i64, found: usize },

    #[error("degenerate cycle: length of {length} frame(s) cannot be normalized")]
    DegenerateCycle { length: i64 },

    #[error("analog channel '{0}' not found")]
    ChannelNotFound(String),

    #[error("analog channel name '{name}' is ambiguous, matches: {matches:?}")]
    AmbiguousChannel { name: String, matches: Vec<String> },

    #[error("signal '{0}' not found")]
    SignalNotFound(String),

    #[error("range {start}..{end} is outside signal '{name}' of {len} samples")]
    SignalOutOfRange {
        name: String,
        start: i64,
        end: i64,
        len: usize,
    },

    #[error("signal of {len} samples is too short for zero-phase filtering (needs more than {min})")]
    SignalTooShort { len: usize, min: usize },

    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("EMG channel '{name}' looks disconnected (interference ratio {ratio:.1})")]
    EmgDisconnected { name: String, ratio: f64 },

    #[error("no normalized curves to aggregate")]
    NoCurves,

    #[error("parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, GaitDataError>;

// src/error.rs
