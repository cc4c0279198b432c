//! Error types

use thiserror::Error;

use crate::sim::Phase;

/// Errors surfaced by draw commands and configuration access
#[derive(Debug, Error)]
pub enum DrawError {
    /// Start requested with nobody to race
    #[error("cannot start a race without participants")]
    EmptyParticipantSet,

    /// Start requested while a race or its celebration is still running
    #[error("a draw is already in progress (phase: {0:?})")]
    NotIdle(Phase),

    /// Config file could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for a draw config
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Failures reported by a recording sink. Logged, never fatal to the race.
#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("recording sink unavailable: {0}")]
    Unavailable(String),

    #[error("recording sink failed: {0}")]
    Sink(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not encode capture: {0}")]
    Encode(#[from] serde_json::Error),
}
