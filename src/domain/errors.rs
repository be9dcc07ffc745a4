//! EngineError — the error taxonomy from spec.md §7, as a single `thiserror` enum
//! per the teacher's per-domain enum style (`src/domain/errors.rs`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot reach persistence: {0}")]
    Connection(String),

    #[error("no response within {0}ms")]
    Timeout(u64),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("storage write failed: {0}")]
    Storage(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("capacity exceeded: {0}")]
    Capacity(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("fatal: {0}")]
    Fatal(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
