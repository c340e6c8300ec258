use thiserror::Error;

/// Failures of the input layer that callers must not retry.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("unmapped key name: {0:?}")]
    UnmappedKey(String),
    #[error("input injection failed: {0}")]
    Injection(String),
}

/// Configuration rejected when the driver is built.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("phase sequence is empty")]
    EmptySequence,
    #[error("difficulty {0} outside 1..=25")]
    DifficultyOutOfRange(u32),
    #[error("unknown phase name: {0:?}")]
    UnknownPhase(String),
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
}
