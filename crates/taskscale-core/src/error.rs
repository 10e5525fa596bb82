//! Engine error types.
//!
//! Malformed task fields never surface here; they normalize to neutral values.
//! These variants cover caller mistakes that would otherwise produce
//! misleading zeros.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("negative count {count} for key '{key}' passed to percentage allocation")]
    NegativeCount { key: String, count: i64 },

    #[error("task list must be a JSON array, got {0}")]
    TasksNotArray(&'static str),

    #[error("aggregation takes one or two dimensions, got {0}")]
    InvalidDimensions(usize),

    #[error("comparison takes two or three periods, got {0}")]
    InvalidPeriodCount(usize),
}

pub type Result<T> = std::result::Result<T, EngineError>;
