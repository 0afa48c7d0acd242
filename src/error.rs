//! Error types for Scaffold Flux

use thiserror::Error;

/// Errors that can occur while capturing or aggregating a quiz session
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Cannot aggregate an empty session")]
    EmptySession,

    #[error("Session log incomplete: expected {expected} records, found {actual}")]
    IncompleteLog { expected: usize, actual: usize },

    #[error("No question is currently displayed")]
    NoActiveQuestion,

    #[error("Question {0} is already displayed")]
    QuestionAlreadyDisplayed(u32),

    #[error("An answer must be selected before advancing from question {0}")]
    SelectionRequired(u32),

    #[error("Session is complete; no further events are accepted")]
    SessionComplete,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Persistence failed: {0}")]
    Persistence(String),

    #[error("Export failed: {0}")]
    ExportError(String),
}
